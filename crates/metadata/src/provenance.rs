use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{
	error::MetadataError,
	store::RelationalStore,
	value::{SqlRow, SqlValue},
};

pub const DATASET_FILES_DDL: &str = "
CREATE TABLE IF NOT EXISTS dataset_files (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	project_id TEXT NOT NULL,
	bucket TEXT NOT NULL,
	object_key TEXT NOT NULL,
	path TEXT NOT NULL,
	bytes INTEGER NOT NULL,
	checksum TEXT NOT NULL,
	downloaded_at TEXT NOT NULL
)";

const INSERT_FILE: &str = "
INSERT INTO dataset_files (project_id, bucket, object_key, path, bytes, checksum, downloaded_at)
VALUES (?, ?, ?, ?, ?, ?, ?)";

const SELECT_FILES: &str = "
SELECT project_id, bucket, object_key, path, bytes, checksum, downloaded_at
FROM dataset_files
WHERE project_id = ?
ORDER BY object_key, id";

/// Where one downloaded file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
	pub project_id: String,
	pub bucket: String,
	pub key: String,
	pub path: String,
	pub bytes: u64,
	pub checksum: String,
	pub downloaded_at: DateTime<Utc>,
}

impl FileRecord {
	fn to_row(&self) -> Result<SqlRow, MetadataError> {
		Ok(vec![
			self.project_id.as_str().into(),
			self.bucket.as_str().into(),
			self.key.as_str().into(),
			self.path.as_str().into(),
			i64::try_from(self.bytes)
				.map_err(|_| MetadataError::OutOfRange("bytes"))?
				.into(),
			self.checksum.as_str().into(),
			self.downloaded_at.to_rfc3339().into(),
		])
	}

	fn from_row(row: &[SqlValue]) -> Result<Self, MetadataError> {
		let text = |index: usize, column| {
			row.get(index)
				.and_then(SqlValue::as_str)
				.map(ToString::to_string)
				.ok_or(MetadataError::Decode {
					column,
					expected: "text",
				})
		};

		let bytes = row
			.get(4)
			.and_then(SqlValue::as_i64)
			.ok_or(MetadataError::Decode {
				column: "bytes",
				expected: "integer",
			})?;

		let downloaded_at = DateTime::parse_from_rfc3339(&text(6, "downloaded_at")?)
			.map_err(|_| MetadataError::Decode {
				column: "downloaded_at",
				expected: "an RFC 3339 timestamp",
			})?
			.with_timezone(&Utc);

		Ok(Self {
			project_id: text(0, "project_id")?,
			bucket: text(1, "bucket")?,
			key: text(2, "object_key")?,
			path: text(3, "path")?,
			bytes: u64::try_from(bytes).map_err(|_| MetadataError::OutOfRange("bytes"))?,
			checksum: text(5, "checksum")?,
			downloaded_at,
		})
	}
}

/// Records which files each project downloaded.
#[derive(Debug)]
pub struct ProvenanceLog<S> {
	store: S,
}

impl<S: RelationalStore> ProvenanceLog<S> {
	pub const fn new(store: S) -> Self {
		Self { store }
	}

	pub const fn store(&self) -> &S {
		&self.store
	}

	/// Creates the `dataset_files` table if it does not exist.
	pub async fn ensure_schema(&self) -> Result<(), MetadataError> {
		self.ensure_schema_with(DATASET_FILES_DDL).await
	}

	pub async fn ensure_schema_with(&self, ddl: &str) -> Result<(), MetadataError> {
		self.store.execute(ddl, &[]).await?;
		debug!("Provenance schema ready;");
		Ok(())
	}

	/// Inserts every record in one transaction, returning how many rows were written.
	pub async fn record(&self, files: &[FileRecord]) -> Result<u64, MetadataError> {
		if files.is_empty() {
			return Ok(0);
		}

		let rows = files
			.iter()
			.map(FileRecord::to_row)
			.collect::<Result<Vec<_>, _>>()?;

		let written = self.store.execute_many(INSERT_FILE, &rows).await?;

		info!(written, "Recorded downloaded files;");

		Ok(written)
	}

	/// Every file recorded for `project_id`, ordered by object key.
	pub async fn files_for_project(&self, project_id: &str) -> Result<Vec<FileRecord>, MetadataError> {
		self.store
			.execute(SELECT_FILES, &[project_id.into()])
			.await?
			.iter()
			.map(|row| FileRecord::from_row(row))
			.collect()
	}
}
