use std::{path::PathBuf, sync::Arc};

use nlr_job_system::{Job, Worker};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{
	error::SourceError,
	plan::{PARAM_BUCKET, PARAM_DESTINATION, PARAM_FORCE, PARAM_KEY},
	store::{DownloadKind, ObjectStore},
};

/// An object now present at its destination, as reported back to the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReceipt {
	pub kind: DownloadKind,
	pub bucket: String,
	pub key: String,
	pub path: PathBuf,
	pub bytes: u64,
	pub checksum: String,
}

/// Downloads the single object named by a job's `bucket` and `key` to its `destination`.
pub struct DownloadWorker<S> {
	store: Arc<S>,
}

impl<S: ObjectStore> DownloadWorker<S> {
	pub fn new(store: Arc<S>) -> Self {
		Self { store }
	}
}

impl<S: ObjectStore> Worker for DownloadWorker<S> {
	type Output = DownloadReceipt;
	type Error = SourceError;

	fn execute(&self, job: &Job<DownloadReceipt>) -> Result<DownloadReceipt, SourceError> {
		let param = |name| job.param_str(name).ok_or(SourceError::MissingParam(name));

		let bucket = param(PARAM_BUCKET)?;
		let key = param(PARAM_KEY)?;
		let path = PathBuf::from(param(PARAM_DESTINATION)?);
		let force = job
			.params()
			.get(PARAM_FORCE)
			.and_then(Value::as_bool)
			.unwrap_or(false);

		let status = self.store.download(bucket, key, &path, force)?;

		match status.kind {
			DownloadKind::Downloaded => info!(bucket, key, bytes = status.bytes, "Downloaded {key};"),
			DownloadKind::Skipped => {
				info!(bucket, key, "{key} already exists and force is not set, skipped;");
			}
		}

		Ok(DownloadReceipt {
			kind: status.kind,
			bucket: bucket.to_string(),
			key: key.to_string(),
			path,
			bytes: status.bytes,
			checksum: status.checksum,
		})
	}
}
