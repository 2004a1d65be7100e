use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
	query::Query,
	sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
	Row, Sqlite, TypeInfo, ValueRef,
};
use tracing::{debug, info};

use super::{
	error::MetadataError,
	store::RelationalStore,
	value::{SqlRow, SqlValue},
};

const MAX_CONNECTIONS: u32 = 4;

/// [`RelationalStore`] over a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
	pool: SqlitePool,
}

impl SqliteStore {
	/// Opens `url` (`sqlite://path/to/file.db`), creating the database file if it is missing.
	pub async fn connect(url: &str) -> Result<Self, MetadataError> {
		let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

		let pool = SqlitePoolOptions::new()
			.max_connections(MAX_CONNECTIONS)
			.connect_with(options)
			.await?;

		info!("Connected to metadata database;");

		Ok(Self { pool })
	}

	/// A private in-memory database. Lives as long as this store.
	pub async fn in_memory() -> Result<Self, MetadataError> {
		let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

		// Every connection would open its own empty database
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.min_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?;

		Ok(Self { pool })
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}

#[async_trait]
impl RelationalStore for SqliteStore {
	async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, MetadataError> {
		debug!(sql, params = params.len(), "Executing statement;");

		let rows = bind_all(sqlx::query(sql), params)
			.fetch_all(&self.pool)
			.await?;

		rows.iter()
			.map(decode_row)
			.collect::<Result<_, _>>()
			.map_err(Into::into)
	}

	async fn execute_many(&self, sql: &str, rows: &[SqlRow]) -> Result<u64, MetadataError> {
		debug!(sql, rows = rows.len(), "Executing batch;");

		let mut tx = self.pool.begin().await?;
		let mut affected = 0;

		for params in rows {
			affected += bind_all(sqlx::query(sql), params)
				.execute(&mut *tx)
				.await?
				.rows_affected();
		}

		tx.commit().await?;

		Ok(affected)
	}
}

fn bind_all<'q>(
	query: Query<'q, Sqlite, SqliteArguments<'q>>,
	params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	params.iter().fold(query, |query, value| match value {
		SqlValue::Null => query.bind(None::<i64>),
		SqlValue::Integer(value) => query.bind(*value),
		SqlValue::Real(value) => query.bind(*value),
		SqlValue::Text(value) => query.bind(value.clone()),
		SqlValue::Blob(value) => query.bind(value.clone()),
	})
}

fn decode_row(row: &SqliteRow) -> Result<SqlRow, sqlx::Error> {
	(0..row.len())
		.map(|index| {
			let raw = row.try_get_raw(index)?;
			if raw.is_null() {
				return Ok(SqlValue::Null);
			}

			let storage = raw.type_info().name().to_string();

			Ok(match storage.as_str() {
				"INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(index)?),
				"REAL" | "NUMERIC" => SqlValue::Real(row.try_get(index)?),
				"BLOB" => SqlValue::Blob(row.try_get(index)?),
				_ => SqlValue::Text(row.try_get(index)?),
			})
		})
		.collect()
}
