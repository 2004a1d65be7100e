use async_trait::async_trait;

use super::{
	error::MetadataError,
	value::{SqlRow, SqlValue},
};

/// The relational store collaborator: parameterised statements in, rows out.
#[async_trait]
pub trait RelationalStore: Send + Sync {
	/// Runs one statement, returning whatever rows it produced.
	async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, MetadataError>;

	/// Runs one statement per parameter row, all or nothing, returning the affected row count.
	async fn execute_many(&self, sql: &str, rows: &[SqlRow]) -> Result<u64, MetadataError>;
}
