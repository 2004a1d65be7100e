use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("unexpected value in column '{column}', expected {expected}")]
	Decode {
		column: &'static str,
		expected: &'static str,
	},
	#[error("value out of range for column '{0}'")]
	OutOfRange(&'static str),
}
