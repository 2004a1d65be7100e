use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
	#[error("object store is unreachable <root='{}'>: {source}", .root.display())]
	Connection {
		root: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("bucket <name='{0}'> not found")]
	BucketNotFound(String),
	#[error("object <bucket='{bucket}', key='{key}'> not found")]
	ObjectNotFound { bucket: String, key: String },
	#[error("invalid object key '{key}': {reason}")]
	InvalidKey { key: String, reason: &'static str },
	#[error("job parameter '{0}' is missing or not a string")]
	MissingParam(&'static str),
	#[error("i/o error <path='{}'>: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl SourceError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}
}
