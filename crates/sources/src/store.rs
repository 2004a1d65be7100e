use std::path::Path;

use serde::Serialize;

use super::error::SourceError;

/// One object listed in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
	pub key: String,
	pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
	/// The object was copied to its destination.
	Downloaded,
	/// The destination already existed and the download was not forced.
	Skipped,
}

/// What a completed download left on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadStatus {
	pub kind: DownloadKind,
	pub bytes: u64,
	/// blake3 hex digest of the file at the destination.
	pub checksum: String,
}

/// Remote object storage organised as buckets of keyed objects.
///
/// Calls are synchronous since they run on pool threads, one download per job.
pub trait ObjectStore: Send + Sync + 'static {
	fn exists(&self, bucket: &str) -> Result<bool, SourceError>;

	/// Every object in `bucket`, sorted by key.
	fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>, SourceError>;

	/// Copies one object to `dest`.
	///
	/// An existing `dest` is kept and reported as [`DownloadKind::Skipped`] unless `force` is set.
	/// A missing object is an error either way.
	fn download(
		&self,
		bucket: &str,
		key: &str,
		dest: &Path,
		force: bool,
	) -> Result<DownloadStatus, SourceError>;
}
