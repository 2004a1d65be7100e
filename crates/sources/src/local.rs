use std::{
	fs::{self, File},
	io::{self, ErrorKind, Read, Write},
	path::{Component, Path, PathBuf},
};

use blake3::Hasher;
use tracing::{debug, trace};

use super::{
	error::SourceError,
	store::{DownloadKind, DownloadStatus, ObjectInfo, ObjectStore},
};

const BLOCK_LEN: usize = 1024 * 1024;

/// An [`ObjectStore`] over a local directory: every subdirectory of `root` is a bucket and every
/// file below it an object, keyed by its `/` separated relative path.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
	root: PathBuf,
}

impl LocalObjectStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn connect(&self) -> Result<(), SourceError> {
		match fs::metadata(&self.root) {
			Ok(metadata) if metadata.is_dir() => Ok(()),
			Ok(_) => Err(SourceError::Connection {
				root: self.root.clone(),
				source: io::Error::other("object store root is not a directory"),
			}),
			Err(source) => Err(SourceError::Connection {
				root: self.root.clone(),
				source,
			}),
		}
	}

	fn bucket_path(&self, bucket: &str) -> Result<PathBuf, SourceError> {
		self.connect()?;

		let path = self.root.join(bucket);
		if is_plain_segment(bucket) && path.is_dir() {
			Ok(path)
		} else {
			Err(SourceError::BucketNotFound(bucket.to_string()))
		}
	}
}

impl ObjectStore for LocalObjectStore {
	fn exists(&self, bucket: &str) -> Result<bool, SourceError> {
		match self.bucket_path(bucket) {
			Ok(_) => Ok(true),
			Err(SourceError::BucketNotFound(_)) => Ok(false),
			Err(e) => Err(e),
		}
	}

	fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>, SourceError> {
		let bucket_path = self.bucket_path(bucket)?;

		let mut objects = Vec::new();
		collect_objects(&bucket_path, "", &mut objects)?;
		objects.sort_by(|a, b| a.key.cmp(&b.key));

		debug!(bucket, objects = objects.len(), "Listed bucket;");

		Ok(objects)
	}

	fn download(
		&self,
		bucket: &str,
		key: &str,
		dest: &Path,
		force: bool,
	) -> Result<DownloadStatus, SourceError> {
		let source = self.bucket_path(bucket)?.join(validate_key(key)?);

		let mut reader = match File::open(&source) {
			Ok(file) => file,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				return Err(SourceError::ObjectNotFound {
					bucket: bucket.to_string(),
					key: key.to_string(),
				})
			}
			Err(e) => return Err(SourceError::io(&source)(e)),
		};

		if !force && dest.is_file() {
			let mut existing = File::open(dest).map_err(SourceError::io(dest))?;
			let (bytes, checksum) = copy_hashed(&mut existing, &mut io::sink(), dest, dest)?;

			debug!(bucket, key, "Destination already exists, skipping download;");

			return Ok(DownloadStatus {
				kind: DownloadKind::Skipped,
				bytes,
				checksum,
			});
		}

		if let Some(parent) = dest.parent() {
			fs::create_dir_all(parent).map_err(SourceError::io(parent))?;
		}

		let mut writer = File::create(dest).map_err(SourceError::io(dest))?;
		let (bytes, checksum) = copy_hashed(&mut reader, &mut writer, &source, dest)?;
		writer.sync_all().map_err(SourceError::io(dest))?;

		trace!(bucket, key, bytes, "Downloaded object;");

		Ok(DownloadStatus {
			kind: DownloadKind::Downloaded,
			bytes,
			checksum,
		})
	}
}

/// Copies `reader` into `writer` block by block, returning the byte count and blake3 hex digest.
fn copy_hashed(
	reader: &mut impl Read,
	writer: &mut impl Write,
	from: &Path,
	to: &Path,
) -> Result<(u64, String), SourceError> {
	let mut hasher = Hasher::new();
	let mut buffer = vec![0; BLOCK_LEN].into_boxed_slice();
	let mut bytes = 0;

	loop {
		let read_count = reader.read(&mut buffer).map_err(SourceError::io(from))?;
		if read_count == 0 {
			break;
		}

		hasher.update(&buffer[..read_count]);
		writer
			.write_all(&buffer[..read_count])
			.map_err(SourceError::io(to))?;
		bytes += read_count as u64;
	}

	Ok((bytes, hasher.finalize().to_hex().to_string()))
}

fn collect_objects(dir: &Path, prefix: &str, objects: &mut Vec<ObjectInfo>) -> Result<(), SourceError> {
	for entry in fs::read_dir(dir).map_err(SourceError::io(dir))? {
		let entry = entry.map_err(SourceError::io(dir))?;
		let path = entry.path();
		let metadata = entry.metadata().map_err(SourceError::io(&path))?;
		let name = entry.file_name().to_string_lossy().into_owned();
		let key = if prefix.is_empty() {
			name
		} else {
			format!("{prefix}/{name}")
		};

		if metadata.is_dir() {
			collect_objects(&path, &key, objects)?;
		} else {
			objects.push(ObjectInfo {
				key,
				size: metadata.len(),
			});
		}
	}

	Ok(())
}

fn is_plain_segment(segment: &str) -> bool {
	matches!(
		Path::new(segment).components().collect::<Vec<_>>().as_slice(),
		[Component::Normal(_)]
	)
}

/// Keys are relative `/` separated paths that stay inside their bucket.
pub(crate) fn validate_key(key: &str) -> Result<&Path, SourceError> {
	let invalid = |reason| SourceError::InvalidKey {
		key: key.to_string(),
		reason,
	};

	if key.is_empty() {
		return Err(invalid("key is empty"));
	}

	let path = Path::new(key);
	if !path
		.components()
		.all(|component| matches!(component, Component::Normal(_)))
	{
		return Err(invalid("key must stay inside its bucket"));
	}

	Ok(path)
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LocalObjectStore) {
		let dir = tempdir().expect("temp dir");
		for (key, contents) in files {
			let path = dir.path().join(key);
			fs::create_dir_all(path.parent().expect("has parent")).expect("dirs");
			fs::write(path, contents).expect("write");
		}
		let store = LocalObjectStore::new(dir.path());
		(dir, store)
	}

	#[test]
	fn lists_nested_objects_sorted() {
		let (_dir, store) = store_with(&[
			("raw/b.txt", "bb"),
			("raw/a/z.txt", "z"),
			("raw/a/y.txt", "yyy"),
		]);

		let keys = store
			.list_objects("raw")
			.expect("listed")
			.into_iter()
			.map(|object| (object.key, object.size))
			.collect::<Vec<_>>();

		assert_eq!(
			keys,
			[
				("a/y.txt".to_string(), 3),
				("a/z.txt".to_string(), 1),
				("b.txt".to_string(), 2)
			]
		);
	}

	#[test]
	fn bucket_existence() {
		let (_dir, store) = store_with(&[("raw/a.txt", "a")]);

		assert!(store.exists("raw").expect("reachable"));
		assert!(!store.exists("cooked").expect("reachable"));
		assert!(!store.exists("..").expect("reachable"));
		assert!(matches!(
			store.list_objects("cooked"),
			Err(SourceError::BucketNotFound(bucket)) if bucket == "cooked"
		));
	}

	#[test]
	fn unreachable_root_is_a_connection_error() {
		let dir = tempdir().expect("temp dir");
		let store = LocalObjectStore::new(dir.path().join("gone"));

		assert!(matches!(
			store.exists("raw"),
			Err(SourceError::Connection { .. })
		));
	}

	#[test]
	fn download_copies_and_hashes() {
		let (dir, store) = store_with(&[("raw/a/data.bin", "hello world")]);
		let dest = dir.path().join("out").join("a").join("data.bin");

		let status = store
			.download("raw", "a/data.bin", &dest, false)
			.expect("downloaded");

		assert_eq!(status.kind, DownloadKind::Downloaded);
		assert_eq!(status.bytes, 11);
		assert_eq!(status.checksum, blake3::hash(b"hello world").to_hex().to_string());
		assert_eq!(fs::read(&dest).expect("written"), b"hello world");
	}

	#[test]
	fn download_rejects_bad_keys() {
		let (dir, store) = store_with(&[("raw/a.txt", "a"), ("secret.txt", "s")]);
		let dest = dir.path().join("out.txt");

		assert!(matches!(
			store.download("raw", "../secret.txt", &dest, false),
			Err(SourceError::InvalidKey { .. })
		));
		assert!(matches!(
			store.download("raw", "", &dest, false),
			Err(SourceError::InvalidKey { .. })
		));
		assert!(matches!(
			store.download("raw", "missing.txt", &dest, true),
			Err(SourceError::ObjectNotFound { key, .. }) if key == "missing.txt"
		));
	}

	#[test]
	fn existing_destination_is_kept_unless_forced() {
		let (dir, store) = store_with(&[("raw/a.txt", "remote")]);
		let dest = dir.path().join("out").join("a.txt");
		fs::create_dir_all(dest.parent().expect("has parent")).expect("dirs");
		fs::write(&dest, "local").expect("write");

		let skipped = store.download("raw", "a.txt", &dest, false).expect("skipped");
		assert_eq!(skipped.kind, DownloadKind::Skipped);
		assert_eq!(skipped.bytes, 5);
		assert_eq!(skipped.checksum, blake3::hash(b"local").to_hex().to_string());
		assert_eq!(fs::read_to_string(&dest).expect("kept"), "local");

		let forced = store.download("raw", "a.txt", &dest, true).expect("forced");
		assert_eq!(forced.kind, DownloadKind::Downloaded);
		assert_eq!(forced.bytes, 6);
		assert_eq!(fs::read_to_string(&dest).expect("replaced"), "remote");
	}

	#[test]
	fn missing_object_is_reported_before_an_existing_destination() {
		let (dir, store) = store_with(&[("raw/a.txt", "a")]);
		let dest = dir.path().join("gone.txt");
		fs::write(&dest, "stale").expect("write");

		assert!(matches!(
			store.download("raw", "gone.txt", &dest, false),
			Err(SourceError::ObjectNotFound { key, .. }) if key == "gone.txt"
		));
	}
}
