use std::path::Path;

use nlr_job_system::JobParams;
use serde_json::Value;
use tracing::info;

use super::{error::SourceError, store::ObjectStore};

pub const PARAM_BUCKET: &str = "bucket";
pub const PARAM_KEY: &str = "key";
pub const PARAM_DESTINATION: &str = "destination";
pub const PARAM_SIZE: &str = "size";
/// Overwrite a destination that already exists. Absent means `false`.
pub const PARAM_FORCE: &str = "force";

/// One parameter bundle per object of `bucket` whose key starts with `prefix`, in key order.
///
/// Each object is planned to land at `destination/<key>`, replacing a file already there only when
/// `force` is set.
pub fn plan_downloads(
	store: &impl ObjectStore,
	bucket: &str,
	destination: &Path,
	prefix: Option<&str>,
	force: bool,
) -> Result<Vec<JobParams>, SourceError> {
	let prefix = prefix.unwrap_or_default();

	let planned = store
		.list_objects(bucket)?
		.into_iter()
		.filter(|object| object.key.starts_with(prefix))
		.map(|object| {
			JobParams::from_iter([
				(PARAM_BUCKET.to_string(), Value::from(bucket)),
				(
					PARAM_DESTINATION.to_string(),
					Value::from(destination.join(&object.key).to_string_lossy().into_owned()),
				),
				(PARAM_FORCE.to_string(), Value::from(force)),
				(PARAM_KEY.to_string(), Value::from(object.key)),
				(PARAM_SIZE.to_string(), Value::from(object.size)),
			])
		})
		.collect::<Vec<_>>();

	info!(bucket, prefix, force, planned = planned.len(), "Planned downloads;");

	Ok(planned)
}
