use std::{collections::HashMap, marker::PhantomData};

use nlr_job_system::{AggregationError, InvalidParams, Job, JobId, JobOutcome, JobParams, Manager};
use serde::Serialize;

use super::{
	local::validate_key,
	plan::{PARAM_BUCKET, PARAM_DESTINATION, PARAM_FORCE, PARAM_KEY},
	store::{DownloadKind, ObjectStore},
	worker::{DownloadReceipt, DownloadWorker},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
	pub downloaded: usize,
	/// Objects whose destination already existed.
	pub skipped: usize,
	pub failed: usize,
	/// Bytes fetched by this run, skipped objects excluded.
	pub total_bytes: u64,
	/// Sorted by key.
	pub receipts: Vec<DownloadReceipt>,
}

/// Builds one download job per planned object and sums up what was fetched.
pub struct DatasetManager<S>(PhantomData<fn() -> S>);

impl<S> DatasetManager<S> {
	#[must_use]
	pub const fn new() -> Self {
		Self(PhantomData)
	}
}

impl<S> Default for DatasetManager<S> {
	fn default() -> Self {
		Self::new()
	}
}

impl<S: ObjectStore> Manager for DatasetManager<S> {
	type Worker = DownloadWorker<S>;
	type Aggregate = DownloadSummary;

	fn build_job(&self, params: &JobParams) -> Result<Job<DownloadReceipt>, InvalidParams> {
		let required = |name: &str| {
			params
				.get(name)
				.and_then(serde_json::Value::as_str)
				.filter(|value| !value.is_empty())
				.ok_or_else(|| InvalidParams(format!("`{name}` must be a non empty string")))
		};

		required(PARAM_BUCKET)?;
		required(PARAM_DESTINATION)?;
		let key = required(PARAM_KEY)?;

		validate_key(key).map_err(|e| InvalidParams(e.to_string()))?;

		if params.get(PARAM_FORCE).is_some_and(|force| !force.is_boolean()) {
			return Err(InvalidParams(format!("`{PARAM_FORCE}` must be a boolean")));
		}

		Ok(Job::new("download", params.clone()))
	}

	fn combine(
		&self,
		results: &HashMap<JobId, JobOutcome<DownloadReceipt>>,
	) -> Result<DownloadSummary, AggregationError> {
		if results.is_empty() {
			return Err(AggregationError::NoJobs);
		}

		let mut receipts = results
			.values()
			.filter_map(JobOutcome::value)
			.cloned()
			.collect::<Vec<_>>();
		receipts.sort_by(|a, b| a.key.cmp(&b.key));

		let skipped = receipts
			.iter()
			.filter(|receipt| receipt.kind == DownloadKind::Skipped)
			.count();

		Ok(DownloadSummary {
			downloaded: receipts.len() - skipped,
			skipped,
			failed: results.len() - receipts.len(),
			total_bytes: receipts
				.iter()
				.filter(|receipt| receipt.kind == DownloadKind::Downloaded)
				.map(|receipt| receipt.bytes)
				.sum(),
			receipts,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use nlr_job_system::{FailureCause, JobExecutionError};
	use serde_json::json;

	use super::{super::local::LocalObjectStore, *};

	type Dataset = DatasetManager<LocalObjectStore>;

	fn params(value: serde_json::Value) -> JobParams {
		match value {
			serde_json::Value::Object(map) => map,
			_ => unreachable!("test params are always objects"),
		}
	}

	#[test]
	fn build_job_validates_params() {
		let good = params(json!({"bucket": "raw", "key": "a/b.txt", "destination": "/tmp/a/b.txt"}));
		let job = Dataset::new().build_job(&good).expect("valid params");
		assert_eq!(job.name(), "download");

		let other = params(json!({"bucket": "raw", "key": "c.txt", "destination": "/tmp/c.txt", "force": true}));
		assert_eq!(Dataset::new().build_job(&other).expect("valid params").name(), job.name());

		let no_bucket = params(json!({"key": "a.txt", "destination": "/tmp/a.txt"}));
		assert!(Dataset::new().build_job(&no_bucket).is_err());

		let escaping = params(json!({"bucket": "raw", "key": "../a.txt", "destination": "/tmp/a.txt"}));
		assert!(Dataset::new().build_job(&escaping).is_err());

		let stringly_forced =
			params(json!({"bucket": "raw", "key": "a.txt", "destination": "/tmp/a.txt", "force": "yes"}));
		assert!(Dataset::new().build_job(&stringly_forced).is_err());
	}

	#[test]
	fn combine_counts_bytes_and_failures() {
		let receipt = |key: &str, bytes, kind| DownloadReceipt {
			kind,
			bucket: "raw".to_string(),
			key: key.to_string(),
			path: PathBuf::from(key),
			bytes,
			checksum: String::new(),
		};
		let failure = JobExecutionError {
			job_id: JobId::new_v4(),
			job_name: "download".to_string(),
			worker_kind: "DownloadWorker".to_string(),
			cause: FailureCause::Missing,
		};

		let results = HashMap::from([
			(JobId::new_v4(), JobOutcome::Succeeded(receipt("b", 5, DownloadKind::Downloaded))),
			(JobId::new_v4(), JobOutcome::Succeeded(receipt("a", 7, DownloadKind::Downloaded))),
			(JobId::new_v4(), JobOutcome::Succeeded(receipt("c", 3, DownloadKind::Skipped))),
			(JobId::new_v4(), JobOutcome::Failed(failure)),
		]);

		let summary = Dataset::new().combine(&results).expect("summary");

		assert_eq!(summary.downloaded, 2);
		assert_eq!(summary.skipped, 1);
		assert_eq!(summary.failed, 1);
		assert_eq!(summary.total_bytes, 12);
		assert_eq!(summary.receipts[0].key, "a");
		assert_eq!(summary.receipts.len(), 3);
	}

	#[test]
	fn combine_rejects_empty_results() {
		assert_eq!(
			Dataset::new().combine(&HashMap::new()),
			Err(AggregationError::NoJobs)
		);
	}
}
