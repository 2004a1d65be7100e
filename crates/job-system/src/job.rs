use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::error::{FailureCause, JobExecutionError};

/// A unique identifier for a job using the [`uuid`](https://docs.rs/uuid) crate.
pub type JobId = Uuid;

/// Opaque parameters handed to a job by its manager.
pub type JobParams = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
	Pending,
	Succeeded,
	Failed,
}

/// What a worker produced for a job, plus which execution unit produced it.
#[derive(Debug, Clone)]
pub struct JobResult<T> {
	pub outcome: Result<T, JobExecutionError>,
	pub worker_identity: String,
	pub process_identity: String,
}

/// One unit of work: a parameter bundle and a result slot.
///
/// `id`, `name` and `params` never change after creation. The timing fields and the result are
/// written once, by the worker executing the job.
#[derive(Debug, Clone)]
pub struct Job<T> {
	id: JobId,
	name: String,
	params: JobParams,
	result: Option<JobResult<T>>,
	start_time: Option<DateTime<Utc>>,
	end_time: Option<DateTime<Utc>>,
	duration: Option<Duration>,
}

impl<T> Job<T> {
	pub fn new(name: impl Into<String>, params: JobParams) -> Self {
		Self {
			id: JobId::new_v4(),
			name: name.into(),
			params,
			result: None,
			start_time: None,
			end_time: None,
			duration: None,
		}
	}

	#[must_use]
	pub const fn id(&self) -> JobId {
		self.id
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub const fn params(&self) -> &JobParams {
		&self.params
	}

	#[must_use]
	pub fn param_str(&self, key: &str) -> Option<&str> {
		self.params.get(key).and_then(Value::as_str)
	}

	#[must_use]
	pub fn param_i64(&self, key: &str) -> Option<i64> {
		self.params.get(key).and_then(Value::as_i64)
	}

	/// The result is only visible once the job has both of its run boundaries recorded.
	#[must_use]
	pub fn result(&self) -> Option<&JobResult<T>> {
		self.result
			.as_ref()
			.filter(|_| self.start_time.is_some() && self.end_time.is_some())
	}

	#[must_use]
	pub fn into_result(self) -> Option<JobResult<T>> {
		if self.start_time.is_some() && self.end_time.is_some() {
			self.result
		} else {
			None
		}
	}

	#[must_use]
	pub const fn start_time(&self) -> Option<DateTime<Utc>> {
		self.start_time
	}

	#[must_use]
	pub const fn end_time(&self) -> Option<DateTime<Utc>> {
		self.end_time
	}

	#[must_use]
	pub const fn duration(&self) -> Option<Duration> {
		self.duration
	}

	#[must_use]
	pub const fn is_executed(&self) -> bool {
		self.result.is_some() || self.end_time.is_some()
	}

	#[must_use]
	pub fn status(&self) -> JobStatus {
		match self.result() {
			None => JobStatus::Pending,
			Some(JobResult { outcome: Ok(_), .. }) => JobStatus::Succeeded,
			Some(JobResult { outcome: Err(_), .. }) => JobStatus::Failed,
		}
	}

	pub(crate) fn mark_started(&mut self) {
		self.start_time = Some(Utc::now());
	}

	pub(crate) fn finish(
		&mut self,
		outcome: Result<T, JobExecutionError>,
		worker_identity: impl Into<String>,
	) {
		let end_time = Utc::now();
		let start_time = *self.start_time.get_or_insert(end_time);

		self.end_time = Some(end_time);
		self.duration = Some((end_time - start_time).to_std().unwrap_or_default());
		self.result = Some(JobResult {
			outcome,
			worker_identity: worker_identity.into(),
			process_identity: process_identity(),
		});
	}

	pub(crate) fn execution_error(
		&self,
		worker_kind: impl Into<String>,
		cause: FailureCause,
	) -> JobExecutionError {
		JobExecutionError {
			job_id: self.id,
			job_name: self.name.clone(),
			worker_kind: worker_kind.into(),
			cause,
		}
	}
}

/// `<pid>:<thread name>` of the current execution unit.
pub(crate) fn process_identity() -> String {
	let thread = std::thread::current();
	format!(
		"{}:{}",
		std::process::id(),
		thread.name().unwrap_or("unnamed")
	)
}
