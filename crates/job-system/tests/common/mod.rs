#![allow(dead_code)]

use std::{
	collections::{BTreeSet, HashMap},
	io,
	sync::atomic::{AtomicUsize, Ordering},
	thread,
	time::Duration,
};

use nlr_job_system::{
	AggregationError, InvalidParams, Job, JobId, JobOutcome, JobParams, LogRecord, LogSink,
	Manager, Worker,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("id {0} is not allowed")]
pub struct ValueError(pub i64);

/// Multiplies the `id` parameter by ten, refusing negative ids.
pub struct TimesTen;

impl Worker for TimesTen {
	type Output = i64;
	type Error = ValueError;

	fn execute(&self, job: &Job<i64>) -> Result<i64, ValueError> {
		let id = job.param_i64("id").unwrap_or_default();

		info!(id, "multiplying");

		if id < 0 {
			warn!(id, "refusing negative id");
			return Err(ValueError(id));
		}

		Ok(id * 10)
	}
}

/// Panics on the id given by its `explode` parameter.
pub struct Exploding;

impl Worker for Exploding {
	type Output = i64;
	type Error = ValueError;

	fn execute(&self, job: &Job<i64>) -> Result<i64, ValueError> {
		let id = job.param_i64("id").unwrap_or_default();
		assert!(id != job.param_i64("explode").unwrap_or(i64::MIN), "boom on {id}");
		Ok(id)
	}
}

/// Sleeps a little while tracking how many jobs run at the same time.
#[derive(Default)]
pub struct Sleepy {
	running: AtomicUsize,
	pub peak: AtomicUsize,
}

impl Worker for Sleepy {
	type Output = i64;
	type Error = ValueError;

	fn execute(&self, job: &Job<i64>) -> Result<i64, ValueError> {
		let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);

		thread::sleep(Duration::from_millis(20));

		self.running.fetch_sub(1, Ordering::SeqCst);
		Ok(job.param_i64("id").unwrap_or_default())
	}
}

/// Collects every successful output of an `i64` worker. Every job it builds is named after the
/// kind of work that worker does.
pub struct Collect<W> {
	job_name: &'static str,
	worker: std::marker::PhantomData<W>,
}

impl<W> Collect<W> {
	pub fn new(job_name: &'static str) -> Self {
		Self {
			job_name,
			worker: std::marker::PhantomData,
		}
	}
}

impl<W: Worker<Output = i64>> Manager for Collect<W> {
	type Worker = W;
	type Aggregate = BTreeSet<i64>;

	fn build_job(&self, params: &JobParams) -> Result<Job<i64>, InvalidParams> {
		if !params.contains_key("id") {
			return Err(InvalidParams("missing `id`".to_string()));
		}
		Ok(Job::new(self.job_name, params.clone()))
	}

	fn combine(
		&self,
		results: &HashMap<JobId, JobOutcome<i64>>,
	) -> Result<BTreeSet<i64>, AggregationError> {
		if results.is_empty() {
			return Err(AggregationError::NoJobs);
		}
		Ok(results.values().filter_map(JobOutcome::value).copied().collect())
	}
}

/// A log destination on a full disk.
pub struct FullDisk;

impl LogSink for FullDisk {
	fn write_record(&mut self, _record: &LogRecord) -> io::Result<()> {
		Err(io::Error::other("no space left on device"))
	}
}

pub fn params_for(ids: impl IntoIterator<Item = i64>) -> Vec<JobParams> {
	ids.into_iter()
		.map(|id| JobParams::from_iter([("id".to_string(), id.into())]))
		.collect()
}
