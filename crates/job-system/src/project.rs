use std::{collections::HashMap, fmt, sync::Arc};

use uuid::Uuid;

use super::{
	error::JobExecutionError,
	job::{Job, JobId, JobParams},
	worker::Worker,
};

pub type ProjectId = Uuid;

/// Completed jobs handed back by a dispatch run, keyed by job id. Order carries no meaning.
pub type RawResults<T> = HashMap<JobId, Job<T>>;

/// Final per-job outcome stored on a project after its results are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
	Succeeded(T),
	Failed(JobExecutionError),
}

impl<T> JobOutcome<T> {
	#[must_use]
	pub const fn is_success(&self) -> bool {
		matches!(self, Self::Succeeded(_))
	}

	#[must_use]
	pub const fn value(&self) -> Option<&T> {
		match self {
			Self::Succeeded(value) => Some(value),
			Self::Failed(_) => None,
		}
	}

	#[must_use]
	pub const fn error(&self) -> Option<&JobExecutionError> {
		match self {
			Self::Succeeded(_) => None,
			Self::Failed(e) => Some(e),
		}
	}
}

impl<T> From<Result<T, JobExecutionError>> for JobOutcome<T> {
	fn from(result: Result<T, JobExecutionError>) -> Self {
		result.map_or_else(Self::Failed, Self::Succeeded)
	}
}

/// How a dispatch run ended from the project's point of view. Job failures are data, so both
/// variants mean the run itself completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
	Completed,
	CompletedWithFailures { failed: usize },
}

impl fmt::Display for RunStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Completed => write!(f, "completed"),
			Self::CompletedWithFailures { failed } => {
				write!(f, "completed with failures ({failed} failed)")
			}
		}
	}
}

/// An ordered batch of jobs sharing one worker.
///
/// `jobs` is only ever replaced by [`Manager::create_jobs`](crate::Manager::create_jobs) and
/// `results` by [`Manager::process_results`](crate::Manager::process_results).
pub struct Project<W: Worker> {
	id: ProjectId,
	name: String,
	params: Vec<JobParams>,
	worker: Arc<W>,
	jobs: Vec<Job<W::Output>>,
	results: HashMap<JobId, JobOutcome<W::Output>>,
}

impl<W: Worker> Project<W> {
	pub fn new(name: impl Into<String>, params: Vec<JobParams>, worker: Arc<W>) -> Self {
		Self {
			id: ProjectId::new_v4(),
			name: name.into(),
			params,
			worker,
			jobs: Vec::new(),
			results: HashMap::new(),
		}
	}

	#[must_use]
	pub const fn id(&self) -> ProjectId {
		self.id
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn params(&self) -> &[JobParams] {
		&self.params
	}

	#[must_use]
	pub const fn worker(&self) -> &Arc<W> {
		&self.worker
	}

	#[must_use]
	pub fn jobs(&self) -> &[Job<W::Output>] {
		&self.jobs
	}

	#[must_use]
	pub const fn results(&self) -> &HashMap<JobId, JobOutcome<W::Output>> {
		&self.results
	}

	/// Errors of every failed job, in job creation order.
	#[must_use]
	pub fn failed_jobs(&self) -> Vec<&JobExecutionError> {
		self.jobs
			.iter()
			.filter_map(|job| self.results.get(&job.id()).and_then(JobOutcome::error))
			.collect()
	}

	#[must_use]
	pub fn run_status(&self) -> RunStatus {
		match self.failed_jobs().len() {
			0 => RunStatus::Completed,
			failed => RunStatus::CompletedWithFailures { failed },
		}
	}

	pub(crate) fn set_jobs(&mut self, jobs: Vec<Job<W::Output>>) {
		self.jobs = jobs;
	}

	pub(crate) fn set_results(&mut self, results: HashMap<JobId, JobOutcome<W::Output>>) {
		self.results = results;
	}
}

impl<W: Worker> fmt::Debug for Project<W>
where
	W::Output: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Project")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("worker", &self.worker.kind())
			.field("params", &self.params.len())
			.field("jobs", &self.jobs.len())
			.field("results", &self.results)
			.finish()
	}
}
