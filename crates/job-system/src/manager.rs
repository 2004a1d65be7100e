use std::collections::HashMap;

use tracing::{info, warn};

use super::{
	error::{AggregationError, FailureCause, InvalidParams, JobCreationError},
	job::{Job, JobId, JobParams},
	project::{JobOutcome, Project, RawResults},
	worker::Worker,
};

/// Output type of the worker driven by manager `M`.
pub type WorkerOutput<M> = <<M as Manager>::Worker as Worker>::Output;

/// Turns project parameters into jobs, and completed jobs into a project level result.
///
/// The life cycle is fixed: [`Manager::create_jobs`], then an external dispatch run, then
/// [`Manager::process_results`]. Implementors only vary [`Manager::build_job`] and
/// [`Manager::combine`].
pub trait Manager {
	type Worker: Worker;
	type Aggregate;

	/// Validates one parameter bundle and builds its job.
	fn build_job(&self, params: &JobParams) -> Result<Job<WorkerOutput<Self>>, InvalidParams>;

	/// Folds per-job outcomes into the project aggregate.
	///
	/// Receives every job of the project, failed and missing ones included.
	fn combine(
		&self,
		results: &HashMap<JobId, JobOutcome<WorkerOutput<Self>>>,
	) -> Result<Self::Aggregate, AggregationError>;

	/// Builds one job per parameter bundle, in parameter order, replacing any previous jobs.
	///
	/// Nothing is replaced if any bundle fails validation.
	fn create_jobs(&self, project: &mut Project<Self::Worker>) -> Result<usize, JobCreationError> {
		info!("Project {} creating jobs;", project.name());

		let jobs = project
			.params()
			.iter()
			.enumerate()
			.map(|(index, params)| {
				self.build_job(params).map_err(|InvalidParams(reason)| {
					JobCreationError { index, reason }
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		let created = jobs.len();
		project.set_jobs(jobs);

		info!(created, "Project {} created jobs;", project.name());

		Ok(created)
	}

	/// Records each job's outcome on the project, keyed by job id, and combines them.
	///
	/// Jobs absent from `raw` are recorded as failed with [`FailureCause::Missing`]. Entries that
	/// belong to no job of this project are ignored. Calling this again with the same `raw`
	/// yields the same aggregate.
	fn process_results(
		&self,
		project: &mut Project<Self::Worker>,
		raw: &RawResults<WorkerOutput<Self>>,
	) -> Result<Self::Aggregate, AggregationError>
	where
		WorkerOutput<Self>: Clone,
	{
		info!("Project {} compiling results;", project.name());

		let results = project
			.jobs()
			.iter()
			.map(|job| {
				let outcome = raw
					.get(&job.id())
					.and_then(Job::result)
					.map_or_else(
						|| {
							let kind = project.worker().kind();
							JobOutcome::Failed(job.execution_error(kind, FailureCause::Missing))
						},
						|result| result.outcome.clone().into(),
					);

				(job.id(), outcome)
			})
			.collect::<HashMap<_, _>>();

		let unknown = raw.keys().filter(|id| !results.contains_key(id)).count();
		if unknown > 0 {
			warn!(unknown, "Ignoring results of jobs that belong to another project;");
		}

		project.set_results(results);

		let aggregate = self.combine(project.results())?;

		info!(status = %project.run_status(), "Project {} complete;", project.name());

		Ok(aggregate)
	}
}
