use tracing::{debug, info, info_span};

use super::{
	error::{short_type_name, FailureCause, RunError},
	job::Job,
	log::{LogConfigurer, LogSender},
};

/// The logic that executes a single [`Job`].
///
/// Implementors only supply [`Worker::execute`], which runs synchronously on one pool thread and
/// is free of any concurrency concerns. [`Worker::run`] wraps it with the timing, logging and
/// result bookkeeping shared by every worker.
pub trait Worker: Send + Sync + 'static {
	type Output: Send + 'static;
	type Error: std::error::Error + Send + Sync + 'static;

	/// Name used to identify this worker in results and log records.
	fn kind(&self) -> &str {
		short_type_name::<Self>()
	}

	fn execute(&self, job: &Job<Self::Output>) -> Result<Self::Output, Self::Error>;

	/// Executes `job` and writes timing and outcome back into it.
	///
	/// On failure the error is recorded on the job before being returned, so the job is always
	/// fully populated when this returns, except when it was already executed: a job is never
	/// run twice and such a call leaves it untouched.
	fn run(
		&self,
		job: &mut Job<Self::Output>,
		channel: &LogSender,
		configure_logging: &dyn LogConfigurer,
	) -> Result<(), RunError> {
		if job.is_executed() {
			return Err(RunError::AlreadyExecuted(job.id()));
		}

		job.mark_started();

		configure_logging.configure(channel);

		let span = info_span!(
			"job",
			job_id = %job.id(),
			job_name = job.name(),
			worker = self.kind()
		);
		let _entered = span.enter();

		info!("Worker {} started;", job.name());

		let (outcome, returned) = match self.execute(job) {
			Ok(output) => (Ok(output), Ok(())),
			Err(e) => {
				let error = job.execution_error(self.kind(), FailureCause::from_error(&e));
				(Err(error.clone()), Err(RunError::Execution(error)))
			}
		};

		job.finish(outcome, self.kind());

		if let Some(duration) = job.duration() {
			debug!(?duration, succeeded = returned.is_ok(), "Worker {} completed;", job.name());
		}

		returned
	}
}
