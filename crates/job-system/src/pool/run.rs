use std::{
	any::Any,
	panic::{catch_unwind, AssertUnwindSafe},
};

use async_channel as chan;
use tracing::{error, trace, warn};

use super::{
	super::{
		error::{FailureCause, RunError},
		job::Job,
		log::{LogConfigurer, LogSender},
		worker::Worker,
	},
	PoolWorkerId,
};

/// Body of one pool thread: runs queued jobs until the queue is closed and drained.
pub(super) fn run<W: Worker>(
	id: PoolWorkerId,
	worker: &W,
	jobs_rx: &chan::Receiver<Job<W::Output>>,
	returns_tx: &chan::Sender<Job<W::Output>>,
	log: &LogSender,
	configurer: &dyn LogConfigurer,
) {
	configurer.configure(log);

	trace!(worker_id = id, "Pool worker waiting for jobs;");

	while let Ok(mut job) = jobs_rx.recv_blocking() {
		let outcome = catch_unwind(AssertUnwindSafe(|| worker.run(&mut job, log, configurer)));

		match outcome {
			Ok(Ok(())) => {}

			Ok(Err(RunError::Execution(e))) => {
				error!(
					job_id = %e.job_id,
					job_name = %e.job_name,
					worker_kind = %e.worker_kind,
					cause = %e.cause,
					"Job failed;"
				);
			}

			Ok(Err(RunError::AlreadyExecuted(job_id))) => {
				warn!(%job_id, "Skipped a job that was already executed;");
			}

			Err(payload) => {
				let cause = FailureCause::Panic {
					message: panic_message(payload.as_ref()),
				};
				let e = job.execution_error(worker.kind(), cause);

				error!(
					job_id = %e.job_id,
					job_name = %e.job_name,
					worker_kind = %e.worker_kind,
					cause = %e.cause,
					"Job panicked;"
				);

				job.finish(Err(e), worker.kind());
			}
		}

		if returns_tx.send_blocking(job).is_err() {
			warn!(worker_id = id, "Pool return channel closed, stopping worker;");
			break;
		}
	}

	trace!(worker_id = id, "Pool worker exiting;");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	payload
		.downcast_ref::<&str>()
		.map(|message| (*message).to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string())
}
