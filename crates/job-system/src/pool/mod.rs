use std::{num::NonZeroUsize, sync::Arc, thread};

use async_channel as chan;
use tokio::task::spawn_blocking;
use tracing::{error, instrument, trace, warn};

use super::{
	error::{DispatchError, PoolClosedError},
	job::Job,
	log::{LogConfigurer, LogSender},
	worker::Worker,
};

mod run;

use run::run;

pub type PoolWorkerId = usize;

/// Fixed size pool of OS threads, each executing at most one job at a time.
///
/// Jobs are pulled from a shared queue, so there is no ordering guarantee on start order. Every
/// submitted job is handed back through [`Pool::join`] once executed, successfully or not.
pub struct Pool<W: Worker> {
	jobs_tx: chan::Sender<Job<W::Output>>,
	returns_rx: chan::Receiver<Job<W::Output>>,
	threads: Vec<thread::JoinHandle<()>>,
}

impl<W: Worker> Pool<W> {
	#[instrument(skip(worker, log, configurer), fields(worker_kind = worker.kind()))]
	pub fn start(
		size: NonZeroUsize,
		worker: Arc<W>,
		log: LogSender,
		configurer: Arc<dyn LogConfigurer>,
	) -> Result<Self, DispatchError> {
		let (jobs_tx, jobs_rx) = chan::unbounded();
		let (returns_tx, returns_rx) = chan::unbounded();

		let mut threads = Vec::with_capacity(size.get());

		for worker_id in 0..size.get() {
			let spawned = thread::Builder::new()
				.name(format!("nlr-worker-{worker_id}"))
				.spawn({
					let worker = Arc::clone(&worker);
					let jobs_rx = jobs_rx.clone();
					let returns_tx = returns_tx.clone();
					let log = log.clone();
					let configurer = Arc::clone(&configurer);

					move || {
						run(
							worker_id,
							worker.as_ref(),
							&jobs_rx,
							&returns_tx,
							&log,
							configurer.as_ref(),
						);
					}
				});

			match spawned {
				Ok(handle) => threads.push(handle),
				Err(source) => {
					error!(worker_id, ?source, "Failed to start pool worker;");
					// Threads already running exit as soon as the queue is closed
					jobs_tx.close();
					return Err(DispatchError::PoolStartup { worker_id, source });
				}
			}
		}

		trace!(size = size.get(), "Pool started;");

		Ok(Self {
			jobs_tx,
			returns_rx,
			threads,
		})
	}

	#[must_use]
	pub fn size(&self) -> usize {
		self.threads.len()
	}

	pub async fn submit(&self, job: Job<W::Output>) -> Result<(), PoolClosedError> {
		let job_id = job.id();
		self.jobs_tx
			.send(job)
			.await
			.map_err(|_| PoolClosedError(job_id))
	}

	/// A handle that can close this pool to new submissions from anywhere.
	#[must_use]
	pub fn closer(&self) -> PoolCloser<W::Output> {
		PoolCloser(self.jobs_tx.clone())
	}

	/// Rejects new submissions. Jobs already queued still run.
	pub fn close(&self) {
		self.jobs_tx.close();
	}

	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.jobs_tx.is_closed()
	}

	/// Closes the pool, then waits for every queued job to finish and every thread to exit.
	pub async fn join(self) -> Vec<Job<W::Output>> {
		let Self {
			jobs_tx,
			returns_rx,
			threads,
		} = self;

		jobs_tx.close();

		let mut jobs = Vec::new();
		while let Ok(job) = returns_rx.recv().await {
			jobs.push(job);
		}

		match spawn_blocking(move || {
			threads
				.into_iter()
				.map(thread::JoinHandle::join)
				.filter(Result::is_err)
				.count()
		})
		.await
		{
			Ok(0) => {}
			Ok(crashed) => error!(crashed, "Pool workers exited with a panic;"),
			Err(e) => warn!(?e, "Failed to reap pool worker threads;"),
		}

		jobs
	}
}

#[derive(Debug, Clone)]
pub struct PoolCloser<T>(chan::Sender<Job<T>>);

impl<T> PoolCloser<T> {
	pub fn close(&self) {
		self.0.close();
	}
}
