use std::{
	collections::HashMap,
	num::NonZeroUsize,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	thread,
};

use tracing::{debug, info, instrument, warn, Level};

use super::{
	error::DispatchError,
	log::{log_channel, ChannelConfigurer, LogConfigurer, LogConsumer, LogSink, DEFAULT_LOG_CAPACITY},
	pool::Pool,
	project::{Project, RawResults},
	worker::Worker,
};

/// Half of the available parallelism, never less than one.
#[must_use]
pub fn default_pool_size() -> NonZeroUsize {
	thread::available_parallelism()
		.map(|cores| cores.get() / 2)
		.ok()
		.and_then(NonZeroUsize::new)
		.unwrap_or(NonZeroUsize::MIN)
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	/// `None` picks [`default_pool_size`].
	pub pool_size: Option<NonZeroUsize>,
	pub log_capacity: usize,
	/// Most verbose level forwarded from worker threads to the log sink.
	pub max_log_level: Level,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			pool_size: None,
			log_capacity: DEFAULT_LOG_CAPACITY,
			max_log_level: Level::DEBUG,
		}
	}
}

/// Stops a dispatch run from submitting further jobs. Jobs already queued still run.
///
/// Closing is permanent: every later dispatch through the same [`Dispatcher`] submits nothing and
/// leaves all of its jobs missing. Build a new dispatcher to run again.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
	pub fn close(&self) {
		self.0.store(true, Ordering::Release);
	}

	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

/// What a dispatch run handed back.
#[derive(Debug)]
pub struct DispatchRun<T> {
	pub submitted: usize,
	pub jobs: RawResults<T>,
	/// Records written to the sink by the log consumer, zero when the sink failed.
	pub log_records: usize,
	/// Set when the log sink failed. The jobs above are complete regardless, only log output
	/// after the failure was lost.
	pub log_error: Option<DispatchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
	Idle,
	LogChannelOpen,
	PoolRunning,
	Draining,
	Closed,
}

fn advance(state: &mut DispatchState, next: DispatchState) {
	debug!(from = ?state, to = ?next, "Dispatch state changed;");
	*state = next;
}

/// Runs every job of a project on a worker pool while aggregating worker logs into one sink.
pub struct Dispatcher {
	config: DispatcherConfig,
	configurer: Arc<dyn LogConfigurer>,
	close: CloseHandle,
}

impl Dispatcher {
	#[must_use]
	pub fn new(config: DispatcherConfig) -> Self {
		let configurer = Arc::new(ChannelConfigurer::new(config.max_log_level));

		Self {
			config,
			configurer,
			close: CloseHandle::default(),
		}
	}

	/// Replaces how pool threads attach their log output to the log channel.
	#[must_use]
	pub fn with_log_configurer(mut self, configurer: impl LogConfigurer) -> Self {
		self.configurer = Arc::new(configurer);
		self
	}

	#[must_use]
	pub fn pool_size(&self) -> NonZeroUsize {
		self.config.pool_size.unwrap_or_else(default_pool_size)
	}

	#[must_use]
	pub fn close_handle(&self) -> CloseHandle {
		self.close.clone()
	}

	/// Submits every job of `project` and waits until all of them came back and every log
	/// record reached `sink`.
	///
	/// The project itself is left untouched: jobs are submitted as copies and returned keyed by
	/// id, ready for [`Manager::process_results`](crate::Manager::process_results).
	///
	/// Only a pool that cannot start fails the run. A failing sink is reported in
	/// [`DispatchRun::log_error`].
	#[instrument(
		skip_all,
		fields(project_id = %project.id(), project_name = project.name(), jobs = project.jobs().len()),
	)]
	pub async fn dispatch<W>(
		&self,
		project: &Project<W>,
		sink: impl LogSink,
	) -> Result<DispatchRun<W::Output>, DispatchError>
	where
		W: Worker,
		W::Output: Clone,
	{
		let mut state = DispatchState::Idle;

		if self.close.is_closed() {
			warn!("Dispatcher is closed, no job will be submitted;");
		}

		let (log_tx, log_rx) = log_channel(self.config.log_capacity);
		let consumer = LogConsumer::spawn(log_rx, sink);
		advance(&mut state, DispatchState::LogChannelOpen);

		let pool = match Pool::start(
			self.pool_size(),
			Arc::clone(project.worker()),
			log_tx.clone(),
			Arc::clone(&self.configurer),
		) {
			Ok(pool) => pool,
			Err(e) => {
				log_tx.finish().await;
				if let Err(consumer_error) = consumer.join().await {
					warn!(?consumer_error, "Log consumer failed while aborting dispatch;");
				}
				return Err(e);
			}
		};
		advance(&mut state, DispatchState::PoolRunning);

		info!(pool_size = pool.size(), "Dispatching project {};", project.name());

		let mut submitted = 0;
		for job in project.jobs() {
			if self.close.is_closed() {
				warn!(
					remaining = project.jobs().len() - submitted,
					"Dispatcher closed, remaining jobs were not submitted;"
				);
				pool.close();
				break;
			}

			if let Err(e) = pool.submit(job.clone()).await {
				warn!(%e, "Stopped submitting jobs;");
				break;
			}

			submitted += 1;
		}

		advance(&mut state, DispatchState::Draining);

		let returned = pool.join().await;

		log_tx.finish().await;
		let (log_records, log_error) = match consumer.join().await {
			Ok(written) => (written, None),
			Err(e) => {
				warn!(%e, "Worker log output was lost, job results are kept;");
				(0, Some(e))
			}
		};

		advance(&mut state, DispatchState::Closed);

		let jobs = returned
			.into_iter()
			.map(|job| (job.id(), job))
			.collect::<HashMap<_, _>>();

		info!(
			submitted,
			returned = jobs.len(),
			log_records,
			"Project {} dispatched;",
			project.name()
		);

		Ok(DispatchRun {
			submitted,
			jobs,
			log_records,
			log_error,
		})
	}
}
