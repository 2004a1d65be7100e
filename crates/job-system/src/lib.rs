//!
//! # Job System
//!
//! A batch job dispatch core: describe a project as a list of parameter bundles, let a manager
//! turn them into jobs, run them on a bounded pool of worker threads and fold the outcomes back
//! into a single result.
//!
//! - A fixed size pool of OS threads, each executing at most one job at a time;
//! - Job failures, panics included, are recorded on the job and never take the pool down;
//! - Every worker thread forwards its `tracing` events through one bounded channel to a single
//!   log consumer, so log output from concurrent jobs never interleaves mid-line;
//! - Each job records its own timing and which worker and thread produced its result;
//!
//!
//! ## Basic example
//!
//! ```
//! use std::{collections::HashMap, sync::Arc};
//!
//! use nlr_job_system::{
//!     AggregationError, Dispatcher, DispatcherConfig, InvalidParams, Job, JobId, JobOutcome,
//!     JobParams, Manager, MemorySink, Project, RunStatus, Worker,
//! };
//! use thiserror::Error;
//!
//! #[derive(Debug, Error)]
//! #[error("missing id")]
//! pub struct MissingId;
//!
//! pub struct TimesTen;
//!
//! impl Worker for TimesTen {
//!     type Output = i64;
//!     type Error = MissingId;
//!
//!     fn execute(&self, job: &Job<i64>) -> Result<i64, MissingId> {
//!         job.param_i64("id").map(|id| id * 10).ok_or(MissingId)
//!     }
//! }
//!
//! pub struct Sum;
//!
//! impl Manager for Sum {
//!     type Worker = TimesTen;
//!     type Aggregate = i64;
//!
//!     fn build_job(&self, params: &JobParams) -> Result<Job<i64>, InvalidParams> {
//!         Ok(Job::new("times_ten", params.clone()))
//!     }
//!
//!     fn combine(&self, results: &HashMap<JobId, JobOutcome<i64>>) -> Result<i64, AggregationError> {
//!         Ok(results.values().filter_map(JobOutcome::value).sum())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let params = (1..=3)
//!         .map(|id| JobParams::from_iter([("id".to_string(), id.into())]))
//!         .collect();
//!     let mut project = Project::new("sample", params, Arc::new(TimesTen));
//!
//!     Sum.create_jobs(&mut project).unwrap();
//!
//!     let run = Dispatcher::new(DispatcherConfig::default())
//!         .dispatch(&project, MemorySink::new())
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(Sum.process_results(&mut project, &run.jobs), Ok(60));
//!     assert_eq!(project.run_status(), RunStatus::Completed);
//! }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod dispatcher;
mod error;
mod job;
mod manager;
mod pool;
mod project;
mod worker;

pub mod log;

pub use dispatcher::{default_pool_size, CloseHandle, DispatchRun, Dispatcher, DispatcherConfig};
pub use error::{
	AggregationError, DispatchError, FailureCause, InvalidParams, JobCreationError,
	JobExecutionError, PoolClosedError, RunError,
};
pub use job::{Job, JobId, JobParams, JobResult, JobStatus};
pub use log::{
	log_channel, ChannelConfigurer, FileSink, LogConfigurer, LogRecord, LogSender, LogSink,
	MemorySink,
};
pub use manager::{Manager, WorkerOutput};
pub use pool::{Pool, PoolCloser, PoolWorkerId};
pub use project::{JobOutcome, Project, ProjectId, RawResults, RunStatus};
pub use worker::Worker;
