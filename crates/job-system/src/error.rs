use std::{fmt, io};

use thiserror::Error;

use super::{job::JobId, pool::PoolWorkerId};

/// Why a job ended without an outcome value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
	/// The worker's `execute` returned an error.
	Error { kind: String, message: String },
	/// The worker's `execute` panicked; the pool caught it at the thread boundary.
	Panic { message: String },
	/// The job never came back from the pool.
	Missing,
}

impl FailureCause {
	/// Captures an error by its short type name and its rendered message.
	pub fn from_error<E: std::error::Error + ?Sized>(e: &E) -> Self {
		Self::Error {
			kind: short_type_name::<E>().to_string(),
			message: e.to_string(),
		}
	}

	/// The error kind, if this failure came from an error value.
	#[must_use]
	pub fn kind(&self) -> Option<&str> {
		match self {
			Self::Error { kind, .. } => Some(kind),
			Self::Panic { .. } | Self::Missing => None,
		}
	}
}

impl fmt::Display for FailureCause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error { kind, message } => write!(f, "{kind}: {message}"),
			Self::Panic { message } => write!(f, "panicked: {message}"),
			Self::Missing => write!(f, "no result returned"),
		}
	}
}

/// A job level failure. It is stored on the job as its outcome and never crashes the pool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("job <id='{job_id}', name='{job_name}'> failed on worker '{worker_kind}': {cause}")]
pub struct JobExecutionError {
	pub job_id: JobId,
	pub job_name: String,
	pub worker_kind: String,
	pub cause: FailureCause,
}

#[derive(Debug, Error)]
pub enum RunError {
	#[error("job <id='{0}'> was already executed")]
	AlreadyExecuted(JobId),
	#[error(transparent)]
	Execution(#[from] JobExecutionError),
}

/// Returned by a manager when a single parameter bundle cannot become a job.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidParams(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid job parameters at index {index}: {reason}")]
pub struct JobCreationError {
	pub index: usize,
	pub reason: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
	#[error("no job results to aggregate")]
	NoJobs,
	#[error("job results are unusable: {0}")]
	Unusable(String),
}

#[derive(Debug, Error)]
#[error("worker pool is closed, job <id='{0}'> was not submitted")]
pub struct PoolClosedError(pub JobId);

#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("failed to start pool worker <id='{worker_id}'>: {source}")]
	PoolStartup {
		worker_id: PoolWorkerId,
		#[source]
		source: io::Error,
	},
	#[error("log consumer failed: {0}")]
	LogConsumer(#[source] io::Error),
	#[error("log consumer task join error: {0}")]
	LogConsumerJoin(String),
}

/// Last path segment of a type name, ignoring generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
	let full = std::any::type_name::<T>();
	let base = full.split('<').next().unwrap_or(full);
	base.rsplit("::").next().unwrap_or(base)
}
