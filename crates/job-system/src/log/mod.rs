//! Log aggregation for the worker pool.
//!
//! Workers never write log output themselves. Each pool thread forwards its `tracing` events as
//! [`LogRecord`]s through a bounded channel to a single [`LogConsumer`], which is the only writer
//! of the shared [`LogSink`]. The consumer stops when it receives the typed [`LogMessage::Done`]
//! marker, so no record that was sent before the marker is ever lost.

use std::fmt;

use async_channel as chan;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::Level;

use super::job::JobId;

mod consumer;
mod layer;
mod sink;

pub use consumer::LogConsumer;
pub use layer::{ChannelConfigurer, ChannelLayer, LogConfigurer};
pub use sink::{FileSink, LogSink, MemorySink, WriterSink};

/// Default capacity of the log channel, in records.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// One log line produced by a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
	pub timestamp: DateTime<Utc>,
	pub level: Level,
	pub target: String,
	pub thread: String,
	pub job_id: Option<JobId>,
	pub message: String,
}

impl LogRecord {
	pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			timestamp: Utc::now(),
			level,
			target: target.into(),
			thread: std::thread::current()
				.name()
				.unwrap_or("unnamed")
				.to_string(),
			job_id: None,
			message: message.into(),
		}
	}

	#[must_use]
	pub fn with_job_id(mut self, job_id: JobId) -> Self {
		self.job_id = Some(job_id);
		self
	}
}

/// Always renders on a single line, embedded line breaks are escaped.
impl fmt::Display for LogRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} {:<5} {} job={} {}: {}",
			self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
			self.level,
			self.thread,
			self.job_id
				.map_or_else(|| "-".to_string(), |job_id| job_id.to_string()),
			self.target,
			escape_line_breaks(&self.message)
		)
	}
}

fn escape_line_breaks(message: &str) -> String {
	message.replace('\r', "\\r").replace('\n', "\\n")
}

#[derive(Debug)]
pub enum LogMessage {
	Record(LogRecord),
	Done,
}

/// Producer side of the log channel. Cheap to clone, one per pool thread.
#[derive(Debug, Clone)]
pub struct LogSender(chan::Sender<LogMessage>);

impl LogSender {
	/// Blocks the calling thread while the channel is full.
	///
	/// Returns `false` if the consumer is gone and the record was dropped.
	pub fn send(&self, record: LogRecord) -> bool {
		self.0.send_blocking(LogMessage::Record(record)).is_ok()
	}

	/// Pushes the `Done` marker, telling the consumer to stop after the records already queued.
	pub async fn finish(&self) {
		if self.0.send(LogMessage::Done).await.is_err() {
			tracing::warn!("Log consumer already stopped before receiving the done marker;");
		}
	}

	#[must_use]
	pub fn same_channel(&self, other: &Self) -> bool {
		self.0.same_channel(&other.0)
	}
}

/// Consumer side of the log channel, owned by exactly one [`LogConsumer`].
#[derive(Debug)]
pub struct LogReceiver(chan::Receiver<LogMessage>);

impl LogReceiver {
	pub(crate) fn recv_blocking(&self) -> Option<LogMessage> {
		self.0.recv_blocking().ok()
	}
}

/// Opens a bounded multi-producer, single-consumer log channel.
#[must_use]
pub fn log_channel(capacity: usize) -> (LogSender, LogReceiver) {
	let (tx, rx) = chan::bounded(capacity.max(1));
	(LogSender(tx), LogReceiver(rx))
}
