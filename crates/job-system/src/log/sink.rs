use std::{
	fs::{self, File, OpenOptions},
	io::{self, BufWriter, Write},
	path::Path,
	sync::{Arc, Mutex, PoisonError},
};

use super::LogRecord;

/// Shared log destination. Only the log consumer ever writes to it.
pub trait LogSink: Send + 'static {
	fn write_record(&mut self, record: &LogRecord) -> io::Result<()>;

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl LogSink for Box<dyn LogSink> {
	fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
		(**self).write_record(record)
	}

	fn flush(&mut self) -> io::Result<()> {
		(**self).flush()
	}
}

/// Writes one rendered line per record to any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W>(W);

impl<W: Write + Send + 'static> WriterSink<W> {
	pub const fn new(writer: W) -> Self {
		Self(writer)
	}

	pub fn into_inner(self) -> W {
		self.0
	}
}

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
	fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
		writeln!(self.0, "{record}")
	}

	fn flush(&mut self) -> io::Result<()> {
		self.0.flush()
	}
}

pub type FileSink = WriterSink<BufWriter<File>>;

impl FileSink {
	/// Opens `path` for appending, creating it and its parent directories when needed.
	pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
		let path = path.as_ref();

		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}

		OpenOptions::new()
			.create(true)
			.append(true)
			.open(path)
			.map(|file| Self::new(BufWriter::new(file)))
	}
}

/// Keeps records in memory, clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
	records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn records(&self) -> Vec<LogRecord> {
		self.records
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	#[must_use]
	pub fn lines(&self) -> Vec<String> {
		self.records().iter().map(ToString::to_string).collect()
	}
}

impl LogSink for MemorySink {
	fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
		self.records
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(record.clone());
		Ok(())
	}
}
