use std::io;

use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{error, trace};

use super::{super::error::DispatchError, LogMessage, LogReceiver, LogSink};

/// The single writer of a dispatch run's log output.
///
/// Runs on its own blocking thread, pulling records until the `Done` marker arrives or every
/// sender is gone.
#[derive(Debug)]
pub struct LogConsumer {
	handle: JoinHandle<io::Result<usize>>,
}

impl LogConsumer {
	pub fn spawn(receiver: LogReceiver, mut sink: impl LogSink) -> Self {
		let handle = spawn_blocking(move || drain(&receiver, &mut sink));

		Self { handle }
	}

	/// Waits for the consumer to observe the `Done` marker, returning how many records it wrote.
	pub async fn join(self) -> Result<usize, DispatchError> {
		match self.handle.await {
			Ok(Ok(written)) => Ok(written),
			Ok(Err(e)) => {
				error!(?e, "Log consumer failed to write records;");
				Err(DispatchError::LogConsumer(e))
			}
			Err(e) => Err(DispatchError::LogConsumerJoin(e.to_string())),
		}
	}
}

fn drain(receiver: &LogReceiver, sink: &mut impl LogSink) -> io::Result<usize> {
	let mut written = 0;

	while let Some(msg) = receiver.recv_blocking() {
		match msg {
			LogMessage::Record(record) => {
				sink.write_record(&record)?;
				written += 1;
			}
			LogMessage::Done => {
				trace!(written, "Log consumer received done marker;");
				break;
			}
		}
	}

	sink.flush()?;

	Ok(written)
}
