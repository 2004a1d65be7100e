use std::{cell::RefCell, fmt};

use tracing::{
	field::{Field, Visit},
	span::{Attributes, Id},
	subscriber::DefaultGuard,
	Event, Level, Subscriber,
};
use tracing_subscriber::{
	layer::{Context, SubscriberExt},
	registry::LookupSpan,
	Layer,
};

use super::{super::job::JobId, LogRecord, LogSender};

/// Hook attaching the calling thread's log output to the log channel.
///
/// Called by [`Worker::run`](crate::Worker::run) on every run, so implementations must be
/// idempotent for a given thread and channel.
pub trait LogConfigurer: Send + Sync + 'static {
	fn configure(&self, channel: &LogSender);
}

impl<F> LogConfigurer for F
where
	F: Fn(&LogSender) + Send + Sync + 'static,
{
	fn configure(&self, channel: &LogSender) {
		self(channel);
	}
}

thread_local! {
	static INSTALLED: RefCell<Option<(LogSender, DefaultGuard)>> = const { RefCell::new(None) };
}

/// Installs a [`ChannelLayer`] as the thread default subscriber, once per thread and channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfigurer {
	max_level: Level,
}

impl ChannelConfigurer {
	#[must_use]
	pub const fn new(max_level: Level) -> Self {
		Self { max_level }
	}
}

impl Default for ChannelConfigurer {
	fn default() -> Self {
		Self::new(Level::DEBUG)
	}
}

impl LogConfigurer for ChannelConfigurer {
	fn configure(&self, channel: &LogSender) {
		INSTALLED.with(|installed| {
			let mut installed = installed.borrow_mut();

			if installed
				.as_ref()
				.is_some_and(|(current, _guard)| current.same_channel(channel))
			{
				return;
			}

			// Restore the previous default before stacking a new one
			drop(installed.take());

			let subscriber = tracing_subscriber::registry()
				.with(ChannelLayer::new(channel.clone(), self.max_level));

			*installed = Some((channel.clone(), tracing::subscriber::set_default(subscriber)));
		});
	}
}

/// Forwards `tracing` events to the log channel as [`LogRecord`]s.
///
/// Events are attributed to a job when they, or any span enclosing them, carry a `job_id` field.
#[derive(Debug)]
pub struct ChannelLayer {
	sender: LogSender,
	max_level: Level,
}

impl ChannelLayer {
	#[must_use]
	pub const fn new(sender: LogSender, max_level: Level) -> Self {
		Self { sender, max_level }
	}
}

struct JobSpan(JobId);

impl<S> Layer<S> for ChannelLayer
where
	S: Subscriber + for<'a> LookupSpan<'a>,
{
	fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
		let mut visitor = RecordVisitor::default();
		attrs.record(&mut visitor);

		if let (Some(job_id), Some(span)) = (visitor.job_id, ctx.span(id)) {
			span.extensions_mut().insert(JobSpan(job_id));
		}
	}

	fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
		let metadata = event.metadata();

		// More verbose levels compare greater
		if *metadata.level() > self.max_level {
			return;
		}

		let mut visitor = RecordVisitor::default();
		event.record(&mut visitor);

		let job_id = visitor.job_id.or_else(|| {
			ctx.event_scope(event).and_then(|scope| {
				scope
					.into_iter()
					.find_map(|span| span.extensions().get::<JobSpan>().map(|job| job.0))
			})
		});

		let mut record = LogRecord::new(*metadata.level(), metadata.target(), visitor.render());
		record.job_id = job_id;

		// A dropped record means the consumer is gone, there is nowhere left to report it
		let _ = self.sender.send(record);
	}
}

#[derive(Default)]
struct RecordVisitor {
	message: String,
	fields: Vec<String>,
	job_id: Option<JobId>,
}

impl RecordVisitor {
	fn render(self) -> String {
		if self.fields.is_empty() {
			self.message
		} else if self.message.is_empty() {
			self.fields.join(" ")
		} else {
			format!("{} {}", self.message, self.fields.join(" "))
		}
	}
}

impl Visit for RecordVisitor {
	fn record_str(&mut self, field: &Field, value: &str) {
		match field.name() {
			"message" => self.message = value.to_string(),
			"job_id" => self.job_id = JobId::parse_str(value).ok(),
			name => self.fields.push(format!("{name}={value}")),
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		match field.name() {
			"message" => self.message = format!("{value:?}"),
			"job_id" => self.job_id = JobId::parse_str(&format!("{value:?}")).ok(),
			name => self.fields.push(format!("{name}={value:?}")),
		}
	}
}
