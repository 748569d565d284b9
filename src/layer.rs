use crate::formatter::ContextFormatter;
use crate::record::{Level as RecordLevel, LogRecord};
use serde_json::{Map, Value};
use std::io::Write;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s,
/// formats them with a [`ContextFormatter`] and writes each line to a
/// [`MakeWriter`].
///
/// Failures are never reported through `tracing` itself; they are counted
/// and printed to stderr.
pub struct ContextFormatLayer<W> {
    formatter: ContextFormatter,
    make_writer: W,
    channel: Option<String>,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Lines successfully written.
    pub written_events: Arc<AtomicU64>,
    /// Events that could not be formatted or written.
    pub failed_events: Arc<AtomicU64>,
}

impl<W> ContextFormatLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    /// Create a layer writing formatted lines to `make_writer`.
    ///
    /// Records use the event target as channel unless
    /// [`with_channel`](Self::with_channel) sets a fixed one.
    pub fn new(formatter: ContextFormatter, make_writer: W) -> Self {
        Self {
            formatter,
            make_writer,
            channel: None,
            total_events: Arc::new(AtomicU64::new(0)),
            written_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    fn record_from_event(&self, event: &Event<'_>) -> LogRecord {
        let mut context = Map::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { context: &mut context, message: &mut message };
        event.record(&mut visitor);

        let meta = event.metadata();
        let channel = self
            .channel
            .clone()
            .unwrap_or_else(|| meta.target().to_string());

        LogRecord::new(channel, record_level(meta.level()), message.unwrap_or_default())
            .with_context(context)
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.make_writer.make_writer();
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

/// Map `tracing` levels onto record severities.
pub fn record_level(level: &Level) -> RecordLevel {
    match *level {
        Level::ERROR => RecordLevel::Error,
        Level::WARN => RecordLevel::Warning,
        Level::INFO => RecordLevel::Info,
        Level::DEBUG | Level::TRACE => RecordLevel::Debug,
    }
}

impl<S, W> Layer<S> for ContextFormatLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let record = self.record_from_event(event);
        let line = match self.formatter.format(&record) {
            Ok(line) => line,
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("error formatting log record: {}", e);
                return;
            }
        };

        match self.write_line(&line) {
            Ok(()) => {
                self.written_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("error writing log line: {}", e);
            }
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects event fields into a record context; `message` is kept apart.
pub struct FieldVisitor<'a> {
    pub context: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.context.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // non-finite floats have no JSON number form
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatterConfig;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn events_become_pure_json_lines() {
        let captured = Captured::default();
        let formatter = ContextFormatter::pure_json(FormatterConfig::new().application("svc")).unwrap();
        let layer = ContextFormatLayer::new(formatter, captured.clone()).with_channel("auth");
        let written = Arc::clone(&layer.written_events);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(user_id = 42, message_id = "m-1", "authentication failed");
        });

        let out = captured.text();
        let line: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(line["channel"], "auth");
        assert_eq!(line["severity"], "ERROR");
        assert_eq!(line["level"], 400);
        assert_eq!(line["message"], "authentication failed");
        assert_eq!(line["user_id"], 42);
        assert_eq!(line["application"], "svc");
        assert_eq!(written.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reserved_fields_are_displaced() {
        let captured = Captured::default();
        let formatter = ContextFormatter::bracketed(FormatterConfig::new()).unwrap();
        let layer = ContextFormatLayer::new(formatter, captured.clone());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(timestamp = "sneaky", "disk almost full");
        });

        let out = captured.text();
        assert!(out.contains(".WARNING: "), "{out}");
        assert!(out.contains(r#""context":{"timestamp":"sneaky"}"#), "{out}");
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn tracing_levels_map_to_record_levels() {
        assert_eq!(record_level(&Level::ERROR), RecordLevel::Error);
        assert_eq!(record_level(&Level::WARN), RecordLevel::Warning);
        assert_eq!(record_level(&Level::TRACE), RecordLevel::Debug);
    }
}
