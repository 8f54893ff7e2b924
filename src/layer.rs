use crate::compact::CompactJsonFormatter;
use crate::enrich::{DefaultPropertyFactory, Enricher};
use crate::event::{CapturedError, Level, LogEvent, Properties};
use crate::template::MessageTemplate;
use crate::value::{PropertyValue, Scalar};
use chrono::Utc;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns each observed event into a
/// [`LogEvent`], runs the registered enrichers over it, and writes the
/// compact NDJSON rendering to a shared writer.
///
/// The event's `message` field is taken as the message template text;
/// every other field becomes a scalar property, and a field recorded as
/// an error becomes the event's captured error. Formatting happens
/// synchronously on the emitting thread; a failing writer is reported on
/// stderr and never propagated into the host application.
pub struct CompactFormatLayer<W> {
    writer: Arc<Mutex<W>>,
    formatter: CompactJsonFormatter,
    enrichers: Vec<Box<dyn Enricher>>,
    min_level: Level,
}

impl<W> CompactFormatLayer<W> {
    /// Create a layer writing NDJSON records to `writer`. The writer is
    /// shared behind a mutex so callers can keep a handle to it (tests
    /// read captured output back, applications keep the file around).
    pub fn new(writer: Arc<Mutex<W>>) -> Self {
        CompactFormatLayer {
            writer,
            formatter: CompactJsonFormatter::new(),
            enrichers: Vec::new(),
            min_level: Level::Verbose,
        }
    }

    /// Register an enricher; enrichers run in registration order, so a
    /// later enricher wins when two touch the same property name.
    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// Drop events below `level` before they are formatted.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_formatter(mut self, formatter: CompactJsonFormatter) -> Self {
        self.formatter = formatter;
        self
    }
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::Verbose,
        tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Information,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::ERROR => Level::Error,
    }
}

impl<S, W> Layer<S> for CompactFormatLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let level = map_level(event.metadata().level());
        if level < self.min_level {
            return;
        }

        let mut properties = Properties::new();
        let mut template: Option<String> = None;
        let mut error: Option<CapturedError> = None;

        let mut visitor = EventVisitor {
            properties: &mut properties,
            template: &mut template,
            error: &mut error,
        };
        event.record(&mut visitor);

        let template = MessageTemplate::parse(
            template.unwrap_or_else(|| event.metadata().target().to_string()),
        );

        let mut log_event = LogEvent::new(Utc::now().fixed_offset(), level, template);
        log_event.properties = properties;
        log_event.error = error;

        let factory = DefaultPropertyFactory;
        for enricher in &self.enrichers {
            enricher.enrich(&mut log_event, &factory);
        }

        match self.writer.lock() {
            Ok(mut writer) => {
                if let Err(e) = self.formatter.format_event(&log_event, &mut *writer) {
                    eprintln!("compact log formatting failed: {}", e);
                }
            }
            Err(_) => eprintln!("compact log writer poisoned, dropping record"),
        }
    }
}

/// Collects a `tracing` event's fields into the compact event model.
struct EventVisitor<'a> {
    properties: &'a mut Properties,
    template: &'a mut Option<String>,
    error: &'a mut Option<CapturedError>,
}

impl<'a> Visit for EventVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.template = Some(value.to_string());
        } else {
            self.properties
                .insert(field.name(), PropertyValue::string(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.properties.insert(field.name(), PropertyValue::int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.properties
            .insert(field.name(), PropertyValue::Scalar(Scalar::UInt(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.properties
            .insert(field.name(), PropertyValue::Scalar(Scalar::Float(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.properties.insert(field.name(), PropertyValue::bool(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        *self.error = Some(CapturedError::new(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // The event macro's message arrives here as `fmt::Arguments`.
        if field.name() == "message" {
            *self.template = Some(format!("{:?}", value));
        } else {
            self.properties
                .insert(field.name(), PropertyValue::string(format!("{:?}", value)));
        }
    }
}
