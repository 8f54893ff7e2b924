//! The compact NDJSON record formatter.
//!
//! Writes one JSON object per event, terminated by `\n`, so a stream of
//! calls produces newline-delimited JSON. The field order is a wire
//! contract with downstream consumers and is fixed: `Timestamp`,
//! `MessageTemplate`, `Message`, then optional `Renderings` and `Level`,
//! then one key per event property in insertion order.

use crate::event::{Level, LogEvent};
use crate::template::render_token;
use crate::value::{write_json_string, JsonValueFormatter};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use std::io::Write;

/// Template text substituted when the event carries an error, or when an
/// `Error`-level template matches [`UNHANDLED_ERROR_FRAGMENT`]. In both
/// cases the real template would only repeat what the `Message` field
/// already says.
const ELIDED_TEMPLATE: &str = "Exception";

/// Boilerplate fragment one upstream caller wraps unhandled errors in.
/// Matched as a bare substring, unanchored. A narrow compatibility shim
/// for that caller, not a general redundancy detector.
///
/// TODO: confirm downstream consumers still depend on this elision
/// before making the fragment configurable.
const UNHANDLED_ERROR_FRAGMENT: &str = "Unknown error responding to request";

/// Errors surfaced by [`CompactJsonFormatter::format_event`].
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to write log record to sink: {0}")]
    Io(#[from] std::io::Error),
}

/// Formats a [`LogEvent`] as one compact JSON line.
///
/// The formatter is stateless across events; the only instance data is
/// the value formatter it delegates property rendering to, so a single
/// instance may be shared freely between threads as long as each call
/// gets its own sink.
#[derive(Debug, Clone, Default)]
pub struct CompactJsonFormatter {
    value_formatter: JsonValueFormatter,
}

impl CompactJsonFormatter {
    pub fn new() -> Self {
        CompactJsonFormatter::default()
    }

    /// Use a specific value formatter instead of the default one.
    pub fn with_value_formatter(value_formatter: JsonValueFormatter) -> Self {
        CompactJsonFormatter { value_formatter }
    }

    /// Write `event` to `out` as one JSON object plus a trailing newline.
    ///
    /// The record is assembled in memory and handed to the sink in a
    /// single write, so a failing sink never observes half a record.
    /// The event itself is only read, never mutated.
    pub fn format_event(&self, event: &LogEvent, out: &mut dyn Write) -> Result<(), FormatError> {
        let mut line = String::with_capacity(256);

        line.push_str("{\"Timestamp\":");
        write_json_string(&render_timestamp(&event.timestamp), &mut line);

        line.push_str(",\"MessageTemplate\":");
        write_json_string(self.template_text(event), &mut line);

        line.push_str(",\"Message\":");
        self.write_message(event, &mut line);

        self.write_renderings(event, &mut line);

        if event.level != Level::Information {
            line.push_str(",\"Level\":");
            write_json_string(event.level.as_str(), &mut line);
        }

        for (name, value) in event.properties.iter() {
            line.push(',');
            // A property literally named with a leading `@` doubles the
            // sigil in its key, so consumers can tell it apart from the
            // structured-capture convention.
            if name.starts_with('@') {
                write_json_string(&format!("@{}", name), &mut line);
            } else {
                write_json_string(name, &mut line);
            }
            line.push(':');
            self.value_formatter.write_value(value, &mut line);
        }

        line.push_str("}\n");
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    /// The text emitted for `MessageTemplate`, after redundancy elision.
    fn template_text<'a>(&self, event: &'a LogEvent) -> &'a str {
        if event.error.is_some() {
            return ELIDED_TEMPLATE;
        }
        if event.level == Level::Error && event.template.text().contains(UNHANDLED_ERROR_FRAGMENT) {
            return ELIDED_TEMPLATE;
        }
        event.template.text()
    }

    fn write_message(&self, event: &LogEvent, line: &mut String) {
        if let Some(error) = &event.error {
            write_json_string(&error.message, line);
        } else if event.template.has_structured_capture() {
            // Rendering would just repeat the structured property that
            // appears in the tail.
            line.push_str("null");
        } else {
            let rendered = event.template.render(&event.properties, &self.value_formatter);
            write_json_string(&rendered, line);
        }
    }

    /// Emit `Renderings` when at least one token carries an explicit
    /// format specifier: one formatted string per such token, in
    /// template order. No tokens with formats means no key at all.
    fn write_renderings(&self, event: &LogEvent, line: &mut String) {
        let mut formatted = event
            .template
            .property_tokens()
            .filter(|token| token.format.is_some())
            .peekable();
        if formatted.peek().is_none() {
            return;
        }

        line.push_str(",\"Renderings\":[");
        for (i, token) in formatted.enumerate() {
            if i > 0 {
                line.push(',');
            }
            let mut rendering = String::new();
            render_token(token, &event.properties, &self.value_formatter, &mut rendering);
            write_json_string(&rendering, line);
        }
        line.push(']');
    }
}

/// Round-trip UTC timestamp: ISO-8601 extended with exactly seven
/// fractional digits (100 ns ticks), e.g. `2024-01-01T12:00:00.1234567Z`.
fn render_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    let utc = timestamp.with_timezone(&Utc);
    let ticks = (utc.nanosecond() % 1_000_000_000) / 100;
    format!("{}.{:07}Z", utc.format("%Y-%m-%dT%H:%M:%S"), ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CapturedError;
    use crate::template::MessageTemplate;
    use crate::value::PropertyValue;

    fn event_at(rfc3339: &str, level: Level, template: &str) -> LogEvent {
        let ts = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        LogEvent::new(ts, level, MessageTemplate::parse(template))
    }

    fn format(event: &LogEvent) -> String {
        let mut out = Vec::new();
        CompactJsonFormatter::new().format_event(event, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn information_event_with_scalar_property() {
        let mut event = event_at(
            "2024-01-01T12:00:00Z",
            Level::Information,
            "User {Name} logged in",
        );
        event.properties.insert("Name", PropertyValue::string("Alice"));

        assert_eq!(
            format(&event),
            "{\"Timestamp\":\"2024-01-01T12:00:00.0000000Z\",\
             \"MessageTemplate\":\"User {Name} logged in\",\
             \"Message\":\"User \\\"Alice\\\" logged in\",\
             \"Name\":\"Alice\"}\n"
        );
    }

    #[test]
    fn timestamp_is_converted_to_utc_with_seven_digit_fraction() {
        let event = event_at("2024-06-01T14:30:00.1234567+02:00", Level::Information, "x");
        assert!(format(&event).starts_with("{\"Timestamp\":\"2024-06-01T12:30:00.1234567Z\""));
    }

    #[test]
    fn level_is_suppressed_only_for_information() {
        let event = event_at("2024-01-01T12:00:00Z", Level::Information, "x");
        assert!(!format(&event).contains("\"Level\""));

        let event = event_at("2024-01-01T12:00:00Z", Level::Warning, "x");
        assert!(format(&event).contains(",\"Level\":\"Warning\""));

        let event = event_at("2024-01-01T12:00:00Z", Level::Fatal, "x");
        assert!(format(&event).contains(",\"Level\":\"Fatal\""));
    }

    #[test]
    fn error_event_elides_template_and_uses_error_message() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Error, "Doing {Thing}");
        event.properties.insert("Thing", PropertyValue::string("work"));
        event.error = Some(CapturedError::new("it broke"));

        let line = format(&event);
        assert!(line.contains("\"MessageTemplate\":\"Exception\""));
        assert!(line.contains("\"Message\":\"it broke\""));
        // The property tail is unaffected by the elision.
        assert!(line.contains("\"Thing\":\"work\""));
    }

    #[test]
    fn unhandled_error_boilerplate_elides_template_at_error_level() {
        let mut event = event_at(
            "2024-01-01T12:00:00Z",
            Level::Error,
            "Unknown error responding to request: {Detail}",
        );
        event.properties.insert("Detail", PropertyValue::string("timeout"));

        let line = format(&event);
        assert!(line.contains("\"MessageTemplate\":\"Exception\""));
        assert!(line.contains(",\"Level\":\"Error\""));
        // Message still renders from the real template.
        assert!(line.contains("\"Message\":\"Unknown error responding to request: \\\"timeout\\\"\""));
    }

    #[test]
    fn boilerplate_is_ignored_below_error_level() {
        let event = event_at(
            "2024-01-01T12:00:00Z",
            Level::Warning,
            "Unknown error responding to request: {Detail}",
        );
        assert!(format(&event)
            .contains("\"MessageTemplate\":\"Unknown error responding to request: {Detail}\""));
    }

    #[test]
    fn renderings_lists_formatted_tokens_in_template_order() {
        let mut event = event_at(
            "2024-01-01T12:00:00Z",
            Level::Warning,
            "Retry {Count:000}",
        );
        event.properties.insert("Count", PropertyValue::int(3));

        let line = format(&event);
        assert!(line.contains(",\"Renderings\":[\"003\"]"));
        assert!(line.contains(",\"Level\":\"Warning\""));
        // Renderings precedes Level on the wire.
        assert!(line.find("\"Renderings\"").unwrap() < line.find("\"Level\"").unwrap());
    }

    #[test]
    fn renderings_absent_without_format_specifiers() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Warning, "Retry {Count}");
        event.properties.insert("Count", PropertyValue::int(3));
        assert!(!format(&event).contains("Renderings"));
    }

    #[test]
    fn structured_capture_nulls_message_but_not_template() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Information, "Seen {@User}");
        event.properties.insert(
            "User",
            PropertyValue::Structure {
                type_tag: None,
                fields: vec![("Name".into(), PropertyValue::string("Bob"))],
            },
        );

        let line = format(&event);
        assert!(line.contains("\"MessageTemplate\":\"Seen {@User}\""));
        assert!(line.contains("\"Message\":null"));
        assert!(line.contains("\"User\":{\"Name\":\"Bob\"}"));
    }

    #[test]
    fn at_prefixed_property_names_double_the_sigil() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Information, "x");
        event.properties.insert("@User", PropertyValue::string("bob"));
        event.properties.insert("User", PropertyValue::string("alice"));

        let line = format(&event);
        assert!(line.contains("\"@@User\":\"bob\""));
        assert!(line.contains("\"User\":\"alice\""));
        assert!(!line.contains("\"@User\""));
    }

    #[test]
    fn output_is_one_parseable_json_line() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Debug, "n={N:00}");
        event.properties.insert("N", PropertyValue::int(7));
        event.properties.insert(
            "Tags",
            PropertyValue::Sequence(vec![PropertyValue::string("a"), PropertyValue::string("b")]),
        );

        let line = format(&event);
        assert!(line.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["Message"], "n=07");
        assert_eq!(parsed["Renderings"][0], "07");
        assert_eq!(parsed["Level"], "Debug");
        assert_eq!(parsed["Tags"][1], "b");
    }

    #[test]
    fn encoding_twice_is_byte_identical() {
        let mut event = event_at("2024-01-01T12:00:00Z", Level::Warning, "Retry {Count:000}");
        event.properties.insert("Count", PropertyValue::int(3));
        assert_eq!(format(&event), format(&event));
    }

    #[test]
    fn sink_failure_surfaces_as_io_error() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let event = event_at("2024-01-01T12:00:00Z", Level::Information, "x");
        let err = CompactJsonFormatter::new()
            .format_event(&event, &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }
}
