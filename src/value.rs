//! Property value model and JSON value formatting.
//!
//! Every event property carries one [`PropertyValue`], a small tagged
//! union over scalars, sequences, structured objects and dictionaries.
//! [`JsonValueFormatter`] turns any such value into valid JSON text with
//! standard string escaping; the compact formatter drives it for the
//! dynamic property tail of each record.

/// Scalar leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Pre-formatted JSON text, emitted verbatim. The caller is
    /// responsible for it being a valid JSON fragment.
    Raw(String),
}

/// Tagged union of everything an event property can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    Structure {
        /// Optional type tag, emitted as a leading `_typeTag` field.
        type_tag: Option<String>,
        fields: Vec<(String, PropertyValue)>,
    },
    Dictionary(Vec<(Scalar, PropertyValue)>),
}

impl PropertyValue {
    pub fn string(s: impl Into<String>) -> Self {
        PropertyValue::Scalar(Scalar::String(s.into()))
    }

    pub fn int(v: i64) -> Self {
        PropertyValue::Scalar(Scalar::Int(v))
    }

    pub fn bool(v: bool) -> Self {
        PropertyValue::Scalar(Scalar::Bool(v))
    }

    pub fn null() -> Self {
        PropertyValue::Scalar(Scalar::Null)
    }
}

/// Append `s` to `out` as a quoted JSON string with standard escaping.
///
/// Quotes, backslashes and ASCII control characters are escaped; all
/// other characters (including non-ASCII) pass through as UTF-8, which
/// JSON permits verbatim.
pub fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Renders any [`PropertyValue`] as JSON text.
///
/// Stateless and shareable; the compact formatter holds one instance as
/// its immutable configuration, so one formatter can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct JsonValueFormatter;

impl JsonValueFormatter {
    pub fn new() -> Self {
        JsonValueFormatter
    }

    /// Append the JSON rendering of `value` to `out`.
    pub fn write_value(&self, value: &PropertyValue, out: &mut String) {
        match value {
            PropertyValue::Scalar(scalar) => self.write_scalar(scalar, out),
            PropertyValue::Sequence(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_value(item, out);
                }
                out.push(']');
            }
            PropertyValue::Structure { type_tag, fields } => {
                out.push('{');
                let mut first = true;
                if let Some(tag) = type_tag {
                    out.push_str("\"_typeTag\":");
                    write_json_string(tag, out);
                    first = false;
                }
                for (name, field) in fields {
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    write_json_string(name, out);
                    out.push(':');
                    self.write_value(field, out);
                }
                out.push('}');
            }
            PropertyValue::Dictionary(entries) => {
                out.push('{');
                for (i, (key, entry)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    // JSON object keys must be strings, so non-string
                    // scalar keys are stringified.
                    match key {
                        Scalar::String(s) => write_json_string(s, out),
                        other => {
                            let mut text = String::new();
                            self.write_scalar_text(other, &mut text);
                            write_json_string(&text, out);
                        }
                    }
                    out.push(':');
                    self.write_value(entry, out);
                }
                out.push('}');
            }
        }
    }

    fn write_scalar(&self, scalar: &Scalar, out: &mut String) {
        match scalar {
            Scalar::Null => out.push_str("null"),
            Scalar::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Scalar::Int(v) => out.push_str(&v.to_string()),
            Scalar::UInt(v) => out.push_str(&v.to_string()),
            Scalar::Float(v) => {
                // NaN and infinities are not JSON numbers; write them as
                // strings so the line stays parseable.
                if v.is_finite() {
                    out.push_str(&v.to_string());
                } else {
                    write_json_string(&v.to_string(), out);
                }
            }
            Scalar::String(s) => write_json_string(s, out),
            Scalar::Raw(literal) => out.push_str(literal),
        }
    }

    /// Unquoted text form of a scalar, used for dictionary keys and for
    /// message-template display rendering.
    pub(crate) fn write_scalar_text(&self, scalar: &Scalar, out: &mut String) {
        match scalar {
            Scalar::Null => out.push_str("null"),
            Scalar::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Scalar::Int(v) => out.push_str(&v.to_string()),
            Scalar::UInt(v) => out.push_str(&v.to_string()),
            Scalar::Float(v) => out.push_str(&v.to_string()),
            Scalar::String(s) => out.push_str(s),
            Scalar::Raw(literal) => out.push_str(literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: &PropertyValue) -> String {
        let mut out = String::new();
        JsonValueFormatter::new().write_value(value, &mut out);
        out
    }

    #[test]
    fn escapes_quotes_backslashes_and_controls() {
        let mut out = String::new();
        write_json_string("a\"b\\c\nd\u{0001}", &mut out);
        assert_eq!(out, r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn non_ascii_passes_through() {
        let mut out = String::new();
        write_json_string("héllo", &mut out);
        assert_eq!(out, "\"héllo\"");
    }

    #[test]
    fn scalars_render_as_json_literals() {
        assert_eq!(render(&PropertyValue::null()), "null");
        assert_eq!(render(&PropertyValue::bool(true)), "true");
        assert_eq!(render(&PropertyValue::int(-42)), "-42");
        assert_eq!(render(&PropertyValue::Scalar(Scalar::UInt(7))), "7");
        assert_eq!(render(&PropertyValue::Scalar(Scalar::Float(1.5))), "1.5");
        assert_eq!(render(&PropertyValue::string("hi")), "\"hi\"");
        assert_eq!(
            render(&PropertyValue::Scalar(Scalar::Raw("{\"x\":1}".into()))),
            "{\"x\":1}"
        );
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(render(&PropertyValue::Scalar(Scalar::Float(f64::NAN))), "\"NaN\"");
        assert_eq!(render(&PropertyValue::Scalar(Scalar::Float(f64::INFINITY))), "\"inf\"");
    }

    #[test]
    fn sequences_render_as_arrays() {
        let value = PropertyValue::Sequence(vec![
            PropertyValue::int(1),
            PropertyValue::string("two"),
        ]);
        assert_eq!(render(&value), "[1,\"two\"]");
    }

    #[test]
    fn structures_render_with_leading_type_tag() {
        let value = PropertyValue::Structure {
            type_tag: Some("User".into()),
            fields: vec![("Name".into(), PropertyValue::string("Bob"))],
        };
        assert_eq!(render(&value), "{\"_typeTag\":\"User\",\"Name\":\"Bob\"}");

        let untagged = PropertyValue::Structure {
            type_tag: None,
            fields: vec![("Name".into(), PropertyValue::string("Bob"))],
        };
        assert_eq!(render(&untagged), "{\"Name\":\"Bob\"}");
    }

    #[test]
    fn dictionaries_stringify_non_string_keys() {
        let value = PropertyValue::Dictionary(vec![
            (Scalar::Int(1), PropertyValue::string("one")),
            (Scalar::String("two".into()), PropertyValue::int(2)),
        ]);
        assert_eq!(render(&value), "{\"1\":\"one\",\"two\":2}");
    }
}
