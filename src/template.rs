//! Message template parsing and rendering.
//!
//! A template is a string with named placeholders like `{Name}`,
//! optionally carrying a display format (`{Count:000}`) and a capture
//! sigil (`{@User}` structured, `{$Id}` stringified). `{{` and `}}`
//! escape literal braces. Anything that does not parse as a well-formed
//! token degrades to literal text rather than failing the call.

use crate::event::Properties;
use crate::value::{JsonValueFormatter, PropertyValue, Scalar};

/// How a token asks for its argument to be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    /// Scalar capture, rendered inline.
    #[default]
    Default,
    /// `@` sigil: serialize the argument as a structured object.
    Structured,
    /// `$` sigil: force the argument to its string form.
    Stringified,
}

/// One parsed `{...}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyToken {
    /// The exact source text of the token, braces included.
    pub raw: String,
    pub name: String,
    pub format: Option<String>,
    pub capture: Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Property(PropertyToken),
}

/// A parsed message template: the raw text plus its token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
    tokens: Vec<Token>,
}

impl MessageTemplate {
    /// Parse template text into tokens. Never fails; malformed
    /// placeholders are kept as literal text.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        MessageTemplate { text, tokens }
    }

    /// The raw template text as written at the call site.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn property_tokens(&self) -> impl Iterator<Item = &PropertyToken> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Property(p) => Some(p),
            Token::Text(_) => None,
        })
    }

    /// True when any token's source text contains the structured-capture
    /// sigil. The check is a literal `@` scan over the token text, which
    /// can false-positive on an `@` inside a format string; existing log
    /// consumers depend on exactly this behavior, so it stays.
    pub fn has_structured_capture(&self) -> bool {
        self.property_tokens().any(|t| t.raw.contains('@'))
    }

    /// Render the template against `properties`, substituting each
    /// placeholder with its property's display form. Placeholders with
    /// no matching property render their source text verbatim.
    pub fn render(&self, properties: &Properties, formatter: &JsonValueFormatter) -> String {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Property(prop) => render_token(prop, properties, formatter, &mut out),
            }
        }
        out
    }
}

/// Render one property token (with its format, if any) against the
/// property set, appending the display text to `out`.
pub fn render_token(
    token: &PropertyToken,
    properties: &Properties,
    formatter: &JsonValueFormatter,
    out: &mut String,
) {
    match properties.get(&token.name) {
        Some(value) => render_value(value, token, formatter, out),
        None => out.push_str(&token.raw),
    }
}

fn render_value(
    value: &PropertyValue,
    token: &PropertyToken,
    formatter: &JsonValueFormatter,
    out: &mut String,
) {
    if token.capture == Capture::Stringified {
        let mut text = String::new();
        render_plain(value, formatter, &mut text);
        out.push('"');
        out.push_str(&text);
        out.push('"');
        return;
    }

    match value {
        PropertyValue::Scalar(scalar) => render_scalar(scalar, token.format.as_deref(), formatter, out),
        structured => formatter.write_value(structured, out),
    }
}

fn render_scalar(
    scalar: &Scalar,
    format: Option<&str>,
    formatter: &JsonValueFormatter,
    out: &mut String,
) {
    match (scalar, format) {
        // `l` renders strings literally, without the display quotes.
        (Scalar::String(s), Some("l")) => out.push_str(s),
        (Scalar::String(s), _) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        (Scalar::Int(v), Some(f)) if is_zero_pad(f) => {
            out.push_str(&format!("{:0width$}", v, width = f.len()));
        }
        (Scalar::UInt(v), Some(f)) if is_zero_pad(f) => {
            out.push_str(&format!("{:0width$}", v, width = f.len()));
        }
        (Scalar::Int(v), Some("x")) => out.push_str(&format!("{:x}", v)),
        (Scalar::Int(v), Some("X")) => out.push_str(&format!("{:X}", v)),
        (Scalar::UInt(v), Some("x")) => out.push_str(&format!("{:x}", v)),
        (Scalar::UInt(v), Some("X")) => out.push_str(&format!("{:X}", v)),
        (scalar, _) => formatter.write_scalar_text(scalar, out),
    }
}

fn render_plain(value: &PropertyValue, formatter: &JsonValueFormatter, out: &mut String) {
    match value {
        PropertyValue::Scalar(scalar) => formatter.write_scalar_text(scalar, out),
        structured => formatter.write_value(structured, out),
    }
}

fn is_zero_pad(format: &str) -> bool {
    !format.is_empty() && format.bytes().all(|b| b == b'0')
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                literal.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                literal.push('}');
                i += 2;
            }
            b'{' => match parse_property(text, i) {
                Some((token, end)) => {
                    if !literal.is_empty() {
                        tokens.push(Token::Text(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Property(token));
                    i = end;
                }
                None => {
                    literal.push('{');
                    i += 1;
                }
            },
            _ => {
                let ch = text[i..].chars().next().unwrap_or('\u{FFFD}');
                literal.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Text(literal));
    }
    tokens
}

/// Try to parse a property token starting at the `{` at byte `start`.
/// Returns the token and the byte index just past the closing `}`.
fn parse_property(text: &str, start: usize) -> Option<(PropertyToken, usize)> {
    let bytes = text.as_bytes();
    let close = text[start..].find('}').map(|off| start + off)?;
    let body = &text[start + 1..close];

    let (capture, name_and_format) = match body.as_bytes().first() {
        Some(b'@') => (Capture::Structured, &body[1..]),
        Some(b'$') => (Capture::Stringified, &body[1..]),
        _ => (Capture::Default, body),
    };

    let (name, format) = match name_and_format.split_once(':') {
        Some((name, format)) if !format.is_empty() => (name, Some(format.to_string())),
        Some((name, _)) => (name, None),
        None => (name_and_format, None),
    };

    if name.is_empty() || !name.bytes().all(is_name_byte) {
        return None;
    }

    let end = close + 1;
    debug_assert_eq!(bytes[close], b'}');
    Some((
        PropertyToken {
            raw: text[start..end].to_string(),
            name: name.to_string(),
            format,
            capture,
        },
        end,
    ))
}
