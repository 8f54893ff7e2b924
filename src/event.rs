use crate::template::MessageTemplate;
use crate::value::PropertyValue;
use chrono::{DateTime, FixedOffset};

/// Ordinal event severity. `Information` is the implicit default and is
/// suppressed from the compact output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Verbose,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Wire name of the level, written verbatim into the `Level` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }
}

/// Error captured on a log event. Only the human-readable message is
/// carried; stack traces and causes stay with the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
}

impl CapturedError {
    pub fn new(message: impl Into<String>) -> Self {
        CapturedError { message: message.into() }
    }
}

/// A single named property attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Property { name: name.into(), value }
    }
}

/// Insertion-ordered property map with at-most-one entry per name.
///
/// Backed by a pair vector so the compact formatter can reproduce the
/// tail-key order downstream consumers rely on. Updating an existing
/// name replaces the value in place and keeps the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, PropertyValue)>);

impl Properties {
    pub fn new() -> Self {
        Properties(Vec::new())
    }

    /// Insert a property, overwriting any prior value under the same
    /// name. Last writer wins; position of a replaced entry is kept.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

/// One structured record produced by a logging call.
///
/// Constructed once per call site, mutated only by enrichers, then handed
/// to exactly one formatter invocation. The formatter reads, never writes.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Instant of the call, with its original offset; rendered in UTC.
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub template: MessageTemplate,
    pub properties: Properties,
    pub error: Option<CapturedError>,
}

impl LogEvent {
    pub fn new(timestamp: DateTime<FixedOffset>, level: Level, template: MessageTemplate) -> Self {
        LogEvent {
            timestamp,
            level,
            template,
            properties: Properties::new(),
            error: None,
        }
    }

    /// Attach a property, overwriting any existing property of the same
    /// name. This is the contract enrichers rely on: at most one property
    /// per name survives enrichment, last writer wins.
    pub fn add_or_update_property(&mut self, property: Property) {
        self.properties.insert(property.name, property.value);
    }
}
