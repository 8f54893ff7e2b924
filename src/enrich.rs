use crate::event::{LogEvent, Property};
use crate::value::{PropertyValue, Scalar};

/// Constructs event properties on behalf of enrichers.
///
/// Enrichers go through a factory instead of building [`Property`]
/// values directly so a host pipeline can apply its own construction
/// policy (interning, destructuring limits) without changing enrichers.
pub trait PropertyFactory {
    /// Build a scalar property with the given name and value.
    fn scalar(&self, name: &str, value: Scalar) -> Property;
}

/// Factory with no policy: wraps the scalar as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertyFactory;

impl PropertyFactory for DefaultPropertyFactory {
    fn scalar(&self, name: &str, value: Scalar) -> Property {
        Property::new(name, PropertyValue::Scalar(value))
    }
}

/// Pipeline stage that adds or overwrites event properties before the
/// event reaches the formatter.
///
/// Called once per event, synchronously, on the logging call path.
/// Implementations must not block and must not fail; an enricher that
/// has nothing to contribute simply returns without touching the event.
pub trait Enricher: Send + Sync {
    fn enrich(&self, event: &mut LogEvent, factory: &dyn PropertyFactory);
}
