use crate::enrich::{Enricher, PropertyFactory};
use crate::event::LogEvent;
use crate::value::Scalar;
use std::sync::Arc;

/// Name of the property the correlation enricher attaches.
pub const CORRELATION_ID_PROPERTY: &str = "CorrelationId";

/// Resolves the current correlation identifier.
///
/// The mechanism is entirely the caller's business: ambient request
/// context, a thread-local, a propagated tracing header. The enricher
/// only invokes it synchronously on the enrichment path.
pub type CorrelationResolver = Arc<dyn Fn() -> String + Send + Sync>;

/// Attaches a `CorrelationId` string property to every event, replacing
/// any property already carrying that name.
///
/// Whatever the resolver returns is attached verbatim; an empty string
/// is still a valid correlation id as far as this enricher is concerned.
pub struct CorrelationIdEnricher {
    resolver: CorrelationResolver,
}

impl CorrelationIdEnricher {
    pub fn new(resolver: CorrelationResolver) -> Self {
        CorrelationIdEnricher { resolver }
    }
}

impl Enricher for CorrelationIdEnricher {
    fn enrich(&self, event: &mut LogEvent, factory: &dyn PropertyFactory) {
        let id = (self.resolver)();
        let property = factory.scalar(CORRELATION_ID_PROPERTY, Scalar::String(id));
        event.add_or_update_property(property);
    }
}
