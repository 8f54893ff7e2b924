//! Compact NDJSON log event formatting with message templates and
//! correlation-id enrichment, plus an optional `tracing` layer.

pub mod compact;
pub mod correlation;
pub mod enrich;
pub mod event;
pub mod template;
pub mod value;

#[cfg(feature = "layer")]
pub mod init;
#[cfg(feature = "layer")]
pub mod layer;
