use crate::enrich::Enricher;
use crate::event::Level;
use crate::layer::CompactFormatLayer;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration for the NDJSON layer installed by [`init_with_writer`].
///
/// **Fields**
/// - `min_level`: events below this level are dropped before formatting.
/// - `echo_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   installed alongside the NDJSON layer so events are also printed
///   human-readably on the console.
#[derive(Clone, Debug)]
pub struct InitConfig {
    pub min_level: Level,
    pub echo_stdout: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            min_level: Level::Verbose,
            echo_stdout: false,
        }
    }
}

/// Install a global `tracing` subscriber that writes compact NDJSON
/// records to `writer`, with the given enrichers applied to every event.
///
/// **Parameters**
/// - `writer`: shared sink the NDJSON lines are written to. Keep a clone
///   of the `Arc` if you need to read it back or flush it later.
/// - `enrichers`: run in order on every event before formatting.
/// - `config`: level filter and console-echo behavior.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`CompactFormatLayer`] as the
/// global default subscriber, so all `tracing` events in the process are
/// observed by the layer.
pub fn init_with_writer<W>(
    writer: Arc<Mutex<W>>,
    enrichers: Vec<Box<dyn Enricher>>,
    config: InitConfig,
) where
    W: Write + Send + 'static,
{
    let mut layer = CompactFormatLayer::new(writer).with_min_level(config.min_level);
    for enricher in enrichers {
        layer = layer.with_enricher(enricher);
    }

    if config.echo_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }
}

/// Install the NDJSON layer writing straight to stdout with default
/// configuration. The recommended entrypoint for services that ship
/// their logs by collecting stdout.
pub fn init_stdout(enrichers: Vec<Box<dyn Enricher>>) {
    init_with_writer(
        Arc::new(Mutex::new(std::io::stdout())),
        enrichers,
        InitConfig::default(),
    );
}
