use eyre::Context;
use std::env;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    Layer, Registry,
};

/// Filter from `RUST_LOG`, falling back to `INFO` for everything
fn targets() -> Targets {
    env::var("RUST_LOG")
        .map_err(eyre::Report::from)
        .and_then(|targets| targets.parse().context("Failed to parse RUST_LOG value"))
        .unwrap_or_else(|_| Targets::default().with_default(LevelFilter::INFO))
}

/// Install the global tracing subscriber
pub fn initialise() -> eyre::Result<()> {
    let subscriber = Registry::default()
        .with(tracing_subscriber::fmt::layer().with_filter(targets()))
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)
        .context("Couldn't install the global tracing subscriber")?;

    Ok(())
}
