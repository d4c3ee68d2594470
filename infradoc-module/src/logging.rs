use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{format::FmtSpan, Layer as FmtLayer},
    layer::SubscriberExt as _,
    Layer as _, Registry,
};

/// Install plain line-oriented logging to stderr.
pub(crate) fn set_up(verbose: bool, color: bool) -> Result<()> {
    let filter = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let span_events = if verbose {
        // include enter/exit events for detailed tracing
        FmtSpan::FULL
    } else {
        // announce what we do and when we're done
        FmtSpan::NEW | FmtSpan::CLOSE
    };

    let fmt_layer = FmtLayer::new()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_ansi(color)
        .with_filter(filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))?;

    Ok(())
}
