use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a human-readable subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let filter = env_filter(level, debug)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Same as [`init_logging`] but emits one JSON object per event.
pub fn init_json_logging(level: &str) -> Result<()> {
    let filter = env_filter(level, false)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn env_filter(level: &str, debug: bool) -> Result<EnvFilter> {
    let level: tracing::Level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())))
}
