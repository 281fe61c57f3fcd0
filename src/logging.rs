use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Routes `tracing` output to a daily-rolled file, since the terminal belongs to the UI.
/// Level comes from `RUST_LOG`, defaulting to debug for this crate.
pub fn init(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "econ-tui.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("econ_tui=debug,info")),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(log_dir = %log_dir.display(), "logging initialised");
    Ok(())
}
