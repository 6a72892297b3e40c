//! Tracing setup
//!
//! Installs the global subscriber once per process. Embedding applications
//! that bring their own subscriber simply never call this.

use crate::config::{LogFormat, LoggingConfig};
use anyhow::Context;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Initialize tracing subscriber for structured logging
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    INITIALIZED
        .get_or_try_init(|| {
            let env_filter = EnvFilter::try_new(&config.filter)
                .with_context(|| format!("Invalid log filter '{}'", config.filter))?;

            let (compact, json) = match config.format {
                LogFormat::Compact => (
                    Some(
                        fmt::layer()
                            .with_target(true)
                            .with_level(true)
                            .with_thread_ids(true)
                            .with_file(true)
                            .with_line_number(true)
                            .compact(),
                    ),
                    None,
                ),
                LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(false))),
            };

            tracing_subscriber::registry()
                .with(env_filter)
                .with(compact)
                .with(json)
                .try_init()
                .context("Global tracing subscriber already set")
        })
        .map(|_| ())
}
