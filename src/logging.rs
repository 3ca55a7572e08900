//! Tracing subscriber setup
//!
//! One file layer (JSON or plain text) under `logging.dir`, plus an optional
//! ANSI stdout layer. `RUST_LOG` replaces the configured level when set.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::{LoggingConfig, Rotation};

/// Targets that are too chatty at `info`
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn"];

/// Filter directive for `level`, with the noisy dependencies held at `warn`.
/// An explicit per-target directive in `level` wins over the defaults.
pub fn filter_directive(level: &str) -> String {
    let mut directives: Vec<&str> = QUIET_TARGETS
        .iter()
        .copied()
        .filter(|quiet| {
            let target = quiet.split('=').next().unwrap_or_default();
            !level
                .split(',')
                .any(|d| d.trim().starts_with(&format!("{}=", target)))
        })
        .collect();
    directives.insert(0, level.trim());
    directives.join(",")
}

fn file_appender(config: &LoggingConfig) -> anyhow::Result<RollingFileAppender> {
    let rotation = match config.rotation {
        Rotation::Never => rolling::Rotation::NEVER,
        Rotation::Hourly => rolling::Rotation::HOURLY,
        Rotation::Daily => rolling::Rotation::DAILY,
    };
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.file)
        .build(&config.dir)
        .with_context(|| format!("Failed to open log directory {}", config.dir))
}

/// Install the global subscriber. The returned guard flushes the file writer on drop.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(&config.level))
            .with_context(|| format!("Invalid log level '{}'", config.level))?,
    };

    let file_layer = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_ansi(false)
            .boxed()
    };
    let stdout_layer = config
        .stdout
        .then(|| fmt::layer().with_target(false).with_ansi(true));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}
