//! Logging setup
//!
//! Console output always goes to stderr so stdout stays clean for JSON
//! results. With a log directory, a daily rotating file is added.

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logger
///
/// `RUST_LOG` overrides `level` when set. Keep the returned guard alive for
/// the life of the process or buffered file lines are lost.
pub fn init_logger(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()?;
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, "till-printer");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}
