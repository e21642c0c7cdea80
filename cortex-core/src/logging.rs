//! Structured logging to a single file
//!
//! Hooks are short-lived processes whose stdout belongs to Claude Code, so
//! every record goes to [`Config::log_path`] (`$XDG_STATE_HOME/cortex/cortex.log`).
//! The file is appended to and never rotated. `RUST_LOG` overrides the
//! configured level.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

/// Flushes buffered log records when dropped; hold it for the process lifetime.
#[must_use = "dropping the guard stops log output"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Install the file subscriber.
///
/// A subscriber already installed in this process is left in place.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    init_at(&Config::log_path(), config)
}

fn init_at(log_path: &Path, config: &LoggingConfig) -> Result<LoggingGuard> {
    let (dir, file_name) = match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(name)) => (dir, name),
        _ => {
            return Err(Error::Config(format!(
                "invalid log path {}",
                log_path.display()
            )))
        }
    };
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(path = %log_path.display(), level = %config.level, "Logging to file");
    }
    Ok(LoggingGuard { _worker: worker })
}

/// Route logs to the test harness output; safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer()
        .try_init();
}
