//! Logging configuration using tracing

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

const LOG_FILE_PREFIX: &str = "portside.log";

/// Initialize the logging subsystem in the default location.
///
/// Logs roll daily under `~/.local/share/portside/logs/`; the level is
/// controlled by the `PORTSIDE_LOG` environment variable (`info` for this
/// crate family and `warn` for everything else when unset).
///
/// # Examples
/// ```bash
/// PORTSIDE_LOG=debug cargo run
/// PORTSIDE_LOG=portside_engine=trace cargo run
/// ```
pub fn init() -> Result<()> {
    init_with_directory(default_log_directory())
}

/// Initialize the logging subsystem with logs under the given directory.
///
/// Hosts that embed the engine can point this at their own data directory
/// instead of the Portside default.
pub fn init_with_directory(log_dir: impl AsRef<Path>) -> Result<()> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let env_filter = EnvFilter::try_from_env("PORTSIDE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("portside=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("Logging to {}", log_dir.display());
    Ok(())
}

/// Default log directory under the user's local data directory.
pub fn default_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("portside").join("logs")
}
