//! Process-wide tracing setup.
//!
//! Called once from `main` after the config is loaded. `RUST_LOG` overrides
//! the configured level.

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_LOG_FILE, DebugSettings};
use crate::error::ConfigError;

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    pub fn for_settings(debug: &DebugSettings) -> Self {
        if debug.debug {
            LogTarget::File(
                debug
                    .log_file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            )
        } else {
            LogTarget::Stderr
        }
    }
}

/// Keeps the background log writer alive; drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
}

fn log_error(path: &Path, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: "debug.log_file".into(),
        message: format!("{}: {message}", path.display()),
    }
}

/// Install the global subscriber described by `debug`.
pub fn init(debug: &DebugSettings) -> Result<LogGuard, ConfigError> {
    let filter = env_filter(debug.level);

    match LogTarget::for_settings(debug) {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
            Ok(LogGuard { _worker: None })
        }
        LogTarget::File(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| log_error(&path, "not a file path"))?;

            std::fs::create_dir_all(dir).map_err(|e| log_error(&path, e))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(dir)
                .map_err(|e| log_error(&path, e))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            Ok(LogGuard {
                _worker: Some(guard),
            })
        }
    }
}

/// Stderr logging at INFO, for failures before the config is available.
pub fn init_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(Level::INFO))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
