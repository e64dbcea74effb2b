//! Logging infrastructure for reqrank.
//!
//! Log lines go to a daily-rotated file in the platform state directory so
//! they never draw over the terminal UI.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

const LOG_FILE_PREFIX: &str = "reqrank";
const RETENTION_DAYS: u64 = 7;

/// Handle for swapping the active filter once config is loaded.
pub type ReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Result of initializing the logging system.
pub struct LoggingContext {
    /// Guard that must be held for the application lifetime to ensure logs are flushed.
    pub _guard: WorkerGuard,
    /// The session ID for this invocation.
    pub session_id: String,
    /// The directory where logs are written.
    pub log_directory: PathBuf,
    pub reload_handle: ReloadHandle,
}

/// Error that occurred during logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to determine log directory")]
    NoLogDirectory,

    #[error("Failed to create log directory: {0}")]
    CreateDirectory(#[source] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Generates a 6-character random hex session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let bytes: [u8; 3] = rng.random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Platform log directory.
///
/// macOS: ~/Library/Logs/reqrank/
/// Linux: ~/.local/state/reqrank/
/// Windows: %LocalAppData%\reqrank\
fn log_directory() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        return dirs_home_log_dir();
    }
    let project_dirs = ProjectDirs::from("dev", "reqrank", "reqrank")?;
    project_dirs
        .state_dir()
        .map(PathBuf::from)
        .or_else(|| Some(project_dirs.data_local_dir().to_path_buf()))
}

/// Gets the macOS ~/Library/Logs/reqrank/ directory.
fn dirs_home_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library").join("Logs").join(LOG_FILE_PREFIX))
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `default_level`. The returned
/// `WorkerGuard` must be held for the application lifetime.
pub fn init(default_level: &str) -> Result<LoggingContext, LoggingError> {
    let session_id = generate_session_id();

    let log_dir = log_directory().ok_or(LoggingError::NoLogDirectory)?;
    fs::create_dir_all(&log_dir).map_err(LoggingError::CreateDirectory)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let (filter_layer, reload_handle) = reload::Layer::new(env_filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    info!(session_id = %session_id, "session_start");

    Ok(LoggingContext {
        _guard: guard,
        session_id,
        log_directory: log_dir,
        reload_handle,
    })
}

/// Switch to the configured level. Ignored when `RUST_LOG` is set.
pub fn set_level(handle: &ReloadHandle, level: &str) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        debug!("RUST_LOG set, keeping environment filter");
        return;
    }
    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            warn!(level = %level, error = %e, "invalid_log_level");
            return;
        }
    };
    match handle.reload(filter) {
        Ok(()) => debug!(level = %level, "log_level_changed"),
        Err(e) => warn!(error = %e, "log_level_reload_failed"),
    }
}

/// Whether a file name is one of our rotated log files.
fn is_log_file(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_PREFIX)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

/// Cleans up log files older than the retention period.
///
/// Errors are logged at WARN level but don't prevent app startup.
pub fn cleanup_old_logs(log_dir: &Path) {
    cleanup_logs_older_than(
        log_dir,
        Duration::from_secs(RETENTION_DAYS * 24 * 60 * 60),
        SystemTime::now(),
    );
}

fn cleanup_logs_older_than(log_dir: &Path, retention: Duration, now: SystemTime) -> u32 {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to read log directory for cleanup");
            return 0;
        }
    };

    let mut deleted_count = 0u32;

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_log_file(name) => name.to_string(),
            _ => continue,
        };

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Failed to get modification time for log file");
                continue;
            }
        };

        // Files dated in the future are left alone
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };

        if age > retention {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(file = %file_name, age_days = age.as_secs() / 86400, "Deleted old log file");
                    deleted_count += 1;
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to delete old log file");
                }
            }
        }
    }

    if deleted_count > 0 {
        debug!(count = deleted_count, "Log cleanup completed");
    }
    deleted_count
}
