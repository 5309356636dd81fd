//! Session logger - installs the `tracing` subscriber for the process.
//!
//! Output goes to stderr by default. With a log file the file is
//! **truncated at each launch**, so it only holds the most recent session.
//!
//! Default log location:
//!   Windows:  `%APPDATA%\GridPaint\gridpaint.log`
//!   Linux:    `~/.local/share/GridPaint/gridpaint.log`
//!   macOS:    `~/Library/Application Support/GridPaint/gridpaint.log`
//!
//! `RUST_LOG` overrides the level chosen by `verbose`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise logging. Call once, before any other work.
///
/// * `verbose` lowers the default level from `info` to `debug`.
/// * `log_file` sends output to that file (created or truncated) instead of
///   stderr. If it cannot be opened, stderr is used.
/// * Installs a panic hook that logs the panic before running the previous
///   handler.
pub fn init(verbose: bool, log_file: Option<&Path>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = log_file.and_then(|path| match open_truncated(path) {
        Ok(f) => Some(f),
        Err(e) => {
            // Can't open log file - not fatal, fall back to stderr
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    });

    let installed = match file {
        Some(f) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(f)),
            )
            .try_init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    if installed.is_err() {
        // A subscriber is already set (tests, embedding); keep it.
        return;
    }

    // Session header
    tracing::info!("=== GridPaint session started {} ===", human_timestamp());
    if let Some(path) = log_file {
        tracing::info!("Log file: {}", path.display());
    }

    // Install panic hook - logs panic info, then runs the previous handler
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {}", info);
        prev(info);
    }));
}

fn open_truncated(path: &Path) -> std::io::Result<fs::File> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Where the session log goes when `--log-file` is given without a path.
/// Uses the temp directory when no per-user data directory is known.
pub fn default_log_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("GridPaint")
        .join("gridpaint.log")
}

/// A non-empty environment variable as a path.
fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Per-user data directory (without the app sub-folder).
fn data_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        env_path("APPDATA")
    } else if cfg!(target_os = "macos") {
        env_path("HOME").map(|home| home.join("Library").join("Application Support"))
    } else {
        env_path("XDG_DATA_HOME")
            .or_else(|| env_path("HOME").map(|home| home.join(".local").join("share")))
    }
}

/// Human-readable date-time for the session header.
fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
