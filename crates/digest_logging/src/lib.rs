#![deny(missing_docs)]
//! Shared logging utilities for the webset-digest workspace.
//!
//! This crate provides the `digest_*` logging macros used across the codebase,
//! the terminal/file logger setup used by the binary, and a minimal test
//! initializer for the global logger.

use std::fs::File;
use std::path::{Path, PathBuf};

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log;

/// Re-exported so callers can pick a level without depending on `log`.
pub use log::LevelFilter;

/// Default log file written by [`LogDestination::File`] and [`LogDestination::Both`].
pub const DEFAULT_LOG_FILE: &str = "./webset-digest.log";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! digest_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! digest_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! digest_info {
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! digest_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! digest_error {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to the terminal (stdout/stderr).
    #[default]
    Terminal,
    /// Write to [`DEFAULT_LOG_FILE`] in the current directory.
    File,
    /// Write to both the terminal and the log file.
    Both,
}

/// Initialize the global logger with the specified destination and level.
///
/// Returns the log file path when a file logger was installed. If the file
/// cannot be created the terminal logger is still installed (for `Both`) and
/// a warning is printed to stderr.
pub fn initialize(destination: LogDestination, level: LevelFilter) -> Option<PathBuf> {
    initialize_with_file(destination, level, Path::new(DEFAULT_LOG_FILE))
}

/// Same as [`initialize`] but with an explicit log file path.
pub fn initialize_with_file(
    destination: LogDestination,
    level: LevelFilter,
    log_path: &Path,
) -> Option<PathBuf> {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    let mut file_path = None;

    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config, log_path) {
            loggers.push(file_logger);
            file_path = Some(log_path.to_path_buf());
        }
    }
    if loggers.is_empty() {
        return None;
    }

    // A logger may already be installed (tests, repeated init); keep it.
    let _ = CombinedLogger::init(loggers);
    file_path
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
