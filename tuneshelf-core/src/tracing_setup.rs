//! Tracing setup for Tuneshelf
//!
//! Console output follows the level the user picked. A second layer writes
//! every Tuneshelf event to a per-run log file so a search session can be
//! replayed generation by generation after the fact.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Directory used when the caller does not pick one.
pub const DEFAULT_LOGS_DIR: &str = "logs";

const LOG_FILE_NAME: &str = "tuneshelf-last-run.log";

// HTTP client internals stay at info in the file; our crates log everything.
const FILE_DIRECTIVES: &str = "info,tuneshelf_core=trace,tuneshelf_search=trace,tuneshelf=trace";

/// Path of the run log inside `logs_dir`.
pub fn log_file_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(LOG_FILE_NAME)
}

/// Installs the global subscriber: console at `console_level`, run log at trace.
///
/// `RUST_LOG` overrides the console level when set. The run log in
/// `logs_dir` (default `./logs`) is truncated on every call.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Log directory or file cannot be created,
///   or a global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = logs_dir.unwrap_or_else(|| Path::new(DEFAULT_LOGS_DIR));
    create_dir_all(logs_dir)?;

    let path = log_file_path(logs_dir);
    let file = File::create(&path)?;

    tracing_subscriber::registry()
        .with(console_layer(console_level))
        .with(file_layer(file))
        .try_init()?;

    tracing::info!(console = %console_level, run_log = %path.display(), "Tracing initialized");
    Ok(())
}

fn console_layer<S>(level: Level) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .with_writer(file)
        .with_filter(EnvFilter::new(FILE_DIRECTIVES))
}

/// Console verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogLevel {
    Error,
    /// Failed sections and searches
    Warn,
    /// Accepted queries, settled searches, loaded sections
    Info,
    /// Cancellations and discarded stale results
    Debug,
    /// Every phase change and request
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use tuneshelf_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Debug.as_tracing_level(), tracing::Level::DEBUG);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::str::FromStr for CliLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| format!("Invalid log level: {s}"))
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_tracing_level().as_str().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARN".parse::<CliLogLevel>(), Ok(CliLogLevel::Warn));
        assert_eq!("trace".parse::<CliLogLevel>(), Ok(CliLogLevel::Trace));
        assert!("verbose".parse::<CliLogLevel>().is_err());
        assert_eq!(CliLogLevel::Debug.to_string(), "debug");
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
    }

    #[test]
    fn test_init_tracing_creates_run_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let logs_dir = temp_dir.path().join("nested").join("logs");

        init_tracing(Level::WARN, Some(&logs_dir)).unwrap();

        assert!(log_file_path(&logs_dir).exists());
        assert!(init_tracing(Level::WARN, Some(&logs_dir)).is_err());
    }
}
