//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Route output to stdout or `<dir>/dnsbalancer.log`
//! - Pick the level from `RUST_LOG`, the config, or debug mode
//!
//! # Design Decisions
//! - Events carry key/value fields; rendering is the subscriber's job
//! - JSON format for log shippers, text for humans
//! - Debug mode always logs to the console

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Log file name inside the configured directory.
pub const LOG_FILE_NAME: &str = "dnsbalancer.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("failed to open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("logger already initialized: {0}")]
    Init(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where log output ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

impl LogTarget {
    pub fn resolve(config: &LoggingConfig, debug: bool) -> Self {
        match (&config.dir, debug) {
            (Some(dir), false) => LogTarget::File(Path::new(dir).join(LOG_FILE_NAME)),
            _ => LogTarget::Stdout,
        }
    }
}

/// Build the level filter. `RUST_LOG` overrides the configured level; debug
/// mode overrides both.
pub fn build_filter(config: &LoggingConfig, debug: bool) -> Result<EnvFilter, ParseError> {
    if debug {
        return EnvFilter::try_new("debug");
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level),
    }
}

/// Install the global subscriber. Returns where logs are written.
pub fn init_logging(config: &LoggingConfig, debug: bool) -> Result<LogTarget, LoggingError> {
    let filter = build_filter(config, debug)?;
    let target = LogTarget::resolve(config, debug);

    let layer: BoxedLayer = match &target {
        LogTarget::Stdout => format_layer(fmt::layer(), config.format),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            format_layer(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false), config.format)
        }
    };

    tracing_subscriber::registry().with(layer).with(filter).try_init()?;

    match &target {
        LogTarget::Stdout if debug => tracing::info!("Logging to console (debug mode)"),
        LogTarget::Stdout => {}
        LogTarget::File(path) => tracing::info!(file = %path.display(), "Logging to file"),
    }
    Ok(target)
}

fn format_layer<W>(
    layer: fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, W>,
    format: LogFormat,
) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn open_log_file(path: &Path) -> Result<fs::File, LoggingError> {
    let io_error = |source: std::io::Error| LoggingError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)
}
