//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply command-line overrides
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics exporter, health checks)
//! - Bind the listener and begin accepting traffic
//! - Translate OS signals into the shutdown trigger
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and never retried
//! - Listener binds last (traffic only when ready)

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::loader::{find_config_file, load_or_default};
use crate::config::validation::validate_config;
use crate::config::{BalancerConfig, ConfigError};
use crate::health::ProbeError;
use crate::lifecycle::{signals, Shutdown};
use crate::net::ListenerError;
use crate::observability::logging::{self, LogTarget, LoggingError};
use crate::observability::metrics;
use crate::server::{Dispatcher, ShutdownReport};

/// Errors that stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to setup logger: {0}")]
    Logging(#[from] LoggingError),

    #[error("failed to start server: {0}")]
    Listener(#[from] ListenerError),

    #[error("invalid health check query: {0}")]
    Probe(#[from] ProbeError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub listen: Option<String>,
    pub log_level: Option<String>,
}

/// A validated configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BalancerConfig,
    pub path: Option<PathBuf>,
}

/// Locate and load the config file (defaults when there is none), apply
/// overrides, then validate the result.
pub fn load_config(overrides: &Overrides) -> Result<LoadedConfig, StartupError> {
    let path = find_config_file(overrides.config.as_deref()).filter(|p| p.exists());
    let mut config = load_or_default(path.as_deref())?;

    if let Some(listen) = &overrides.listen {
        config.listener.bind_address = listen.clone();
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(LoadedConfig { config, path })
}

/// Install the global logger and report where the configuration came from.
pub fn init_logging(loaded: &LoadedConfig, debug: bool) -> Result<LogTarget, StartupError> {
    let target = logging::init_logging(&loaded.config.logging, debug)?;

    match loaded.path.as_deref().map(Path::display) {
        Some(file) => tracing::info!(file = %file, "Configuration loaded"),
        None => tracing::info!("No config file found, using defaults"),
    }
    Ok(target)
}

/// Run the balancer until SIGINT/SIGTERM, then shut down gracefully.
pub async fn serve(config: BalancerConfig) -> Result<ShutdownReport, StartupError> {
    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Dispatcher::bind(&config).await?;
    let shutdown = Shutdown::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match signals::wait_for_termination().await {
            Ok(signal) => tracing::info!(
                signal,
                subscribers = trigger.receiver_count(),
                "Received shutdown signal"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to listen for signals, shutting down"),
        }
        trigger.trigger();
    });

    Ok(dispatcher.run(shutdown).await)
}
