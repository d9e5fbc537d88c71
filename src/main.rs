//! dnsbalancer: UDP DNS load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 DNS BALANCER                  │
//!                        │                                              │
//!     Client query       │  ┌──────────┐    ┌────────────┐              │
//!     ───────────────────┼─▶│   net    │───▶│   server   │              │
//!                        │  │ listener │    │ dispatcher │              │
//!                        │  └──────────┘    └─────┬──────┘              │
//!                        │                        ▼                     │
//!                        │                 ┌──────────────┐             │
//!                        │                 │load_balancer │             │
//!                        │                 │ pool + rr    │             │
//!                        │                 └──────┬───────┘             │
//!                        │                        ▼                     │
//!     Client reply       │  ┌──────────┐    ┌──────────────┐            │
//!     ◀──────────────────┼──│ listener │◀───│  forwarder   │◀───────────┼──── Backend
//!                        │  └──────────┘    └──────────────┘            │     resolver
//!                        │                                              │
//!                        │  config · health monitor · lifecycle ·       │
//!                        │  observability (logging, metrics)            │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use dns_balancer::config::loader::{find_config_file, load_config, load_or_default, save_example};
use dns_balancer::config::BalancerConfig;
use dns_balancer::health::{check_once, ProbeQuery};
use dns_balancer::lifecycle::{self, startup, Overrides};
use dns_balancer::load_balancer::Backend;

#[derive(Parser)]
#[command(name = "dnsbalancer")]
#[command(about = "UDP DNS load balancer with active health checks", long_about = None)]
struct Cli {
    /// Config file (default: ./config.toml, then /etc/dnsbalancer/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level to the console
    #[arg(short, long, global = true)]
    debug: bool,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load balancer
    Serve {
        /// Listen address, overrides the config
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Validate a config file
    Validate,
    /// Probe every configured backend once
    Healthcheck {
        /// Probe timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Query name, overrides the config
        #[arg(long)]
        query: Option<String>,
        /// Query type, overrides the config
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write an example config file
    Genconfig {
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { listen } => serve(&cli, listen.clone()).await,
        Commands::Validate => validate(&cli),
        Commands::Healthcheck {
            timeout_ms,
            query,
            record_type,
            json,
        } => {
            let probe_query = (query.clone(), record_type.clone());
            healthcheck(&cli, *timeout_ms, probe_query, *json).await
        }
        Commands::Genconfig { output, force } => genconfig(output, *force),
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(cli: &Cli, listen: Option<String>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let overrides = Overrides {
        config: cli.config.clone(),
        listen,
        log_level: cli.log_level.clone(),
    };
    let loaded = match startup::load_config(&overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    startup::init_logging(&loaded, cli.debug)?;

    let config = loaded.config;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        fail_behavior = %config.fail_behavior,
        query_timeout_ms = config.timeouts.query_ms,
        health_checks = config.health_check.enabled,
        "dnsbalancer starting"
    );

    let report = lifecycle::serve(config).await?;
    tracing::info!(abandoned = report.abandoned, "Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

fn validate(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(path) = find_config_file(cli.config.as_deref()) else {
        eprintln!("no config file found; pass --config PATH");
        return Ok(ExitCode::FAILURE);
    };

    match load_config(&path) {
        Ok(config) => {
            println!("VALID: {}", path.display());
            print_summary(&config);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("INVALID: {}", path.display());
            println!("  {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(config: &BalancerConfig) {
    println!("  listen:        {}", config.listener.bind_address);
    println!("  fail behavior: {}", config.fail_behavior);
    println!("  query timeout: {}ms", config.timeouts.query_ms);
    if config.health_check.enabled {
        println!(
            "  health checks: every {}ms, {} {}",
            config.health_check.interval_ms, config.health_check.query_name, config.health_check.query_type
        );
    } else {
        println!("  health checks: disabled");
    }
    println!("  backends:");
    for backend in &config.backends {
        println!("    - {}", backend.address);
    }
}

async fn healthcheck(
    cli: &Cli,
    timeout_ms: Option<u64>,
    (query, record_type): (Option<String>, Option<String>),
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let path = find_config_file(cli.config.as_deref());
    let config = load_or_default(path.as_deref())?;
    if config.backends.is_empty() {
        eprintln!("no backends configured");
        return Ok(ExitCode::FAILURE);
    }

    let health = &config.health_check;
    let probe_query = ProbeQuery::new(
        query.as_deref().unwrap_or(&health.query_name),
        record_type.as_deref().unwrap_or(&health.query_type),
    )?;
    let timeout = timeout_ms.map(Duration::from_millis).unwrap_or_else(|| health.timeout());

    let backends: Vec<Backend> = config
        .backends
        .iter()
        .map(|b| Backend::new(b.address.clone()))
        .collect();

    let reports = join_all(backends.iter().map(|backend| check_once(backend, &probe_query, timeout))).await;
    let failed = reports.iter().filter(|report| !report.stats.healthy).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let address = &report.stats.address;
            match &report.error {
                None => println!("OK      {:<24} {}ms", address, report.latency_ms),
                Some(e) => println!("FAILED  {:<24} {}ms  {}", address, report.latency_ms, e),
            }
        }
    }

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn genconfig(output: &Path, force: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if output.exists() && !force {
        eprintln!("{} already exists; use --force to overwrite", output.display());
        return Ok(ExitCode::FAILURE);
    }
    save_example(output)?;
    println!("Wrote example config to {}", output.display());
    Ok(ExitCode::SUCCESS)
}
