//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics → backends + health monitor → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting + stop health rounds
//!     → wait for in-flight queries (bounded) → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - One shutdown signal, observed independently by each long-lived loop
//! - Shutdown has timeout: in-flight work is abandoned after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{InFlight, InFlightGuard, Shutdown, ShutdownSignal};
pub use startup::{load_config, serve, LoadedConfig, Overrides, StartupError};
