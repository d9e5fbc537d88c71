//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Immediate round, then periodic timer
//!     → one spawned probe per backend (probe.rs)
//!     → Backend::record_health_check with thresholds (state.rs)
//!     → one log event per transition
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Probing and transition policy are separate: the prober only reports
//! - A hung probe never delays another backend's probe
//! - Forwarding failures update counters only, never the health flag
//! - Health state is per-backend, not per-pool

pub mod active;
pub mod probe;
pub mod state;

pub use active::HealthMonitor;
pub use probe::{check_once, probe, CheckReport, ProbeError, ProbeQuery};
pub use state::{HealthThresholds, HealthTransition};
