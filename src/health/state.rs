//! Backend health state machine.
//!
//! # States
//! - Healthy: backend receives traffic
//! - Unhealthy: backend excluded from load balancing
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= failure_threshold
//! Unhealthy → Healthy: consecutive successes >= success_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Exactly one transition event per crossing, never one per probe
//! - Counters reset on the opposite outcome, not on transition

use crate::config::HealthCheckConfig;

/// Consecutive-outcome thresholds applied by [`Backend::record_health_check`].
///
/// [`Backend::record_health_check`]: crate::load_balancer::backend::Backend::record_health_check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Consecutive failed probes before a healthy backend is marked unhealthy.
    pub failure: u32,
    /// Consecutive successful probes before an unhealthy backend recovers.
    pub success: u32,
}

impl HealthThresholds {
    pub fn new(failure: u32, success: u32) -> Self {
        Self { failure, success }
    }
}

impl From<&HealthCheckConfig> for HealthThresholds {
    fn from(config: &HealthCheckConfig) -> Self {
        Self::new(config.failure_threshold, config.success_threshold)
    }
}

/// Result of recording one health check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTransition {
    /// True only for the probe that crossed a threshold.
    pub changed: bool,
    /// Health flag after the update.
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

impl HealthTransition {
    pub fn recovered(&self) -> bool {
        self.changed && self.healthy
    }

    pub fn failed(&self) -> bool {
        self.changed && !self.healthy
    }
}
