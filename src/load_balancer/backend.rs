//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream DNS server
//! - Track health state (Healthy/Unhealthy) with hysteresis
//! - Track request and failure counters for observability
//!
//! All mutable fields live behind one mutex so that every update (counters,
//! streaks, timestamps, health flag) is applied as a unit.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::health::state::{HealthThresholds, HealthTransition};

#[derive(Debug)]
struct BackendState {
    healthy: bool,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_checked_at: Option<SystemTime>,
    last_failed_at: Option<SystemTime>,
    total_requests: u64,
    total_failures: u64,
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    address: String,
    state: Mutex<BackendState>,
}

/// Point-in-time copy of a backend's state.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStats {
    pub address: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_checked_at: Option<SystemTime>,
    pub last_failed_at: Option<SystemTime>,
    pub total_requests: u64,
    pub total_failures: u64,
}

impl Backend {
    /// Create a new backend. Backends start out healthy.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: Mutex::new(BackendState {
                healthy: true,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_checked_at: None,
                last_failed_at: None,
                total_requests: 0,
                total_failures: 0,
            }),
        }
    }

    /// The `host:port` this backend answers on.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        // Every critical section is a plain group of assignments, so a
        // poisoned lock still holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_healthy(&self) -> bool {
        self.lock().healthy
    }

    /// Count one forwarded query, whatever its outcome.
    pub fn record_attempt(&self) {
        self.lock().total_requests += 1;
    }

    /// Count one failed forward.
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.total_failures += 1;
        state.last_failed_at = Some(SystemTime::now());
    }

    /// Record the outcome of one health probe and apply the thresholds.
    pub fn record_health_check(
        &self,
        success: bool,
        thresholds: &HealthThresholds,
    ) -> HealthTransition {
        let mut state = self.lock();
        let now = SystemTime::now();
        state.last_checked_at = Some(now);

        let mut changed = false;
        if success {
            state.consecutive_successes = state.consecutive_successes.saturating_add(1);
            state.consecutive_failures = 0;

            if !state.healthy && state.consecutive_successes >= thresholds.success {
                state.healthy = true;
                changed = true;
            }
        } else {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            state.consecutive_successes = 0;
            state.last_failed_at = Some(now);

            if state.healthy && state.consecutive_failures >= thresholds.failure {
                state.healthy = false;
                changed = true;
            }
        }

        HealthTransition {
            changed,
            healthy: state.healthy,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
        }
    }

    pub fn stats(&self) -> BackendStats {
        let state = self.lock();
        BackendStats {
            address: self.address.clone(),
            healthy: state.healthy,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            last_checked_at: state.last_checked_at,
            last_failed_at: state.last_failed_at,
            total_requests: state.total_requests,
            total_failures: state.total_failures,
        }
    }
}
