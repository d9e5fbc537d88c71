//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered set of backends, fixed for the process lifetime
//! - Apply round-robin selection over healthy backends
//! - Name the fallback backend used by the fail-open policy

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// Ordered backends plus the shared rotation cursor.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    selector: RoundRobin,
}

impl BackendPool {
    /// Create a pool from configuration, preserving configured order.
    pub fn new(configs: &[BackendConfig]) -> Self {
        let backends = configs
            .iter()
            .map(|config| {
                tracing::info!(backend = %config.address, "Registered backend");
                Arc::new(Backend::new(config.address.clone()))
            })
            .collect();

        Self {
            backends,
            selector: RoundRobin::new(),
        }
    }

    /// Select the next healthy backend, or `None` if all are unhealthy.
    pub fn select(&self) -> Option<Arc<Backend>> {
        let selected = self.selector.next_server(&self.backends);
        if selected.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No healthy backends in pool");
        }
        selected
    }

    /// The designated backend for fail-open routing: the first configured.
    pub fn fallback(&self) -> Option<Arc<Backend>> {
        self.backends.first().cloned()
    }

    /// All backends in rotation order (for health checking and reporting).
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
