//! Query forwarding to a single backend.
//!
//! # Responsibilities
//! - Relay one query datagram verbatim and return the reply datagram
//! - Keep the backend's attempt/failure counters accurate
//!
//! # Design Decisions
//! - Every call counts an attempt before anything can fail
//! - No internal retries; a failed forward means no reply for the client
//! - Payloads are opaque bytes and never parsed

use std::time::{Duration, Instant};

use crate::load_balancer::Backend;
use crate::net::exchange::{exchange, ExchangeError};
use crate::observability::metrics;

/// Relays queries to backends under a fixed per-query timeout.
#[derive(Debug, Clone, Copy)]
pub struct Forwarder {
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward `query` to `backend` and return its reply.
    pub async fn forward(&self, query: &[u8], backend: &Backend) -> Result<Vec<u8>, ExchangeError> {
        let start = Instant::now();
        backend.record_attempt();

        match exchange(backend.address(), query, self.timeout).await {
            Ok(response) => {
                metrics::record_query(backend.address(), "success", start);
                Ok(response)
            }
            Err(e) => {
                backend.record_failure();
                let outcome = if e.is_timeout() { "timeout" } else { "error" };
                metrics::record_query(backend.address(), outcome, start);
                Err(e)
            }
        }
    }
}
