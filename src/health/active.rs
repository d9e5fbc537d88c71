//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Update backend health state based on results

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{probe, ProbeError, ProbeQuery};
use crate::health::state::HealthThresholds;
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

/// Everything one probe task needs, cloned cheaply into each task.
#[derive(Debug, Clone)]
struct ProbePlan {
    query: ProbeQuery,
    timeout: Duration,
    thresholds: HealthThresholds,
}

pub struct HealthMonitor {
    backends: Arc<BackendPool>,
    config: HealthCheckConfig,
    plan: Arc<ProbePlan>,
}

impl HealthMonitor {
    pub fn new(backends: Arc<BackendPool>, config: HealthCheckConfig) -> Result<Self, ProbeError> {
        let plan = ProbePlan {
            query: ProbeQuery::new(&config.query_name, &config.query_type)?,
            timeout: config.timeout(),
            thresholds: HealthThresholds::from(&config),
        };

        Ok(Self {
            backends,
            config,
            plan: Arc::new(plan),
        })
    }

    /// Probe every backend now, then once per interval, until shutdown.
    ///
    /// Rounds already in flight when shutdown arrives are left to finish on
    /// their own; each probe is bounded by the probe timeout.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            failure_threshold = self.config.failure_threshold,
            success_threshold = self.config.success_threshold,
            query = %self.plan.query.name(),
            query_type = %self.plan.query.record_type(),
            "Health monitor started"
        );

        // The first tick completes immediately.
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all();
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        tracing::info!("Health monitor stopped");
    }

    /// Start one independent probe task per backend.
    fn check_all(&self) {
        for backend in self.backends.all_backends() {
            let backend = backend.clone();
            let plan = self.plan.clone();
            tokio::spawn(async move {
                check_backend(&backend, &plan).await;
            });
        }
    }
}

async fn check_backend(backend: &Backend, plan: &ProbePlan) {
    let result = probe(backend, &plan.query, plan.timeout).await;
    let success = result.is_ok();

    if let Err(e) = &result {
        tracing::debug!(backend = %backend.address(), error = %e, "Health check failed");
    }
    metrics::record_health_check(backend.address(), success);

    let transition = backend.record_health_check(success, &plan.thresholds);

    if transition.recovered() {
        tracing::info!(
            backend = %backend.address(),
            consecutive_successes = transition.consecutive_successes,
            "Backend recovered and marked healthy"
        );
    } else if transition.failed() {
        tracing::warn!(
            backend = %backend.address(),
            consecutive_failures = transition.consecutive_failures,
            "Backend marked unhealthy"
        );
    } else if !success {
        tracing::debug!(
            backend = %backend.address(),
            consecutive_failures = transition.consecutive_failures,
            "Health check failed but threshold not reached"
        );
    }

    metrics::record_backend_health(backend.address(), transition.healthy);
}
