//! Datagram dispatcher.
//!
//! # Responsibilities
//! - Own the listening socket and the accept loop
//! - Spawn one independent forwarding task per datagram
//! - Start the health monitor and coordinate graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::config::BalancerConfig;
use crate::health::HealthMonitor;
use crate::lifecycle::{InFlight, Shutdown, ShutdownSignal, StartupError};
use crate::load_balancer::{BackendPool, FailurePolicy};
use crate::net::{Forwarder, Listener, MAX_DATAGRAM_SIZE};
use crate::server::handler::{handle_query, QueryContext};

/// How shutdown went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Forwarding tasks still running when the grace period ran out.
    pub abandoned: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0
    }
}

/// The bound, ready-to-run load balancer.
pub struct Dispatcher {
    listener: Listener,
    pool: Arc<BackendPool>,
    forwarder: Forwarder,
    policy: FailurePolicy,
    monitor: Option<HealthMonitor>,
    shutdown_grace: Duration,
}

impl Dispatcher {
    /// Register backends, prepare the health monitor and bind the listener.
    ///
    /// Expects a validated configuration.
    pub async fn bind(config: &BalancerConfig) -> Result<Self, StartupError> {
        let pool = Arc::new(BackendPool::new(&config.backends));

        let monitor = if config.health_check.enabled {
            tracing::info!("Health checking enabled");
            Some(HealthMonitor::new(pool.clone(), config.health_check.clone())?)
        } else {
            tracing::info!("Active health checks disabled");
            None
        };

        let listener = Listener::bind(&config.listener).await?;

        Ok(Self {
            listener,
            pool,
            forwarder: Forwarder::new(config.timeouts.query()),
            policy: config.fail_behavior,
            monitor,
            shutdown_grace: config.timeouts.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    /// Serve until `shutdown` triggers, then drain in-flight queries.
    pub async fn run(self, shutdown: Shutdown) -> ShutdownReport {
        let Dispatcher {
            listener,
            pool,
            forwarder,
            policy,
            monitor,
            shutdown_grace,
        } = self;

        if let Some(monitor) = monitor {
            tokio::spawn(monitor.run(shutdown.subscribe()));
        }

        tracing::info!(
            address = %listener.local_addr(),
            backends = pool.len(),
            fail_behavior = %policy,
            timeout_ms = forwarder.timeout().as_millis() as u64,
            "DNS load balancer started"
        );

        let in_flight = InFlight::new();
        let ctx = Arc::new(QueryContext {
            socket: Arc::downgrade(listener.socket()),
            pool: pool.clone(),
            forwarder,
            policy,
        });

        accept_loop(listener.socket(), &ctx, &in_flight, shutdown.subscribe()).await;

        tracing::info!(
            in_flight = in_flight.count(),
            grace_ms = shutdown_grace.as_millis() as u64,
            "Shutting down DNS load balancer"
        );

        // No more reads. The socket stays open through the grace period so
        // draining tasks can still reply, and closes right after it.
        drop(ctx);
        let abandoned = in_flight.wait_idle(shutdown_grace).await;
        drop(listener);

        if abandoned == 0 {
            tracing::info!("Graceful shutdown complete");
        } else {
            tracing::warn!(abandoned, "Shutdown timeout reached, abandoning in-flight queries");
        }

        for backend in pool.all_backends() {
            let stats = backend.stats();
            tracing::info!(
                backend = %stats.address,
                healthy = stats.healthy,
                total_requests = stats.total_requests,
                total_failures = stats.total_failures,
                "Backend totals"
            );
        }

        ShutdownReport { abandoned }
    }
}

async fn accept_loop(
    socket: &UdpSocket,
    ctx: &Arc<QueryContext>,
    in_flight: &InFlight,
    mut shutdown: ShutdownSignal,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => break,
            received = socket.recv_from(&mut buffer) => {
                match received {
                    Ok((n, client)) => {
                        let query = buffer[..n].to_vec();
                        let guard = in_flight.track();
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            let _guard = guard;
                            handle_query(ctx, query, client).await;
                        });
                    }
                    Err(e) => {
                        // Includes ICMP errors from earlier replies; the
                        // socket itself stays usable.
                        tracing::error!(error = %e, "Error reading from UDP socket");
                    }
                }
            }
        }
    }
}
