//! Per-datagram forwarding task.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tokio::net::UdpSocket;
use tracing::Instrument;
use uuid::Uuid;

use crate::load_balancer::{Backend, BackendPool, FailurePolicy};
use crate::net::Forwarder;
use crate::observability::metrics;

/// State shared by every forwarding task.
#[derive(Debug)]
pub(crate) struct QueryContext {
    /// The listening socket; replies leave through it. Only the dispatcher
    /// keeps it alive, so an abandoned task cannot hold the port open.
    pub socket: Weak<UdpSocket>,
    pub pool: Arc<BackendPool>,
    pub forwarder: Forwarder,
    pub policy: FailurePolicy,
}

impl QueryContext {
    /// Pick a backend, applying the failure policy when none is healthy.
    fn route(&self) -> Option<Arc<Backend>> {
        if let Some(backend) = self.pool.select() {
            return Some(backend);
        }

        tracing::warn!(policy = %self.policy, "No healthy backends available");
        match self.policy {
            FailurePolicy::Closed => {
                tracing::debug!("Fail-closed: dropping query");
                None
            }
            FailurePolicy::Open => {
                let fallback = self.pool.fallback();
                if let Some(backend) = &fallback {
                    tracing::debug!(
                        backend = %backend.address(),
                        "Fail-open: attempting query with unhealthy backend"
                    );
                }
                fallback
            }
        }
    }
}

/// Forward one query and relay the reply to `client`.
///
/// Every failure stays inside this task: it is logged and counted, and the
/// client simply gets no reply.
pub(crate) async fn handle_query(ctx: Arc<QueryContext>, query: Vec<u8>, client: SocketAddr) {
    let span = tracing::info_span!("query", request_id = %Uuid::new_v4(), client = %client);

    async move {
        let Some(backend) = ctx.route() else {
            metrics::record_dropped("no_healthy_backend");
            return;
        };

        tracing::debug!(backend = %backend.address(), bytes = query.len(), "Forwarding query to backend");

        let response = match ctx.forwarder.forward(&query, &backend).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(backend = %backend.address(), error = %e, "Backend query failed");
                return;
            }
        };

        let Some(socket) = ctx.socket.upgrade() else {
            tracing::debug!(backend = %backend.address(), "Listening socket closed, discarding reply");
            return;
        };
        if let Err(e) = socket.send_to(&response, client).await {
            tracing::error!(error = %e, "Failed to send response to client");
            return;
        }

        tracing::debug!(backend = %backend.address(), bytes = response.len(), "Query handled successfully");
    }
    .instrument(span)
    .await
}
