//! Shared utilities for integration tests.

#![allow(dead_code)]

use hickory_proto::op::{Message, MessageType, ResponseCode};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use dns_balancer::config::{BackendConfig, BalancerConfig};
use dns_balancer::load_balancer::BackendPool;
use dns_balancer::server::{Dispatcher, ShutdownReport};
use dns_balancer::Shutdown;

/// A UDP backend on an ephemeral port.
///
/// DNS queries (health probes) get an empty NOERROR answer. Any other
/// payload is echoed back prefixed with `<tag>:`, so tests can tell which
/// backend served a request. While dead, or when silent, nothing is answered.
pub struct MockBackend {
    pub addr: SocketAddr,
    alive: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub async fn start(tag: &'static str) -> Self {
        Self::spawn(Some(tag)).await
    }

    /// Receives and counts datagrams but never replies.
    pub async fn silent() -> Self {
        Self::spawn(None).await
    }

    async fn spawn(tag: Option<&'static str>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let alive = Arc::new(AtomicBool::new(true));
        let hits = Arc::new(AtomicUsize::new(0));

        let (alive_rx, hits_rx) = (alive.clone(), hits.clone());
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
                hits_rx.fetch_add(1, Ordering::SeqCst);
                let Some(tag) = tag else { continue };
                if !alive_rx.load(Ordering::SeqCst) {
                    continue;
                }
                let reply = answer(tag, &buf[..n]);
                let _ = socket.send_to(&reply, peer).await;
            }
        });

        Self { addr, alive, hits }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Datagrams received so far, probes included.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn answer(tag: &str, payload: &[u8]) -> Vec<u8> {
    match Message::from_vec(payload) {
        Ok(query) if query.message_type() == MessageType::Query => {
            let mut response = Message::new();
            response
                .set_id(query.id())
                .set_message_type(MessageType::Response)
                .set_op_code(query.op_code())
                .set_response_code(ResponseCode::NoError)
                .add_queries(query.queries().to_vec());
            response.to_vec().unwrap()
        }
        _ => {
            let mut reply = format!("{}:", tag).into_bytes();
            reply.extend_from_slice(payload);
            reply
        }
    }
}

/// Loopback config with an ephemeral listener and health checks off.
pub fn test_config(backends: &[&MockBackend]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.query_ms = 500;
    config.timeouts.shutdown_grace_ms = 1000;
    config.health_check.enabled = false;
    config.backends = backends
        .iter()
        .map(|b| BackendConfig::new(b.address()))
        .collect();
    config
}

/// A balancer running in the background.
pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub pool: Arc<BackendPool>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<ShutdownReport>,
}

impl RunningBalancer {
    pub async fn start(config: &BalancerConfig) -> Self {
        let dispatcher = Dispatcher::bind(config).await.unwrap();
        let addr = dispatcher.local_addr();
        let pool = dispatcher.pool();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(dispatcher.run(shutdown.clone()));
        Self {
            addr,
            pool,
            shutdown,
            handle,
        }
    }

    /// Trigger shutdown and wait for the report.
    pub async fn stop(self) -> ShutdownReport {
        self.shutdown.trigger();
        self.handle.await.unwrap()
    }
}

/// Send one datagram from a fresh client socket and wait for a reply.
pub async fn send_query(target: SocketAddr, payload: &[u8], wait: Duration) -> Option<Vec<u8>> {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(payload, target).await.unwrap();
    let mut buf = vec![0u8; 4096];
    match tokio::time::timeout(wait, client.recv_from(&mut buf)).await {
        Ok(Ok((n, _))) => Some(buf[..n].to_vec()),
        _ => None,
    }
}

/// Poll `condition` every 20ms until it holds or `limit` passes.
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
