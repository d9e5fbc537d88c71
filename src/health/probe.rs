//! DNS liveness probe.
//!
//! # Responsibilities
//! - Build one well-formed query for the configured name and type
//! - Exchange it with a backend under the probe timeout
//! - Decide alive/dead from the reply's structure, not its content
//!
//! # Design Decisions
//! - NXDOMAIN counts as alive: the server answered correctly
//! - The reply must be a response carrying our message ID
//! - The prober only reports; it never touches backend state

use hickory_proto::error::ProtoError;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use serde::Serialize;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::health::state::HealthThresholds;
use crate::load_balancer::{Backend, BackendStats};
use crate::net::exchange::{exchange, ExchangeError};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe query name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: ProtoError,
    },

    #[error("unsupported probe query type '{0}'")]
    InvalidType(String),

    #[error("failed to encode probe query: {0}")]
    Encode(#[source] ProtoError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("invalid DNS response: {0}")]
    Malformed(#[source] ProtoError),

    #[error("reply is not a DNS response")]
    NotAResponse,

    #[error("reply id {actual} does not match query id {expected}")]
    IdMismatch { expected: u16, actual: u16 },

    #[error("DNS error response: {0}")]
    ErrorResponse(ResponseCode),
}

/// The question a probe asks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeQuery {
    name: Name,
    record_type: RecordType,
}

impl ProbeQuery {
    /// Parse a query name (made fully qualified) and a record type mnemonic.
    pub fn new(name: &str, record_type: &str) -> Result<Self, ProbeError> {
        let fqdn = if name.ends_with('.') {
            name.to_string()
        } else {
            format!("{}.", name)
        };
        let name = Name::from_ascii(&fqdn).map_err(|source| ProbeError::InvalidName {
            name: name.to_string(),
            source,
        })?;

        let record_type = RecordType::from_str(&record_type.to_ascii_uppercase())
            .map_err(|_| ProbeError::InvalidType(record_type.to_string()))?;

        Ok(Self { name, record_type })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    fn build(&self, id: u16) -> Message {
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(self.name.clone(), self.record_type));
        message
    }
}

/// Probe `backend` once. `Ok(())` means the backend is alive.
pub async fn probe(backend: &Backend, query: &ProbeQuery, timeout: Duration) -> Result<(), ProbeError> {
    let id: u16 = rand::random();
    let request = query.build(id).to_vec().map_err(ProbeError::Encode)?;

    let reply = exchange(backend.address(), &request, timeout).await?;
    validate_reply(&reply, id)
}

/// Outcome of a one-off check, as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    #[serde(flatten)]
    pub stats: BackendStats,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Probe once and fold the outcome into the backend's state with no
/// hysteresis, so one failure marks it unhealthy.
pub async fn check_once(backend: &Backend, query: &ProbeQuery, timeout: Duration) -> CheckReport {
    let start = Instant::now();
    let result = probe(backend, query, timeout).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    backend.record_health_check(result.is_ok(), &HealthThresholds::new(1, 1));
    CheckReport {
        stats: backend.stats(),
        latency_ms,
        error: result.err().map(|e| e.to_string()),
    }
}

fn validate_reply(reply: &[u8], id: u16) -> Result<(), ProbeError> {
    let response = Message::from_vec(reply).map_err(ProbeError::Malformed)?;

    if response.message_type() != MessageType::Response {
        return Err(ProbeError::NotAResponse);
    }
    if response.id() != id {
        return Err(ProbeError::IdMismatch {
            expected: id,
            actual: response.id(),
        });
    }

    match response.response_code() {
        ResponseCode::NoError | ResponseCode::NXDomain => Ok(()),
        code => Err(ProbeError::ErrorResponse(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    fn reply_to(request: &[u8], code: ResponseCode, id_offset: u16) -> Vec<u8> {
        let query = Message::from_vec(request).unwrap();
        let mut response = Message::new();
        response
            .set_id(query.id().wrapping_add(id_offset))
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_response_code(code)
            .add_queries(query.queries().to_vec());
        response.to_vec().unwrap()
    }

    async fn responder<F>(respond: F) -> String
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
                let _ = socket.send_to(&respond(&buf[..n]), peer).await;
            }
        });
        addr.to_string()
    }

    fn root_ns() -> ProbeQuery {
        ProbeQuery::new(".", "NS").unwrap()
    }

    #[test]
    fn test_query_parsing() {
        let q = ProbeQuery::new("example.com", "aaaa").unwrap();
        assert_eq!(q.name().to_ascii(), "example.com.");
        assert_eq!(q.record_type(), RecordType::AAAA);

        assert!(root_ns().name().is_root());
        assert!(matches!(
            ProbeQuery::new(".", "BOGUS"),
            Err(ProbeError::InvalidType(_))
        ));
    }

    #[test]
    fn test_built_query_is_well_formed() {
        let bytes = root_ns().build(42).to_vec().unwrap();
        let parsed = Message::from_vec(&bytes).unwrap();
        assert_eq!(parsed.id(), 42);
        assert_eq!(parsed.message_type(), MessageType::Query);
        assert!(parsed.recursion_desired());
        assert_eq!(parsed.queries()[0].query_type(), RecordType::NS);
    }

    #[tokio::test]
    async fn test_noerror_and_nxdomain_are_alive() {
        for code in [ResponseCode::NoError, ResponseCode::NXDomain] {
            let addr = responder(move |req| reply_to(req, code, 0)).await;
            let backend = Backend::new(addr);
            probe(&backend, &root_ns(), Duration::from_secs(1)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_servfail_is_dead() {
        let addr = responder(|req| reply_to(req, ResponseCode::ServFail, 0)).await;
        let err = probe(&Backend::new(addr), &root_ns(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ErrorResponse(ResponseCode::ServFail)));
    }

    #[tokio::test]
    async fn test_id_mismatch_is_dead() {
        let addr = responder(|req| reply_to(req, ResponseCode::NoError, 1)).await;
        let err = probe(&Backend::new(addr), &root_ns(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::IdMismatch { .. }));
    }

    #[tokio::test]
    async fn test_garbage_is_dead() {
        let addr = responder(|_| b"not dns".to_vec()).await;
        let err = probe(&Backend::new(addr), &root_ns(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_echoed_query_is_not_a_response() {
        let addr = responder(|req| req.to_vec()).await;
        let err = probe(&Backend::new(addr), &root_ns(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::NotAResponse));
    }

    #[tokio::test]
    async fn test_silence_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let backend = Backend::new(silent.local_addr().unwrap().to_string());
        let err = probe(&backend, &root_ns(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Exchange(ExchangeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_check_once_reports_state() {
        let addr = responder(|req| reply_to(req, ResponseCode::NoError, 0)).await;
        let report = check_once(&Backend::new(addr.clone()), &root_ns(), Duration::from_secs(1)).await;
        assert!(report.stats.healthy);
        assert!(report.error.is_none());
        assert_eq!(report.stats.consecutive_successes, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["address"], addr.as_str());
        assert_eq!(json["healthy"], true);
        assert!(json["latency_ms"].is_u64());
        assert!(json["error"].is_null());
    }

    #[tokio::test]
    async fn test_check_once_marks_silent_backend_down() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let backend = Backend::new(silent.local_addr().unwrap().to_string());

        let report = check_once(&backend, &root_ns(), Duration::from_millis(100)).await;
        assert!(!report.stats.healthy);
        assert!(!backend.is_healthy());
        assert!(report.error.unwrap().contains("no response"));
    }
}
