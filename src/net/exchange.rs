//! One-shot UDP request/response exchange.
//!
//! Each call opens a fresh socket connected to the upstream, sends one
//! datagram and waits for one reply. Connecting the socket makes the kernel
//! discard datagrams from any other source and surfaces ICMP port
//! unreachable as `ConnectionRefused` on receive.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time;

/// Largest payload a UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to backend: {0}")]
    Connect(#[source] io::Error),

    #[error("failed to send query: {0}")]
    Send(#[source] io::Error),

    #[error("failed to read response: {0}")]
    Receive(#[source] io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl ExchangeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExchangeError::Timeout(_))
    }
}

/// Send `payload` to `address` and return the first datagram it sends back.
///
/// `timeout` bounds the whole exchange: resolution, connect, send and receive.
pub async fn exchange(
    address: &str,
    payload: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, ExchangeError> {
    time::timeout(timeout, exchange_inner(address, payload))
        .await
        .map_err(|_| ExchangeError::Timeout(timeout))?
}

async fn exchange_inner(address: &str, payload: &[u8]) -> Result<Vec<u8>, ExchangeError> {
    let remote = resolve(address).await?;

    let local: SocketAddr = if remote.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await.map_err(ExchangeError::Connect)?;
    socket.connect(remote).await.map_err(ExchangeError::Connect)?;

    socket.send(payload).await.map_err(ExchangeError::Send)?;

    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let n = socket.recv(&mut buffer).await.map_err(ExchangeError::Receive)?;
    buffer.truncate(n);
    Ok(buffer)
}

async fn resolve(address: &str) -> Result<SocketAddr, ExchangeError> {
    let mut addrs = lookup_host(address)
        .await
        .map_err(|source| ExchangeError::Resolve {
            address: address.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| ExchangeError::Resolve {
        address: address.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
    })
}
