//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound datagram
//!     → listener.rs (bound UDP socket, shared for replies)
//!     → server dispatcher (one task per datagram)
//!     → forwarder.rs (relay to chosen backend, update counters)
//!     → exchange.rs (fresh connected socket, one send, one receive)
//! ```
//!
//! # Design Decisions
//! - No connection pooling; every exchange uses a new ephemeral socket
//! - Every outbound exchange has a deadline
//! - Receive buffers fit the largest possible UDP payload

pub mod exchange;
pub mod forwarder;
pub mod listener;

pub use exchange::{ExchangeError, MAX_DATAGRAM_SIZE};
pub use forwarder::Forwarder;
pub use listener::{Listener, ListenerError};
