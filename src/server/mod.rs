//! DNS forwarding server.
//!
//! # Data Flow
//! ```text
//! Inbound datagram
//!     → dispatcher.rs (accept loop, copies payload, spawns task)
//!     → handler.rs (select backend, apply failure policy)
//!     → net::forwarder (relay to backend)
//!     → reply written back through the listening socket
//! ```
//!
//! # Design Decisions
//! - One task per datagram, no admission control
//! - The accept loop races each receive against the shutdown signal
//! - Shutdown waits for in-flight tasks for a bounded grace period only
//! - Fail-closed drops silently; no synthesised SERVFAIL

pub mod dispatcher;
mod handler;

pub use dispatcher::{Dispatcher, ShutdownReport};
