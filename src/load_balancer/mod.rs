//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Query received
//!     → pool.rs (ordered backends)
//!     → round_robin.rs (rotate, skipping unhealthy backends)
//!     → backend.rs (health flag + counters)
//!     → Some(backend), or None → policy.rs decides drop vs fallback
//! ```
//!
//! # Design Decisions
//! - Backend set is fixed at startup; order defines rotation order
//! - The rotation cursor is a lone atomic, never behind a lock
//! - Selection only reports "no healthy backend"; the failure policy is
//!   applied by the caller, since it concerns the query, not backend health

pub mod backend;
pub mod policy;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, BackendStats};
pub use policy::FailurePolicy;
pub use pool::BackendPool;
