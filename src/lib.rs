//! UDP DNS load balancer library.
//!
//! Accepts DNS queries on one UDP socket, relays each to a healthy backend
//! picked round-robin, and writes the backend's reply back to the client.
//! An optional health monitor probes backends with real DNS queries and
//! moves them in and out of rotation with hysteresis.

// Core subsystems
pub mod config;
pub mod net;
pub mod server;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::BalancerConfig;
pub use lifecycle::Shutdown;
pub use server::Dispatcher;
