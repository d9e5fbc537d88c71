//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, per-query spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout or file, text or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured key/value events, never pre-formatted strings
//! - Each query runs in a span carrying a request ID and the client address
//! - Metrics are cheap and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
