//! What to do with a query when no backend is healthy.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Drop the query without replying.
    #[default]
    Closed,
    /// Send the query to the fallback backend even though it is unhealthy.
    Open,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Closed => write!(f, "closed"),
            FailurePolicy::Open => write!(f, "open"),
        }
    }
}
