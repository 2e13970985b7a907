mod metrics;

pub use metrics::{render, GovernanceMetrics};
