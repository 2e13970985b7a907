pub mod chain;
pub mod clock;
pub mod config;
pub mod election;
pub mod fingerprint;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod tabulator;
pub mod triggers;

#[cfg(test)]
mod tests;

pub use chain::{ChainState, GovernanceChain, GovernanceError, TriggerReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GenesisConfig, GovernanceConfig};
pub use election::{
    Ballot, CandidateProfile, CandidateRegistration, Election, ElectionError, ElectionManager,
    ElectionPhase, ElectionStatus, FatalInvariantViolation,
};
pub use fingerprint::{DigestFingerprints, FingerprintInput, FingerprintSource, RandomFingerprints};
pub use ledger::{Block, Ledger, LedgerError, Transaction};
pub use metrics::{MetricKind, MetricsRecord, MetricsSnapshot, MetricsStore, Trend};
pub use registry::{OfficeHolder, OfficeRegistry};
pub use tabulator::{tally, TallyResult, TallyRound, TieBreak};
pub use triggers::{compute_triggers, Severity, TriggerEvent, TriggerKind, TriggerThresholds};
