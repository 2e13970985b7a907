//! Unattended driver for the governance chain: metric drift between
//! elections, mock candidates and mock ballots during them.

pub mod config;
pub mod drift;
pub mod driver;
pub mod keys;
pub mod runner;

pub use config::{ConfigError, DriftBounds, RankWalk, SimulationConfig, Walk};
pub use driver::{advance_phase, DriverError, PhaseStep};
pub use keys::MockVoter;
pub use runner::{RunSummary, Simulation, TickEvent};
