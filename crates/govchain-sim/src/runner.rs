use crate::config::{ConfigError, SimulationConfig};
use crate::driver::{advance_phase, DriverError, PhaseStep};
use crate::drift::drift;
use chrono::{Duration, Utc};
use govchain_core::{
    GovernanceChain, GovernanceConfig, ManualClock, RandomFingerprints, TriggerReport,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TickEvent {
    MetricsDrifted { report: TriggerReport },
    Phase { step: PhaseStep },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub metric_updates: usize,
    pub elections_opened: usize,
    pub elections_concluded: usize,
    pub ledger_height: usize,
    pub holder: Option<String>,
}

/// Owns a chain on a simulated clock. Each tick moves time forward, then
/// either drifts the office's metrics (no election running) or drives the
/// running election one phase.
pub struct Simulation {
    chain: GovernanceChain,
    clock: ManualClock,
    rng: StdRng,
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(governance: GovernanceConfig, config: SimulationConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let clock = ManualClock::new(Utc::now());
        let fingerprints = RandomFingerprints::seeded(rng.gen());
        let chain = GovernanceChain::with_parts(governance, Box::new(clock.clone()), Box::new(fingerprints));
        Self {
            chain,
            clock,
            rng,
            config,
        }
    }

    pub fn chain(&self) -> &GovernanceChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut GovernanceChain {
        &mut self.chain
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fails without touching the chain or the clock when the simulation
    /// config does not validate.
    pub fn tick(&mut self) -> Result<TickEvent, DriverError> {
        self.config.validate()?;
        let by = Duration::try_days(self.config.days_per_tick).ok_or_else(|| {
            ConfigError::Invalid(format!("days_per_tick {} out of range", self.config.days_per_tick))
        })?;
        self.clock.advance(by);
        let office = self.config.office.as_str();

        if self.chain.active_election(office).is_some() {
            let step = advance_phase(&mut self.chain, &self.config, &mut self.rng)?;
            return Ok(TickEvent::Phase { step });
        }

        let current = self
            .chain
            .metrics()
            .get(office)
            .map(|r| r.current)
            .unwrap_or(self.chain.config().genesis.initial_metrics);
        let next = drift(&mut self.rng, &current, &self.config.drift);
        debug!(
            office,
            gdp = next.gdp,
            approval = next.approval_rating,
            "metrics drifted"
        );
        let report = self.chain.update_metrics(office, next)?;
        Ok(TickEvent::MetricsDrifted { report })
    }

    pub fn run(&mut self, ticks: usize) -> Result<RunSummary, DriverError> {
        let mut summary = RunSummary::default();
        for _ in 0..ticks {
            match self.tick()? {
                TickEvent::MetricsDrifted { report } => {
                    summary.metric_updates += 1;
                    if report.opened_election.is_some() {
                        summary.elections_opened += 1;
                    }
                }
                TickEvent::Phase {
                    step: PhaseStep::Concluded { .. },
                } => summary.elections_concluded += 1,
                TickEvent::Phase { .. } => {}
            }
            summary.ticks += 1;
        }
        summary.ledger_height = self.chain.ledger().len();
        summary.holder = self
            .chain
            .registry()
            .holder(&self.config.office)
            .map(|h| h.name.clone());
        info!(
            ticks = summary.ticks,
            opened = summary.elections_opened,
            concluded = summary.elections_concluded,
            height = summary.ledger_height,
            "simulation finished"
        );
        Ok(summary)
    }
}
