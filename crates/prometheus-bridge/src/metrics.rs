use govchain_core::{GovernanceChain, MetricKind};
use prometheus::{
    register_gauge_vec_with_registry, register_gauge_with_registry, Encoder, Gauge, GaugeVec,
    Registry, TextEncoder,
};
use std::collections::BTreeSet;

const MS_PER_DAY: f64 = 86_400_000.0;

pub struct GovernanceMetrics {
    pub office_metric: GaugeVec,
    pub ledger_height: Gauge,
    pub active_elections: GaugeVec,
    pub completed_elections: GaugeVec,
    pub holder_term_elapsed_days: GaugeVec,
}

impl GovernanceMetrics {
    pub fn register(registry: &Registry) -> anyhow::Result<Self> {
        let office_metric = register_gauge_vec_with_registry!(
            "governance_office_metric",
            "Current performance metric per office",
            &["office", "metric"],
            registry
        )?;

        let ledger_height = register_gauge_with_registry!(
            "governance_ledger_height",
            "Number of blocks on the governance ledger",
            registry
        )?;

        let active_elections = register_gauge_vec_with_registry!(
            "governance_active_elections",
            "Whether an election is running for the office (0 or 1)",
            &["office"],
            registry
        )?;

        let completed_elections = register_gauge_vec_with_registry!(
            "governance_completed_elections",
            "Concluded elections retained in the office history",
            &["office"],
            registry
        )?;

        let holder_term_elapsed_days = register_gauge_vec_with_registry!(
            "governance_holder_term_elapsed_days",
            "Days since the current holder's term started",
            &["office"],
            registry
        )?;

        Ok(Self {
            office_metric,
            ledger_height,
            active_elections,
            completed_elections,
            holder_term_elapsed_days,
        })
    }

    /// Sets every gauge from the chain's current state.
    pub fn observe(&self, chain: &GovernanceChain) {
        self.ledger_height.set(chain.ledger().len() as f64);

        for (office, record) in chain.metrics().records() {
            for kind in MetricKind::ALL {
                self.office_metric
                    .with_label_values(&[office.as_str(), kind.as_str()])
                    .set(record.current.value(kind));
            }
        }

        let now = chain.now();
        for (office, holder) in chain.registry().holders() {
            let elapsed = holder.term_elapsed(now).num_milliseconds() as f64 / MS_PER_DAY;
            self.holder_term_elapsed_days
                .with_label_values(&[office.as_str()])
                .set(elapsed);
        }

        let offices: BTreeSet<&str> = chain
            .registry()
            .offices()
            .chain(chain.metrics().records().keys().map(String::as_str))
            .collect();
        for office in offices {
            let active = chain.active_election(office).is_some();
            self.active_elections
                .with_label_values(&[office])
                .set(if active { 1.0 } else { 0.0 });
            self.completed_elections
                .with_label_values(&[office])
                .set(chain.elections().completed(office).count() as f64);
        }
    }
}

/// Text exposition of everything in `registry`.
pub fn render(registry: &Registry) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&registry.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
