//! Rule-based election triggers.
//!
//! `compute_triggers` is pure: it only looks at the metrics, the baseline and
//! the holder's term. Opening an election in response is the chain's job
//! (`GovernanceChain::maybe_open_election`).

use crate::metrics::MetricsSnapshot;
use crate::registry::OfficeHolder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    TermComplete,
    ApprovalCollapse,
    GdpDecline,
    EducationDecline,
    UnemploymentSpike,
    InfrastructureFailure,
    LowApproval,
    UnemploymentHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mandatory,
    Critical,
    Warning,
}

impl Severity {
    pub fn forces_election(self) -> bool {
        matches!(self, Severity::Mandatory | Severity::Critical)
    }
}

/// What a trigger value was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reference", rename_all = "snake_case")]
pub enum TriggerReference {
    /// Term expiry carries no measurement.
    Term,
    Baseline { baseline: f64, change: f64 },
    Threshold { threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(flatten)]
    pub reference: TriggerReference,
}

impl TriggerEvent {
    fn term_complete() -> Self {
        Self {
            kind: TriggerKind::TermComplete,
            severity: Severity::Mandatory,
            value: None,
            reference: TriggerReference::Term,
        }
    }

    fn relative(kind: TriggerKind, severity: Severity, value: f64, baseline: f64, change: f64) -> Self {
        Self {
            kind,
            severity,
            value: Some(value),
            reference: TriggerReference::Baseline { baseline, change },
        }
    }

    fn absolute(kind: TriggerKind, severity: Severity, value: f64, threshold: f64) -> Self {
        Self {
            kind,
            severity,
            value: Some(value),
            reference: TriggerReference::Threshold { threshold },
        }
    }
}

/// Trigger limits. Relative limits apply while a baseline exists, absolute
/// limits only before an office's first baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerThresholds {
    /// Approval points lost since baseline.
    pub approval_drop: f64,
    /// Percent of baseline GDP lost.
    pub gdp_decline_pct: f64,
    /// Ranking places lost (rank number grew by this much).
    pub education_drop: i32,
    /// Unemployment percentage points gained.
    pub unemployment_rise: f64,
    /// Infrastructure points lost.
    pub infrastructure_drop: f64,

    pub approval_floor: f64,
    pub gdp_floor: f64,
    pub education_ceiling: i32,
    pub unemployment_ceiling: f64,
    pub infrastructure_floor: f64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            approval_drop: 20.0,
            gdp_decline_pct: 10.0,
            education_drop: 10,
            unemployment_rise: 2.5,
            infrastructure_drop: 15.0,
            approval_floor: 35.0,
            gdp_floor: 90.0,
            education_ceiling: 25,
            unemployment_ceiling: 7.5,
            infrastructure_floor: 55.0,
        }
    }
}

/// Every rule is evaluated; all firing triggers are returned in rule order.
/// A vacant office (`holder == None`) has no term to complete.
pub fn compute_triggers(
    current: &MetricsSnapshot,
    baseline: Option<&MetricsSnapshot>,
    holder: Option<&OfficeHolder>,
    now: DateTime<Utc>,
    limits: &TriggerThresholds,
) -> Vec<TriggerEvent> {
    let mut triggers = Vec::new();

    if holder.is_some_and(|h| h.term_complete(now)) {
        triggers.push(TriggerEvent::term_complete());
    }

    match baseline {
        Some(base) => relative_triggers(current, base, limits, &mut triggers),
        None => absolute_triggers(current, limits, &mut triggers),
    }

    triggers
}

/// True when at least one trigger is mandatory or critical.
pub fn requires_election(triggers: &[TriggerEvent]) -> bool {
    triggers.iter().any(|t| t.severity.forces_election())
}

fn relative_triggers(
    m: &MetricsSnapshot,
    base: &MetricsSnapshot,
    limits: &TriggerThresholds,
    out: &mut Vec<TriggerEvent>,
) {
    let approval_drop = base.approval_rating - m.approval_rating;
    if approval_drop >= limits.approval_drop {
        out.push(TriggerEvent::relative(
            TriggerKind::ApprovalCollapse,
            Severity::Critical,
            m.approval_rating,
            base.approval_rating,
            -approval_drop,
        ));
    }

    // A non-positive baseline GDP has no meaningful percentage decline.
    if base.gdp > 0.0 {
        let gdp_decline = (base.gdp - m.gdp) / base.gdp * 100.0;
        if gdp_decline >= limits.gdp_decline_pct {
            out.push(TriggerEvent::relative(
                TriggerKind::GdpDecline,
                Severity::Critical,
                m.gdp,
                base.gdp,
                -gdp_decline,
            ));
        }
    }

    let education_drop = m.education_ranking - base.education_ranking;
    if education_drop >= limits.education_drop {
        out.push(TriggerEvent::relative(
            TriggerKind::EducationDecline,
            Severity::Warning,
            f64::from(m.education_ranking),
            f64::from(base.education_ranking),
            f64::from(education_drop),
        ));
    }

    let unemployment_rise = m.unemployment_rate - base.unemployment_rate;
    if unemployment_rise >= limits.unemployment_rise {
        out.push(TriggerEvent::relative(
            TriggerKind::UnemploymentSpike,
            Severity::Warning,
            m.unemployment_rate,
            base.unemployment_rate,
            unemployment_rise,
        ));
    }

    let infrastructure_drop = base.infrastructure_score - m.infrastructure_score;
    if infrastructure_drop >= limits.infrastructure_drop {
        out.push(TriggerEvent::relative(
            TriggerKind::InfrastructureFailure,
            Severity::Critical,
            m.infrastructure_score,
            base.infrastructure_score,
            -infrastructure_drop,
        ));
    }
}

fn absolute_triggers(m: &MetricsSnapshot, limits: &TriggerThresholds, out: &mut Vec<TriggerEvent>) {
    if m.approval_rating < limits.approval_floor {
        out.push(TriggerEvent::absolute(
            TriggerKind::LowApproval,
            Severity::Critical,
            m.approval_rating,
            limits.approval_floor,
        ));
    }
    if m.gdp < limits.gdp_floor {
        out.push(TriggerEvent::absolute(
            TriggerKind::GdpDecline,
            Severity::Critical,
            m.gdp,
            limits.gdp_floor,
        ));
    }
    if m.education_ranking > limits.education_ceiling {
        out.push(TriggerEvent::absolute(
            TriggerKind::EducationDecline,
            Severity::Warning,
            f64::from(m.education_ranking),
            f64::from(limits.education_ceiling),
        ));
    }
    if m.unemployment_rate > limits.unemployment_ceiling {
        out.push(TriggerEvent::absolute(
            TriggerKind::UnemploymentHigh,
            Severity::Warning,
            m.unemployment_rate,
            limits.unemployment_ceiling,
        ));
    }
    if m.infrastructure_score < limits.infrastructure_floor {
        out.push(TriggerEvent::absolute(
            TriggerKind::InfrastructureFailure,
            Severity::Critical,
            m.infrastructure_score,
            limits.infrastructure_floor,
        ));
    }
}
