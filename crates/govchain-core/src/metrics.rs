use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Performance snapshot for one office.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub gdp: f64,
    /// Rank position, lower is better.
    pub education_ranking: i32,
    /// Percent.
    pub approval_rating: f64,
    /// Percent.
    pub unemployment_rate: f64,
    pub infrastructure_score: f64,
}

impl MetricsSnapshot {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Gdp => self.gdp,
            MetricKind::EducationRanking => f64::from(self.education_ranking),
            MetricKind::ApprovalRating => self.approval_rating,
            MetricKind::UnemploymentRate => self.unemployment_rate,
            MetricKind::InfrastructureScore => self.infrastructure_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Gdp,
    EducationRanking,
    ApprovalRating,
    UnemploymentRate,
    InfrastructureScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Gdp,
        MetricKind::EducationRanking,
        MetricKind::ApprovalRating,
        MetricKind::UnemploymentRate,
        MetricKind::InfrastructureScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gdp => "gdp",
            MetricKind::EducationRanking => "education_ranking",
            MetricKind::ApprovalRating => "approval_rating",
            MetricKind::UnemploymentRate => "unemployment_rate",
            MetricKind::InfrastructureScore => "infrastructure_score",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::Gdp => "Gross Domestic Product (GDP) Index",
            MetricKind::EducationRanking => "National Education Ranking",
            MetricKind::ApprovalRating => "Public Approval Rating",
            MetricKind::UnemploymentRate => "Unemployment Rate",
            MetricKind::InfrastructureScore => "Infrastructure Quality Score",
        }
    }

    pub fn higher_is_better(self) -> bool {
        matches!(
            self,
            MetricKind::Gdp | MetricKind::ApprovalRating | MetricKind::InfrastructureScore
        )
    }

    /// Direction of change relative to the baseline, from the office's point
    /// of view: `Up` means the metric improved.
    pub fn trend(self, current: &MetricsSnapshot, baseline: Option<&MetricsSnapshot>) -> Trend {
        let Some(baseline) = baseline else {
            return Trend::Neutral;
        };
        let change = current.value(self) - baseline.value(self);
        let signed = if self.higher_is_better() { change } else { -change };
        if signed > 0.0 {
            Trend::Up
        } else if signed < 0.0 {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryEvent {
    NewTermStart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<HistoryEvent>,
}

/// Current, baseline and full history for one office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub current: MetricsSnapshot,
    /// Captured at term start; `None` until an office gets its first term.
    pub baseline: Option<MetricsSnapshot>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsStore {
    records: BTreeMap<String, MetricsRecord>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, office: &str) -> Option<&MetricsRecord> {
        self.records.get(office)
    }

    pub fn records(&self) -> &BTreeMap<String, MetricsRecord> {
        &self.records
    }

    /// Opens a record whose baseline is the given snapshot.
    pub fn establish(&mut self, office: &str, initial: MetricsSnapshot, at: DateTime<Utc>) {
        self.records.insert(
            office.to_string(),
            MetricsRecord {
                current: initial,
                baseline: Some(initial),
                history: vec![HistoryEntry {
                    snapshot: initial,
                    timestamp: at,
                    event: None,
                }],
            },
        );
    }

    /// Replaces `current` and appends to history. An office seen for the first
    /// time gets a record without a baseline. Field ranges are not checked.
    pub fn record(&mut self, office: &str, snapshot: MetricsSnapshot, at: DateTime<Utc>) {
        let entry = HistoryEntry {
            snapshot,
            timestamp: at,
            event: None,
        };
        match self.records.get_mut(office) {
            Some(record) => {
                record.history.push(entry);
                record.current = snapshot;
            }
            None => {
                self.records.insert(
                    office.to_string(),
                    MetricsRecord {
                        current: snapshot,
                        baseline: None,
                        history: vec![entry],
                    },
                );
            }
        }
    }

    /// Starts a new term: the incoming holder inherits every current value
    /// except approval, which restarts at `fresh_approval`. The result becomes
    /// both baseline and current. `fallback` seeds offices with no record.
    pub fn reset_for_new_term(
        &mut self,
        office: &str,
        fresh_approval: f64,
        fallback: MetricsSnapshot,
        at: DateTime<Utc>,
    ) -> MetricsSnapshot {
        let inherited = self
            .records
            .get(office)
            .map(|r| r.current)
            .unwrap_or(fallback);
        let baseline = MetricsSnapshot {
            approval_rating: fresh_approval,
            ..inherited
        };
        let entry = HistoryEntry {
            snapshot: baseline,
            timestamp: at,
            event: Some(HistoryEvent::NewTermStart),
        };
        let record = self
            .records
            .entry(office.to_string())
            .or_insert_with(|| MetricsRecord {
                current: baseline,
                baseline: None,
                history: Vec::new(),
            });
        record.baseline = Some(baseline);
        record.current = baseline;
        record.history.push(entry);
        baseline
    }
}
