//! Random-walk metric drift applied between elections.

use crate::config::{DriftBounds, RankWalk, Walk};
use govchain_core::MetricsSnapshot;
use rand::Rng;

impl Walk {
    pub fn step<R: Rng + ?Sized>(&self, rng: &mut R, value: f64) -> f64 {
        (value + rng.gen_range(-self.step..=self.step)).clamp(self.min, self.max)
    }
}

impl RankWalk {
    pub fn step<R: Rng + ?Sized>(&self, rng: &mut R, value: i32) -> i32 {
        (value + rng.gen_range(self.down..=self.up)).clamp(self.min, self.max)
    }
}

/// Next snapshot: every field takes one clamped step.
pub fn drift<R: Rng + ?Sized>(rng: &mut R, current: &MetricsSnapshot, bounds: &DriftBounds) -> MetricsSnapshot {
    MetricsSnapshot {
        gdp: bounds.gdp.step(rng, current.gdp),
        education_ranking: bounds.education_ranking.step(rng, current.education_ranking),
        approval_rating: bounds.approval_rating.step(rng, current.approval_rating),
        unemployment_rate: bounds.unemployment_rate.step(rng, current.unemployment_rate),
        infrastructure_score: bounds.infrastructure_score.step(rng, current.infrastructure_score),
    }
}
