use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current occupant of an office. Replaced wholesale when an election concludes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeHolder {
    pub id: String,
    pub name: String,
    /// Opaque key-like identifier, never verified.
    pub public_key: String,
    pub term_start: DateTime<Utc>,
    pub term_length_ms: i64,
}

impl OfficeHolder {
    pub fn term_length(&self) -> Duration {
        Duration::milliseconds(self.term_length_ms)
    }

    pub fn term_elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.term_start
    }

    pub fn term_complete(&self, now: DateTime<Utc>) -> bool {
        self.term_elapsed(now) >= self.term_length()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficeRegistry {
    holders: BTreeMap<String, OfficeHolder>,
}

impl OfficeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self, office: &str) -> Option<&OfficeHolder> {
        self.holders.get(office)
    }

    pub fn holders(&self) -> &BTreeMap<String, OfficeHolder> {
        &self.holders
    }

    pub fn offices(&self) -> impl Iterator<Item = &str> {
        self.holders.keys().map(String::as_str)
    }

    /// Seats `holder`, returning whoever held the office before.
    pub fn install(&mut self, office: &str, holder: OfficeHolder) -> Option<OfficeHolder> {
        self.holders.insert(office.to_string(), holder)
    }
}
