//! Election lifecycle per office.
//!
//! Phases only move forward: candidate registration, voting, tallying. At
//! most one election per office is active; concluded elections move into a
//! bounded, most-recent-first history. Ledger recording is left to the chain.

use crate::tabulator::TallyResult;
use crate::triggers::TriggerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionPhase {
    CandidateRegistration,
    Voting,
    Tallying,
}

impl ElectionPhase {
    pub fn next(self) -> Option<ElectionPhase> {
        match self {
            ElectionPhase::CandidateRegistration => Some(ElectionPhase::Voting),
            ElectionPhase::Voting => Some(ElectionPhase::Tallying),
            ElectionPhase::Tallying => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElectionPhase::CandidateRegistration => "candidate_registration",
            ElectionPhase::Voting => "voting",
            ElectionPhase::Tallying => "tallying",
        }
    }
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    Active,
    Completed,
}

/// What a candidate submits to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    pub public_key: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRegistration {
    pub candidate_id: String,
    pub name: String,
    pub public_key: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter_id: String,
    pub voter_public_key: String,
    /// Candidate ids, most preferred first.
    pub ranked_choices: Vec<String>,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    pub vote_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub office: String,
    pub triggers: Vec<TriggerEvent>,
    pub start_time: DateTime<Utc>,
    pub phase: ElectionPhase,
    pub candidates: Vec<CandidateRegistration>,
    pub votes: Vec<Ballot>,
    pub status: ElectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<TallyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Election {
    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.candidate_id.clone()).collect()
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&CandidateRegistration> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }

    /// Moves exactly one phase forward.
    pub fn advance_to(&mut self, next: ElectionPhase) -> Result<(), ElectionError> {
        if self.phase.next() != Some(next) {
            return Err(ElectionError::InvalidPhaseTransition {
                election_id: self.id.clone(),
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}

/// Conditions with no defined outcome. Concluding stops instead of picking a
/// fallback winner.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FatalInvariantViolation {
    #[error("election {election_id} has no registered candidates")]
    NoCandidates { election_id: String },
    #[error("election {election_id} has no ballots")]
    NoBallots { election_id: String },
    #[error("tally winner {winner} is not registered in election {election_id}")]
    WinnerNotRegistered { election_id: String, winner: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElectionError {
    #[error("election {election_id} is already active for office {office}")]
    AlreadyActive { office: String, election_id: String },
    #[error("no active election for office {office}")]
    NoActiveElection { office: String },
    #[error("office {office} is running election {active}, not {given}")]
    ElectionMismatch {
        office: String,
        active: String,
        given: String,
    },
    #[error("election {election_id} is in phase {phase}; ballots are only accepted while voting")]
    NotInVotingPhase {
        election_id: String,
        phase: ElectionPhase,
    },
    #[error("ballot ranks candidate {candidate_id} more than once")]
    DuplicateRanking { candidate_id: String },
    #[error("election {election_id} cannot move from {from} to {to}")]
    InvalidPhaseTransition {
        election_id: String,
        from: ElectionPhase,
        to: ElectionPhase,
    },
    #[error(transparent)]
    Fatal(#[from] FatalInvariantViolation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionManager {
    active: BTreeMap<String, Election>,
    completed: BTreeMap<String, VecDeque<Election>>,
    history_capacity: usize,
    opened: u64,
}

impl ElectionManager {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            active: BTreeMap::new(),
            completed: BTreeMap::new(),
            history_capacity,
            opened: 0,
        }
    }

    pub fn active(&self, office: &str) -> Option<&Election> {
        self.active.get(office)
    }

    pub fn active_elections(&self) -> &BTreeMap<String, Election> {
        &self.active
    }

    /// Concluded elections for `office`, most recent first.
    pub fn completed(&self, office: &str) -> impl Iterator<Item = &Election> {
        self.completed.get(office).into_iter().flatten()
    }

    pub fn completed_elections(&self) -> &BTreeMap<String, VecDeque<Election>> {
        &self.completed
    }

    pub fn open(
        &mut self,
        office: &str,
        triggers: Vec<TriggerEvent>,
        now: DateTime<Utc>,
    ) -> Result<&Election, ElectionError> {
        if let Some(existing) = self.active.get(office) {
            return Err(ElectionError::AlreadyActive {
                office: office.to_string(),
                election_id: existing.id.clone(),
            });
        }
        self.opened += 1;
        let election = Election {
            id: format!("election_{}_{}-{}", office, now.timestamp_millis(), self.opened),
            office: office.to_string(),
            triggers,
            start_time: now,
            phase: ElectionPhase::CandidateRegistration,
            candidates: Vec::new(),
            votes: Vec::new(),
            status: ElectionStatus::Active,
            results: None,
            completed_at: None,
        };
        Ok(self.active.entry(office.to_string()).or_insert(election))
    }

    fn active_mut(&mut self, office: &str) -> Result<&mut Election, ElectionError> {
        self.active
            .get_mut(office)
            .ok_or_else(|| ElectionError::NoActiveElection {
                office: office.to_string(),
            })
    }

    fn require_active(&self, office: &str) -> Result<&Election, ElectionError> {
        self.active
            .get(office)
            .ok_or_else(|| ElectionError::NoActiveElection {
                office: office.to_string(),
            })
    }

    /// Accepted in any phase as long as `election_id` is the office's active
    /// election.
    pub fn register_candidate(
        &mut self,
        election_id: &str,
        office: &str,
        profile: CandidateProfile,
        now: DateTime<Utc>,
    ) -> Result<CandidateRegistration, ElectionError> {
        let election = self.active_mut(office)?;
        if election.id != election_id {
            return Err(ElectionError::ElectionMismatch {
                office: office.to_string(),
                active: election.id.clone(),
                given: election_id.to_string(),
            });
        }
        let registration = CandidateRegistration {
            candidate_id: profile.id,
            name: profile.name,
            public_key: profile.public_key,
            platform: profile.platform,
            timestamp: now,
        };
        election.candidates.push(registration.clone());
        Ok(registration)
    }

    /// Gate for incoming ballots: an active election in the voting phase and
    /// no candidate ranked twice.
    pub fn check_ballot(&self, office: &str, ranked_choices: &[String]) -> Result<&Election, ElectionError> {
        let election = self.require_active(office)?;
        if election.phase != ElectionPhase::Voting {
            return Err(ElectionError::NotInVotingPhase {
                election_id: election.id.clone(),
                phase: election.phase,
            });
        }
        for (i, choice) in ranked_choices.iter().enumerate() {
            if ranked_choices[..i].contains(choice) {
                return Err(ElectionError::DuplicateRanking {
                    candidate_id: choice.clone(),
                });
            }
        }
        Ok(election)
    }

    pub fn record_ballot(&mut self, office: &str, ballot: Ballot) -> Result<&Ballot, ElectionError> {
        self.check_ballot(office, &ballot.ranked_choices)?;
        let election = self.active_mut(office)?;
        election.votes.push(ballot);
        Ok(&election.votes[election.votes.len() - 1])
    }

    pub fn advance(&mut self, office: &str, next: ElectionPhase) -> Result<&Election, ElectionError> {
        let election = self.active_mut(office)?;
        election.advance_to(next)?;
        Ok(election)
    }

    /// The active election, provided it has candidates and ballots to tally.
    pub fn ready_to_conclude(&self, office: &str) -> Result<&Election, ElectionError> {
        let election = self.require_active(office)?;
        if election.candidates.is_empty() {
            return Err(FatalInvariantViolation::NoCandidates {
                election_id: election.id.clone(),
            }
            .into());
        }
        if election.votes.is_empty() {
            return Err(FatalInvariantViolation::NoBallots {
                election_id: election.id.clone(),
            }
            .into());
        }
        Ok(election)
    }

    /// Marks the office's election completed and archives it at the front of
    /// the office history, evicting the oldest beyond capacity. The newest
    /// election is always kept, even at capacity 0.
    pub fn complete(
        &mut self,
        office: &str,
        results: TallyResult,
        now: DateTime<Utc>,
    ) -> Result<&Election, ElectionError> {
        let mut election = self
            .active
            .remove(office)
            .ok_or_else(|| ElectionError::NoActiveElection {
                office: office.to_string(),
            })?;
        election.phase = ElectionPhase::Tallying;
        election.status = ElectionStatus::Completed;
        election.results = Some(results);
        election.completed_at = Some(now);

        let history = self.completed.entry(office.to_string()).or_default();
        history.push_front(election);
        history.truncate(self.history_capacity.max(1));
        history
            .front()
            .ok_or_else(|| ElectionError::NoActiveElection {
                office: office.to_string(),
            })
    }
}
