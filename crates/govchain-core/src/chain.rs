//! `GovernanceChain` ties the components together and records every state
//! transition on the ledger.
//!
//! All mutating operations take `&mut self`, so per-office invariants (one
//! active election, ballots only while voting) hold as long as callers
//! serialize access to the chain.

use crate::clock::{Clock, SystemClock};
use crate::config::GovernanceConfig;
use crate::election::{
    Ballot, CandidateProfile, CandidateRegistration, Election, ElectionError, ElectionManager,
    ElectionPhase, FatalInvariantViolation,
};
use crate::fingerprint::{short_fingerprint, FingerprintInput, FingerprintSource, RandomFingerprints};
use crate::ledger::{Ledger, LedgerError, Transaction, METRICS_VALIDATOR};
use crate::metrics::{MetricsRecord, MetricsSnapshot, MetricsStore};
use crate::registry::{OfficeHolder, OfficeRegistry};
use crate::tabulator::{tally, TallyError};
use crate::triggers::{self, TriggerEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("unknown office {0}")]
    UnknownOffice(String),
    #[error("office {0} has no metrics")]
    NoMetrics(String),
    #[error("office {0} already has a holder")]
    OfficeAlreadyEstablished(String),
    #[error("election error: {0}")]
    Election(#[from] ElectionError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<FatalInvariantViolation> for GovernanceError {
    fn from(v: FatalInvariantViolation) -> Self {
        GovernanceError::Election(ElectionError::Fatal(v))
    }
}

/// Triggers computed for an office and the election they opened, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerReport {
    pub triggers: Vec<TriggerEvent>,
    pub opened_election: Option<String>,
}

/// Read-only view of the whole chain.
#[derive(Debug, Serialize)]
pub struct ChainState<'a> {
    pub blocks: &'a [crate::ledger::Block],
    pub office_holders: &'a BTreeMap<String, OfficeHolder>,
    pub metrics: &'a BTreeMap<String, MetricsRecord>,
    pub active_elections: &'a BTreeMap<String, Election>,
    pub completed_elections: &'a BTreeMap<String, VecDeque<Election>>,
}

pub struct GovernanceChain {
    config: GovernanceConfig,
    ledger: Ledger,
    metrics: MetricsStore,
    registry: OfficeRegistry,
    elections: ElectionManager,
    clock: Box<dyn Clock>,
    fingerprints: Box<dyn FingerprintSource>,
}

impl GovernanceChain {
    /// Wall-clock time and random fingerprints.
    pub fn new(config: GovernanceConfig) -> Self {
        Self::with_parts(
            config,
            Box::new(SystemClock),
            Box::new(RandomFingerprints::from_entropy()),
        )
    }

    /// Builds the chain and writes its genesis block.
    pub fn with_parts(
        config: GovernanceConfig,
        clock: Box<dyn Clock>,
        fingerprints: Box<dyn FingerprintSource>,
    ) -> Self {
        let elections = ElectionManager::new(config.completed_history_capacity);
        let mut chain = Self {
            config,
            ledger: Ledger::new(),
            metrics: MetricsStore::new(),
            registry: OfficeRegistry::new(),
            elections,
            clock,
            fingerprints,
        };
        chain.write_genesis();
        chain
    }

    fn write_genesis(&mut self) {
        let genesis = &self.config.genesis;
        let term_start = self.clock.now() - genesis.tenure_elapsed();
        let holder = OfficeHolder {
            id: genesis.holder_id.clone(),
            name: genesis.holder_name.clone(),
            public_key: genesis.holder_public_key.clone(),
            term_start,
            term_length_ms: self.config.term_length().num_milliseconds(),
        };
        let office = genesis.office.clone();
        let initial = genesis.initial_metrics;

        self.ledger.append(
            vec![Transaction::OfficeInit {
                office: office.clone(),
                holder: holder.clone(),
                initial_metrics: initial,
            }],
            term_start,
            self.fingerprints.as_mut(),
        );
        self.metrics.establish(&office, initial, term_start);
        info!(office = %office, holder = %holder.name, "genesis office established");
        self.registry.install(&office, holder);
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.metrics
    }

    pub fn registry(&self) -> &OfficeRegistry {
        &self.registry
    }

    pub fn elections(&self) -> &ElectionManager {
        &self.elections
    }

    pub fn active_election(&self, office: &str) -> Option<&Election> {
        self.elections.active(office)
    }

    pub fn state(&self) -> ChainState<'_> {
        ChainState {
            blocks: self.ledger.blocks(),
            office_holders: self.registry.holders(),
            metrics: self.metrics.records(),
            active_elections: self.elections.active_elections(),
            completed_elections: self.elections.completed_elections(),
        }
    }

    pub fn export_json(&self) -> Result<String, GovernanceError> {
        Ok(serde_json::to_string_pretty(&self.state())?)
    }

    /// Seats a holder for a new office with its first baseline.
    pub fn establish_office(
        &mut self,
        office: &str,
        holder: OfficeHolder,
        initial: MetricsSnapshot,
    ) -> Result<(), GovernanceError> {
        if self.registry.holder(office).is_some() {
            return Err(GovernanceError::OfficeAlreadyEstablished(office.to_string()));
        }
        let now = self.clock.now();
        self.ledger.append(
            vec![Transaction::OfficeInit {
                office: office.to_string(),
                holder: holder.clone(),
                initial_metrics: initial,
            }],
            now,
            self.fingerprints.as_mut(),
        );
        self.metrics.establish(office, initial, now);
        info!(office, holder = %holder.name, "office established");
        self.registry.install(office, holder);
        Ok(())
    }

    /// Records the snapshot, then evaluates triggers for the office.
    pub fn update_metrics(
        &mut self,
        office: &str,
        snapshot: MetricsSnapshot,
    ) -> Result<TriggerReport, GovernanceError> {
        let now = self.clock.now();
        self.ledger.append(
            vec![Transaction::MetricsUpdate {
                office: office.to_string(),
                metrics: snapshot,
                timestamp: now,
                validator: METRICS_VALIDATOR.to_string(),
            }],
            now,
            self.fingerprints.as_mut(),
        );
        self.metrics.record(office, snapshot, now);
        self.evaluate_triggers(office)
    }

    /// Pure trigger computation for one office.
    pub fn compute_triggers(&self, office: &str) -> Result<Vec<TriggerEvent>, GovernanceError> {
        let holder = self.registry.holder(office);
        let Some(record) = self.metrics.get(office) else {
            return Err(match holder {
                Some(_) => GovernanceError::NoMetrics(office.to_string()),
                None => GovernanceError::UnknownOffice(office.to_string()),
            });
        };
        Ok(triggers::compute_triggers(
            &record.current,
            record.baseline.as_ref(),
            holder,
            self.clock.now(),
            &self.config.thresholds,
        ))
    }

    /// Opens an election when a mandatory or critical trigger fired and the
    /// office has none running.
    pub fn maybe_open_election(
        &mut self,
        office: &str,
        fired: &[TriggerEvent],
    ) -> Result<Option<String>, GovernanceError> {
        if !triggers::requires_election(fired) {
            return Ok(None);
        }
        if let Some(active) = self.elections.active(office) {
            debug!(office, election = %active.id, "election already running, triggers noted");
            return Ok(None);
        }
        self.initiate_election(office, fired.to_vec(), true).map(Some)
    }

    /// `compute_triggers` followed by `maybe_open_election`.
    pub fn evaluate_triggers(&mut self, office: &str) -> Result<TriggerReport, GovernanceError> {
        let triggers = self.compute_triggers(office)?;
        let opened_election = self.maybe_open_election(office, &triggers)?;
        Ok(TriggerReport {
            triggers,
            opened_election,
        })
    }

    /// Returns the new election's id.
    pub fn initiate_election(
        &mut self,
        office: &str,
        triggers: Vec<TriggerEvent>,
        autonomous: bool,
    ) -> Result<String, GovernanceError> {
        let now = self.clock.now();
        let trigger_types = triggers.iter().map(|t| t.kind).collect::<Vec<_>>();
        let election = self.elections.open(office, triggers, now)?;
        let election_id = election.id.clone();
        self.ledger.append(
            vec![Transaction::ElectionInitiated {
                election_id: election_id.clone(),
                office: office.to_string(),
                trigger_types: trigger_types.clone(),
                autonomous,
            }],
            now,
            self.fingerprints.as_mut(),
        );
        info!(office, election = %election_id, triggers = ?trigger_types, autonomous, "election initiated");
        Ok(election_id)
    }

    pub fn register_candidate(
        &mut self,
        election_id: &str,
        office: &str,
        profile: CandidateProfile,
    ) -> Result<CandidateRegistration, GovernanceError> {
        let now = self.clock.now();
        let registration = match self.elections.register_candidate(election_id, office, profile, now) {
            Ok(r) => r,
            Err(err) => {
                warn!(office, election = election_id, error = %err, "candidate registration rejected");
                return Err(err.into());
            }
        };
        self.ledger.append(
            vec![Transaction::CandidateRegistered {
                election_id: election_id.to_string(),
                candidate: registration.clone(),
                verified: true,
            }],
            now,
            self.fingerprints.as_mut(),
        );
        info!(office, election = election_id, candidate = %registration.candidate_id, "candidate registered");
        Ok(registration)
    }

    /// Rejected calls leave both the election and the ledger untouched.
    pub fn cast_vote(
        &mut self,
        office: &str,
        voter_id: &str,
        voter_key: &str,
        ranked_choices: Vec<String>,
        signature: &str,
    ) -> Result<&Ballot, GovernanceError> {
        let election_id = match self.elections.check_ballot(office, &ranked_choices) {
            Ok(election) => election.id.clone(),
            Err(err) => {
                warn!(office, voter = voter_id, error = %err, "ballot rejected");
                return Err(err.into());
            }
        };
        let now = self.clock.now();
        let vote_fingerprint = self.fingerprints.fingerprint(&FingerprintInput::Vote {
            voter_id,
            ranked_choices: &ranked_choices,
            timestamp: now,
        });
        let ballot = self.elections.record_ballot(
            office,
            Ballot {
                voter_id: voter_id.to_string(),
                voter_public_key: voter_key.to_string(),
                ranked_choices,
                signature: signature.to_string(),
                timestamp: now,
                vote_fingerprint,
            },
        )?;
        self.ledger.append(
            vec![Transaction::VoteCast {
                election_id,
                vote_fingerprint: ballot.vote_fingerprint.clone(),
                voter_key: voter_key.to_string(),
                timestamp: now,
                verified: true,
            }],
            now,
            self.fingerprints.as_mut(),
        );
        debug!(office, vote = %short_fingerprint(&ballot.vote_fingerprint), "ballot cast");
        Ok(ballot)
    }

    pub fn advance_to_voting(&mut self, office: &str) -> Result<(), GovernanceError> {
        let election = self.elections.advance(office, ElectionPhase::Voting)?;
        info!(
            office,
            election = %election.id,
            candidates = election.candidates.len(),
            "voting opened"
        );
        Ok(())
    }

    /// Moves voting to tallying and concludes. Nothing changes if the election
    /// cannot be concluded.
    pub fn advance_to_tallying_and_conclude(&mut self, office: &str) -> Result<&Election, GovernanceError> {
        let election = self.elections.ready_to_conclude(office)?;
        if election.phase != ElectionPhase::Voting {
            return Err(ElectionError::InvalidPhaseTransition {
                election_id: election.id.clone(),
                from: election.phase,
                to: ElectionPhase::Tallying,
            }
            .into());
        }
        self.elections.advance(office, ElectionPhase::Tallying)?;
        self.conclude_election(office)
    }

    /// Tallies the active election, seats the winner for a fresh term and
    /// starts a new metrics baseline. Returns the archived election.
    pub fn conclude_election(&mut self, office: &str) -> Result<&Election, GovernanceError> {
        let election = self.elections.ready_to_conclude(office)?;
        let election_id = election.id.clone();

        let result = tally(
            &election.candidate_ids(),
            election.votes.iter().map(|b| b.ranked_choices.as_slice()),
            self.config.tie_break,
        )
        .map_err(|e| match e {
            TallyError::NoCandidates => FatalInvariantViolation::NoCandidates {
                election_id: election_id.clone(),
            },
        })?;

        let winner = election
            .candidate(&result.winner)
            .cloned()
            .ok_or_else(|| FatalInvariantViolation::WinnerNotRegistered {
                election_id: election_id.clone(),
                winner: result.winner.clone(),
            })?;

        let now = self.clock.now();
        let new_holder = OfficeHolder {
            id: winner.candidate_id,
            name: winner.name,
            public_key: winner.public_key,
            term_start: now,
            term_length_ms: self.config.term_length().num_milliseconds(),
        };
        let previous = self.registry.install(office, new_holder.clone());

        self.ledger.append(
            vec![Transaction::ElectionConcluded {
                election_id: election_id.clone(),
                office: office.to_string(),
                winner_id: new_holder.id.clone(),
                total_votes: result.total_ballots,
                round_count: result.round_count(),
                new_holder: new_holder.clone(),
            }],
            now,
            self.fingerprints.as_mut(),
        );

        let baseline = self.metrics.reset_for_new_term(
            office,
            self.config.fresh_approval_rating,
            self.config.genesis.initial_metrics,
            now,
        );

        info!(
            office,
            election = %election_id,
            winner = %new_holder.name,
            previous = previous.as_ref().map(|h| h.name.as_str()).unwrap_or("vacant"),
            rounds = result.round_count(),
            ballots = result.total_ballots,
            approval = baseline.approval_rating,
            "election concluded"
        );

        Ok(self.elections.complete(office, result, now)?)
    }
}
