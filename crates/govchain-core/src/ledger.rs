//! Append-only block ledger.
//!
//! Every state transition of the chain lands here as one block holding one
//! transaction. Blocks link to their predecessor's fingerprint; whether that
//! fingerprint commits to the block body depends on the `FingerprintSource`
//! the chain was built with. Transaction content is never validated here.

use crate::election::CandidateRegistration;
use crate::fingerprint::{FingerprintInput, FingerprintSource};
use crate::metrics::MetricsSnapshot;
use crate::registry::OfficeHolder;
use crate::triggers::TriggerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `previous_fingerprint` of block 0.
pub const GENESIS_PREVIOUS: &str = "0";

/// Attestation tag written on metrics updates.
pub const METRICS_VALIDATOR: &str = "consensus_nodes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transaction {
    OfficeInit {
        office: String,
        holder: OfficeHolder,
        initial_metrics: MetricsSnapshot,
    },
    MetricsUpdate {
        office: String,
        metrics: MetricsSnapshot,
        timestamp: DateTime<Utc>,
        validator: String,
    },
    ElectionInitiated {
        election_id: String,
        office: String,
        trigger_types: Vec<TriggerKind>,
        autonomous: bool,
    },
    CandidateRegistered {
        election_id: String,
        candidate: CandidateRegistration,
        verified: bool,
    },
    VoteCast {
        election_id: String,
        vote_fingerprint: String,
        /// Key only; the voter's identity stays off the ledger.
        voter_key: String,
        timestamp: DateTime<Utc>,
        verified: bool,
    },
    ElectionConcluded {
        election_id: String,
        office: String,
        winner_id: String,
        total_votes: usize,
        round_count: usize,
        new_holder: OfficeHolder,
    },
}

impl Transaction {
    pub fn type_name(&self) -> &'static str {
        match self {
            Transaction::OfficeInit { .. } => "OFFICE_INIT",
            Transaction::MetricsUpdate { .. } => "METRICS_UPDATE",
            Transaction::ElectionInitiated { .. } => "ELECTION_INITIATED",
            Transaction::CandidateRegistered { .. } => "CANDIDATE_REGISTERED",
            Transaction::VoteCast { .. } => "VOTE_CAST",
            Transaction::ElectionConcluded { .. } => "ELECTION_CONCLUDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    pub previous_fingerprint: String,
    pub fingerprint: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger has no genesis block")]
    Empty,
    #[error("block at position {position} carries index {found}")]
    IndexGap { position: usize, found: u64 },
    #[error("genesis block must link to \"0\", found {found}")]
    BadGenesisLink { found: String },
    #[error("block {index} does not link to its predecessor's fingerprint")]
    BrokenLink { index: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals `transactions` into the next block and returns it. Never fails.
    pub fn append(
        &mut self,
        transactions: Vec<Transaction>,
        timestamp: DateTime<Utc>,
        fingerprints: &mut dyn FingerprintSource,
    ) -> &Block {
        let index = self.blocks.len() as u64;
        let previous_fingerprint = self
            .blocks
            .last()
            .map(|b| b.fingerprint.clone())
            .unwrap_or_else(|| GENESIS_PREVIOUS.to_string());

        let fingerprint = fingerprints.fingerprint(&FingerprintInput::Block {
            index,
            timestamp,
            previous_fingerprint: &previous_fingerprint,
            transactions: &transactions,
        });

        tracing::debug!(
            index,
            kinds = ?transactions.iter().map(Transaction::type_name).collect::<Vec<_>>(),
            fingerprint = %crate::fingerprint::short_fingerprint(&fingerprint),
            "block appended"
        );

        self.blocks.push(Block {
            index,
            timestamp,
            transactions,
            previous_fingerprint,
            fingerprint,
        });
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// All transactions matching `predicate`, oldest first, with their block index.
    pub fn find_transactions<'a, F>(&'a self, mut predicate: F) -> Vec<(u64, &'a Transaction)>
    where
        F: FnMut(&Transaction) -> bool,
    {
        self.blocks
            .iter()
            .flat_map(|b| b.transactions.iter().map(move |t| (b.index, t)))
            .filter(|(_, t)| predicate(t))
            .collect()
    }

    /// Checks gapless indices and the previous-fingerprint chain.
    pub fn verify_linkage(&self) -> Result<(), LedgerError> {
        let genesis = self.blocks.first().ok_or(LedgerError::Empty)?;
        if genesis.previous_fingerprint != GENESIS_PREVIOUS {
            return Err(LedgerError::BadGenesisLink {
                found: genesis.previous_fingerprint.clone(),
            });
        }
        for (position, block) in self.blocks.iter().enumerate() {
            if block.index != position as u64 {
                return Err(LedgerError::IndexGap {
                    position,
                    found: block.index,
                });
            }
            if position > 0 && block.previous_fingerprint != self.blocks[position - 1].fingerprint {
                return Err(LedgerError::BrokenLink { index: block.index });
            }
        }
        Ok(())
    }
}
