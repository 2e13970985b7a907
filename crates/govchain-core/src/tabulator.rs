//! Instant-runoff (ranked-choice) tabulation.
//!
//! Every ballot carries a cursor into its ranking. Each round counts a ballot
//! only when the choice under its cursor is still continuing. A candidate
//! reaching `floor(total / 2) + 1` wins; otherwise the weakest candidate is
//! eliminated and the ballots pointing at it move their cursor forward by one.
//! A ballot whose cursor lands on an eliminated or unregistered id stays there
//! and abstains from then on. `total` is the full ballot count in every round.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Rule for choosing among candidates tied for the fewest votes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Eliminate the tied candidate that registered first.
    #[default]
    RegistrationOrder,
    /// Eliminate the tied candidate with the smallest id.
    LexicographicId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRound {
    pub vote_counts: BTreeMap<String, u32>,
    pub total_votes: usize,
    pub majority: usize,
    /// Candidate dropped at the end of this round, if no one won it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eliminated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub winner: String,
    pub rounds: Vec<TallyRound>,
    pub total_ballots: usize,
}

impl TallyResult {
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TallyError {
    #[error("no candidates to tally")]
    NoCandidates,
}

/// Runs instant-runoff over `candidates` (registration order, duplicates
/// ignored) and the ranked choices of each ballot.
pub fn tally<'a, I>(candidates: &[String], ballots: I, tie_break: TieBreak) -> Result<TallyResult, TallyError>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut continuing: Vec<&str> = Vec::with_capacity(candidates.len());
    for id in candidates {
        if !continuing.contains(&id.as_str()) {
            continuing.push(id.as_str());
        }
    }
    if continuing.is_empty() {
        return Err(TallyError::NoCandidates);
    }

    let ballots: Vec<&[String]> = ballots.into_iter().collect();
    let mut cursors = vec![0usize; ballots.len()];
    let total_votes = ballots.len();
    let majority = total_votes / 2 + 1;
    let mut rounds = Vec::new();

    while continuing.len() > 1 {
        let mut vote_counts: BTreeMap<String, u32> =
            continuing.iter().map(|c| (c.to_string(), 0)).collect();

        for (ballot, cursor) in ballots.iter().zip(&cursors) {
            if let Some(count) = ballot.get(*cursor).and_then(|c| vote_counts.get_mut(c)) {
                *count += 1;
            }
        }

        let count_of = |id: &str| vote_counts.get(id).copied().unwrap_or(0);

        if let Some(winner) = continuing
            .iter()
            .copied()
            .find(|c| count_of(*c) as usize >= majority)
        {
            let winner = winner.to_string();
            rounds.push(TallyRound {
                vote_counts,
                total_votes,
                majority,
                eliminated: None,
            });
            return Ok(TallyResult {
                winner,
                rounds,
                total_ballots: total_votes,
            });
        }

        let fewest = continuing.iter().map(|c| count_of(*c)).min().unwrap_or(0);
        let mut tied = continuing.iter().copied().filter(|c| count_of(*c) == fewest);
        let loser = match tie_break {
            TieBreak::RegistrationOrder => tied.next(),
            TieBreak::LexicographicId => tied.min(),
        };
        // `continuing` has at least two entries here, so a loser exists.
        let Some(loser) = loser else { break };

        tracing::trace!(loser, fewest, round = rounds.len() + 1, "candidate eliminated");
        continuing.retain(|c| *c != loser);
        for (ballot, cursor) in ballots.iter().zip(cursors.iter_mut()) {
            if ballot.get(*cursor).is_some_and(|c| c == loser) {
                *cursor += 1;
            }
        }
        rounds.push(TallyRound {
            vote_counts,
            total_votes,
            majority,
            eliminated: Some(loser.to_string()),
        });
    }

    Ok(TallyResult {
        winner: continuing[0].to_string(),
        rounds,
        total_ballots: total_votes,
    })
}
