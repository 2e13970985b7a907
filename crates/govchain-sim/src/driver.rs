//! Drives an office's active election one phase at a time, filling in mock
//! candidates and ballots the way an unattended simulation would.

use crate::config::{ConfigError, SimulationConfig};
use crate::keys::MockVoter;
use govchain_core::{ElectionPhase, GovernanceChain, GovernanceError, TallyResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PhaseStep {
    /// Nothing to drive.
    Idle,
    VotingOpened {
        election_id: String,
        mock_candidates_registered: usize,
    },
    Concluded {
        election_id: String,
        winner_id: String,
        winner_name: String,
        ballots: usize,
        rounds: usize,
    },
}

/// Candidate registration moves to voting, voting moves to tallying and
/// concludes.
pub fn advance_phase<R: Rng + ?Sized>(
    chain: &mut GovernanceChain,
    sim: &SimulationConfig,
    rng: &mut R,
) -> Result<PhaseStep, DriverError> {
    let office = sim.office.as_str();
    let Some(election) = chain.active_election(office) else {
        return Ok(PhaseStep::Idle);
    };
    let election_id = election.id.clone();
    let phase = election.phase;
    let candidate_ids = election.candidate_ids();

    match phase {
        ElectionPhase::CandidateRegistration => {
            let mut registered = 0;
            if candidate_ids.is_empty() {
                for profile in &sim.mock_candidates {
                    chain.register_candidate(&election_id, office, profile.clone())?;
                    registered += 1;
                }
            }
            chain.advance_to_voting(office)?;
            Ok(PhaseStep::VotingOpened {
                election_id,
                mock_candidates_registered: registered,
            })
        }
        ElectionPhase::Voting => {
            for i in 0..sim.mock_ballots {
                let mut ranking = candidate_ids.clone();
                ranking.shuffle(rng);
                let voter = MockVoter::generate(rng, i);
                chain.cast_vote(office, &voter.voter_id, &voter.public_key, ranking, &voter.signature)?;
            }
            info!(office, election = %election_id, ballots = sim.mock_ballots, "mock ballots cast");
            let results = chain.advance_to_tallying_and_conclude(office)?.results.clone();
            Ok(concluded(chain, office, election_id, results.as_ref()))
        }
        ElectionPhase::Tallying => {
            let results = chain.conclude_election(office)?.results.clone();
            Ok(concluded(chain, office, election_id, results.as_ref()))
        }
    }
}

fn concluded(
    chain: &GovernanceChain,
    office: &str,
    election_id: String,
    results: Option<&TallyResult>,
) -> PhaseStep {
    let holder = chain.registry().holder(office);
    PhaseStep::Concluded {
        election_id,
        winner_id: holder.map(|h| h.id.clone()).unwrap_or_default(),
        winner_name: holder.map(|h| h.name.clone()).unwrap_or_default(),
        ballots: results.map(|r| r.total_ballots).unwrap_or(0),
        rounds: results.map(|r| r.round_count()).unwrap_or(0),
    }
}
