use crate::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

fn genesis_metrics() -> MetricsSnapshot {
    GovernanceConfig::default().genesis.initial_metrics
}

fn chain_with(clock: &ManualClock) -> GovernanceChain {
    GovernanceChain::with_parts(
        GovernanceConfig::default(),
        Box::new(clock.clone()),
        Box::new(RandomFingerprints::seeded(42)),
    )
}

fn profile(id: &str) -> CandidateProfile {
    CandidateProfile {
        id: id.into(),
        name: format!("Candidate {id}"),
        public_key: format!("0x{id}"),
        platform: "Platform".into(),
    }
}

fn ranking(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn register_all(chain: &mut GovernanceChain, election_id: &str, ids: &[&str]) {
    for id in ids {
        chain.register_candidate(election_id, "Governor", profile(id)).unwrap();
    }
}

/// Opens, fills and concludes one election where `A` is the only candidate.
fn run_trivial_election(chain: &mut GovernanceChain) -> String {
    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    register_all(chain, &id, &["A"]);
    chain.advance_to_voting("Governor").unwrap();
    chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["A"]), "0xsig")
        .unwrap();
    chain.advance_to_tallying_and_conclude("Governor").unwrap();
    id
}

#[test]
fn genesis_block_establishes_the_governor() {
    let clock = ManualClock::new(start());
    let chain = chain_with(&clock);

    assert_eq!(chain.ledger().len(), 1);
    let genesis = &chain.ledger().blocks()[0];
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.previous_fingerprint, "0");
    assert!(matches!(
        &genesis.transactions[..],
        [Transaction::OfficeInit { office, .. }] if office == "Governor"
    ));

    let holder = chain.registry().holder("Governor").unwrap();
    assert_eq!(holder.id, "official_001");
    assert_eq!(holder.term_start, start() - Duration::days(365));
    assert_eq!(holder.term_length(), Duration::days(1460));

    let record = chain.metrics().get("Governor").unwrap();
    assert_eq!(record.baseline, Some(genesis_metrics()));
    assert_eq!(record.current, genesis_metrics());
}

#[test]
fn approval_collapse_opens_an_election() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    let report = chain
        .update_metrics(
            "Governor",
            MetricsSnapshot {
                approval_rating: 30.0,
                ..genesis_metrics()
            },
        )
        .unwrap();

    assert_eq!(report.triggers.len(), 1);
    assert_eq!(report.triggers[0].kind, TriggerKind::ApprovalCollapse);
    assert_eq!(report.triggers[0].severity, Severity::Critical);

    let opened = report.opened_election.clone().unwrap();
    let election = chain.active_election("Governor").unwrap();
    assert_eq!(election.id, opened);
    assert_eq!(election.phase, ElectionPhase::CandidateRegistration);
    assert_eq!(election.status, ElectionStatus::Active);
    assert_eq!(election.triggers, report.triggers);

    let kinds: Vec<_> = chain
        .ledger()
        .blocks()
        .iter()
        .flat_map(|b| b.transactions.iter().map(Transaction::type_name))
        .collect();
    assert_eq!(kinds, vec!["OFFICE_INIT", "METRICS_UPDATE", "ELECTION_INITIATED"]);
    match &chain.ledger().blocks()[2].transactions[0] {
        Transaction::ElectionInitiated {
            trigger_types,
            autonomous,
            ..
        } => {
            assert_eq!(trigger_types, &vec![TriggerKind::ApprovalCollapse]);
            assert!(*autonomous);
        }
        other => panic!("unexpected transaction {other:?}"),
    }
}

#[test]
fn repeated_evaluation_is_stable() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let first = chain
        .update_metrics(
            "Governor",
            MetricsSnapshot {
                approval_rating: 30.0,
                ..genesis_metrics()
            },
        )
        .unwrap();
    let height = chain.ledger().len();

    let second = chain.evaluate_triggers("Governor").unwrap();
    let third = chain.evaluate_triggers("Governor").unwrap();

    assert_eq!(second.triggers, first.triggers);
    assert_eq!(second, third);
    assert_eq!(second.opened_election, None);
    assert_eq!(chain.ledger().len(), height);
    assert_eq!(chain.elections().active_elections().len(), 1);
}

#[test]
fn steady_metrics_open_nothing() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let report = chain.update_metrics("Governor", genesis_metrics()).unwrap();
    assert!(report.triggers.is_empty());
    assert_eq!(report.opened_election, None);
    assert!(chain.active_election("Governor").is_none());
}

#[test]
fn ballots_only_land_while_voting() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    let err = chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["A"]), "0xsig")
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::NoActiveElection { .. })
    ));
    assert_eq!(chain.ledger().len(), 1);

    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    register_all(&mut chain, &id, &["A", "B"]);
    let height = chain.ledger().len();

    let err = chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["A"]), "0xsig")
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::NotInVotingPhase { .. })
    ));
    assert_eq!(chain.ledger().len(), height);
    assert!(chain.active_election("Governor").unwrap().votes.is_empty());

    chain.advance_to_voting("Governor").unwrap();
    let err = chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["A", "B", "A"]), "0xsig")
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::DuplicateRanking { .. })
    ));
    assert_eq!(chain.ledger().len(), height);

    let ballot = chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["B", "ghost"]), "0xsig")
        .unwrap();
    assert_eq!(ballot.ranked_choices, ranking(&["B", "ghost"]));
    let fingerprint = ballot.vote_fingerprint.clone();

    assert_eq!(chain.ledger().len(), height + 1);
    match &chain.ledger().last().unwrap().transactions[0] {
        Transaction::VoteCast {
            election_id,
            vote_fingerprint,
            voter_key,
            ..
        } => {
            assert_eq!(election_id, &id);
            assert_eq!(vote_fingerprint, &fingerprint);
            assert_eq!(voter_key, "0xkey");
        }
        other => panic!("unexpected transaction {other:?}"),
    }
}

#[test]
fn ranked_choice_election_seats_winner_and_resets_baseline() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    let current = MetricsSnapshot {
        gdp: 96.0,
        education_ranking: 18,
        approval_rating: 30.0,
        unemployment_rate: 5.0,
        infrastructure_score: 70.0,
    };
    let id = chain
        .update_metrics("Governor", current)
        .unwrap()
        .opened_election
        .unwrap();

    register_all(&mut chain, &id, &["A", "B", "C"]);
    chain.advance_to_voting("Governor").unwrap();
    for (i, ballot) in [
        ["A", "B", "C"],
        ["B", "A", "C"],
        ["C", "B", "A"],
        ["A", "C", "B"],
        ["B", "C", "A"],
    ]
    .iter()
    .enumerate()
    {
        chain
            .cast_vote("Governor", &format!("voter_{i}"), "0xkey", ranking(ballot), "0xsig")
            .unwrap();
    }

    clock.advance(Duration::days(10));
    let archived = chain.advance_to_tallying_and_conclude("Governor").unwrap();
    assert_eq!(archived.id, id);
    assert_eq!(archived.status, ElectionStatus::Completed);
    assert_eq!(archived.phase, ElectionPhase::Tallying);
    assert_eq!(archived.completed_at, Some(start() + Duration::days(10)));
    let results = archived.results.clone().unwrap();
    assert_eq!(results.winner, "B");
    assert_eq!(results.round_count(), 2);

    let holder = chain.registry().holder("Governor").unwrap();
    assert_eq!(holder.id, "B");
    assert_eq!(holder.public_key, "0xB");
    assert_eq!(holder.term_start, start() + Duration::days(10));
    assert_eq!(holder.term_length(), Duration::days(4 * 365));

    match &chain.ledger().last().unwrap().transactions[0] {
        Transaction::ElectionConcluded {
            winner_id,
            total_votes,
            round_count,
            new_holder,
            ..
        } => {
            assert_eq!(winner_id, "B");
            assert_eq!(*total_votes, 5);
            assert_eq!(*round_count, 2);
            assert_eq!(new_holder, holder);
        }
        other => panic!("unexpected transaction {other:?}"),
    }

    let record = chain.metrics().get("Governor").unwrap();
    let baseline = record.baseline.unwrap();
    assert_eq!(baseline.approval_rating, 55.0);
    assert_eq!(baseline.gdp, current.gdp);
    assert_eq!(baseline.education_ranking, current.education_ranking);
    assert_eq!(baseline.unemployment_rate, current.unemployment_rate);
    assert_eq!(baseline.infrastructure_score, current.infrastructure_score);
    assert_eq!(record.current, baseline);
    assert_eq!(
        record.history.last().and_then(|h| h.event),
        Some(metrics::HistoryEvent::NewTermStart)
    );

    assert!(chain.active_election("Governor").is_none());
    assert_eq!(chain.elections().completed("Governor").count(), 1);
    assert_eq!(chain.ledger().verify_linkage(), Ok(()));
}

#[test]
fn phases_never_move_backward() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    register_all(&mut chain, &id, &["A"]);

    chain.advance_to_voting("Governor").unwrap();
    let err = chain.advance_to_voting("Governor").unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::InvalidPhaseTransition {
            from: ElectionPhase::Voting,
            to: ElectionPhase::Voting,
            ..
        })
    ));
    assert_eq!(
        chain.active_election("Governor").unwrap().phase,
        ElectionPhase::Voting
    );
}

#[test]
fn concluding_without_candidates_or_ballots_is_fatal() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    chain.advance_to_voting("Governor").unwrap();
    let height = chain.ledger().len();

    let err = chain.advance_to_tallying_and_conclude("Governor").unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::Fatal(FatalInvariantViolation::NoCandidates { .. }))
    ));

    register_all(&mut chain, &id, &["A"]);
    let height = height + 1;
    let err = chain.conclude_election("Governor").unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::Fatal(FatalInvariantViolation::NoBallots { .. }))
    ));

    let election = chain.active_election("Governor").unwrap();
    assert_eq!(election.phase, ElectionPhase::Voting);
    assert_eq!(election.status, ElectionStatus::Active);
    assert_eq!(chain.ledger().len(), height);
    assert_eq!(chain.registry().holder("Governor").unwrap().id, "official_001");
}

#[test]
fn only_one_election_per_office() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    let height = chain.ledger().len();

    let err = chain
        .initiate_election("Governor", Vec::new(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::AlreadyActive { ref election_id, .. }) if *election_id == id
    ));
    assert_eq!(chain.ledger().len(), height);

    let report = chain
        .update_metrics(
            "Governor",
            MetricsSnapshot {
                gdp: 80.0,
                ..genesis_metrics()
            },
        )
        .unwrap();
    assert_eq!(report.triggers[0].kind, TriggerKind::GdpDecline);
    assert_eq!(report.opened_election, None);
    assert_eq!(chain.active_election("Governor").unwrap().id, id);
}

#[test]
fn registration_checks_election_id() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    chain.initiate_election("Governor", Vec::new(), false).unwrap();
    let height = chain.ledger().len();

    let err = chain
        .register_candidate("election_Governor_0-99", "Governor", profile("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::Election(ElectionError::ElectionMismatch { .. })
    ));
    assert_eq!(chain.ledger().len(), height);
}

#[test]
fn history_keeps_five_most_recent_elections() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(run_trivial_election(&mut chain));
        clock.advance(Duration::hours(1));
    }

    let history: Vec<_> = chain
        .elections()
        .completed("Governor")
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0], ids[5]);
    assert!(!history.contains(&ids[0]));
    assert_eq!(chain.registry().holder("Governor").unwrap().id, "A");

    let concluded = chain
        .ledger()
        .find_transactions(|t| matches!(t, Transaction::ElectionConcluded { .. }));
    assert_eq!(concluded.len(), 6);
}

#[test]
fn zero_history_capacity_still_reports_the_conclusion() {
    let clock = ManualClock::new(start());
    let mut chain = GovernanceChain::with_parts(
        GovernanceConfig {
            completed_history_capacity: 0,
            ..GovernanceConfig::default()
        },
        Box::new(clock.clone()),
        Box::new(RandomFingerprints::seeded(42)),
    );

    let id = chain.initiate_election("Governor", Vec::new(), false).unwrap();
    register_all(&mut chain, &id, &["A"]);
    chain.advance_to_voting("Governor").unwrap();
    chain
        .cast_vote("Governor", "voter_1", "0xkey", ranking(&["A"]), "0xsig")
        .unwrap();

    let archived = chain.advance_to_tallying_and_conclude("Governor").unwrap();
    assert_eq!(archived.id, id);
    assert_eq!(archived.status, ElectionStatus::Completed);
    assert_eq!(chain.registry().holder("Governor").unwrap().id, "A");
    assert_eq!(chain.elections().completed("Governor").count(), 1);
}

#[test]
fn expired_term_forces_an_election() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    clock.advance(Duration::days(1095) - Duration::milliseconds(1));
    let report = chain.evaluate_triggers("Governor").unwrap();
    assert!(report.triggers.is_empty());

    clock.advance(Duration::milliseconds(1));
    let report = chain.evaluate_triggers("Governor").unwrap();
    assert_eq!(report.triggers.len(), 1);
    assert_eq!(report.triggers[0].kind, TriggerKind::TermComplete);
    assert_eq!(report.triggers[0].severity, Severity::Mandatory);
    assert!(report.opened_election.is_some());
}

#[test]
fn vacant_office_uses_absolute_thresholds() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);

    assert!(matches!(
        chain.compute_triggers("Mayor"),
        Err(GovernanceError::UnknownOffice(_))
    ));

    let report = chain
        .update_metrics(
            "Mayor",
            MetricsSnapshot {
                approval_rating: 30.0,
                ..genesis_metrics()
            },
        )
        .unwrap();
    assert_eq!(report.triggers.len(), 1);
    assert_eq!(report.triggers[0].kind, TriggerKind::LowApproval);
    assert!(chain.metrics().get("Mayor").unwrap().baseline.is_none());

    let id = report.opened_election.unwrap();
    chain.register_candidate(&id, "Mayor", profile("M")).unwrap();
    chain.advance_to_voting("Mayor").unwrap();
    chain
        .cast_vote("Mayor", "voter_1", "0xkey", ranking(&["M"]), "0xsig")
        .unwrap();
    chain.advance_to_tallying_and_conclude("Mayor").unwrap();

    assert_eq!(chain.registry().holder("Mayor").unwrap().id, "M");
    let baseline = chain.metrics().get("Mayor").unwrap().baseline.unwrap();
    assert_eq!(baseline.approval_rating, 55.0);
    assert_eq!(baseline.gdp, 100.0);
}

#[test]
fn establish_office_adds_a_second_seat() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    let holder = OfficeHolder {
        id: "official_002".into(),
        name: "Treasurer One".into(),
        public_key: "0x02".into(),
        term_start: start(),
        term_length_ms: Duration::days(1460).num_milliseconds(),
    };

    let err = chain
        .establish_office("Governor", holder.clone(), genesis_metrics())
        .unwrap_err();
    assert!(matches!(err, GovernanceError::OfficeAlreadyEstablished(_)));

    chain
        .establish_office("Treasurer", holder.clone(), genesis_metrics())
        .unwrap();
    assert_eq!(chain.registry().holder("Treasurer"), Some(&holder));
    assert_eq!(
        chain.metrics().get("Treasurer").unwrap().baseline,
        Some(genesis_metrics())
    );
    assert_eq!(chain.ledger().len(), 2);
    assert!(chain.evaluate_triggers("Treasurer").unwrap().triggers.is_empty());
}

#[test]
fn digest_fingerprints_keep_the_chain_linked() {
    let clock = ManualClock::new(start());
    let mut chain = GovernanceChain::with_parts(
        GovernanceConfig::default(),
        Box::new(clock.clone()),
        Box::new(DigestFingerprints),
    );
    run_trivial_election(&mut chain);
    chain.update_metrics("Governor", genesis_metrics()).unwrap();

    assert_eq!(chain.ledger().verify_linkage(), Ok(()));
    for (i, block) in chain.ledger().blocks().iter().enumerate() {
        assert_eq!(block.index, i as u64);
        assert_eq!(block.fingerprint.len(), 66);
    }
}

#[test]
fn exported_state_lists_every_section() {
    let clock = ManualClock::new(start());
    let mut chain = chain_with(&clock);
    chain.initiate_election("Governor", Vec::new(), false).unwrap();

    let json: serde_json::Value = serde_json::from_str(&chain.export_json().unwrap()).unwrap();
    assert_eq!(json["blocks"][0]["transactions"][0]["type"], "OFFICE_INIT");
    assert_eq!(json["office_holders"]["Governor"]["name"], "Sarah Chen");
    assert_eq!(json["metrics"]["Governor"]["baseline"]["approval_rating"], 55.0);
    assert_eq!(
        json["active_elections"]["Governor"]["phase"],
        "candidate_registration"
    );
    assert!(json["completed_elections"].as_object().unwrap().is_empty());
}
