//! Replay determinism tests
//!
//! A recorded event log must rebuild exactly the same match state every
//! time, whatever order the snapshot hands the events back in.

use cardclash::core::{MatchId, Seat, TemplateId};
use cardclash::game::state_hash::canonical_state;
use cardclash::game::{AutoController, GameLogger, GameState, MatchSession, MatchSetup, RulesConfig};
use cardclash::loader::{CardCatalog, DeckLoader};
use cardclash::replication::{EventStore, MatchEvent, MemoryEventStore, ReplicationClient};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use similar_asserts::assert_eq;
use std::sync::Arc;

fn catalog() -> Arc<CardCatalog> {
    Arc::new(CardCatalog::from_json(include_str!("../data/catalog.json")).unwrap())
}

fn setup(catalog: &CardCatalog, match_id: &str, seed: u64) -> MatchSetup {
    let deck = |text: &str| -> Vec<TemplateId> {
        DeckLoader::parse(text).unwrap().resolve(catalog).unwrap()
    };
    MatchSetup::new(
        match_id,
        seed,
        ["Alice", "Bob"],
        [
            deck(include_str!("../data/ember.dck")),
            deck(include_str!("../data/frost.dck")),
        ],
    )
}

fn quiet_logger() -> GameLogger {
    let mut logger = GameLogger::new();
    logger.enable_capture();
    logger
}

fn rules() -> RulesConfig {
    RulesConfig {
        max_turns: 6,
        ..RulesConfig::default()
    }
}

/// Play an automated replicated match and return its full event log
async fn record_match(catalog: &Arc<CardCatalog>, match_id: &MatchId) -> Vec<MatchEvent> {
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let mut peers: Vec<MatchSession> = Seat::both()
        .into_iter()
        .map(|seat| {
            let client = ReplicationClient::new(match_id.clone(), Arc::clone(&store));
            let mut session =
                MatchSession::networked(Arc::clone(catalog), rules(), client, &[seat]);
            session.set_logger(quiet_logger());
            session.set_controller(seat, Box::new(AutoController::new(seat.to_string())));
            session
        })
        .collect();

    peers[0]
        .start_match(setup(catalog, match_id.as_str(), 99))
        .unwrap();
    for _ in 0..2_000 {
        let mut progressed = false;
        for session in peers.iter_mut() {
            progressed |= session.sync().await.unwrap().applied > 0;
            session.run_automation();
        }
        let idle = peers
            .iter()
            .all(|s| s.client().is_some_and(|c| c.outbox_len() == 0));
        if !progressed && idle {
            break;
        }
    }

    store.snapshot(match_id).await.unwrap()
}

fn replay(catalog: &Arc<CardCatalog>, match_id: &MatchId, events: Vec<MatchEvent>) -> GameState {
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let mut client = ReplicationClient::new(match_id.clone(), store);
    let mut slot = None;
    let total = events.len();
    let report = client.ingest(&mut slot, events, catalog, &quiet_logger());
    assert_eq!(report.applied, total);
    slot.unwrap()
}

#[tokio::test]
async fn test_replay_rebuilds_identical_state() {
    let catalog = catalog();
    let match_id = MatchId::new("determinism");
    let events = record_match(&catalog, &match_id).await;
    assert!(events.len() > 10, "recorded only {} events", events.len());

    let first = replay(&catalog, &match_id, events.clone());
    let second = replay(&catalog, &match_id, events.clone());
    assert_eq!(
        canonical_state(&first).unwrap(),
        canonical_state(&second).unwrap()
    );

    let mut shuffled = events;
    shuffled.shuffle(&mut ChaCha12Rng::seed_from_u64(5));
    let third = replay(&catalog, &match_id, shuffled);
    assert_eq!(
        canonical_state(&first).unwrap(),
        canonical_state(&third).unwrap()
    );
}

#[tokio::test]
async fn test_replay_matches_live_peers() {
    let catalog = catalog();
    let match_id = MatchId::new("live");
    let events = record_match(&catalog, &match_id).await;

    // Replaying a prefix and then the rest lands on the same state
    let split = events.len() / 2;
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let mut client = ReplicationClient::new(match_id.clone(), store);
    let mut slot = None;
    let logger = quiet_logger();
    let mut sorted = events.clone();
    sorted.sort_by_key(|e| e.sequence);
    client.ingest(&mut slot, sorted[..split].to_vec(), &catalog, &logger);
    client.ingest(&mut slot, sorted.clone(), &catalog, &logger);

    let whole = replay(&catalog, &match_id, events);
    assert_eq!(
        canonical_state(&whole).unwrap(),
        canonical_state(slot.as_ref().unwrap()).unwrap()
    );
}

#[test]
fn test_offline_runs_with_same_seed_agree() {
    let run = || {
        let catalog = catalog();
        let mut session = MatchSession::offline(Arc::clone(&catalog), rules());
        session.set_logger(quiet_logger());
        session
            .start_match(setup(&catalog, "offline", 1234))
            .unwrap();
        session.set_controller(Seat::FIRST, Box::new(AutoController::new("Alice")));
        session.set_controller(Seat::SECOND, Box::new(AutoController::new("Bob")));
        session.run_automation();
        canonical_state(session.game().unwrap()).unwrap()
    };

    assert_eq!(run(), run());
}
