//! Card Clash - command line driver
//!
//! Runs automated matches, either offline or as two replicated peers that
//! share an in-memory event store.

use cardclash::{
    core::{MatchId, Seat, TemplateId},
    game::{
        format_hash, AutoController, GameLogger, MatchSession, MatchSetup, RulesConfig,
        VerbosityLevel,
    },
    loader::{CardCatalog, DeckLoader},
    replication::{EventStore, MemoryEventStore, ReplicationClient},
    ClashError, Result,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "clash")]
#[command(about = "Card Clash - two-seat card battles with event-log replication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an automated match offline
    Simulate {
        /// Card catalog (.json)
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Deck file (.dck) for player 1
        #[arg(value_name = "PLAYER1_DECK")]
        deck1: PathBuf,

        /// Deck file (.dck) for player 2
        #[arg(value_name = "PLAYER2_DECK")]
        deck2: PathBuf,

        /// Seed for dice and shuffling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Verbosity level (silent/0, minimal/1, normal/2, verbose/3)
        #[arg(long, default_value = "normal")]
        verbosity: VerbosityLevel,

        /// Rules overrides (.json)
        #[arg(long, value_name = "RULES")]
        rules: Option<PathBuf>,

        /// Sleep through pacing delays instead of skipping them
        #[arg(long)]
        realtime: bool,
    },

    /// Play an automated match between two replicated peers
    Replicate {
        /// Card catalog (.json)
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Deck file (.dck) for player 1
        #[arg(value_name = "PLAYER1_DECK")]
        deck1: PathBuf,

        /// Deck file (.dck) for player 2
        #[arg(value_name = "PLAYER2_DECK")]
        deck2: PathBuf,

        /// Seed for dice and shuffling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Verbosity level (silent/0, minimal/1, normal/2, verbose/3)
        #[arg(long, default_value = "minimal")]
        verbosity: VerbosityLevel,

        /// Rules overrides (.json)
        #[arg(long, value_name = "RULES")]
        rules: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            catalog,
            deck1,
            deck2,
            seed,
            verbosity,
            rules,
            realtime,
        } => {
            run_simulate(
                &catalog,
                [&deck1, &deck2],
                seed,
                verbosity,
                rules,
                realtime,
            )
            .await?
        }
        Commands::Replicate {
            catalog,
            deck1,
            deck2,
            seed,
            verbosity,
            rules,
        } => run_replicate(&catalog, [&deck1, &deck2], seed, verbosity, rules).await?,
    }

    Ok(())
}

/// Catalog, both resolved decks and the rules of a run
struct Prepared {
    catalog: Arc<CardCatalog>,
    setup: MatchSetup,
    rules: RulesConfig,
}

fn prepare(
    catalog_path: &Path,
    decks: [&PathBuf; 2],
    seed: u64,
    rules: Option<PathBuf>,
) -> Result<Prepared> {
    let catalog = CardCatalog::load_from_file(catalog_path)?;
    println!("Loaded {} card templates", catalog.len());

    let mut resolved: [Vec<TemplateId>; 2] = [Vec::new(), Vec::new()];
    for (slot, path) in resolved.iter_mut().zip(decks) {
        let list = DeckLoader::load_from_file(path)?;
        *slot = list.resolve(&catalog)?;
        println!("  {}: {} cards", path.display(), slot.len());
    }

    let rules = match rules {
        Some(path) => RulesConfig::load_from_file(&path)?,
        None => RulesConfig::default(),
    };
    let setup = MatchSetup::new(format!("match-{seed}"), seed, ["Player 1", "Player 2"], resolved);
    Ok(Prepared {
        catalog: Arc::new(catalog),
        setup,
        rules,
    })
}

async fn run_simulate(
    catalog_path: &Path,
    decks: [&PathBuf; 2],
    seed: u64,
    verbosity: VerbosityLevel,
    rules: Option<PathBuf>,
    realtime: bool,
) -> Result<()> {
    let prepared = prepare(catalog_path, decks, seed, rules)?;

    let mut session = MatchSession::offline(prepared.catalog, prepared.rules);
    session.set_logger(GameLogger::with_verbosity(verbosity));
    session.start_match(prepared.setup)?;
    session.set_controller(Seat::FIRST, Box::new(AutoController::new("Player 1")));
    session.set_controller(Seat::SECOND, Box::new(AutoController::new("Player 2")));

    println!("\n=== Starting Match ===\n");
    if realtime {
        while let Some(due_in) = session.pacer().next_due_in() {
            if session.game().map_or(true, |g| g.is_finished()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(due_in)).await;
            session.tick(due_in);
        }
    } else {
        session.run_automation();
    }

    print_summary(&session);
    Ok(())
}

async fn run_replicate(
    catalog_path: &Path,
    decks: [&PathBuf; 2],
    seed: u64,
    verbosity: VerbosityLevel,
    rules: Option<PathBuf>,
) -> Result<()> {
    let prepared = prepare(catalog_path, decks, seed, rules)?;
    let match_id = prepared.setup.match_id.clone();
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());

    let mut peers = [
        peer(&prepared, &match_id, &store, Seat::FIRST, verbosity),
        peer(&prepared, &match_id, &store, Seat::SECOND, verbosity),
    ];
    peers[0].start_match(prepared.setup.clone())?;

    println!("\n=== Starting Replicated Match ===\n");
    let max_rounds = prepared.rules.max_turns as usize * 64;
    for _ in 0..max_rounds {
        let mut progressed = false;
        for session in peers.iter_mut() {
            let report = session.sync().await?;
            progressed |= report.applied > 0;
            session.run_automation();
        }
        let over = peers
            .iter()
            .all(|s| s.game().is_some_and(|g| g.is_finished()));
        let idle = peers
            .iter()
            .all(|s| s.client().is_some_and(|c| c.outbox_len() == 0));
        if over || (!progressed && idle) {
            break;
        }
    }
    for session in peers.iter_mut() {
        session.sync().await?;
    }

    let hashes: Vec<u64> = peers.iter().filter_map(|s| s.state_hash()).collect();
    println!("\n=== Replication Summary ===");
    println!("  Events in log: {}", store.snapshot(&match_id).await?.len());
    for (seat, hash) in Seat::both().iter().zip(&hashes) {
        println!("  Peer {seat}: state hash {}", format_hash(*hash));
    }
    print_summary(&peers[0]);

    if hashes.len() != 2 || hashes[0] != hashes[1] {
        return Err(ClashError::ProtocolViolation(
            "peers did not converge on the same state".into(),
        ));
    }
    // Equal hashes on a half-played match prove nothing
    for session in &peers {
        match session.game() {
            Some(game) if game.is_finished() => {}
            Some(game) => return Err(ClashError::MatchStalled { turn: game.turn }),
            None => return Err(ClashError::MatchStalled { turn: 0 }),
        }
    }
    println!("Peers converged");
    Ok(())
}

fn peer(
    prepared: &Prepared,
    match_id: &MatchId,
    store: &Arc<dyn EventStore>,
    seat: Seat,
    verbosity: VerbosityLevel,
) -> MatchSession {
    let client = ReplicationClient::new(match_id.clone(), Arc::clone(store));
    let mut session = MatchSession::networked(
        Arc::clone(&prepared.catalog),
        prepared.rules.clone(),
        client,
        &[seat],
    );
    let mut logger = GameLogger::with_verbosity(verbosity);
    logger.set_prefix(seat.to_string());
    session.set_logger(logger);
    session.set_controller(seat, Box::new(AutoController::new(format!("Player {}", seat.index() + 1))));
    session
}

fn print_summary(session: &MatchSession) {
    let Some(game) = session.game() else {
        println!("No match was played");
        return;
    };
    println!("\n=== Match Over ===");
    match game.winner {
        Some(winner) => println!("Winner: {}", game.player(winner).name),
        None => println!("No winner after {} turns", game.turn),
    }
    println!("Turns played: {}", game.turn);
    for player in &game.players {
        println!("  {}: {} life", player.name, player.life);
    }
}
