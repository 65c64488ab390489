//! Match rules, turn structure and the session driving them

// Verbose-only log line; compiled out (no format! allocation) without the feature
macro_rules! log_if_verbose {
    ($game:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $game.logger.verbose(&format!($($arg)*));
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$game;
        }
    };
}

pub mod auto_controller;
pub mod combat;
pub mod config;
pub mod controller;
pub mod effects;
pub mod logger;
pub mod pacing;
pub mod pending;
pub mod phase;
pub mod session;
pub mod setup;
pub mod state;
pub mod state_hash;

pub use auto_controller::AutoController;
pub use combat::{BlockingState, CombatExchange, CombatReport, CombatStage, CombatState};
pub use config::RulesConfig;
pub use controller::{AutomationHooks, Controller, GameStateView, PlayerAction};
pub use logger::{GameLogger, LogEntry, OutputMode, VerbosityLevel};
pub use pacing::{DeferredTask, Pacer, TaskId, TaskOwner};
pub use pending::{PendingAction, PendingKind};
pub use phase::{Phase, PhaseAdvance};
pub use session::MatchSession;
pub use setup::MatchSetup;
pub use state::GameState;
pub use state_hash::{compute_state_hash, format_hash};
