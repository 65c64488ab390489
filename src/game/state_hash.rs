//! Deterministic state hashing for convergence checks
//!
//! Two peers that applied the same event log must end with the same hash.
//! The hash covers the canonical JSON of the match state, minus the
//! per-peer logger settings.

use crate::game::GameState;
use rustc_hash::FxHasher;
use serde_json::Value;
use std::hash::{Hash, Hasher};

/// Top-level state fields that differ between peers without affecting play
const PEER_LOCAL_FIELDS: &[&str] = &["logger"];

/// Canonical JSON of the gameplay-relevant part of `game`
///
/// `serde_json` maps keep keys sorted, so equal states give equal strings.
pub fn canonical_state(game: &GameState) -> crate::Result<String> {
    let mut value = serde_json::to_value(game)?;
    if let Value::Object(fields) = &mut value {
        for field in PEER_LOCAL_FIELDS {
            fields.remove(*field);
        }
    }
    Ok(value.to_string())
}

/// Hash of `canonical_state`; 0 (with a warning) if the state cannot be serialized
pub fn compute_state_hash(game: &GameState) -> u64 {
    match canonical_state(game) {
        Ok(canonical) => {
            let mut hasher = FxHasher::default();
            canonical.hash(&mut hasher);
            hasher.finish()
        }
        Err(e) => {
            game.logger
                .warn("state", &format!("cannot serialize state for hashing: {e}"));
            0
        }
    }
}

/// Short display form of a hash (high 32 bits as hex)
pub fn format_hash(hash: u64) -> String {
    format!("{:08x}", hash >> 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{RulesConfig, VerbosityLevel};
    use crate::loader::CardCatalog;
    use std::sync::Arc;

    fn game() -> GameState {
        GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        )
    }

    #[test]
    fn test_canonical_state_omits_logger() {
        let canonical = canonical_state(&game()).unwrap();
        let value: Value = serde_json::from_str(&canonical).unwrap();
        assert!(value.get("logger").is_none());
        assert_eq!(value["turn"], 1);
    }

    #[test]
    fn test_logger_settings_do_not_change_hash() {
        let a = game();
        let mut b = game();
        b.logger.set_verbosity(VerbosityLevel::Silent);
        assert_eq!(compute_state_hash(&a), compute_state_hash(&b));
    }

    #[test]
    fn test_gameplay_change_changes_hash() {
        let a = game();
        let mut b = game();
        b.player_mut(crate::core::Seat::FIRST).lose_life(1);
        assert_ne!(compute_state_hash(&a), compute_state_hash(&b));
        assert_eq!(format_hash(compute_state_hash(&a)).len(), 8);
    }
}
