//! Rules configuration

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric rules and pacing knobs for a match
///
/// Both peers of a replicated match must use the same values; the
/// `MATCH_STARTED` event carries them so a joining peer adopts the author's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub starting_life: i32,
    pub starting_hand: u8,
    pub mana_ceiling: u32,
    pub draw_per_turn: u8,
    /// Guard for automated runs
    pub max_turns: u32,
    /// Pause before combat resolves when the defender cannot block
    pub block_skip_delay_ms: u64,
    /// Pause before an automated seat acts
    pub automation_delay_ms: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            starting_life: 20,
            starting_hand: 4,
            mana_ceiling: 10,
            draw_per_turn: 1,
            max_turns: 200,
            block_skip_delay_ms: 800,
            automation_delay_ms: 400,
        }
    }
}

impl RulesConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let rules = RulesConfig::from_json(r#"{"starting_life": 12}"#).unwrap();
        assert_eq!(rules.starting_life, 12);
        assert_eq!(rules.mana_ceiling, 10);
        assert_eq!(rules.block_skip_delay_ms, 800);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(RulesConfig::from_json("{not json").is_err());
    }
}
