//! Translation of effect definitions into target requirements

use crate::core::{EffectDef, TargetClass};
use serde::{Deserialize, Serialize};

/// One target choice an action needs before it can be confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Index of the effect (within the action's effect list) the targets feed
    pub effect_index: usize,
    pub class: TargetClass,
    pub count: u8,
    /// May be finalized with fewer targets than `count` when fewer legal ones exist
    pub allow_less: bool,
    pub exclude_self: bool,
}

impl Requirement {
    pub fn allows_players(&self) -> bool {
        self.class.allows_players()
    }

    /// Number of targets actually required given how many legal ones exist
    ///
    /// `None` means the requirement cannot be met at all.
    pub fn effective_count(&self, legal: usize) -> Option<usize> {
        let wanted = self.count as usize;
        if legal >= wanted {
            Some(wanted)
        } else if self.allow_less {
            Some(legal)
        } else {
            None
        }
    }
}

/// Build the requirement list for a sequence of effects
///
/// Pure and deterministic: the same effects always yield the same list, in
/// effect order. Untargeted effects contribute nothing.
pub fn build_requirements(effects: &[EffectDef]) -> Vec<Requirement> {
    effects
        .iter()
        .enumerate()
        .filter_map(|(effect_index, effect)| {
            let spec = effect.target()?;
            if spec.count == 0 {
                return None;
            }
            let creature_only = matches!(
                spec.class,
                TargetClass::FriendlyCreature | TargetClass::EnemyCreature | TargetClass::AnyCreature
            );
            Some(Requirement {
                effect_index,
                class: spec.class,
                count: spec.count,
                allow_less: creature_only || spec.count > 1,
                exclude_self: spec.exclude_self,
            })
        })
        .collect()
}
