//! Card effects, target classes and passive abilities

use crate::core::{InstanceId, Seat, TemplateId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chosen target: a creature (by instance id and controller) or a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Creature { instance: InstanceId, controller: Seat },
    Player { seat: Seat },
}

impl Target {
    pub fn creature(instance: InstanceId, controller: Seat) -> Self {
        Target::Creature {
            instance,
            controller,
        }
    }

    pub fn player(seat: Seat) -> Self {
        Target::Player { seat }
    }

    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            Target::Creature { instance, .. } => Some(*instance),
            Target::Player { .. } => None,
        }
    }

    /// Seat that owns the target (the creature's controller or the player)
    pub fn seat(&self) -> Seat {
        match self {
            Target::Creature { controller, .. } => *controller,
            Target::Player { seat } => *seat,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Creature { instance, .. } => write!(f, "creature {instance}"),
            Target::Player { seat } => write!(f, "player {seat}"),
        }
    }
}

/// Which objects a targeted effect may choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    /// A creature controlled by the acting seat
    FriendlyCreature,
    /// A creature controlled by the opponent
    EnemyCreature,
    /// Any creature; may be satisfied with fewer targets than requested
    AnyCreature,
    /// Any creature or any player
    Any,
    /// Any creature; the full count is mandatory
    Creature,
}

impl TargetClass {
    pub fn allows_players(&self) -> bool {
        matches!(self, TargetClass::Any)
    }
}

/// Target declaration attached to an effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub class: TargetClass,
    #[serde(default = "one")]
    pub count: u8,
    /// The effect's own source creature is never a legal target
    #[serde(default)]
    pub exclude_self: bool,
}

fn one() -> u8 {
    1
}

impl TargetSpec {
    pub fn single(class: TargetClass) -> Self {
        TargetSpec {
            class,
            count: 1,
            exclude_self: false,
        }
    }

    pub fn many(class: TargetClass, count: u8) -> Self {
        TargetSpec {
            class,
            count,
            exclude_self: false,
        }
    }

    pub fn excluding_self(mut self) -> Self {
        self.exclude_self = true;
        self
    }
}

/// How long a stat modification lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffDuration {
    EndOfTurn,
    Permanent,
}

/// Effect definitions a card template can carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectDef {
    /// Deal damage to each chosen target
    Damage { amount: i32, target: TargetSpec },

    /// Remove marked damage from creatures, or restore life to players
    Heal { amount: i32, target: TargetSpec },

    /// Modify attack/toughness
    Buff {
        attack: i32,
        toughness: i32,
        duration: BuffDuration,
        target: TargetSpec,
    },

    /// Creature cannot attack or block for a number of its controller's turns
    Freeze { turns: u8, target: TargetSpec },

    /// Destroy a creature outright
    Destroy { target: TargetSpec },

    /// Controller draws cards
    Draw { count: u8 },

    /// Put token creatures onto the controller's battlefield
    SummonToken { template: TemplateId, count: u8 },

    /// Combat damage to the controller is prevented for the rest of the turn
    PreventCombatDamage,

    /// Creature cannot be assigned a blocker this turn
    GrantUnblockable { target: TargetSpec },
}

impl EffectDef {
    /// Target declaration, if the effect needs chosen targets
    pub fn target(&self) -> Option<&TargetSpec> {
        match self {
            EffectDef::Damage { target, .. }
            | EffectDef::Heal { target, .. }
            | EffectDef::Buff { target, .. }
            | EffectDef::Freeze { target, .. }
            | EffectDef::Destroy { target }
            | EffectDef::GrantUnblockable { target } => Some(target),
            EffectDef::Draw { .. }
            | EffectDef::SummonToken { .. }
            | EffectDef::PreventCombatDamage => None,
        }
    }

    /// Effects that help whatever they target
    pub fn is_beneficial(&self) -> bool {
        match self {
            EffectDef::Heal { .. } | EffectDef::GrantUnblockable { .. } => true,
            EffectDef::Buff {
                attack, toughness, ..
            } => attack + toughness >= 0,
            _ => false,
        }
    }

    pub fn damage_amount(&self) -> Option<i32> {
        match self {
            EffectDef::Damage { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// Activated ability: pay mana once per turn to apply effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub cost: u32,
    pub effects: Vec<EffectDef>,
}

/// Passive abilities that trigger on their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Passive {
    /// Triggers when the creature is declared as an attacker
    OnAttack { effects: Vec<EffectDef> },
    /// Forced trigger after the creature enters the battlefield
    OnEnter { effects: Vec<EffectDef> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_target_lookup() {
        let bolt = EffectDef::Damage {
            amount: 3,
            target: TargetSpec::single(TargetClass::Any),
        };
        assert_eq!(bolt.target().map(|t| t.class), Some(TargetClass::Any));
        assert_eq!(bolt.damage_amount(), Some(3));
        assert!(!bolt.is_beneficial());

        let draw = EffectDef::Draw { count: 2 };
        assert!(draw.target().is_none());
    }

    #[test]
    fn test_negative_buff_is_not_beneficial() {
        let shrink = EffectDef::Buff {
            attack: -2,
            toughness: -2,
            duration: BuffDuration::EndOfTurn,
            target: TargetSpec::single(TargetClass::EnemyCreature),
        };
        assert!(!shrink.is_beneficial());
    }

    #[test]
    fn test_effect_json_shape() {
        let json = r#"{"effect":"damage","amount":2,"target":{"class":"enemy_creature"}}"#;
        let effect: EffectDef = serde_json::from_str(json).unwrap();
        assert_eq!(
            effect,
            EffectDef::Damage {
                amount: 2,
                target: TargetSpec::single(TargetClass::EnemyCreature),
            }
        );
    }
}
