//! Card templates and card instances

use crate::core::{
    ActivatedAbility, BuffDuration, CardName, EffectDef, InstanceId, Passive, Seat, TemplateId,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Creature,
    Spell,
}

/// Immutable card definition, shared by every instance printed from it
///
/// For creatures `effects` are the on-summon effects chosen while the creature
/// is being played; for spells they are the spell's effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: TemplateId,
    pub name: CardName,
    pub kind: CardKind,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub toughness: i32,
    #[serde(default)]
    pub effects: Vec<EffectDef>,
    #[serde(default)]
    pub passives: Vec<Passive>,
    #[serde(default)]
    pub ability: Option<ActivatedAbility>,
}

impl CardTemplate {
    pub fn creature(id: impl Into<TemplateId>, name: &str, cost: u32, attack: i32, toughness: i32) -> Self {
        CardTemplate {
            id: id.into(),
            name: CardName::new(name),
            kind: CardKind::Creature,
            cost,
            attack,
            toughness,
            effects: Vec::new(),
            passives: Vec::new(),
            ability: None,
        }
    }

    pub fn spell(id: impl Into<TemplateId>, name: &str, cost: u32, effects: Vec<EffectDef>) -> Self {
        CardTemplate {
            id: id.into(),
            name: CardName::new(name),
            kind: CardKind::Spell,
            cost,
            attack: 0,
            toughness: 0,
            effects,
            passives: Vec::new(),
            ability: None,
        }
    }

    pub fn with_effects(mut self, effects: Vec<EffectDef>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_passive(mut self, passive: Passive) -> Self {
        self.passives.push(passive);
        self
    }

    pub fn with_ability(mut self, cost: u32, effects: Vec<EffectDef>) -> Self {
        self.ability = Some(ActivatedAbility { cost, effects });
        self
    }

    pub fn on_attack_effects(&self) -> Option<&[EffectDef]> {
        self.passives.iter().find_map(|p| match p {
            Passive::OnAttack { effects } => Some(effects.as_slice()),
            _ => None,
        })
    }

    pub fn on_enter_effects(&self) -> Option<&[EffectDef]> {
        self.passives.iter().find_map(|p| match p {
            Passive::OnEnter { effects } => Some(effects.as_slice()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buff {
    pub attack: i32,
    pub toughness: i32,
    pub duration: BuffDuration,
}

/// A card during play
///
/// `instance_id` is stable for the instance's whole life across zones; the
/// mutable fields only matter while it is on the battlefield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInstance {
    pub instance_id: InstanceId,
    pub template: Arc<CardTemplate>,
    pub owner: Seat,
    pub controller: Seat,
    pub base_attack: i32,
    pub base_toughness: i32,
    pub damage_marked: i32,
    pub buffs: SmallVec<[Buff; 2]>,
    pub summoning_sickness: bool,
    pub frozen_turns: u8,
    pub activated_this_turn: bool,
    pub unblockable_this_turn: bool,
    pub is_token: bool,
}

impl CardInstance {
    pub fn new(instance_id: InstanceId, template: Arc<CardTemplate>, owner: Seat) -> Self {
        CardInstance {
            instance_id,
            base_attack: template.attack,
            base_toughness: template.toughness,
            template,
            owner,
            controller: owner,
            damage_marked: 0,
            buffs: SmallVec::new(),
            summoning_sickness: false,
            frozen_turns: 0,
            activated_this_turn: false,
            unblockable_this_turn: false,
            is_token: false,
        }
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template.id
    }

    pub fn name(&self) -> &str {
        self.template.name.as_str()
    }

    pub fn cost(&self) -> u32 {
        self.template.cost
    }

    pub fn is_creature(&self) -> bool {
        self.template.kind == CardKind::Creature
    }

    /// Attack including buffs, never below zero
    pub fn current_attack(&self) -> i32 {
        let bonus: i32 = self.buffs.iter().map(|b| b.attack).sum();
        (self.base_attack + bonus).max(0)
    }

    pub fn current_toughness(&self) -> i32 {
        let bonus: i32 = self.buffs.iter().map(|b| b.toughness).sum();
        self.base_toughness + bonus
    }

    /// Damage still needed to destroy the creature
    pub fn remaining_toughness(&self) -> i32 {
        self.current_toughness() - self.damage_marked
    }

    pub fn has_lethal_damage(&self) -> bool {
        self.is_creature() && self.remaining_toughness() <= 0
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_turns > 0
    }

    pub fn add_buff(&mut self, attack: i32, toughness: i32, duration: BuffDuration) {
        self.buffs.push(Buff {
            attack,
            toughness,
            duration,
        });
    }

    /// Drop end-of-turn buffs and marked damage
    pub fn clear_end_of_turn(&mut self) {
        self.buffs.retain(|b| b.duration == BuffDuration::Permanent);
        self.damage_marked = 0;
        self.unblockable_this_turn = false;
    }

    /// Reset per-instance battlefield state when the card changes zones
    pub fn reset_for_zone_change(&mut self) {
        self.damage_marked = 0;
        self.buffs.clear();
        self.frozen_turns = 0;
        self.activated_this_turn = false;
        self.unblockable_this_turn = false;
        self.summoning_sickness = false;
        self.controller = self.owner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bear() -> CardInstance {
        let template = Arc::new(CardTemplate::creature("bear", "Bear", 2, 2, 2));
        CardInstance::new(InstanceId::new(1), template, Seat::FIRST)
    }

    #[test]
    fn test_buffs_and_damage() {
        let mut card = bear();
        assert_eq!(card.current_attack(), 2);
        assert_eq!(card.current_toughness(), 2);

        card.add_buff(2, 1, BuffDuration::EndOfTurn);
        card.add_buff(0, 1, BuffDuration::Permanent);
        assert_eq!(card.current_attack(), 4);
        assert_eq!(card.current_toughness(), 4);

        card.damage_marked = 3;
        assert!(!card.has_lethal_damage());

        card.clear_end_of_turn();
        assert_eq!(card.current_attack(), 2);
        assert_eq!(card.current_toughness(), 3);
        assert_eq!(card.damage_marked, 0);
    }

    #[test]
    fn test_attack_never_negative() {
        let mut card = bear();
        card.add_buff(-5, 0, BuffDuration::EndOfTurn);
        assert_eq!(card.current_attack(), 0);
    }
}
