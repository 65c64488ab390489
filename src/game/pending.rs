//! Pending action resolver
//!
//! A pending action is the one in-flight play (summon, spell, trigger or
//! activated ability) collecting targets before it resolves. Life cycle:
//! collecting -> awaiting confirmation -> resolved | cancelled. Every mutator
//! here keeps `GameState::pending` to at most one action.

use crate::core::{EffectDef, InstanceId, Seat, Target};
use crate::game::GameState;
use crate::targeting::{build_requirements, is_target_valid, legal_targets, PendingContext, Requirement};
use crate::zones::Zone;
use crate::{ClashError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Summon,
    Spell,
    Trigger,
    Ability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: u64,
    pub kind: PendingKind,
    pub controller: Seat,
    /// The card being played, or the creature whose trigger/ability this is
    pub source: InstanceId,
    pub source_name: String,
    pub effects: Vec<EffectDef>,
    pub requirements: Vec<Requirement>,
    /// Targets each requirement actually needs, fixed when the action opens
    pub required_counts: Vec<usize>,
    pub requirement_index: usize,
    /// Effect index -> finalized targets
    pub chosen_targets: BTreeMap<usize, Vec<Target>>,
    /// Targets picked so far for the current requirement
    pub selected_targets: Vec<Target>,
    pub awaiting_confirmation: bool,
    pub cancellable: bool,
    /// Mana paid up front, refunded on cancel
    pub paid_mana: u32,
    /// Where the card sat in hand, for putting it back on cancel
    pub hand_position: Option<usize>,
    /// An attack trigger: resolving it continues the combat trigger queue
    pub resumes_combat: bool,
}

impl PendingAction {
    pub fn current_requirement(&self) -> Option<&Requirement> {
        if self.awaiting_confirmation {
            return None;
        }
        self.requirements.get(self.requirement_index)
    }

    /// Effect the current requirement feeds
    pub fn current_effect(&self) -> Option<&EffectDef> {
        self.current_requirement()
            .and_then(|req| self.effects.get(req.effect_index))
    }

    pub fn context(&self) -> PendingContext<'_> {
        PendingContext::new(self.controller, Some(self.source)).with_selected(&self.selected_targets)
    }

    /// Finalize every requirement that needs no more targets
    fn settle(&mut self) {
        while let Some(req) = self.requirements.get(self.requirement_index) {
            let needed = self.required_counts[self.requirement_index];
            if self.selected_targets.len() < needed {
                return;
            }
            let picked = std::mem::take(&mut self.selected_targets);
            self.chosen_targets.insert(req.effect_index, picked);
            self.requirement_index += 1;
        }
        self.awaiting_confirmation = true;
    }
}

/// Seed for a new pending action
struct PendingDraft {
    kind: PendingKind,
    controller: Seat,
    source: InstanceId,
    source_name: String,
    effects: Vec<EffectDef>,
    cancellable: bool,
    resumes_combat: bool,
    /// Unmeetable mandatory requirements shrink to zero instead of failing
    lenient: bool,
}

impl GameState {
    /// Build requirements and their effective counts against the current board
    ///
    /// Fails with "No legal targets" when a mandatory requirement cannot be met.
    fn plan_requirements(
        &self,
        controller: Seat,
        source: InstanceId,
        effects: &[EffectDef],
        lenient: bool,
    ) -> Result<(Vec<Requirement>, Vec<usize>)> {
        let requirements = build_requirements(effects);
        let ctx = PendingContext::new(controller, Some(source));
        let mut counts = Vec::with_capacity(requirements.len());
        for req in &requirements {
            let legal = legal_targets(self, req, &ctx).len();
            match req.effective_count(legal) {
                Some(count) => counts.push(count),
                None if lenient => counts.push(0),
                None => return Err(ClashError::InvalidAction("No legal targets".into())),
            }
        }
        Ok((requirements, counts))
    }

    fn open_pending(
        &mut self,
        draft: PendingDraft,
        paid_mana: u32,
        hand_position: Option<usize>,
    ) -> Result<u64> {
        self.require_no_pending()?;
        let (requirements, required_counts) =
            self.plan_requirements(draft.controller, draft.source, &draft.effects, draft.lenient)?;
        let id = self.allocate_pending_id();
        let mut pending = PendingAction {
            id,
            kind: draft.kind,
            controller: draft.controller,
            source: draft.source,
            source_name: draft.source_name,
            effects: draft.effects,
            requirements,
            required_counts,
            requirement_index: 0,
            chosen_targets: BTreeMap::new(),
            selected_targets: Vec::new(),
            awaiting_confirmation: false,
            cancellable: draft.cancellable,
            paid_mana,
            hand_position,
            resumes_combat: draft.resumes_combat,
        };
        pending.settle();
        log_if_verbose!(
            self,
            "Pending #{} opened: {:?} {} ({} requirement(s))",
            id,
            pending.kind,
            pending.source_name,
            pending.requirements.len()
        );
        self.pending = Some(pending);
        Ok(id)
    }

    /// Checks shared by playing from hand: active seat, main phase, card in
    /// hand, affordable
    fn check_playable(&self, seat: Seat, id: InstanceId) -> Result<()> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        if !self.phase.is_main() {
            return Err(ClashError::InvalidAction(
                "cards can only be played in a main phase".into(),
            ));
        }
        if !self.player(seat).zones.hand.contains(id) {
            return Err(ClashError::InvalidAction(format!(
                "{id} is not in {seat}'s hand"
            )));
        }
        let card = self.card(id)?;
        if !self.player(seat).can_afford(card.cost()) {
            return Err(ClashError::InvalidAction(format!(
                "not enough mana to play {}",
                card.name()
            )));
        }
        Ok(())
    }

    /// Whether `seat` could play `id` from hand right now
    pub fn can_play(&self, seat: Seat, id: InstanceId) -> bool {
        if self.check_playable(seat, id).is_err() {
            return false;
        }
        match self.card(id) {
            Ok(card) if card.is_creature() => true,
            Ok(card) => self
                .plan_requirements(seat, id, &card.template.effects, false)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Play a card from hand: creatures are summoned, spells prepared
    pub fn play_card(&mut self, seat: Seat, id: InstanceId) -> Result<u64> {
        if self.card(id)?.is_creature() {
            self.play_creature(seat, id)
        } else {
            self.prepare_spell(seat, id)
        }
    }

    /// Start summoning a creature from hand
    ///
    /// Mana is paid and the card leaves the hand now; on-summon targets that
    /// cannot be met are skipped rather than blocking the summon.
    pub fn play_creature(&mut self, seat: Seat, id: InstanceId) -> Result<u64> {
        self.check_playable(seat, id)?;
        let card = self.card(id)?;
        if !card.is_creature() {
            return Err(ClashError::InvalidAction(format!(
                "{} is not a creature",
                card.name()
            )));
        }
        let draft = PendingDraft {
            kind: PendingKind::Summon,
            controller: seat,
            source: id,
            source_name: card.name().to_string(),
            effects: card.template.effects.clone(),
            cancellable: true,
            resumes_combat: false,
            lenient: true,
        };
        self.pay_from_hand(seat, id, draft)
    }

    /// Start casting a spell from hand
    pub fn prepare_spell(&mut self, seat: Seat, id: InstanceId) -> Result<u64> {
        self.check_playable(seat, id)?;
        let card = self.card(id)?;
        if card.is_creature() {
            return Err(ClashError::InvalidAction(format!(
                "{} is not a spell",
                card.name()
            )));
        }
        let draft = PendingDraft {
            kind: PendingKind::Spell,
            controller: seat,
            source: id,
            source_name: card.name().to_string(),
            effects: card.template.effects.clone(),
            cancellable: true,
            resumes_combat: false,
            lenient: false,
        };
        self.pay_from_hand(seat, id, draft)
    }

    fn pay_from_hand(&mut self, seat: Seat, id: InstanceId, draft: PendingDraft) -> Result<u64> {
        // Validate targets before anything is paid
        self.plan_requirements(seat, id, &draft.effects, draft.lenient)?;

        let cost = self.card(id)?.cost();
        let name = draft.source_name.clone();
        let kind = draft.kind;
        let position = self.player(seat).zones.hand.position(id);
        self.player_mut(seat).zones.hand.remove(id);
        self.player_mut(seat).spend_mana(cost);

        let pending_id = self.open_pending(draft, cost, position)?;
        let player = self.player(seat).name.clone();
        match kind {
            PendingKind::Summon => self.record(format!("{player} plays {name}")),
            _ => self.record(format!("{player} prepares {name}")),
        }
        Ok(pending_id)
    }

    /// Whether `id`'s activated ability could be used by `seat` right now
    pub fn can_activate(&self, seat: Seat, id: InstanceId) -> Result<()> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        if !self.phase.is_main() {
            return Err(ClashError::InvalidAction(
                "abilities can only be activated in a main phase".into(),
            ));
        }
        if self.battlefield_seat(id) != Some(seat) {
            return Err(ClashError::InvalidAction(format!(
                "{id} is not on {seat}'s battlefield"
            )));
        }
        let card = self.card(id)?;
        let Some(ability) = card.template.ability.as_ref() else {
            return Err(ClashError::InvalidAction(format!(
                "{} has no activated ability",
                card.name()
            )));
        };
        if card.activated_this_turn {
            return Err(ClashError::InvalidAction(format!(
                "{} was already activated this turn",
                card.name()
            )));
        }
        if card.is_frozen() {
            return Err(ClashError::InvalidAction(format!("{} is frozen", card.name())));
        }
        if !self.player(seat).can_afford(ability.cost) {
            return Err(ClashError::InvalidAction(format!(
                "not enough mana to activate {}",
                card.name()
            )));
        }
        self.plan_requirements(seat, id, &ability.effects, false)?;
        Ok(())
    }

    /// Pay for and open an activated ability
    pub fn activate_ability(&mut self, seat: Seat, id: InstanceId) -> Result<u64> {
        self.can_activate(seat, id)?;
        let card = self.card(id)?;
        let (cost, effects) = match card.template.ability.as_ref() {
            Some(ability) => (ability.cost, ability.effects.clone()),
            None => return Err(ClashError::InvalidAction("no activated ability".into())),
        };
        let draft = PendingDraft {
            kind: PendingKind::Ability,
            controller: seat,
            source: id,
            source_name: card.name().to_string(),
            effects,
            cancellable: true,
            resumes_combat: false,
            lenient: false,
        };
        let name = draft.source_name.clone();
        self.player_mut(seat).spend_mana(cost);
        let pending_id = self.open_pending(draft, cost, None)?;
        let player = self.player(seat).name.clone();
        self.record(format!("{player} activates {name}"));
        Ok(pending_id)
    }

    /// Open a forced trigger of `source`
    ///
    /// Untargeted triggers resolve on the spot. Returns true if a pending
    /// action was opened and now waits for targets or confirmation. A trigger
    /// whose mandatory targets do not exist is skipped with a log line.
    pub(crate) fn open_trigger(
        &mut self,
        controller: Seat,
        source: InstanceId,
        effects: Vec<EffectDef>,
    ) -> Result<bool> {
        let name = self.card(source)?.name().to_string();
        let resumes_combat = self
            .combat
            .as_ref()
            .is_some_and(|c| c.stage == crate::game::CombatStage::Triggers);

        if build_requirements(&effects).is_empty() {
            self.record(format!("{name} triggers"));
            self.resolve_effects(controller, Some(source), &effects, &BTreeMap::new());
            return Ok(false);
        }

        let draft = PendingDraft {
            kind: PendingKind::Trigger,
            controller,
            source,
            source_name: name.clone(),
            effects,
            cancellable: false,
            resumes_combat,
            lenient: false,
        };
        match self.open_pending(draft, 0, None) {
            Ok(_) => {
                self.record(format!("{name} triggers"));
                Ok(true)
            }
            Err(ClashError::InvalidAction(_)) => {
                self.record(format!("{name} triggers, but there are no legal targets"));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn pending_for(&self, seat: Seat) -> Result<&PendingAction> {
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| ClashError::InvalidAction("nothing is pending".into()))?;
        if pending.controller != seat {
            return Err(ClashError::InvalidAction(format!(
                "the pending action belongs to {}",
                pending.controller
            )));
        }
        Ok(pending)
    }

    /// Check a target against the current requirement without choosing it
    pub fn check_target(&self, seat: Seat, target: &Target) -> Result<()> {
        let pending = self.pending_for(seat)?;
        let Some(req) = pending.current_requirement() else {
            return Err(ClashError::InvalidAction(
                "no more targets are needed".into(),
            ));
        };
        if !is_target_valid(self, target, req, &pending.context()) {
            return Err(ClashError::InvalidAction(format!(
                "{target} is not a legal target"
            )));
        }
        Ok(())
    }

    /// Choose a target for the current requirement
    pub fn select_target(&mut self, seat: Seat, target: Target) -> Result<()> {
        self.check_target(seat, &target)?;
        if let Some(pending) = self.pending.as_mut() {
            pending.selected_targets.push(target);
            pending.settle();
        }
        log_if_verbose!(self, "{} targets {}", seat, target);
        Ok(())
    }

    /// Resolve the pending action (only once every requirement is met)
    pub fn confirm_pending(&mut self, seat: Seat) -> Result<()> {
        let pending = self.pending_for(seat)?;
        if !pending.awaiting_confirmation {
            return Err(ClashError::InvalidAction(
                "targets are still missing".into(),
            ));
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let player = self.player(seat).name.clone();
        let source = pending.source;

        match pending.kind {
            PendingKind::Summon => {
                self.player_mut(seat).zones.battlefield.add(source);
                if let Ok(card) = self.card_mut(source) {
                    card.summoning_sickness = true;
                    card.controller = seat;
                }
                self.record(format!("{player} summons {}", pending.source_name));
                self.resolve_effects(seat, Some(source), &pending.effects, &pending.chosen_targets);

                let on_enter = self
                    .card(source)
                    .ok()
                    .and_then(|c| c.template.on_enter_effects().map(|e| e.to_vec()));
                if let Some(effects) = on_enter {
                    if !self.is_over() && self.battlefield_seat(source) == Some(seat) {
                        self.open_trigger(seat, source, effects)?;
                    }
                }
            }
            PendingKind::Spell => {
                self.record(format!("{player} casts {}", pending.source_name));
                self.resolve_effects(seat, Some(source), &pending.effects, &pending.chosen_targets);
                self.player_mut(seat).zones.graveyard.add(source);
            }
            PendingKind::Ability => {
                if let Ok(card) = self.card_mut(source) {
                    card.activated_this_turn = true;
                }
                self.resolve_effects(seat, Some(source), &pending.effects, &pending.chosen_targets);
            }
            PendingKind::Trigger => {
                self.resolve_effects(seat, Some(source), &pending.effects, &pending.chosen_targets);
            }
        }

        if pending.resumes_combat && !self.is_over() {
            self.process_attack_triggers()?;
        }
        Ok(())
    }

    /// Back out of the pending action, refunding what was paid
    ///
    /// Forced triggers cannot be cancelled.
    pub fn cancel_pending(&mut self, seat: Seat) -> Result<()> {
        let pending = self.pending_for(seat)?;
        if !pending.cancellable {
            return Err(ClashError::InvalidAction(format!(
                "{} cannot be cancelled",
                pending.source_name
            )));
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        self.player_mut(seat).refund_mana(pending.paid_mana);
        if matches!(pending.kind, PendingKind::Summon | PendingKind::Spell) {
            let position = pending.hand_position.unwrap_or(usize::MAX);
            self.player_mut(seat)
                .zones
                .get_zone_mut(Zone::Hand)
                .insert_at(position, pending.source);
        }
        let player = self.player(seat).name.clone();
        self.record(format!("{player} cancels {}", pending.source_name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardTemplate, TargetClass, TargetSpec};
    use crate::game::RulesConfig;
    use crate::loader::CardCatalog;
    use std::sync::Arc;

    fn game() -> GameState {
        let mut game = GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        );
        game.player_mut(Seat::FIRST).max_mana = 5;
        game.player_mut(Seat::FIRST).available_mana = 5;
        game
    }

    fn in_hand(game: &mut GameState, template: CardTemplate) -> InstanceId {
        game.create_instance(Arc::new(template), Seat::FIRST, Zone::Hand)
    }

    fn zap() -> CardTemplate {
        CardTemplate::spell(
            "zap",
            "Zap",
            1,
            vec![EffectDef::Damage {
                amount: 2,
                target: TargetSpec::single(TargetClass::Any),
            }],
        )
    }

    #[test]
    fn test_spell_collects_target_then_resolves() {
        let mut game = game();
        let zap = in_hand(&mut game, zap());

        game.prepare_spell(Seat::FIRST, zap).unwrap();
        assert_eq!(game.player(Seat::FIRST).available_mana, 4);
        assert!(!game.pending.as_ref().unwrap().awaiting_confirmation);

        // Confirming early does nothing
        assert!(game.confirm_pending(Seat::FIRST).is_err());
        assert!(game.pending.is_some());

        game.select_target(Seat::FIRST, Target::player(Seat::SECOND)).unwrap();
        assert!(game.pending.as_ref().unwrap().awaiting_confirmation);
        game.confirm_pending(Seat::FIRST).unwrap();

        assert!(game.pending.is_none());
        assert_eq!(game.player(Seat::SECOND).life, 18);
        assert!(game.player(Seat::FIRST).zones.graveyard.contains(zap));
    }

    #[test]
    fn test_cancel_restores_hand_position_and_mana() {
        let mut game = game();
        let bear = in_hand(&mut game, CardTemplate::creature("bear", "Bear", 2, 2, 2));
        let zap = in_hand(&mut game, zap());
        let other = in_hand(&mut game, CardTemplate::creature("bear", "Bear", 2, 2, 2));

        game.prepare_spell(Seat::FIRST, zap).unwrap();
        game.cancel_pending(Seat::FIRST).unwrap();

        assert!(game.pending.is_none());
        assert_eq!(game.player(Seat::FIRST).available_mana, 5);
        assert_eq!(game.player(Seat::FIRST).zones.hand.cards, vec![bear, zap, other]);
    }

    #[test]
    fn test_one_pending_at_a_time() {
        let mut game = game();
        let a = in_hand(&mut game, zap());
        let b = in_hand(&mut game, zap());

        game.prepare_spell(Seat::FIRST, a).unwrap();
        assert!(game.prepare_spell(Seat::FIRST, b).is_err());
        assert!(game.player(Seat::FIRST).zones.hand.contains(b));
    }

    #[test]
    fn test_unaffordable_card_rejected_without_change() {
        let mut game = game();
        let dragon = in_hand(&mut game, CardTemplate::creature("dragon", "Dragon", 9, 6, 6));
        assert!(game.play_card(Seat::FIRST, dragon).is_err());
        assert!(game.pending.is_none());
        assert_eq!(game.player(Seat::FIRST).available_mana, 5);
    }

    #[test]
    fn test_summon_enters_sick() {
        let mut game = game();
        let bear = in_hand(&mut game, CardTemplate::creature("bear", "Bear", 2, 2, 2));

        game.play_card(Seat::FIRST, bear).unwrap();
        assert!(game.pending.as_ref().unwrap().awaiting_confirmation);
        game.confirm_pending(Seat::FIRST).unwrap();

        assert!(game.player(Seat::FIRST).zones.battlefield.contains(bear));
        assert!(game.card(bear).unwrap().summoning_sickness);
    }

    #[test]
    fn test_enter_trigger_cannot_be_cancelled() {
        let mut game = game();
        let enemy = game.create_instance(
            Arc::new(CardTemplate::creature("rat", "Rat", 1, 1, 1)),
            Seat::SECOND,
            Zone::Battlefield,
        );
        let template = CardTemplate::creature("archer", "Archer", 2, 1, 1).with_passive(
            crate::core::Passive::OnEnter {
                effects: vec![EffectDef::Damage {
                    amount: 1,
                    target: TargetSpec::single(TargetClass::EnemyCreature),
                }],
            },
        );
        let archer = in_hand(&mut game, template);

        game.play_card(Seat::FIRST, archer).unwrap();
        game.confirm_pending(Seat::FIRST).unwrap();

        let pending = game.pending.as_ref().unwrap();
        assert_eq!(pending.kind, PendingKind::Trigger);
        assert!(game.cancel_pending(Seat::FIRST).is_err());
        assert!(game.pending.is_some());

        game.select_target(Seat::FIRST, Target::creature(enemy, Seat::SECOND))
            .unwrap();
        game.confirm_pending(Seat::FIRST).unwrap();
        assert!(game.player(Seat::SECOND).zones.graveyard.contains(enemy));
    }

    #[test]
    fn test_ability_once_per_turn_and_refund() {
        let mut game = game();
        let template = CardTemplate::creature("mage", "Mage", 2, 1, 1)
            .with_ability(2, vec![EffectDef::Draw { count: 1 }]);
        let mage = game.create_instance(Arc::new(template), Seat::FIRST, Zone::Battlefield);

        game.activate_ability(Seat::FIRST, mage).unwrap();
        game.cancel_pending(Seat::FIRST).unwrap();
        assert_eq!(game.player(Seat::FIRST).available_mana, 5);

        game.activate_ability(Seat::FIRST, mage).unwrap();
        game.confirm_pending(Seat::FIRST).unwrap();
        assert_eq!(game.player(Seat::FIRST).available_mana, 3);
        assert!(game.activate_ability(Seat::FIRST, mage).is_err());
    }
}
