//! Combat: attacker declaration, attack triggers, blocking and damage
//!
//! A combat walks `CombatStage` strictly forward: Choose, Triggers, Blockers,
//! then it is cleared. Damage is computed into a `CombatReport` first (pure,
//! from pre-damage power) and applied second, so a replaying peer can apply
//! the author's report without recomputing stats.

use crate::core::{InstanceId, Seat};
use crate::game::GameState;
use crate::{ClashError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombatStage {
    Choose,
    Triggers,
    Blockers,
}

/// Combat state for the current combat phase
///
/// Uses Vec (attacker order matters for triggers and resolution) and BTreeMap
/// for deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub attacking_seat: Seat,
    /// Attackers in declaration order
    pub attackers: Vec<InstanceId>,
    pub stage: CombatStage,
    /// Attackers with an on-attack passive, in attacker order
    pub trigger_queue: Vec<InstanceId>,
    pub trigger_cursor: usize,
}

impl CombatState {
    pub fn new(attacking_seat: Seat) -> Self {
        CombatState {
            attacking_seat,
            attackers: Vec::new(),
            stage: CombatStage::Choose,
            trigger_queue: Vec::new(),
            trigger_cursor: 0,
        }
    }

    pub fn is_attacking(&self, id: InstanceId) -> bool {
        self.attackers.contains(&id)
    }

    /// Move to a later stage; going backwards (or standing still) is an error
    pub fn advance_stage(&mut self, to: CombatStage) -> Result<()> {
        if to <= self.stage {
            return Err(ClashError::InvalidAction(format!(
                "combat cannot move from {:?} to {:?}",
                self.stage, to
            )));
        }
        self.stage = to;
        Ok(())
    }

    pub fn triggers_exhausted(&self) -> bool {
        self.trigger_cursor >= self.trigger_queue.len()
    }
}

/// Defender's side of the combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingState {
    pub defending_seat: Seat,
    /// Attackers still on the battlefield when blocking began
    pub attackers: Vec<InstanceId>,
    /// attacker -> blocker
    pub assignments: BTreeMap<InstanceId, InstanceId>,
    pub selected_blocker: Option<InstanceId>,
    /// False when the defender has nothing to block with; combat then resolves
    /// on its own after the block-skip delay
    pub awaiting_defender: bool,
}

impl BlockingState {
    pub fn blocker_for(&self, attacker: InstanceId) -> Option<InstanceId> {
        self.assignments.get(&attacker).copied()
    }

    /// Attacker currently assigned to `blocker`, if any
    pub fn blocked_by(&self, blocker: InstanceId) -> Option<InstanceId> {
        self.assignments
            .iter()
            .find(|(_, &b)| b == blocker)
            .map(|(&a, _)| a)
    }
}

/// One attacker's share of a combat, computed before any damage lands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatExchange {
    pub attacker: InstanceId,
    pub attacker_name: String,
    pub attacker_power: i32,
    pub blocker: Option<InstanceId>,
    pub blocker_name: Option<String>,
    pub blocker_power: i32,
    /// Damage the defending player takes (0 when blocked or prevented)
    pub damage_to_player: i32,
    /// Damage the attacker takes back (0 when prevented for its controller)
    pub damage_to_attacker: i32,
}

/// Structured per-attacker damage log of one combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub attacking_seat: Seat,
    pub defending_seat: Seat,
    pub exchanges: Vec<CombatExchange>,
}

impl CombatReport {
    pub fn total_player_damage(&self) -> i32 {
        self.exchanges.iter().map(|e| e.damage_to_player).sum()
    }
}

impl GameState {
    fn combat_ref(&self) -> Result<&CombatState> {
        self.combat
            .as_ref()
            .ok_or_else(|| ClashError::InvalidAction("no combat in progress".into()))
    }

    fn combat_mut(&mut self) -> Result<&mut CombatState> {
        self.combat
            .as_mut()
            .ok_or_else(|| ClashError::InvalidAction("no combat in progress".into()))
    }

    fn blocking_ref(&self) -> Result<&BlockingState> {
        self.blocking
            .as_ref()
            .ok_or_else(|| ClashError::InvalidAction("no blocking in progress".into()))
    }

    /// Whether `id` could be declared as an attacker by `seat` right now
    pub fn can_attack_with(&self, seat: Seat, id: InstanceId) -> bool {
        self.battlefield_seat(id) == Some(seat)
            && self.cards.get(id).is_ok_and(|card| {
                card.is_creature()
                    && !card.summoning_sickness
                    && !card.is_frozen()
                    && !card.has_lethal_damage()
            })
    }

    /// Whether `id` could block for `seat` (summoning sickness does not matter)
    pub fn can_block_with(&self, seat: Seat, id: InstanceId) -> bool {
        self.battlefield_seat(id) == Some(seat)
            && self.cards.get(id).is_ok_and(|card| {
                card.is_creature() && !card.is_frozen() && !card.has_lethal_damage()
            })
    }

    pub fn eligible_attackers(&self, seat: Seat) -> Vec<InstanceId> {
        self.player(seat)
            .zones
            .battlefield
            .cards
            .iter()
            .copied()
            .filter(|&id| self.can_attack_with(seat, id))
            .collect()
    }

    pub fn eligible_blockers(&self, seat: Seat) -> Vec<InstanceId> {
        self.player(seat)
            .zones
            .battlefield
            .cards
            .iter()
            .copied()
            .filter(|&id| self.can_block_with(seat, id))
            .collect()
    }

    /// Toggle `id` in or out of the attacker list; returns whether it now attacks
    pub fn declare_attacker(&mut self, seat: Seat, id: InstanceId) -> Result<bool> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        if self.combat_ref()?.stage != CombatStage::Choose {
            return Err(ClashError::InvalidAction(
                "attackers are already declared".into(),
            ));
        }
        if !self.can_attack_with(seat, id) {
            return Err(ClashError::InvalidAction(format!(
                "{id} cannot attack"
            )));
        }

        let combat = self.combat_mut()?;
        let attacking = if let Some(pos) = combat.attackers.iter().position(|&a| a == id) {
            combat.attackers.remove(pos);
            false
        } else {
            combat.attackers.push(id);
            true
        };
        log_if_verbose!(
            self,
            "{} {} attackers",
            id,
            if attacking { "joins" } else { "leaves" }
        );
        Ok(attacking)
    }

    /// Lock in the attackers and start the trigger stage
    ///
    /// With no attackers this is the same as skipping combat.
    pub fn confirm_attackers(&mut self, seat: Seat) -> Result<()> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        if self.combat_ref()?.stage != CombatStage::Choose {
            return Err(ClashError::InvalidAction(
                "attackers are already declared".into(),
            ));
        }
        let attackers = self.combat_ref()?.attackers.clone();
        if attackers.is_empty() {
            self.record("No attackers declared");
            self.end_combat();
            return Ok(());
        }

        let queue: Vec<InstanceId> = attackers
            .iter()
            .copied()
            .filter(|&id| {
                self.cards
                    .get(id)
                    .is_ok_and(|c| c.template.on_attack_effects().is_some())
            })
            .collect();

        let names: Vec<String> = attackers
            .iter()
            .filter_map(|&id| self.cards.get(id).ok().map(|c| c.name().to_string()))
            .collect();
        let player = self.player(seat).name.clone();
        self.record(format!("{player} attacks with {}", names.join(", ")));

        let combat = self.combat_mut()?;
        combat.advance_stage(CombatStage::Triggers)?;
        combat.trigger_queue = queue;
        combat.trigger_cursor = 0;

        self.process_attack_triggers()
    }

    /// Skip combat entirely (only before attackers are confirmed)
    pub fn skip_combat(&mut self, seat: Seat) -> Result<()> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        if self.combat_ref()?.stage != CombatStage::Choose {
            return Err(ClashError::InvalidAction(
                "combat can no longer be skipped".into(),
            ));
        }
        let player = self.player(seat).name.clone();
        self.record(format!("{player} skips combat"));
        self.end_combat();
        Ok(())
    }

    /// Resolve queued on-attack triggers until one needs targets or the queue ends
    pub(crate) fn process_attack_triggers(&mut self) -> Result<()> {
        loop {
            let combat = self.combat_ref()?;
            if combat.stage != CombatStage::Triggers || combat.triggers_exhausted() {
                return Ok(());
            }
            let source = combat.trigger_queue[combat.trigger_cursor];
            let attacking_seat = combat.attacking_seat;
            self.combat_mut()?.trigger_cursor += 1;

            if self.battlefield_seat(source) != Some(attacking_seat) {
                self.record(format!(
                    "Attack trigger of {source} fizzles: source left the battlefield"
                ));
                continue;
            }
            let effects = match self.cards.get(source) {
                Ok(card) => card.template.on_attack_effects().map(|e| e.to_vec()),
                Err(_) => None,
            };
            let Some(effects) = effects else { continue };

            if self.open_trigger(attacking_seat, source, effects)? {
                // Wait for the trigger's targets; resolving it resumes the queue
                return Ok(());
            }
            if self.is_over() {
                return Ok(());
            }
        }
    }

    /// True once every attack trigger has resolved and blocking can begin
    pub fn ready_for_blockers(&self) -> bool {
        self.pending.is_none()
            && self.combat.as_ref().is_some_and(|c| {
                c.stage == CombatStage::Triggers && c.triggers_exhausted()
            })
    }

    /// Hand combat over to the defender
    pub fn begin_blocking(&mut self, seat: Seat) -> Result<()> {
        self.require_active(seat)?;
        if !self.ready_for_blockers() {
            return Err(ClashError::InvalidAction(
                "attack triggers are still resolving".into(),
            ));
        }

        let attackers: Vec<InstanceId> = self
            .combat_ref()?
            .attackers
            .iter()
            .copied()
            .filter(|&id| self.battlefield_seat(id) == Some(seat))
            .collect();
        self.combat_mut()?.advance_stage(CombatStage::Blockers)?;

        let defender = seat.opponent();
        let can_block = !attackers.is_empty() && !self.eligible_blockers(defender).is_empty();
        self.blocking = Some(BlockingState {
            defending_seat: defender,
            attackers,
            assignments: BTreeMap::new(),
            selected_blocker: None,
            awaiting_defender: can_block,
        });

        let name = self.player(defender).name.clone();
        if can_block {
            self.record(format!("{name} declares blockers"));
        } else {
            self.record(format!("{name} has no blockers"));
        }
        Ok(())
    }

    /// Defender picks which creature to assign next
    pub fn select_blocker(&mut self, seat: Seat, blocker: InstanceId) -> Result<()> {
        let blocking = self.blocking_ref()?;
        if seat != blocking.defending_seat || !blocking.awaiting_defender || self.is_over() {
            return Err(ClashError::InvalidAction(format!(
                "{seat} is not blocking"
            )));
        }
        if !self.can_block_with(seat, blocker) {
            return Err(ClashError::InvalidAction(format!(
                "{blocker} cannot block"
            )));
        }
        if let Some(blocking) = self.blocking.as_mut() {
            blocking.selected_blocker = Some(blocker);
        }
        Ok(())
    }

    /// Assign the selected blocker to `attacker`
    ///
    /// A blocker guards one attacker at a time: assigning it again moves it.
    /// An attacker that already has a different blocker keeps it.
    pub fn assign_blocker(&mut self, seat: Seat, attacker: InstanceId) -> Result<()> {
        let blocking = self.blocking_ref()?;
        if seat != blocking.defending_seat || !blocking.awaiting_defender || self.is_over() {
            return Err(ClashError::InvalidAction(format!(
                "{seat} is not blocking"
            )));
        }
        let Some(blocker) = blocking.selected_blocker else {
            return Err(ClashError::InvalidAction("no blocker selected".into()));
        };
        if !blocking.attackers.contains(&attacker) || !self.is_on_battlefield(attacker) {
            return Err(ClashError::InvalidAction(format!(
                "{attacker} is not attacking"
            )));
        }
        if self.cards.get(attacker)?.unblockable_this_turn {
            return Err(ClashError::InvalidAction(format!(
                "{attacker} cannot be blocked this turn"
            )));
        }
        if let Some(existing) = blocking.blocker_for(attacker) {
            if existing != blocker {
                return Err(ClashError::InvalidAction(format!(
                    "{attacker} is already blocked"
                )));
            }
        }
        if !self.can_block_with(seat, blocker) {
            return Err(ClashError::InvalidAction(format!(
                "{blocker} cannot block"
            )));
        }

        let blocker_name = self.cards.get(blocker)?.name().to_string();
        let attacker_name = self.cards.get(attacker)?.name().to_string();
        if let Some(blocking) = self.blocking.as_mut() {
            if let Some(previous) = blocking.blocked_by(blocker) {
                blocking.assignments.remove(&previous);
            }
            blocking.assignments.insert(attacker, blocker);
            blocking.selected_blocker = None;
        }
        self.record(format!("{blocker_name} blocks {attacker_name}"));
        Ok(())
    }

    /// Check that combat may resolve now (blocking started, and the defender
    /// is either done or has nothing to block with)
    pub fn can_resolve_combat(&self, seat: Option<Seat>) -> Result<()> {
        let blocking = self.blocking_ref()?;
        if self.combat_ref()?.stage != CombatStage::Blockers {
            return Err(ClashError::InvalidAction("combat is not at blockers".into()));
        }
        if let Some(seat) = seat {
            if seat != blocking.defending_seat {
                return Err(ClashError::InvalidAction(format!(
                    "{seat} is not blocking"
                )));
            }
        }
        Ok(())
    }

    /// Compute the damage of the current combat without applying it
    ///
    /// Every number comes from the board as it stands before any damage of
    /// this combat lands, so both halves of a blocked exchange are simultaneous.
    pub fn compute_combat_report(&self) -> Result<CombatReport> {
        let combat = self.combat_ref()?;
        let blocking = self.blocking_ref()?;
        let attacking_seat = combat.attacking_seat;
        let defending_seat = blocking.defending_seat;
        let defender_prevented = self.player(defending_seat).combat_damage_prevented;
        let attacker_prevented = self.player(attacking_seat).combat_damage_prevented;

        let mut exchanges = Vec::with_capacity(blocking.attackers.len());
        for &attacker_id in &blocking.attackers {
            if self.battlefield_seat(attacker_id) != Some(attacking_seat) {
                continue;
            }
            let attacker = self.cards.get(attacker_id)?;
            let attacker_power = attacker.current_attack();

            let blocker = blocking
                .blocker_for(attacker_id)
                .filter(|&b| self.battlefield_seat(b) == Some(defending_seat))
                .and_then(|b| self.cards.get(b).ok());

            let exchange = match blocker {
                Some(blocker) => CombatExchange {
                    attacker: attacker_id,
                    attacker_name: attacker.name().to_string(),
                    attacker_power,
                    blocker: Some(blocker.instance_id),
                    blocker_name: Some(blocker.name().to_string()),
                    blocker_power: blocker.current_attack(),
                    damage_to_player: 0,
                    damage_to_attacker: if attacker_prevented {
                        0
                    } else {
                        blocker.current_attack()
                    },
                },
                None => CombatExchange {
                    attacker: attacker_id,
                    attacker_name: attacker.name().to_string(),
                    attacker_power,
                    blocker: None,
                    blocker_name: None,
                    blocker_power: 0,
                    damage_to_player: if defender_prevented { 0 } else { attacker_power },
                    damage_to_attacker: 0,
                },
            };
            exchanges.push(exchange);
        }

        Ok(CombatReport {
            attacking_seat,
            defending_seat,
            exchanges,
        })
    }

    /// Apply a combat report, sweep the dead once, and move to Main2
    ///
    /// Creatures are looked up again by id; an exchange whose creature has
    /// left the battlefield only contributes its log line.
    pub fn apply_combat_report(&mut self, report: &CombatReport) {
        let defender_name = self.player(report.defending_seat).name.clone();

        for exchange in &report.exchanges {
            match exchange.blocker {
                None => {
                    if exchange.damage_to_player > 0 {
                        self.player_mut(report.defending_seat)
                            .lose_life(exchange.damage_to_player);
                        self.record(format!(
                            "{} deals {} damage to {defender_name}",
                            exchange.attacker_name, exchange.damage_to_player
                        ));
                    } else if exchange.attacker_power > 0 {
                        self.record(format!(
                            "Combat damage from {} to {defender_name} is prevented",
                            exchange.attacker_name
                        ));
                    }
                }
                Some(blocker) => {
                    let blocker_name = exchange.blocker_name.clone().unwrap_or_default();
                    if let Ok(card) = self.cards.get_mut(blocker) {
                        card.damage_marked += exchange.attacker_power;
                    }
                    if exchange.attacker_power > 0 {
                        self.record(format!(
                            "{} deals {} damage to {blocker_name}",
                            exchange.attacker_name, exchange.attacker_power
                        ));
                    }
                    if let Ok(card) = self.cards.get_mut(exchange.attacker) {
                        card.damage_marked += exchange.damage_to_attacker;
                    }
                    if exchange.damage_to_attacker > 0 {
                        self.record(format!(
                            "{blocker_name} deals {} damage to {}",
                            exchange.damage_to_attacker, exchange.attacker_name
                        ));
                    }
                }
            }
        }

        self.sweep_dead(&[]);
        self.end_combat();
        self.check_winner();
    }

    /// Compute and apply the combat in one step (offline play)
    pub fn resolve_combat(&mut self) -> Result<CombatReport> {
        let report = self.compute_combat_report()?;
        self.apply_combat_report(&report);
        Ok(report)
    }

    /// Defender is done assigning blockers
    pub fn declare_blockers_done(&mut self, seat: Seat) -> Result<CombatReport> {
        self.can_resolve_combat(Some(seat))?;
        self.resolve_combat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardTemplate;
    use crate::game::{Phase, RulesConfig};
    use crate::loader::CardCatalog;
    use crate::zones::Zone;
    use std::sync::Arc;

    fn game_in_combat() -> GameState {
        let mut game = GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        );
        game.begin_combat();
        game
    }

    fn creature(game: &mut GameState, seat: Seat, attack: i32, toughness: i32) -> InstanceId {
        let template = Arc::new(CardTemplate::creature("c", "Critter", 1, attack, toughness));
        game.create_instance(template, seat, Zone::Battlefield)
    }

    #[test]
    fn test_stage_only_moves_forward() {
        let mut combat = CombatState::new(Seat::FIRST);
        combat.advance_stage(CombatStage::Triggers).unwrap();
        assert!(combat.advance_stage(CombatStage::Choose).is_err());
        assert!(combat.advance_stage(CombatStage::Triggers).is_err());
        combat.advance_stage(CombatStage::Blockers).unwrap();
    }

    #[test]
    fn test_attacker_toggle_and_eligibility() {
        let mut game = game_in_combat();
        let ready = creature(&mut game, Seat::FIRST, 2, 2);
        let sick = creature(&mut game, Seat::FIRST, 2, 2);
        game.card_mut(sick).unwrap().summoning_sickness = true;

        assert!(game.declare_attacker(Seat::FIRST, ready).unwrap());
        assert!(game.declare_attacker(Seat::FIRST, sick).is_err());
        assert!(!game.declare_attacker(Seat::FIRST, ready).unwrap());
        assert!(game.combat.as_ref().unwrap().attackers.is_empty());
    }

    #[test]
    fn test_blocker_reassignment_moves_blocker() {
        let mut game = game_in_combat();
        let a1 = creature(&mut game, Seat::FIRST, 2, 2);
        let a2 = creature(&mut game, Seat::FIRST, 2, 2);
        let b = creature(&mut game, Seat::SECOND, 1, 1);
        game.declare_attacker(Seat::FIRST, a1).unwrap();
        game.declare_attacker(Seat::FIRST, a2).unwrap();
        game.confirm_attackers(Seat::FIRST).unwrap();
        game.begin_blocking(Seat::FIRST).unwrap();

        game.select_blocker(Seat::SECOND, b).unwrap();
        game.assign_blocker(Seat::SECOND, a1).unwrap();
        game.select_blocker(Seat::SECOND, b).unwrap();
        game.assign_blocker(Seat::SECOND, a2).unwrap();

        let blocking = game.blocking.as_ref().unwrap();
        assert_eq!(blocking.blocker_for(a1), None);
        assert_eq!(blocking.blocker_for(a2), Some(b));
    }

    #[test]
    fn test_unblockable_attacker_rejects_assignment() {
        let mut game = game_in_combat();
        let a = creature(&mut game, Seat::FIRST, 2, 2);
        let b = creature(&mut game, Seat::SECOND, 2, 2);
        game.card_mut(a).unwrap().unblockable_this_turn = true;
        game.declare_attacker(Seat::FIRST, a).unwrap();
        game.confirm_attackers(Seat::FIRST).unwrap();
        game.begin_blocking(Seat::FIRST).unwrap();

        game.select_blocker(Seat::SECOND, b).unwrap();
        assert!(game.assign_blocker(Seat::SECOND, a).is_err());
    }

    #[test]
    fn test_no_blockers_marks_defender_done() {
        let mut game = game_in_combat();
        let a = creature(&mut game, Seat::FIRST, 3, 3);
        let frozen = creature(&mut game, Seat::SECOND, 2, 2);
        game.card_mut(frozen).unwrap().frozen_turns = 1;
        game.declare_attacker(Seat::FIRST, a).unwrap();
        game.confirm_attackers(Seat::FIRST).unwrap();
        game.begin_blocking(Seat::FIRST).unwrap();

        assert!(!game.blocking.as_ref().unwrap().awaiting_defender);
        let report = game.resolve_combat().unwrap();
        assert_eq!(report.total_player_damage(), 3);
        assert_eq!(game.player(Seat::SECOND).life, 17);
        assert_eq!(game.phase, Phase::Main2);
    }

    #[test]
    fn test_zero_power_attacker_logs_nothing() {
        let mut game = game_in_combat();
        let wall = creature(&mut game, Seat::FIRST, 0, 4);
        game.declare_attacker(Seat::FIRST, wall).unwrap();
        game.confirm_attackers(Seat::FIRST).unwrap();
        game.begin_blocking(Seat::FIRST).unwrap();
        let before = game.log.len();

        game.resolve_combat().unwrap();

        assert!(!game.log[before..].iter().any(|l| l.contains("0 damage")));
        assert_eq!(game.player(Seat::SECOND).life, 20);
    }
}
