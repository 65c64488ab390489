//! Deterministic automated controller
//!
//! Simple "first choice" heuristics:
//! - Resolves its own pending actions with the default targets
//! - Plays the first affordable card, then uses abilities
//! - Attacks with every eligible creature
//! - Blocks the strongest attacker each blocker can survive
//!
//! Given the same state it always picks the same action, which keeps
//! automated matches reproducible.

use crate::core::InstanceId;
use crate::game::combat::CombatStage;
use crate::game::controller::{Controller, GameStateView, PlayerAction};
use crate::game::Phase;

#[derive(Debug, Clone, Default)]
pub struct AutoController {
    name: String,
    /// Cards and abilities given up on during `abandoned_turn`; not retried
    /// until the turn changes
    abandoned: Vec<InstanceId>,
    abandoned_turn: u32,
}

impl AutoController {
    pub fn new(name: impl Into<String>) -> Self {
        AutoController {
            name: name.into(),
            ..Default::default()
        }
    }

    fn resolve_pending(&mut self, view: &GameStateView<'_>) -> Option<PlayerAction> {
        let pending = view.my_pending()?;
        if pending.awaiting_confirmation {
            return Some(PlayerAction::ConfirmPending);
        }
        match view.suggested_target() {
            Some(target) => Some(PlayerAction::SelectTarget(target)),
            None if pending.cancellable => {
                self.abandoned.push(pending.source);
                Some(PlayerAction::CancelPending)
            }
            None => None,
        }
    }

    fn block(&self, view: &GameStateView<'_>) -> PlayerAction {
        let game = view.game();
        let Some(blocking) = game.blocking.as_ref() else {
            return PlayerAction::DeclareBlockersDone;
        };

        let power = |id: InstanceId| view.card(id).map(|c| c.current_attack()).unwrap_or(0);
        let survives = |blocker: InstanceId, attacker: InstanceId| {
            view.card(blocker)
                .is_some_and(|b| b.remaining_toughness() > power(attacker))
        };

        // Strongest first; stable sort keeps attacker order on ties
        let mut open: Vec<InstanceId> = blocking
            .attackers
            .iter()
            .copied()
            .filter(|&a| blocking.blocker_for(a).is_none())
            .filter(|&a| view.card(a).is_some_and(|c| !c.unblockable_this_turn))
            .collect();
        open.sort_by_key(|&a| std::cmp::Reverse(power(a)));

        if let Some(blocker) = blocking.selected_blocker {
            return match open.iter().copied().find(|&a| survives(blocker, a)) {
                Some(attacker) => PlayerAction::AssignBlocker(attacker),
                None => PlayerAction::DeclareBlockersDone,
            };
        }

        let free: Vec<InstanceId> = view
            .eligible_blockers()
            .into_iter()
            .filter(|&b| blocking.blocked_by(b).is_none())
            .collect();
        for attacker in open {
            if let Some(&blocker) = free.iter().find(|&&b| survives(b, attacker)) {
                return PlayerAction::SelectBlocker(blocker);
            }
        }
        PlayerAction::DeclareBlockersDone
    }

    fn main_phase(&self, view: &GameStateView<'_>) -> PlayerAction {
        let fresh = |id: &InstanceId| !self.abandoned.contains(id);
        if let Some(card) = view.playable_cards().into_iter().find(fresh) {
            return PlayerAction::PlayCard(card);
        }
        if let Some(creature) = view.activatable_creatures().into_iter().find(fresh) {
            return PlayerAction::ActivateAbility(creature);
        }
        PlayerAction::AdvancePhase
    }

    fn combat(&self, view: &GameStateView<'_>) -> Option<PlayerAction> {
        match view.combat_stage()? {
            CombatStage::Choose => {
                let declared = view.declared_attackers();
                let next = view
                    .eligible_attackers()
                    .into_iter()
                    .find(|id| !declared.contains(id));
                Some(match next {
                    Some(attacker) => PlayerAction::DeclareAttacker(attacker),
                    None if declared.is_empty() => PlayerAction::SkipCombat,
                    None => PlayerAction::ConfirmAttackers,
                })
            }
            // Triggers resolve through pending actions; blockers are the defender's
            CombatStage::Triggers | CombatStage::Blockers => None,
        }
    }
}

impl Controller for AutoController {
    fn next_action(&mut self, view: &GameStateView<'_>) -> Option<PlayerAction> {
        if view.game().is_over() {
            return None;
        }
        if view.game().turn != self.abandoned_turn {
            self.abandoned.clear();
            self.abandoned_turn = view.game().turn;
        }
        if view.game().pending.is_some() {
            return self.resolve_pending(view);
        }
        if view.is_blocking() {
            return Some(self.block(view));
        }
        if !view.is_my_turn() {
            return None;
        }
        match view.phase() {
            Phase::Main1 | Phase::Main2 => Some(self.main_phase(view)),
            Phase::Combat => self.combat(view),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardTemplate, EffectDef, Seat, TargetClass, TargetSpec};
    use crate::game::{GameState, RulesConfig};
    use crate::loader::CardCatalog;
    use crate::zones::Zone;
    use std::sync::Arc;

    fn game() -> GameState {
        let mut game = GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        );
        game.start_turn_with_draw(Seat::FIRST, false);
        game
    }

    fn put(game: &mut GameState, seat: Seat, zone: Zone, cost: u32, attack: i32, toughness: i32) -> InstanceId {
        let template = Arc::new(CardTemplate::creature("c", "Critter", cost, attack, toughness));
        game.create_instance(template, seat, zone)
    }

    #[test]
    fn test_plays_first_affordable_card() {
        let mut game = game();
        let _big = put(&mut game, Seat::FIRST, Zone::Hand, 5, 5, 5);
        let small = put(&mut game, Seat::FIRST, Zone::Hand, 1, 1, 1);

        let mut ai = AutoController::new("ai");
        let view = GameStateView::new(&game, Seat::FIRST);
        assert_eq!(ai.next_action(&view), Some(PlayerAction::PlayCard(small)));
    }

    #[test]
    fn test_advances_when_nothing_to_do() {
        let game = game();
        let mut ai = AutoController::new("ai");
        let view = GameStateView::new(&game, Seat::FIRST);
        assert_eq!(ai.next_action(&view), Some(PlayerAction::AdvancePhase));

        let view = GameStateView::new(&game, Seat::SECOND);
        assert_eq!(ai.next_action(&view), None);
    }

    #[test]
    fn test_blocks_strongest_survivable_attacker() {
        let mut game = game();
        let weak = put(&mut game, Seat::FIRST, Zone::Battlefield, 1, 1, 1);
        let strong = put(&mut game, Seat::FIRST, Zone::Battlefield, 1, 3, 3);
        let wall = put(&mut game, Seat::SECOND, Zone::Battlefield, 1, 0, 4);

        game.advance_phase(Seat::FIRST).unwrap();
        game.declare_attacker(Seat::FIRST, weak).unwrap();
        game.declare_attacker(Seat::FIRST, strong).unwrap();
        game.confirm_attackers(Seat::FIRST).unwrap();
        game.begin_blocking(Seat::FIRST).unwrap();

        let mut ai = AutoController::new("ai");
        let action = ai.next_action(&GameStateView::new(&game, Seat::SECOND));
        assert_eq!(action, Some(PlayerAction::SelectBlocker(wall)));

        game.select_blocker(Seat::SECOND, wall).unwrap();
        let action = ai.next_action(&GameStateView::new(&game, Seat::SECOND));
        assert_eq!(action, Some(PlayerAction::AssignBlocker(strong)));

        game.assign_blocker(Seat::SECOND, strong).unwrap();
        let action = ai.next_action(&GameStateView::new(&game, Seat::SECOND));
        assert_eq!(action, Some(PlayerAction::DeclareBlockersDone));
    }

    #[test]
    fn test_cancelled_card_is_not_replayed_this_turn() {
        let mut game = game();
        let enemy = put(&mut game, Seat::SECOND, Zone::Battlefield, 1, 2, 2);
        let bolt = CardTemplate::spell(
            "bolt",
            "Bolt",
            1,
            vec![EffectDef::Damage {
                amount: 2,
                target: TargetSpec::single(TargetClass::EnemyCreature),
            }],
        );
        let bolt = game.create_instance(Arc::new(bolt), Seat::FIRST, Zone::Hand);

        let mut ai = AutoController::new("ai");
        game.prepare_spell(Seat::FIRST, bolt).unwrap();
        // The only target leaves play before it is chosen
        game.destroy_creature(enemy).unwrap();

        let action = ai.next_action(&GameStateView::new(&game, Seat::FIRST));
        assert_eq!(action, Some(PlayerAction::CancelPending));
        game.cancel_pending(Seat::FIRST).unwrap();

        let action = ai.next_action(&GameStateView::new(&game, Seat::FIRST));
        assert_eq!(action, Some(PlayerAction::AdvancePhase));

        game.turn += 1;
        let action = ai.next_action(&GameStateView::new(&game, Seat::FIRST));
        assert_eq!(action, Some(PlayerAction::PlayCard(bolt)));
    }
}
