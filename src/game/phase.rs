//! Turn phases and the turn cycle

use crate::core::Seat;
use crate::game::combat::{CombatStage, CombatState};
use crate::game::GameState;
use crate::{ClashError, Result};
use serde::{Deserialize, Serialize};

/// Phases of a turn, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Main1,
    Combat,
    Main2,
}

impl Phase {
    /// Next phase within the same turn (`None` after Main2: the turn ends)
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Main1 => Some(Phase::Combat),
            Phase::Combat => Some(Phase::Main2),
            Phase::Main2 => None,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Phase::Main1 | Phase::Main2)
    }
}

/// Outcome of a phase advance, used to pick the matching replicated event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAdvance {
    /// Main1 -> Combat
    CombatStarted,
    /// Combat skipped -> Main2
    Changed(Phase),
    /// Main2 -> the next player's Main1
    TurnStarted { seat: Seat, turn: u32 },
}

impl GameState {
    /// What `advance_phase` would do right now, without doing it
    pub fn next_phase_transition(&self, seat: Seat) -> Result<PhaseAdvance> {
        self.require_active(seat)?;
        self.require_no_pending()?;
        match self.phase {
            Phase::Main1 => Ok(PhaseAdvance::CombatStarted),
            Phase::Combat => match self.combat.as_ref().map(|c| c.stage) {
                Some(CombatStage::Choose) | None => Ok(PhaseAdvance::Changed(Phase::Main2)),
                Some(stage) => Err(ClashError::InvalidAction(format!(
                    "cannot leave combat during {stage:?}"
                ))),
            },
            Phase::Main2 => Ok(PhaseAdvance::TurnStarted {
                seat: self.current_player.opponent(),
                turn: self.turn + 1,
            }),
        }
    }

    /// Move to the next phase, ending the turn after Main2
    ///
    /// Rejected while an action is pending. Leaving combat is only possible
    /// before attackers are confirmed, and counts as skipping combat.
    pub fn advance_phase(&mut self, seat: Seat) -> Result<PhaseAdvance> {
        let transition = self.next_phase_transition(seat)?;
        match transition {
            PhaseAdvance::CombatStarted => self.begin_combat(),
            PhaseAdvance::Changed(_) => self.skip_combat(seat)?,
            PhaseAdvance::TurnStarted { seat, .. } => {
                self.end_turn();
                self.start_turn(seat);
            }
        }
        Ok(transition)
    }

    pub(crate) fn begin_combat(&mut self) {
        self.phase = Phase::Combat;
        self.combat = Some(CombatState::new(self.current_player));
        self.blocking = None;
        let name = self.player(self.current_player).name.clone();
        self.record(format!("{name} enters combat"));
    }

    /// Clear all combat state and go to Main2
    pub(crate) fn end_combat(&mut self) {
        self.combat = None;
        self.blocking = None;
        self.phase = Phase::Main2;
        log_if_verbose!(self, "Turn {}: Main 2", self.turn);
    }

    /// Start `seat`'s turn: grow and refill mana, draw, ready creatures
    ///
    /// Frozen counters tick down for the seat whose turn just ended, so a
    /// creature frozen for one turn sits out its controller's next turn.
    pub fn start_turn(&mut self, seat: Seat) {
        self.start_turn_with_draw(seat, true);
    }

    pub(crate) fn start_turn_with_draw(&mut self, seat: Seat, draw: bool) {
        self.current_player = seat;
        self.phase = Phase::Main1;
        self.combat = None;
        self.blocking = None;

        let ceiling = self.rules.mana_ceiling;
        self.player_mut(seat).grow_and_refill_mana(ceiling);

        let name = self.player(seat).name.clone();
        self.record(format!("Turn {}: {name}", self.turn));

        if draw {
            let count = self.rules.draw_per_turn as u32;
            self.draw_cards(seat, count);
        }

        let own: Vec<_> = self.player(seat).zones.battlefield.cards.clone();
        for id in own {
            if let Ok(card) = self.cards.get_mut(id) {
                card.summoning_sickness = false;
                card.activated_this_turn = false;
            }
        }

        let other: Vec<_> = self.player(seat.opponent()).zones.battlefield.cards.clone();
        for id in other {
            if let Ok(card) = self.cards.get_mut(id) {
                card.frozen_turns = card.frozen_turns.saturating_sub(1);
            }
        }
    }

    /// Clear damage and end-of-turn buffs everywhere, flip seats, bump the turn
    pub fn end_turn(&mut self) {
        for seat in Seat::both() {
            let ids: Vec<_> = self.player(seat).zones.battlefield.cards.clone();
            for id in ids {
                if let Ok(card) = self.cards.get_mut(id) {
                    card.clear_end_of_turn();
                }
            }
            self.player_mut(seat).combat_damage_prevented = false;
        }
        self.combat = None;
        self.blocking = None;
        self.current_player = self.current_player.opponent();
        self.turn += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuffDuration, CardTemplate};
    use crate::game::RulesConfig;
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

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::Main1.next(), Some(Phase::Combat));
        assert_eq!(Phase::Combat.next(), Some(Phase::Main2));
        assert_eq!(Phase::Main2.next(), None);
    }

    #[test]
    fn test_full_turn_cycle() {
        let mut game = game();
        assert_eq!(game.player(Seat::FIRST).max_mana, 1);

        assert_eq!(
            game.advance_phase(Seat::FIRST).unwrap(),
            PhaseAdvance::CombatStarted
        );
        assert!(game.combat.is_some());
        assert_eq!(
            game.advance_phase(Seat::FIRST).unwrap(),
            PhaseAdvance::Changed(Phase::Main2)
        );
        assert!(game.combat.is_none());

        let advance = game.advance_phase(Seat::FIRST).unwrap();
        assert_eq!(
            advance,
            PhaseAdvance::TurnStarted {
                seat: Seat::SECOND,
                turn: 2
            }
        );
        assert_eq!(game.current_player, Seat::SECOND);
        assert_eq!(game.phase, Phase::Main1);
        assert_eq!(game.player(Seat::SECOND).max_mana, 1);
    }

    #[test]
    fn test_wrong_seat_cannot_advance() {
        let mut game = game();
        assert!(game.advance_phase(Seat::SECOND).is_err());
    }

    #[test]
    fn test_end_turn_clears_temporary_state() {
        let mut game = game();
        let bear = Arc::new(CardTemplate::creature("bear", "Bear", 2, 2, 3));
        let id = game.create_instance(bear, Seat::SECOND, Zone::Battlefield);
        {
            let card = game.card_mut(id).unwrap();
            card.damage_marked = 2;
            card.add_buff(3, 3, BuffDuration::EndOfTurn);
            card.summoning_sickness = true;
            card.frozen_turns = 1;
        }
        game.player_mut(Seat::SECOND).combat_damage_prevented = true;

        game.end_turn();
        game.start_turn_with_draw(Seat::SECOND, false);

        let card = game.card(id).unwrap();
        assert_eq!(card.damage_marked, 0);
        assert_eq!(card.current_attack(), 2);
        assert!(!card.summoning_sickness);
        // Frozen through its controller's turn; thaws when the opponent's turn starts
        assert!(card.is_frozen());
        assert!(!game.player(Seat::SECOND).combat_damage_prevented);
    }
}
