//! Controller seam and read-only state view
//!
//! Automated seats are just callers of the action API: a `Controller` looks at
//! a `GameStateView` and names the next `PlayerAction`, and the session
//! executes it exactly as it would a human's. `AutomationHooks` is the fixed
//! callback surface the session offers to automation code.

use crate::core::{CardInstance, EffectDef, InstanceId, Seat, Target};
use crate::game::combat::CombatStage;
use crate::game::pending::PendingAction;
use crate::game::{GameState, Phase};
use crate::targeting::{auto_select_targets, build_requirements, legal_targets, Requirement};
use crate::Result;
use std::collections::BTreeMap;

/// Every call of the action API, as a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    PlayCard(InstanceId),
    PrepareSpell(InstanceId),
    SelectTarget(Target),
    ConfirmPending,
    CancelPending,
    DeclareAttacker(InstanceId),
    ConfirmAttackers,
    SkipCombat,
    SelectBlocker(InstanceId),
    AssignBlocker(InstanceId),
    DeclareBlockersDone,
    AdvancePhase,
    ActivateAbility(InstanceId),
}

/// Decision maker for one automated seat
pub trait Controller {
    /// Next action for `view`'s seat, or `None` when it has nothing to do now
    fn next_action(&mut self, view: &GameStateView<'_>) -> Option<PlayerAction>;

    fn name(&self) -> &str {
        "controller"
    }
}

/// Callbacks the session exposes to automation code
///
/// Mutating hooks follow the session's mode: applied directly offline, or
/// appended to the event log when networked.
pub trait AutomationHooks {
    fn advance_phase(&mut self, seat: Seat) -> Result<()>;
    fn play_creature(&mut self, seat: Seat, card: InstanceId) -> Result<()>;
    fn prepare_spell(&mut self, seat: Seat, card: InstanceId) -> Result<()>;
    fn compute_requirements(&self, effects: &[EffectDef]) -> Vec<Requirement>;
    fn remove_from_hand(&mut self, seat: Seat, card: InstanceId) -> Result<()>;
    fn spend_mana(&mut self, seat: Seat, amount: u32) -> Result<()>;
    fn resolve_effects(
        &mut self,
        seat: Seat,
        source: Option<InstanceId>,
        effects: Vec<EffectDef>,
        targets: BTreeMap<usize, Vec<Target>>,
    ) -> Result<()>;
    fn draw(&mut self, seat: Seat, count: u32) -> Result<()>;
    fn log(&mut self, message: &str);
    fn can_play(&self, seat: Seat, card: InstanceId) -> bool;
}

/// Read-only view of the match from one seat
pub struct GameStateView<'a> {
    game: &'a GameState,
    seat: Seat,
}

impl<'a> GameStateView<'a> {
    pub fn new(game: &'a GameState, seat: Seat) -> Self {
        GameStateView { game, seat }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn game(&self) -> &'a GameState {
        self.game
    }

    pub fn is_my_turn(&self) -> bool {
        self.game.current_player == self.seat && !self.game.is_over()
    }

    pub fn phase(&self) -> Phase {
        self.game.phase
    }

    pub fn combat_stage(&self) -> Option<CombatStage> {
        self.game.combat.as_ref().map(|c| c.stage)
    }

    pub fn life(&self) -> i32 {
        self.game.player(self.seat).life
    }

    pub fn opponent_life(&self) -> i32 {
        self.game.player(self.seat.opponent()).life
    }

    pub fn hand(&self) -> &'a [InstanceId] {
        &self.game.player(self.seat).zones.hand.cards
    }

    pub fn card(&self, id: InstanceId) -> Option<&'a CardInstance> {
        self.game.card(id).ok()
    }

    /// Cards in hand that could be played right now, in hand order
    pub fn playable_cards(&self) -> Vec<InstanceId> {
        self.hand()
            .iter()
            .copied()
            .filter(|&id| self.game.can_play(self.seat, id))
            .collect()
    }

    /// Creatures whose activated ability could be used right now
    pub fn activatable_creatures(&self) -> Vec<InstanceId> {
        self.game
            .player(self.seat)
            .zones
            .battlefield
            .cards
            .iter()
            .copied()
            .filter(|&id| self.game.can_activate(self.seat, id).is_ok())
            .collect()
    }

    pub fn eligible_attackers(&self) -> Vec<InstanceId> {
        self.game.eligible_attackers(self.seat)
    }

    pub fn declared_attackers(&self) -> &'a [InstanceId] {
        self.game
            .combat
            .as_ref()
            .map(|c| c.attackers.as_slice())
            .unwrap_or(&[])
    }

    pub fn eligible_blockers(&self) -> Vec<InstanceId> {
        self.game.eligible_blockers(self.seat)
    }

    /// True while this seat is the defender and may still assign blockers
    pub fn is_blocking(&self) -> bool {
        self.game
            .blocking
            .as_ref()
            .is_some_and(|b| b.defending_seat == self.seat && b.awaiting_defender)
            && !self.game.is_over()
    }

    /// The pending action, if this seat controls it
    pub fn my_pending(&self) -> Option<&'a PendingAction> {
        self.game
            .pending
            .as_ref()
            .filter(|p| p.controller == self.seat)
    }

    /// Legal targets for the current requirement of this seat's pending action
    pub fn legal_targets(&self) -> Vec<Target> {
        let Some(pending) = self.my_pending() else {
            return Vec::new();
        };
        let Some(req) = pending.current_requirement() else {
            return Vec::new();
        };
        legal_targets(self.game, req, &pending.context())
    }

    /// Default choice for the next target of this seat's pending action
    pub fn suggested_target(&self) -> Option<Target> {
        let pending = self.my_pending()?;
        let req = pending.current_requirement()?;
        let effect = pending.current_effect()?;
        auto_select_targets(self.game, req, effect, &pending.context())
            .into_iter()
            .next()
    }

    pub fn requirements_for(&self, effects: &[EffectDef]) -> Vec<Requirement> {
        build_requirements(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardTemplate;
    use crate::game::RulesConfig;
    use crate::loader::CardCatalog;
    use crate::zones::Zone;
    use std::sync::Arc;

    #[test]
    fn test_view_reports_playable_and_attackers() {
        let mut game = GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        );
        game.start_turn_with_draw(Seat::FIRST, false);
        let cheap = game.create_instance(
            Arc::new(CardTemplate::creature("imp", "Imp", 1, 1, 1)),
            Seat::FIRST,
            Zone::Hand,
        );
        let pricey = game.create_instance(
            Arc::new(CardTemplate::creature("ogre", "Ogre", 4, 4, 4)),
            Seat::FIRST,
            Zone::Hand,
        );
        let veteran = game.create_instance(
            Arc::new(CardTemplate::creature("vet", "Veteran", 2, 2, 2)),
            Seat::FIRST,
            Zone::Battlefield,
        );

        let view = GameStateView::new(&game, Seat::FIRST);
        assert!(view.is_my_turn());
        assert_eq!(view.playable_cards(), vec![cheap]);
        assert!(!view.playable_cards().contains(&pricey));
        assert_eq!(view.eligible_attackers(), vec![veteran]);
        assert!(view.my_pending().is_none());

        let other = GameStateView::new(&game, Seat::SECOND);
        assert!(!other.is_my_turn());
        assert!(other.playable_cards().is_empty());
    }
}
