//! Target legality checks

use crate::core::{InstanceId, Seat, Target, TargetClass};
use crate::game::GameState;
use crate::targeting::Requirement;

/// What a target is being chosen for
#[derive(Debug, Clone, Copy)]
pub struct PendingContext<'a> {
    pub controller: Seat,
    pub source: Option<InstanceId>,
    /// Targets already picked for the same requirement
    pub already_selected: &'a [Target],
}

impl<'a> PendingContext<'a> {
    pub fn new(controller: Seat, source: Option<InstanceId>) -> Self {
        PendingContext {
            controller,
            source,
            already_selected: &[],
        }
    }

    pub fn with_selected(mut self, selected: &'a [Target]) -> Self {
        self.already_selected = selected;
        self
    }
}

/// Whether `target` may be chosen for `req`
///
/// Creature targets are resolved against the current battlefield: the
/// instance must be there, under the controller the target names, and not
/// already dead.
pub fn is_target_valid(
    game: &GameState,
    target: &Target,
    req: &Requirement,
    ctx: &PendingContext<'_>,
) -> bool {
    if ctx.already_selected.contains(target) {
        return false;
    }

    match *target {
        Target::Player { .. } => req.allows_players(),
        Target::Creature {
            instance,
            controller,
        } => {
            if req.exclude_self && ctx.source == Some(instance) {
                return false;
            }
            if game.battlefield_seat(instance) != Some(controller) {
                return false;
            }
            let alive = game
                .cards
                .get(instance)
                .is_ok_and(|c| c.is_creature() && !c.has_lethal_damage());
            if !alive {
                return false;
            }
            match req.class {
                TargetClass::FriendlyCreature => controller == ctx.controller,
                TargetClass::EnemyCreature => controller != ctx.controller,
                TargetClass::AnyCreature | TargetClass::Any | TargetClass::Creature => true,
            }
        }
    }
}

/// Every legal target for `req`, friendly side first, then the opponent's,
/// each in battlefield order, then players
pub fn legal_targets(game: &GameState, req: &Requirement, ctx: &PendingContext<'_>) -> Vec<Target> {
    let mut targets = Vec::new();
    let seats = [ctx.controller, ctx.controller.opponent()];

    for seat in seats {
        for &id in &game.player(seat).zones.battlefield.cards {
            let target = Target::creature(id, seat);
            if is_target_valid(game, &target, req, ctx) {
                targets.push(target);
            }
        }
    }
    if req.allows_players() {
        for seat in seats {
            let target = Target::player(seat);
            if is_target_valid(game, &target, req, ctx) {
                targets.push(target);
            }
        }
    }
    targets
}
