//! Deterministic default target selection for automated seats
//!
//! Given the same board this always picks the same targets, so a peer that
//! did not see a live choice can rebuild it.

use crate::core::{EffectDef, Target};
use crate::game::GameState;
use crate::targeting::{legal_targets, PendingContext, Requirement};

/// Pick targets for `req` the way an automated seat would
///
/// Damage prefers a kill on the strongest creature it can finish, then the
/// enemy player when players are allowed. Beneficial effects prefer the
/// controller's side. Everything else goes for the strongest enemy creature,
/// falling back to friendly creatures. Ties go to battlefield order.
pub fn auto_select_targets(
    game: &GameState,
    req: &Requirement,
    effect: &EffectDef,
    ctx: &PendingContext<'_>,
) -> Vec<Target> {
    let mut chosen: Vec<Target> = ctx.already_selected.to_vec();
    // Earlier picks count toward the requirement but are no longer legal
    let legal_count = chosen.len() + legal_targets(game, req, ctx).len();
    let wanted = req.effective_count(legal_count).unwrap_or(0);

    while chosen.len() < wanted {
        let step_ctx = PendingContext {
            controller: ctx.controller,
            source: ctx.source,
            already_selected: &chosen,
        };
        let legal = legal_targets(game, req, &step_ctx);
        match pick_one(game, &legal, effect, &step_ctx) {
            Some(target) => chosen.push(target),
            None => break,
        }
    }

    chosen.split_off(ctx.already_selected.len())
}

fn pick_one(
    game: &GameState,
    legal: &[Target],
    effect: &EffectDef,
    ctx: &PendingContext<'_>,
) -> Option<Target> {
    let me = ctx.controller;
    let enemy_creatures: Vec<Target> = legal
        .iter()
        .copied()
        .filter(|t| t.instance().is_some() && t.seat() != me)
        .collect();
    let friendly_creatures: Vec<Target> = legal
        .iter()
        .copied()
        .filter(|t| t.instance().is_some() && t.seat() == me)
        .collect();
    let player = |seat| legal.iter().copied().find(|t| *t == Target::player(seat));

    if let Some(amount) = effect.damage_amount() {
        let lethal: Vec<Target> = enemy_creatures
            .iter()
            .copied()
            .filter(|t| {
                t.instance()
                    .and_then(|id| game.card(id).ok())
                    .is_some_and(|c| c.remaining_toughness() <= amount)
            })
            .collect();
        return strongest(game, &lethal)
            .or_else(|| player(me.opponent()))
            .or_else(|| strongest(game, &enemy_creatures))
            .or_else(|| strongest(game, &friendly_creatures))
            .or_else(|| player(me));
    }

    if effect.is_beneficial() {
        return strongest(game, &friendly_creatures)
            .or_else(|| player(me))
            .or_else(|| strongest(game, &enemy_creatures))
            .or_else(|| player(me.opponent()));
    }

    strongest(game, &enemy_creatures)
        .or_else(|| player(me.opponent()))
        .or_else(|| strongest(game, &friendly_creatures))
        .or_else(|| player(me))
}

/// Highest current attack; the earliest candidate wins ties
fn strongest(game: &GameState, candidates: &[Target]) -> Option<Target> {
    let power = |t: &Target| {
        t.instance()
            .and_then(|id| game.card(id).ok())
            .map(|c| c.current_attack())
            .unwrap_or(i32::MIN)
    };
    let mut best: Option<(Target, i32)> = None;
    for target in candidates {
        let p = power(target);
        if best.map_or(true, |(_, bp)| p > bp) {
            best = Some((*target, p));
        }
    }
    best.map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuffDuration, CardTemplate, InstanceId, Seat, TargetClass, TargetSpec};
    use crate::game::RulesConfig;
    use crate::loader::CardCatalog;
    use crate::targeting::build_requirements;
    use crate::zones::Zone;
    use std::sync::Arc;

    fn game() -> GameState {
        GameState::new_two_player(
            "m",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        )
    }

    fn put(game: &mut GameState, seat: Seat, attack: i32, toughness: i32) -> InstanceId {
        let template = Arc::new(CardTemplate::creature("c", "Critter", 1, attack, toughness));
        game.create_instance(template, seat, Zone::Battlefield)
    }

    fn select(game: &GameState, effect: EffectDef) -> Vec<Target> {
        let reqs = build_requirements(std::slice::from_ref(&effect));
        let ctx = PendingContext::new(Seat::FIRST, None);
        auto_select_targets(game, &reqs[0], &effect, &ctx)
    }

    #[test]
    fn test_damage_prefers_strongest_kill() {
        let mut game = game();
        let _big = put(&mut game, Seat::SECOND, 5, 5);
        let _small = put(&mut game, Seat::SECOND, 1, 1);
        let mid = put(&mut game, Seat::SECOND, 3, 2);

        let picked = select(
            &game,
            EffectDef::Damage {
                amount: 2,
                target: TargetSpec::single(TargetClass::Any),
            },
        );
        assert_eq!(picked, vec![Target::creature(mid, Seat::SECOND)]);
    }

    #[test]
    fn test_damage_falls_back_to_player() {
        let mut game = game();
        put(&mut game, Seat::SECOND, 5, 5);

        let picked = select(
            &game,
            EffectDef::Damage {
                amount: 2,
                target: TargetSpec::single(TargetClass::Any),
            },
        );
        assert_eq!(picked, vec![Target::player(Seat::SECOND)]);
    }

    #[test]
    fn test_beneficial_prefers_friendly() {
        let mut game = game();
        let mine = put(&mut game, Seat::FIRST, 1, 1);
        put(&mut game, Seat::SECOND, 4, 4);

        let picked = select(
            &game,
            EffectDef::Buff {
                attack: 2,
                toughness: 2,
                duration: BuffDuration::EndOfTurn,
                target: TargetSpec::single(TargetClass::AnyCreature),
            },
        );
        assert_eq!(picked, vec![Target::creature(mine, Seat::FIRST)]);
    }

    #[test]
    fn test_harmful_falls_back_to_friendly() {
        let mut game = game();
        let mine = put(&mut game, Seat::FIRST, 1, 1);

        let picked = select(
            &game,
            EffectDef::Freeze {
                turns: 1,
                target: TargetSpec::single(TargetClass::AnyCreature),
            },
        );
        assert_eq!(picked, vec![Target::creature(mine, Seat::FIRST)]);
    }

    #[test]
    fn test_ties_break_by_battlefield_order() {
        let mut game = game();
        let first = put(&mut game, Seat::SECOND, 2, 2);
        let second = put(&mut game, Seat::SECOND, 2, 2);

        let picked = select(
            &game,
            EffectDef::Destroy {
                target: TargetSpec::many(TargetClass::EnemyCreature, 2),
            },
        );
        assert_eq!(
            picked,
            vec![
                Target::creature(first, Seat::SECOND),
                Target::creature(second, Seat::SECOND)
            ]
        );
    }

    #[test]
    fn test_second_pick_completes_multi_target_requirement() {
        let mut game = game();
        let first = put(&mut game, Seat::SECOND, 2, 3);
        let second = put(&mut game, Seat::SECOND, 2, 3);
        let effect = EffectDef::Damage {
            amount: 2,
            target: TargetSpec::many(TargetClass::EnemyCreature, 2),
        };
        let reqs = build_requirements(std::slice::from_ref(&effect));

        let picked = [Target::creature(first, Seat::SECOND)];
        let ctx = PendingContext::new(Seat::FIRST, None).with_selected(&picked);
        assert_eq!(
            auto_select_targets(&game, &reqs[0], &effect, &ctx),
            vec![Target::creature(second, Seat::SECOND)]
        );

        let both = [
            Target::creature(first, Seat::SECOND),
            Target::creature(second, Seat::SECOND),
        ];
        let ctx = PendingContext::new(Seat::FIRST, None).with_selected(&both);
        assert!(auto_select_targets(&game, &reqs[0], &effect, &ctx).is_empty());
    }
}
