//! Applying replicated events to local state
//!
//! Every event is routed into the same `GameState` operation a local action
//! would have called, so both peers run identical rules code on identical
//! input. Nothing here mutates state on its own account.

use crate::core::{InstanceId, Seat};
use crate::game::pending::PendingKind;
use crate::game::{GameLogger, GameState, PhaseAdvance};
use crate::loader::CardCatalog;
use crate::replication::{CardRef, EventPayload, MatchEvent};
use crate::zones::Zone;
use crate::{ClashError, Result};
use std::sync::Arc;

/// Apply one event to the match held in `slot`
///
/// `MATCH_STARTED` fills an empty slot; every other event needs a running
/// match. Rule rejections and references to cards that are gone are recorded
/// in the match log and otherwise ignored, so a race between peers degrades
/// to a log line instead of an error.
pub fn apply_event(
    slot: &mut Option<GameState>,
    event: &MatchEvent,
    catalog: &Arc<CardCatalog>,
    logger: &GameLogger,
) {
    if let EventPayload::MatchStarted {
        setup,
        rules,
        dice,
        first_player,
    } = &event.event
    {
        if let Some(game) = slot.as_ref() {
            game.logger.warn(
                "replication",
                &format!("#{} starts a match that is already running", event.sequence),
            );
            return;
        }
        match GameState::from_setup_logged(setup, rules.clone(), Arc::clone(catalog), logger.clone())
        {
            Ok(game) => {
                if setup.roll_dice() != *dice || game.current_player != *first_player {
                    game.logger.warn(
                        "replication",
                        "match start disagrees with the locally derived dice roll",
                    );
                }
                *slot = Some(game);
            }
            Err(e) => logger.warn("replication", &format!("cannot start match: {e}")),
        }
        return;
    }

    let Some(game) = slot.as_mut() else {
        logger.warn(
            "replication",
            &format!(
                "#{} {} arrived before the match started",
                event.sequence,
                event.event.type_name()
            ),
        );
        return;
    };

    game.logger.category(
        "replication",
        &format!("applying #{} {}", event.sequence, event.event.type_name()),
    );
    match apply_to_game(game, &event.event) {
        Ok(()) => {}
        Err(ClashError::InvalidAction(reason)) => {
            game.record(format!("Ignored {}: {reason}", event.event.type_name()));
        }
        Err(ClashError::EntityNotFound(id)) => {
            game.record(format!(
                "Ignored {}: card #{id} is not in this match",
                event.event.type_name()
            ));
        }
        Err(e) => game.logger.warn(
            "replication",
            &format!("#{} {} failed: {e}", event.sequence, event.event.type_name()),
        ),
    }
}

fn apply_to_game(game: &mut GameState, payload: &EventPayload) -> Result<()> {
    match payload {
        EventPayload::MatchStarted { .. } => Err(ClashError::ProtocolViolation(
            "match already started".into(),
        )),
        EventPayload::TurnStarted { seat, turn } => {
            let active = seat.opponent();
            expect_transition(game, active, PhaseAdvance::TurnStarted { seat: *seat, turn: *turn })?;
            game.advance_phase(active).map(drop)
        }
        EventPayload::PhaseChanged { seat, phase } => {
            expect_transition(game, *seat, PhaseAdvance::Changed(*phase))?;
            game.advance_phase(*seat).map(drop)
        }
        EventPayload::CombatStarted { seat } => {
            expect_transition(game, *seat, PhaseAdvance::CombatStarted)?;
            game.advance_phase(*seat).map(drop)
        }
        EventPayload::CardPlayed { seat, card, zone } => {
            let id = resolve(game, card)?;
            match zone {
                Zone::Battlefield => game.play_creature(*seat, id).map(drop),
                Zone::Graveyard => game.discard(*seat, id),
                other => Err(ClashError::InvalidAction(format!(
                    "cards cannot be played to the {other:?}"
                ))),
            }
        }
        EventPayload::TokenCreated { seat, template } => {
            let template = game.catalog.require(template)?;
            game.create_token(*seat, template);
            Ok(())
        }
        EventPayload::CreatureDestroyed { card } => {
            let id = resolve(game, card)?;
            game.destroy_creature(id)
        }
        EventPayload::PendingCreated { seat, kind, card } => {
            let id = resolve(game, card)?;
            match kind {
                PendingKind::Summon => game.play_creature(*seat, id).map(drop),
                PendingKind::Spell => game.prepare_spell(*seat, id).map(drop),
                PendingKind::Ability => game.activate_ability(*seat, id).map(drop),
                PendingKind::Trigger => Err(ClashError::InvalidAction(
                    "triggers open on their own".into(),
                )),
            }
        }
        EventPayload::PendingUpdated {
            seat,
            pending_id,
            target,
        } => {
            expect_pending(game, *pending_id)?;
            game.select_target(*seat, *target)
        }
        EventPayload::PendingResolved { seat, pending_id } => {
            expect_pending(game, *pending_id)?;
            game.confirm_pending(*seat)
        }
        EventPayload::PendingCancelled { seat, pending_id } => {
            expect_pending(game, *pending_id)?;
            game.cancel_pending(*seat)
        }
        EventPayload::AttackerToggled { seat, attacker } => {
            let id = resolve(game, attacker)?;
            game.declare_attacker(*seat, id).map(drop)
        }
        EventPayload::AttackersConfirmed { seat } => game.confirm_attackers(*seat),
        EventPayload::BlockingStarted { seat } => game.begin_blocking(*seat),
        EventPayload::BlockerSelected { seat, blocker } => {
            let id = resolve(game, blocker)?;
            game.select_blocker(*seat, id)
        }
        EventPayload::BlockerAssigned { seat, attacker } => {
            let id = resolve(game, attacker)?;
            game.assign_blocker(*seat, id)
        }
        EventPayload::CombatResolved { report } => {
            game.can_resolve_combat(None)?;
            game.apply_combat_report(report);
            Ok(())
        }
        EventPayload::LifeChanged { seat, delta } => {
            game.adjust_life(*seat, *delta);
            Ok(())
        }
        EventPayload::ManaSpent { seat, amount } => game.pay_mana(*seat, *amount),
        EventPayload::EffectsResolved {
            seat,
            source,
            effects,
            targets,
        } => {
            game.resolve_effects(*seat, *source, effects, targets);
            Ok(())
        }
        EventPayload::Draw { seat, count } => {
            game.draw_cards(*seat, *count);
            Ok(())
        }
        EventPayload::LogLine { text } => {
            game.record(text.clone());
            Ok(())
        }
        EventPayload::GameEnded { conceded_by } => game.concede(*conceded_by),
    }
}

/// Look the referenced card up again by instance id
///
/// The template must match too: an id that now names a different card means
/// the payload and the local match disagree.
fn resolve(game: &GameState, card: &CardRef) -> Result<InstanceId> {
    let local = game.card(card.instance)?;
    if local.template_id() != &card.template || local.owner != card.owner {
        return Err(ClashError::InvalidAction(format!(
            "{} is not a {} owned by {}",
            card.instance, card.template, card.owner
        )));
    }
    Ok(card.instance)
}

fn expect_pending(game: &GameState, pending_id: u64) -> Result<()> {
    match game.pending.as_ref() {
        Some(pending) if pending.id == pending_id => Ok(()),
        Some(pending) => Err(ClashError::InvalidAction(format!(
            "pending action {pending_id} is not current (found {})",
            pending.id
        ))),
        None => Err(ClashError::InvalidAction(format!(
            "pending action {pending_id} no longer exists"
        ))),
    }
}

fn expect_transition(game: &GameState, seat: Seat, expected: PhaseAdvance) -> Result<()> {
    let actual = game.next_phase_transition(seat)?;
    if actual != expected {
        return Err(ClashError::InvalidAction(format!(
            "expected {expected:?}, the match is at {actual:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardTemplate, MatchId, TemplateId};
    use crate::game::setup::MatchSetup;
    use crate::game::RulesConfig;

    fn catalog() -> Arc<CardCatalog> {
        Arc::new(CardCatalog::from_templates([CardTemplate::creature(
            "bear", "Bear", 1, 2, 2,
        )]))
    }

    fn started() -> (Option<GameState>, Arc<CardCatalog>, GameLogger) {
        let catalog = catalog();
        let mut logger = GameLogger::new();
        logger.enable_capture();
        let deck: Vec<TemplateId> = vec![TemplateId::new("bear"); 8];
        let setup = MatchSetup::new("m", 7, ["Alice", "Bob"], [deck.clone(), deck])
            .with_first_player(Seat::FIRST);
        let dice = setup.roll_dice();
        let start = MatchEvent::new(
            MatchId::new("m"),
            1,
            EventPayload::MatchStarted {
                setup,
                rules: RulesConfig::default(),
                dice,
                first_player: Seat::FIRST,
            },
            0,
        );
        let mut slot = None;
        apply_event(&mut slot, &start, &catalog, &logger);
        (slot, catalog, logger)
    }

    #[test]
    fn test_match_started_builds_state() {
        let (slot, _, _) = started();
        let game = slot.unwrap();
        assert_eq!(game.current_player, Seat::FIRST);
        assert_eq!(game.player(Seat::FIRST).zones.hand.len(), 4);
    }

    #[test]
    fn test_card_played_routes_to_summon() {
        let (mut slot, catalog, logger) = started();
        let game = slot.as_ref().unwrap();
        let card = game.card(game.player(Seat::FIRST).zones.hand.cards[0]).unwrap();
        let event = MatchEvent::new(
            MatchId::new("m"),
            2,
            EventPayload::CardPlayed {
                seat: Seat::FIRST,
                card: CardRef::of(card),
                zone: Zone::Battlefield,
            },
            0,
        );
        apply_event(&mut slot, &event, &catalog, &logger);
        let game = slot.unwrap();
        assert!(game.pending.is_some());
    }

    #[test]
    fn test_missing_reference_is_log_only() {
        let (mut slot, catalog, logger) = started();
        let event = MatchEvent::new(
            MatchId::new("m"),
            2,
            EventPayload::CreatureDestroyed {
                card: CardRef {
                    instance: InstanceId::new(999),
                    template: TemplateId::new("bear"),
                    owner: Seat::SECOND,
                },
            },
            0,
        );
        apply_event(&mut slot, &event, &catalog, &logger);
        let game = slot.unwrap();
        assert!(game.log.last().unwrap().starts_with("Ignored CREATURE_DESTROYED"));
    }

    #[test]
    fn test_out_of_order_phase_event_is_ignored() {
        let (mut slot, catalog, logger) = started();
        let event = MatchEvent::new(
            MatchId::new("m"),
            2,
            EventPayload::TurnStarted {
                seat: Seat::SECOND,
                turn: 2,
            },
            0,
        );
        apply_event(&mut slot, &event, &catalog, &logger);
        let game = slot.unwrap();
        assert_eq!(game.turn, 1);
        assert!(game.log.last().unwrap().starts_with("Ignored TURN_STARTED"));
    }
}
