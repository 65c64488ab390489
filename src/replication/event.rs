//! Replicated match events
//!
//! Payloads carry only stable identifiers (instance ids, seats, template ids),
//! never live objects. The receiving side looks everything up again.

use crate::core::{CardInstance, EffectDef, InstanceId, MatchId, Seat, Target, TemplateId};
use crate::game::combat::CombatReport;
use crate::game::pending::PendingKind;
use crate::game::setup::MatchSetup;
use crate::game::{Phase, RulesConfig};
use crate::zones::Zone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable reference to a card instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub instance: InstanceId,
    pub template: TemplateId,
    pub owner: Seat,
}

impl CardRef {
    pub fn of(card: &CardInstance) -> Self {
        CardRef {
            instance: card.instance_id,
            template: card.template_id().clone(),
            owner: card.owner,
        }
    }
}

/// The fixed event catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    MatchStarted {
        setup: MatchSetup,
        rules: RulesConfig,
        dice: [u8; 2],
        first_player: Seat,
    },
    TurnStarted {
        seat: Seat,
        turn: u32,
    },
    PhaseChanged {
        seat: Seat,
        phase: Phase,
    },
    /// A card leaves the hand: to the battlefield (summon) or the graveyard
    CardPlayed {
        seat: Seat,
        card: CardRef,
        zone: Zone,
    },
    TokenCreated {
        seat: Seat,
        template: TemplateId,
    },
    CreatureDestroyed {
        card: CardRef,
    },
    PendingCreated {
        seat: Seat,
        kind: PendingKind,
        card: CardRef,
    },
    PendingUpdated {
        seat: Seat,
        pending_id: u64,
        target: Target,
    },
    PendingResolved {
        seat: Seat,
        pending_id: u64,
    },
    PendingCancelled {
        seat: Seat,
        pending_id: u64,
    },
    AttackerToggled {
        seat: Seat,
        attacker: CardRef,
    },
    AttackersConfirmed {
        seat: Seat,
    },
    BlockingStarted {
        seat: Seat,
    },
    BlockerSelected {
        seat: Seat,
        blocker: CardRef,
    },
    BlockerAssigned {
        seat: Seat,
        attacker: CardRef,
    },
    CombatStarted {
        seat: Seat,
    },
    CombatResolved {
        report: CombatReport,
    },
    LifeChanged {
        seat: Seat,
        delta: i32,
    },
    ManaSpent {
        seat: Seat,
        amount: u32,
    },
    EffectsResolved {
        seat: Seat,
        source: Option<InstanceId>,
        effects: Vec<EffectDef>,
        targets: BTreeMap<usize, Vec<Target>>,
    },
    Draw {
        seat: Seat,
        count: u32,
    },
    LogLine {
        text: String,
    },
    GameEnded {
        conceded_by: Seat,
    },
}

impl EventPayload {
    /// Wire tag of the event
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::MatchStarted { .. } => "MATCH_STARTED",
            EventPayload::TurnStarted { .. } => "TURN_STARTED",
            EventPayload::PhaseChanged { .. } => "PHASE_CHANGED",
            EventPayload::CardPlayed { .. } => "CARD_PLAYED",
            EventPayload::TokenCreated { .. } => "TOKEN_CREATED",
            EventPayload::CreatureDestroyed { .. } => "CREATURE_DESTROYED",
            EventPayload::PendingCreated { .. } => "PENDING_CREATED",
            EventPayload::PendingUpdated { .. } => "PENDING_UPDATED",
            EventPayload::PendingResolved { .. } => "PENDING_RESOLVED",
            EventPayload::PendingCancelled { .. } => "PENDING_CANCELLED",
            EventPayload::AttackerToggled { .. } => "ATTACKER_TOGGLED",
            EventPayload::AttackersConfirmed { .. } => "ATTACKERS_CONFIRMED",
            EventPayload::BlockingStarted { .. } => "BLOCKING_STARTED",
            EventPayload::BlockerSelected { .. } => "BLOCKER_SELECTED",
            EventPayload::BlockerAssigned { .. } => "BLOCKER_ASSIGNED",
            EventPayload::CombatStarted { .. } => "COMBAT_STARTED",
            EventPayload::CombatResolved { .. } => "COMBAT_RESOLVED",
            EventPayload::LifeChanged { .. } => "LIFE_CHANGED",
            EventPayload::ManaSpent { .. } => "MANA_SPENT",
            EventPayload::EffectsResolved { .. } => "EFFECTS_RESOLVED",
            EventPayload::Draw { .. } => "DRAW",
            EventPayload::LogLine { .. } => "LOG_LINE",
            EventPayload::GameEnded { .. } => "GAME_ENDED",
        }
    }
}

/// One entry of a match's append-only event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: String,
    pub match_id: MatchId,
    /// Gapless, starting at 1
    pub sequence: u64,
    pub event: EventPayload,
    /// Milliseconds since the Unix epoch, informational only
    pub created_at: u64,
}

impl MatchEvent {
    pub fn new(match_id: MatchId, sequence: u64, event: EventPayload, created_at: u64) -> Self {
        MatchEvent {
            id: format!("{match_id}:{sequence}"),
            match_id,
            sequence,
            event,
            created_at,
        }
    }
}
