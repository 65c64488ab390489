//! Main match state structure

use crate::core::{CardInstance, CardTemplate, InstanceId, InstanceRegistry, MatchId, Player, Seat};
use crate::game::combat::{BlockingState, CombatState};
use crate::game::pending::PendingAction;
use crate::game::{GameLogger, Phase, RulesConfig};
use crate::loader::CardCatalog;
use crate::zones::Zone;
use crate::{ClashError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lines kept in the replicated match log; the oldest half is dropped past this
pub const MAX_LOG_LINES: usize = 10_000;

/// Complete match state
///
/// Everything both peers of a replicated match must agree on lives here, and
/// nothing else does: the state hash is computed over this struct (minus the
/// logger). Cheap to clone, which the session uses to dry-run an action before
/// committing it to the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub match_id: MatchId,

    pub rules: RulesConfig,

    /// Every card instance of the match, in any zone
    pub cards: InstanceRegistry<CardInstance>,

    /// Indexed by `Seat::index()`
    pub players: [Player; 2],

    pub current_player: Seat,

    pub phase: Phase,

    /// Starts at 1, incremented when a turn ends
    pub turn: u32,

    /// At most one in-progress action awaiting targets or confirmation
    pub pending: Option<PendingAction>,

    pub combat: Option<CombatState>,

    pub blocking: Option<BlockingState>,

    /// Human-readable match log (replicated, so part of the hashed state).
    /// Bounded by `MAX_LOG_LINES`; the logger keeps the full record.
    pub log: Vec<String>,

    pub winner: Option<Seat>,

    next_pending_id: u64,

    /// Template table; tokens are printed from it mid-match
    #[serde(skip)]
    pub catalog: Arc<CardCatalog>,

    pub logger: GameLogger,
}

impl GameState {
    /// Create an empty two-player match (no cards, turn 1, first seat active)
    pub fn new_two_player(
        match_id: impl Into<MatchId>,
        player1_name: &str,
        player2_name: &str,
        rules: RulesConfig,
        catalog: Arc<CardCatalog>,
    ) -> Self {
        let life = rules.starting_life;
        GameState {
            match_id: match_id.into(),
            cards: InstanceRegistry::new(),
            players: [
                Player::new(Seat::FIRST, player1_name, life),
                Player::new(Seat::SECOND, player2_name, life),
            ],
            current_player: Seat::FIRST,
            phase: Phase::Main1,
            turn: 1,
            pending: None,
            combat: None,
            blocking: None,
            log: Vec::new(),
            winner: None,
            next_pending_id: 1,
            rules,
            catalog,
            logger: GameLogger::new(),
        }
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    pub fn player_mut(&mut self, seat: Seat) -> &mut Player {
        &mut self.players[seat.index()]
    }

    pub fn card(&self, id: InstanceId) -> Result<&CardInstance> {
        self.cards.get(id)
    }

    pub fn card_mut(&mut self, id: InstanceId) -> Result<&mut CardInstance> {
        self.cards.get_mut(id)
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Won, or played past the automated turn limit
    pub fn is_finished(&self) -> bool {
        self.is_over() || self.turn > self.rules.max_turns
    }

    pub(crate) fn allocate_pending_id(&mut self) -> u64 {
        let id = self.next_pending_id;
        self.next_pending_id += 1;
        id
    }

    /// Print a new instance of `template` into `zone` of `owner`
    pub fn create_instance(
        &mut self,
        template: Arc<CardTemplate>,
        owner: Seat,
        zone: Zone,
    ) -> InstanceId {
        let id = self.cards.next_id();
        self.cards.insert(id, CardInstance::new(id, template, owner));
        self.player_mut(owner).zones.get_zone_mut(zone).add(id);
        id
    }

    /// Seat whose battlefield currently holds `id`
    pub fn battlefield_seat(&self, id: InstanceId) -> Option<Seat> {
        Seat::both()
            .into_iter()
            .find(|&seat| self.player(seat).zones.battlefield.contains(id))
    }

    pub fn is_on_battlefield(&self, id: InstanceId) -> bool {
        self.battlefield_seat(id).is_some()
    }

    /// Creatures on `seat`'s battlefield, in battlefield order
    pub fn battlefield_creatures(&self, seat: Seat) -> impl Iterator<Item = &CardInstance> {
        self.player(seat)
            .zones
            .battlefield
            .cards
            .iter()
            .filter_map(move |&id| self.cards.get(id).ok())
            .filter(|card| card.is_creature())
    }

    /// Move a card between two of `seat`'s zones
    ///
    /// Tokens leaving the battlefield cease to exist: they are dropped from
    /// every zone but keep their registry entry so old references still resolve.
    pub fn move_card(&mut self, id: InstanceId, seat: Seat, from: Zone, to: Zone) -> Result<()> {
        if !self.player_mut(seat).zones.get_zone_mut(from).remove(id) {
            return Err(ClashError::InvalidAction(format!(
                "{id} is not in {seat}'s {from:?}"
            )));
        }

        let card = self.cards.get_mut(id)?;
        if from == Zone::Battlefield {
            card.reset_for_zone_change();
            if card.is_token {
                return Ok(());
            }
        }
        self.player_mut(seat).zones.get_zone_mut(to).add(id);
        Ok(())
    }

    /// Draw up to `count` cards; returns how many were actually drawn
    pub fn draw_cards(&mut self, seat: Seat, count: u32) -> u32 {
        let mut drawn = 0;
        for _ in 0..count {
            let Some(id) = self.player_mut(seat).zones.deck.draw_top() else {
                let name = self.player(seat).name.clone();
                self.record(format!("{name} has no cards left to draw"));
                break;
            };
            self.player_mut(seat).zones.hand.add(id);
            drawn += 1;
        }
        if drawn > 0 {
            log_if_verbose!(self, "{} draws {} card(s)", self.player(seat).name, drawn);
        }
        drawn
    }

    /// Append a line to the replicated match log and echo it to the logger
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.logger.normal(&message);
        if self.log.len() >= MAX_LOG_LINES {
            self.log.drain(..MAX_LOG_LINES / 2);
        }
        self.log.push(message);
    }

    /// Remove every dead creature (lethal damage or explicitly destroyed) in one pass
    ///
    /// Runs after a whole batch of effects or a whole combat exchange so that
    /// simultaneous damage is judged together.
    pub fn sweep_dead(&mut self, destroyed: &[InstanceId]) {
        for seat in Seat::both() {
            let dead: Vec<InstanceId> = self
                .player(seat)
                .zones
                .battlefield
                .cards
                .iter()
                .copied()
                .filter(|&id| {
                    destroyed.contains(&id)
                        || self.cards.get(id).is_ok_and(|c| c.has_lethal_damage())
                })
                .collect();

            for id in dead {
                let name = match self.cards.get(id) {
                    Ok(card) => card.name().to_string(),
                    Err(_) => continue,
                };
                if self
                    .move_card(id, seat, Zone::Battlefield, Zone::Graveyard)
                    .is_ok()
                {
                    self.record(format!("{name} dies"));
                }
            }
        }
    }

    /// Settle the winner once a player's life reaches zero
    ///
    /// If both players fall at once the seat not taking the current turn wins.
    pub fn check_winner(&mut self) {
        if self.winner.is_some() {
            return;
        }
        let active = self.current_player;
        let lost = |seat: Seat| self.player(seat).has_lost();
        let winner = match (lost(active), lost(active.opponent())) {
            (false, false) => return,
            (true, _) => active.opponent(),
            (false, true) => active,
        };
        self.declare_winner(winner);
    }

    /// `seat` gives up; the opponent wins immediately
    pub fn concede(&mut self, seat: Seat) -> Result<()> {
        if self.is_over() {
            return Err(ClashError::InvalidAction("match is already over".into()));
        }
        let name = self.player(seat).name.clone();
        self.record(format!("{name} concedes"));
        self.declare_winner(seat.opponent());
        Ok(())
    }

    fn declare_winner(&mut self, winner: Seat) {
        self.winner = Some(winner);
        self.pending = None;
        self.combat = None;
        self.blocking = None;
        let name = self.player(winner).name.clone();
        self.logger.minimal(&format!("{name} wins the match"));
        self.log.push(format!("{name} wins the match"));
    }

    /// Common gate for player actions: match running and `seat` is active
    pub(crate) fn require_active(&self, seat: Seat) -> Result<()> {
        if self.is_over() {
            return Err(ClashError::InvalidAction("match is over".into()));
        }
        if seat != self.current_player {
            return Err(ClashError::InvalidAction(format!(
                "it is not {seat}'s turn"
            )));
        }
        Ok(())
    }

    pub(crate) fn require_no_pending(&self) -> Result<()> {
        if self.pending.is_some() {
            return Err(ClashError::InvalidAction(
                "another action is waiting to be resolved".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_game() -> GameState {
        GameState::new_two_player(
            "m1",
            "Alice",
            "Bob",
            RulesConfig::default(),
            Arc::new(CardCatalog::new()),
        )
    }

    fn bear() -> Arc<CardTemplate> {
        Arc::new(CardTemplate::creature("bear", "Grizzly Bear", 2, 2, 2))
    }

    #[test]
    fn test_match_log_is_bounded() {
        let mut game = empty_game();
        game.logger.enable_capture();
        for i in 0..MAX_LOG_LINES + 1 {
            game.record(format!("line {i}"));
        }
        assert_eq!(game.log.len(), MAX_LOG_LINES / 2 + 1);
        assert_eq!(game.log.last().map(String::as_str), Some("line 10000"));
        assert_eq!(game.log[0], format!("line {}", MAX_LOG_LINES / 2));
    }

    #[test]
    fn test_is_finished_after_turn_limit() {
        let mut game = empty_game();
        assert!(!game.is_finished());
        game.turn = game.rules.max_turns + 1;
        assert!(game.is_finished());
        assert!(!game.is_over());
    }

    #[test]
    fn test_new_two_player() {
        let game = empty_game();
        assert_eq!(game.player(Seat::FIRST).life, 20);
        assert_eq!(game.player(Seat::SECOND).name.as_str(), "Bob");
        assert_eq!(game.turn, 1);
        assert!(game.cards.is_empty());
    }

    #[test]
    fn test_draw_from_empty_deck_logs() {
        let mut game = empty_game();
        game.create_instance(bear(), Seat::FIRST, Zone::Deck);

        assert_eq!(game.draw_cards(Seat::FIRST, 2), 1);
        assert_eq!(game.player(Seat::FIRST).zones.hand.len(), 1);
        assert!(game.log.iter().any(|l| l.contains("no cards left")));
    }

    #[test]
    fn test_sweep_removes_lethal_and_destroyed() {
        let mut game = empty_game();
        let a = game.create_instance(bear(), Seat::FIRST, Zone::Battlefield);
        let b = game.create_instance(bear(), Seat::SECOND, Zone::Battlefield);
        let c = game.create_instance(bear(), Seat::SECOND, Zone::Battlefield);
        game.card_mut(a).unwrap().damage_marked = 2;

        game.sweep_dead(&[c]);

        assert!(game.player(Seat::FIRST).zones.graveyard.contains(a));
        assert!(game.player(Seat::SECOND).zones.battlefield.contains(b));
        assert!(game.player(Seat::SECOND).zones.graveyard.contains(c));
        assert_eq!(game.card(a).unwrap().damage_marked, 0);
    }

    #[test]
    fn test_tokens_vanish_but_stay_resolvable() {
        let mut game = empty_game();
        let token = game.create_instance(bear(), Seat::FIRST, Zone::Battlefield);
        game.card_mut(token).unwrap().is_token = true;
        game.card_mut(token).unwrap().damage_marked = 5;

        game.sweep_dead(&[]);

        assert!(!game.player(Seat::FIRST).zones.graveyard.contains(token));
        assert!(game.card(token).is_ok());
    }

    #[test]
    fn test_winner_and_concede() {
        let mut game = empty_game();
        game.player_mut(Seat::SECOND).lose_life(20);
        game.check_winner();
        assert_eq!(game.winner, Some(Seat::FIRST));

        let mut game = empty_game();
        game.concede(Seat::FIRST).unwrap();
        assert_eq!(game.winner, Some(Seat::SECOND));
        assert!(game.concede(Seat::SECOND).is_err());
    }
}
