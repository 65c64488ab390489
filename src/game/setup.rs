//! Match initialization from deck lists
//!
//! Both peers of a replicated match build their `GameState` from the same
//! `MatchSetup` (carried by the match-started event), so everything random
//! here comes from a ChaCha RNG seeded by the setup.

use crate::core::{MatchId, PlayerName, Seat, TemplateId};
use crate::game::{GameLogger, GameState, RulesConfig};
use crate::loader::CardCatalog;
use crate::zones::Zone;
use crate::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything needed to start a match deterministically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub match_id: MatchId,
    pub seed: u64,
    /// Deck contents per seat, in deck-list order (shuffled during setup)
    pub decks: [Vec<TemplateId>; 2],
    pub names: [PlayerName; 2],
    /// Overrides the dice roll when set
    pub first_player: Option<Seat>,
}

impl MatchSetup {
    pub fn new(
        match_id: impl Into<MatchId>,
        seed: u64,
        names: [&str; 2],
        decks: [Vec<TemplateId>; 2],
    ) -> Self {
        MatchSetup {
            match_id: match_id.into(),
            seed,
            decks,
            names: [PlayerName::new(names[0]), PlayerName::new(names[1])],
            first_player: None,
        }
    }

    pub fn with_first_player(mut self, seat: Seat) -> Self {
        self.first_player = Some(seat);
        self
    }

    /// Roll a d20 per seat until the results differ
    pub fn roll_dice(&self) -> [u8; 2] {
        let mut rng = self.dice_rng();
        loop {
            let a = rng.gen_range(1..=20u8);
            let b = rng.gen_range(1..=20u8);
            if a != b {
                return [a, b];
            }
        }
    }

    /// Seat that takes the first turn: the override, else the higher roll
    pub fn starting_seat(&self, dice: [u8; 2]) -> Seat {
        self.first_player.unwrap_or(if dice[0] > dice[1] {
            Seat::FIRST
        } else {
            Seat::SECOND
        })
    }

    fn dice_rng(&self) -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(self.seed)
    }

    fn shuffle_rng(&self) -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(self.seed.wrapping_add(1))
    }
}

impl GameState {
    /// Build a ready-to-play match: decks loaded and shuffled, opening hands
    /// drawn, and the first turn started (without a draw) for the dice winner
    pub fn from_setup(
        setup: &MatchSetup,
        rules: RulesConfig,
        catalog: Arc<CardCatalog>,
    ) -> Result<GameState> {
        Self::from_setup_logged(setup, rules, catalog, GameLogger::new())
    }

    /// Same as `from_setup`, writing through `logger` from the first line on
    pub fn from_setup_logged(
        setup: &MatchSetup,
        rules: RulesConfig,
        catalog: Arc<CardCatalog>,
        logger: GameLogger,
    ) -> Result<GameState> {
        let mut game = GameState::new_two_player(
            setup.match_id.clone(),
            setup.names[0].as_str(),
            setup.names[1].as_str(),
            rules,
            Arc::clone(&catalog),
        );
        game.logger = logger;

        // Instance ids are allocated seat by seat in deck-list order
        for seat in Seat::both() {
            for template_id in &setup.decks[seat.index()] {
                let template = catalog.require(template_id)?;
                game.create_instance(template, seat, Zone::Deck);
            }
        }

        let mut rng = setup.shuffle_rng();
        for seat in Seat::both() {
            game.player_mut(seat).zones.deck.shuffle(&mut rng);
        }

        let dice = setup.roll_dice();
        let first = setup.starting_seat(dice);
        game.record(format!(
            "{} rolls {}, {} rolls {}",
            setup.names[0], dice[0], setup.names[1], dice[1]
        ));

        let hand = game.rules.starting_hand as u32;
        for seat in Seat::both() {
            game.draw_cards(seat, hand);
        }

        game.start_turn_with_draw(first, false);
        Ok(game)
    }
}
