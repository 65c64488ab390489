//! Match zones (Deck, Hand, Battlefield, Graveyard)

use crate::core::{InstanceId, Seat};
use serde::{Deserialize, Serialize};

/// Different zones where cards can exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Deck,
    Hand,
    Battlefield,
    Graveyard,
}

/// An ordered zone of card instance ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardZone {
    pub zone_type: Zone,
    pub owner: Seat,
    /// Cards in this zone; for the deck the top card is the last element
    pub cards: Vec<InstanceId>,
}

impl CardZone {
    pub fn new(zone_type: Zone, owner: Seat) -> Self {
        CardZone {
            zone_type,
            owner,
            cards: Vec::new(),
        }
    }

    pub fn add(&mut self, id: InstanceId) {
        self.cards.push(id);
    }

    pub fn remove(&mut self, id: InstanceId) -> bool {
        if let Some(pos) = self.cards.iter().position(|&c| c == id) {
            // Order is part of replicated state, so never swap_remove
            self.cards.remove(pos);
            true
        } else {
            false
        }
    }

    /// Put a card back at a remembered position (clamped to the zone length)
    pub fn insert_at(&mut self, index: usize, id: InstanceId) {
        let index = index.min(self.cards.len());
        self.cards.insert(index, id);
    }

    pub fn position(&self, id: InstanceId) -> Option<usize> {
        self.cards.iter().position(|&c| c == id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.cards.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn draw_top(&mut self) -> Option<InstanceId> {
        self.cards.pop()
    }

    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        use rand::seq::SliceRandom;
        self.cards.shuffle(rng);
    }
}

/// Collection of all zones for a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerZones {
    pub deck: CardZone,
    pub hand: CardZone,
    pub battlefield: CardZone,
    pub graveyard: CardZone,
}

impl PlayerZones {
    pub fn new(seat: Seat) -> Self {
        PlayerZones {
            deck: CardZone::new(Zone::Deck, seat),
            hand: CardZone::new(Zone::Hand, seat),
            battlefield: CardZone::new(Zone::Battlefield, seat),
            graveyard: CardZone::new(Zone::Graveyard, seat),
        }
    }

    pub fn get_zone(&self, zone: Zone) -> &CardZone {
        match zone {
            Zone::Deck => &self.deck,
            Zone::Hand => &self.hand,
            Zone::Battlefield => &self.battlefield,
            Zone::Graveyard => &self.graveyard,
        }
    }

    pub fn get_zone_mut(&mut self, zone: Zone) -> &mut CardZone {
        match zone {
            Zone::Deck => &mut self.deck,
            Zone::Hand => &mut self.hand,
            Zone::Battlefield => &mut self.battlefield,
            Zone::Graveyard => &mut self.graveyard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_zone() {
        let mut zone = CardZone::new(Zone::Hand, Seat::FIRST);
        assert!(zone.is_empty());

        let a = InstanceId::new(10);
        let b = InstanceId::new(11);
        let c = InstanceId::new(12);
        zone.add(a);
        zone.add(b);
        zone.add(c);

        assert!(zone.remove(b));
        assert!(!zone.remove(b));
        assert_eq!(zone.cards, vec![a, c]);

        zone.insert_at(1, b);
        assert_eq!(zone.cards, vec![a, b, c]);
        zone.insert_at(99, InstanceId::new(13));
        assert_eq!(zone.len(), 4);
    }

    #[test]
    fn test_deck_draws_from_top() {
        let mut deck = CardZone::new(Zone::Deck, Seat::SECOND);
        deck.add(InstanceId::new(1));
        deck.add(InstanceId::new(2));

        assert_eq!(deck.draw_top(), Some(InstanceId::new(2)));
        assert_eq!(deck.draw_top(), Some(InstanceId::new(1)));
        assert_eq!(deck.draw_top(), None);
    }
}
