//! Player representation

use crate::core::{PlayerName, Seat};
use crate::zones::PlayerZones;
use serde::{Deserialize, Serialize};

/// One seat's player: zones, life and mana
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub seat: Seat,
    pub name: PlayerName,
    pub life: i32,
    pub max_mana: u32,
    pub available_mana: u32,
    pub zones: PlayerZones,
    /// Combat damage to this player is prevented until end of turn
    pub combat_damage_prevented: bool,
}

impl Player {
    pub fn new(seat: Seat, name: impl Into<PlayerName>, starting_life: i32) -> Self {
        Player {
            seat,
            name: name.into(),
            life: starting_life,
            max_mana: 0,
            available_mana: 0,
            zones: PlayerZones::new(seat),
            combat_damage_prevented: false,
        }
    }

    pub fn gain_life(&mut self, amount: i32) {
        self.life += amount;
    }

    pub fn lose_life(&mut self, amount: i32) {
        self.life -= amount;
    }

    pub fn has_lost(&self) -> bool {
        self.life <= 0
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.available_mana >= cost
    }

    /// Spend mana; returns false (and spends nothing) if the pool is short
    pub fn spend_mana(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.available_mana -= cost;
        true
    }

    /// Give back mana spent on a cancelled action
    pub fn refund_mana(&mut self, amount: u32) {
        self.available_mana += amount;
    }

    /// Turn-start mana growth: cap grows by one up to `ceiling`, pool refills
    pub fn grow_and_refill_mana(&mut self, ceiling: u32) {
        self.max_mana = (self.max_mana + 1).min(ceiling);
        self.available_mana = self.max_mana;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_life() {
        let mut player = Player::new(Seat::FIRST, "Bob", 20);
        player.lose_life(5);
        assert_eq!(player.life, 15);
        assert!(!player.has_lost());

        player.lose_life(15);
        assert!(player.has_lost());

        player.gain_life(3);
        assert_eq!(player.life, 3);
    }

    #[test]
    fn test_mana_growth_caps_at_ceiling() {
        let mut player = Player::new(Seat::SECOND, "Cara", 20);
        for _ in 0..12 {
            player.grow_and_refill_mana(10);
        }
        assert_eq!(player.max_mana, 10);
        assert_eq!(player.available_mana, 10);

        assert!(player.spend_mana(4));
        assert!(!player.spend_mana(7));
        assert_eq!(player.available_mana, 6);

        player.refund_mana(4);
        assert_eq!(player.available_mana, 10);
    }
}
