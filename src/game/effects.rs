//! Effect application

use crate::core::{EffectDef, InstanceId, Seat, Target};
use crate::game::GameState;
use crate::zones::Zone;
use std::collections::BTreeMap;

impl GameState {
    /// Apply `effects` for `controller`, each against its chosen targets
    ///
    /// `chosen` maps effect index to targets. Creature targets are looked up
    /// again on the current battlefield; one that has left play is skipped with
    /// a log line. Dead creatures are swept once after the whole batch.
    pub fn resolve_effects(
        &mut self,
        controller: Seat,
        source: Option<InstanceId>,
        effects: &[EffectDef],
        chosen: &BTreeMap<usize, Vec<Target>>,
    ) {
        let source_name = source
            .and_then(|id| self.card(id).ok())
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| self.player(controller).name.to_string());
        let mut destroyed: Vec<InstanceId> = Vec::new();
        let no_targets = Vec::new();

        for (index, effect) in effects.iter().enumerate() {
            let targets = chosen.get(&index).unwrap_or(&no_targets);
            match effect {
                EffectDef::Damage { amount, .. } => {
                    for target in self.live_targets(targets, &source_name) {
                        self.deal_damage(&source_name, target, *amount);
                    }
                }
                EffectDef::Heal { amount, .. } => {
                    for target in self.live_targets(targets, &source_name) {
                        match target {
                            Target::Creature { instance, .. } => {
                                if let Ok(card) = self.card_mut(instance) {
                                    card.damage_marked = (card.damage_marked - amount).max(0);
                                }
                            }
                            Target::Player { seat } => self.player_mut(seat).gain_life(*amount),
                        }
                        let name = self.target_name(&target);
                        self.record(format!("{source_name} heals {name} for {amount}"));
                    }
                }
                EffectDef::Buff {
                    attack,
                    toughness,
                    duration,
                    ..
                } => {
                    for target in self.live_targets(targets, &source_name) {
                        if let Some(id) = target.instance() {
                            if let Ok(card) = self.card_mut(id) {
                                card.add_buff(*attack, *toughness, *duration);
                            }
                            let name = self.target_name(&target);
                            self.record(format!(
                                "{name} gets {attack:+}/{toughness:+} from {source_name}"
                            ));
                        }
                    }
                }
                EffectDef::Freeze { turns, .. } => {
                    for target in self.live_targets(targets, &source_name) {
                        if let Some(id) = target.instance() {
                            if let Ok(card) = self.card_mut(id) {
                                card.frozen_turns = card.frozen_turns.max(*turns);
                            }
                            let name = self.target_name(&target);
                            self.record(format!("{name} is frozen"));
                        }
                    }
                }
                EffectDef::Destroy { .. } => {
                    for target in self.live_targets(targets, &source_name) {
                        if let Some(id) = target.instance() {
                            destroyed.push(id);
                        }
                    }
                }
                EffectDef::Draw { count } => {
                    self.draw_cards(controller, *count as u32);
                }
                EffectDef::SummonToken { template, count } => {
                    let Some(template) = self.catalog.get(template) else {
                        self.record(format!("{source_name}: unknown token '{template}'"));
                        continue;
                    };
                    for _ in 0..*count {
                        self.create_token(controller, std::sync::Arc::clone(&template));
                    }
                }
                EffectDef::PreventCombatDamage => {
                    self.player_mut(controller).combat_damage_prevented = true;
                    let name = self.player(controller).name.clone();
                    self.record(format!("Combat damage to {name} is prevented this turn"));
                }
                EffectDef::GrantUnblockable { .. } => {
                    for target in self.live_targets(targets, &source_name) {
                        if let Some(id) = target.instance() {
                            if let Ok(card) = self.card_mut(id) {
                                card.unblockable_this_turn = true;
                            }
                            let name = self.target_name(&target);
                            self.record(format!("{name} cannot be blocked this turn"));
                        }
                    }
                }
            }
        }

        self.sweep_dead(&destroyed);
        self.check_winner();
    }

    /// Put a token printed from `template` onto `seat`'s battlefield
    pub fn create_token(
        &mut self,
        seat: Seat,
        template: std::sync::Arc<crate::core::CardTemplate>,
    ) -> InstanceId {
        let name = template.name.clone();
        let id = self.create_instance(template, seat, Zone::Battlefield);
        if let Ok(card) = self.card_mut(id) {
            card.is_token = true;
            card.summoning_sickness = true;
        }
        let player = self.player(seat).name.clone();
        self.record(format!("{player} creates a {name} token"));
        id
    }

    /// Move a card from `seat`'s hand straight to the graveyard
    pub fn discard(&mut self, seat: Seat, id: InstanceId) -> crate::Result<()> {
        self.move_card(id, seat, Zone::Hand, Zone::Graveyard)?;
        let name = self.card(id)?.name().to_string();
        let player = self.player(seat).name.clone();
        self.record(format!("{player} discards {name}"));
        Ok(())
    }

    /// Spend mana outside of a pending action
    pub fn pay_mana(&mut self, seat: Seat, amount: u32) -> crate::Result<()> {
        if !self.player_mut(seat).spend_mana(amount) {
            return Err(crate::ClashError::InvalidAction(format!(
                "{seat} cannot pay {amount} mana"
            )));
        }
        Ok(())
    }

    /// Change a player's life directly (positive heals)
    pub fn adjust_life(&mut self, seat: Seat, delta: i32) {
        let player = self.player_mut(seat);
        player.gain_life(delta);
        let name = player.name.clone();
        let life = player.life;
        self.record(format!("{name} is now at {life} life"));
        self.check_winner();
    }

    /// Destroy a creature outside of combat or effects
    pub fn destroy_creature(&mut self, id: InstanceId) -> crate::Result<()> {
        if !self.is_on_battlefield(id) {
            return Err(crate::ClashError::InvalidAction(format!(
                "{id} is not on the battlefield"
            )));
        }
        self.sweep_dead(&[id]);
        self.check_winner();
        Ok(())
    }

    /// Deal non-combat damage; zero damage still applies but is not logged
    fn deal_damage(&mut self, source_name: &str, target: Target, amount: i32) {
        match target {
            Target::Creature { instance, .. } => {
                if let Ok(card) = self.card_mut(instance) {
                    card.damage_marked += amount;
                }
            }
            Target::Player { seat } => self.player_mut(seat).lose_life(amount),
        }
        if amount != 0 {
            let name = self.target_name(&target);
            self.record(format!("{source_name} deals {amount} damage to {name}"));
        }
    }

    /// Targets still present; creatures that left the battlefield drop out
    fn live_targets(&mut self, targets: &[Target], source_name: &str) -> Vec<Target> {
        let mut live = Vec::with_capacity(targets.len());
        for target in targets {
            match target {
                Target::Creature { instance, .. } => match self.battlefield_seat(*instance) {
                    Some(controller) => live.push(Target::creature(*instance, controller)),
                    None => self.record(format!(
                        "{source_name}: target {instance} is no longer on the battlefield"
                    )),
                },
                Target::Player { .. } => live.push(*target),
            }
        }
        live
    }

    pub(crate) fn target_name(&self, target: &Target) -> String {
        match target {
            Target::Creature { instance, .. } => self
                .card(*instance)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|_| instance.to_string()),
            Target::Player { seat } => self.player(*seat).name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuffDuration, CardTemplate, TargetClass, TargetSpec};
    use crate::game::RulesConfig;
    use crate::loader::CardCatalog;
    use std::sync::Arc;

    fn game_with_catalog(catalog: CardCatalog) -> GameState {
        GameState::new_two_player("m", "Alice", "Bob", RulesConfig::default(), Arc::new(catalog))
    }

    fn bear(game: &mut GameState, seat: Seat) -> InstanceId {
        let template = Arc::new(CardTemplate::creature("bear", "Bear", 2, 2, 2));
        game.create_instance(template, seat, Zone::Battlefield)
    }

    fn targets(pairs: &[(usize, Target)]) -> BTreeMap<usize, Vec<Target>> {
        let mut map: BTreeMap<usize, Vec<Target>> = BTreeMap::new();
        for (index, target) in pairs {
            map.entry(*index).or_default().push(*target);
        }
        map
    }

    #[test]
    fn test_damage_and_sweep() {
        let mut game = game_with_catalog(CardCatalog::new());
        let victim = bear(&mut game, Seat::SECOND);
        let effects = vec![EffectDef::Damage {
            amount: 2,
            target: TargetSpec::single(TargetClass::EnemyCreature),
        }];

        game.resolve_effects(
            Seat::FIRST,
            None,
            &effects,
            &targets(&[(0, Target::creature(victim, Seat::SECOND))]),
        );

        assert!(game.player(Seat::SECOND).zones.graveyard.contains(victim));
    }

    #[test]
    fn test_buff_then_damage_in_one_batch() {
        let mut game = game_with_catalog(CardCatalog::new());
        let mine = bear(&mut game, Seat::FIRST);
        let t = Target::creature(mine, Seat::FIRST);
        let effects = vec![
            EffectDef::Buff {
                attack: 0,
                toughness: 2,
                duration: BuffDuration::EndOfTurn,
                target: TargetSpec::single(TargetClass::FriendlyCreature),
            },
            EffectDef::Damage {
                amount: 3,
                target: TargetSpec::single(TargetClass::AnyCreature),
            },
        ];

        game.resolve_effects(Seat::FIRST, None, &effects, &targets(&[(0, t), (1, t)]));

        let card = game.card(mine).unwrap();
        assert!(game.is_on_battlefield(mine));
        assert_eq!(card.remaining_toughness(), 1);
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let mut game = game_with_catalog(CardCatalog::new());
        let gone = bear(&mut game, Seat::SECOND);
        game.move_card(gone, Seat::SECOND, Zone::Battlefield, Zone::Graveyard)
            .unwrap();
        let effects = vec![EffectDef::Freeze {
            turns: 2,
            target: TargetSpec::single(TargetClass::EnemyCreature),
        }];

        game.resolve_effects(
            Seat::FIRST,
            None,
            &effects,
            &targets(&[(0, Target::creature(gone, Seat::SECOND))]),
        );

        assert_eq!(game.card(gone).unwrap().frozen_turns, 0);
        assert!(game.log.last().unwrap().contains("no longer on the battlefield"));
    }

    #[test]
    fn test_tokens_and_prevention() {
        let catalog = CardCatalog::from_templates([CardTemplate::creature(
            "wolf", "Wolf", 0, 1, 1,
        )]);
        let mut game = game_with_catalog(catalog);
        let effects = vec![
            EffectDef::SummonToken {
                template: "wolf".into(),
                count: 2,
            },
            EffectDef::PreventCombatDamage,
        ];

        game.resolve_effects(Seat::FIRST, None, &effects, &BTreeMap::new());

        assert_eq!(game.player(Seat::FIRST).zones.battlefield.len(), 2);
        assert!(game.player(Seat::FIRST).combat_damage_prevented);
    }

    #[test]
    fn test_lethal_player_damage_sets_winner() {
        let mut game = game_with_catalog(CardCatalog::new());
        let effects = vec![EffectDef::Damage {
            amount: 25,
            target: TargetSpec::single(TargetClass::Any),
        }];
        game.resolve_effects(
            Seat::FIRST,
            None,
            &effects,
            &targets(&[(0, Target::player(Seat::SECOND))]),
        );
        assert_eq!(game.winner, Some(Seat::FIRST));
    }
}
