//! Reference game state implementing every combat hook
//!
//! Owns cards, players and zones, logs each mutation to the undo log, and
//! routes damage and life gain through the [`ReplacementRegistry`]. Cheap to
//! clone, so batches of previews can each take their own copy.

use crate::combat::{
    CharacteristicResolver, CombatTrigger, DamageEvent, GameMutator, LifeGainEvent, PermanentSnapshot,
    SubstitutionHook, TriggerSink, ZoneChangeCause, ZoneMover,
};
use crate::core::{
    Card, CardId, CardType, CounterType, EntityId, EntityStore, Keyword, Player, PlayerId, PlayerName, Subtype,
};
use crate::error::{HookError, HookResult};
use crate::game::{GameLogger, ReplacementRegistry};
use crate::undo::{GameAction, UndoLog};
use crate::zones::{CardZone, PlayerZones, Zone};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// All cards in the game
    pub cards: EntityStore<Card>,

    /// All players in the game (Vec for stable ordering, small count)
    pub players: Vec<Player>,

    /// Zones for each player
    pub player_zones: Vec<(PlayerId, PlayerZones)>,

    /// Shared battlefield (all players)
    pub battlefield: CardZone,

    /// Set once combat damage has been dealt this turn
    pub combat_damage_dealt: bool,

    pub replacements: ReplacementRegistry,

    /// Permanents whose damage can't be removed
    pub persistent_damage: FxHashSet<CardId>,

    /// Triggers reported by the combat core, in firing order
    pub fired_triggers: Vec<(CardId, CombatTrigger)>,

    /// Unified entity ID generator (shared across all entity types)
    next_entity_id: u32,

    pub undo_log: UndoLog,

    #[serde(skip)]
    pub logger: GameLogger,
}

impl GameState {
    /// Create a new game with two players
    pub fn new_two_player(
        player1_name: impl Into<PlayerName>,
        player2_name: impl Into<PlayerName>,
        starting_life: i32,
    ) -> Self {
        let p1_id = PlayerId::new(0);
        let p2_id = PlayerId::new(1);
        // The battlefield belongs to no player but its zone needs an owner id
        let shared_id = PlayerId::new(2);

        GameState {
            cards: EntityStore::new(),
            players: vec![
                Player::new(p1_id, player1_name, starting_life),
                Player::new(p2_id, player2_name, starting_life),
            ],
            player_zones: vec![(p1_id, PlayerZones::new(p1_id)), (p2_id, PlayerZones::new(p2_id))],
            battlefield: CardZone::new(Zone::Battlefield, shared_id),
            combat_damage_dealt: false,
            replacements: ReplacementRegistry::new(),
            persistent_damage: FxHashSet::default(),
            fired_triggers: Vec::new(),
            next_entity_id: 3,
            undo_log: UndoLog::new(),
            logger: GameLogger::new(),
        }
    }

    /// Get next entity ID (unified across all entity types)
    pub fn next_id<T>(&mut self) -> EntityId<T> {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn next_card_id(&mut self) -> CardId {
        self.next_id()
    }

    pub fn get_player(&self, id: PlayerId) -> HookResult<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(HookError::EntityNotFound(id.as_u32()))
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> HookResult<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(HookError::EntityNotFound(id.as_u32()))
    }

    pub fn get_player_zones(&self, player_id: PlayerId) -> Option<&PlayerZones> {
        self.player_zones
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, zones)| zones)
    }

    pub fn get_player_zones_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerZones> {
        self.player_zones
            .iter_mut()
            .find(|(id, _)| *id == player_id)
            .map(|(_, zones)| zones)
    }

    /// Put a new card onto the battlefield under its owner's control
    pub fn put_onto_battlefield(&mut self, mut card: Card) -> CardId {
        let id = self.next_card_id();
        card.id = id;
        self.cards.insert(id, card);
        self.battlefield.add(id);
        id
    }

    pub fn create_creature(
        &mut self,
        owner: PlayerId,
        name: &str,
        power: i32,
        toughness: i32,
        keywords: &[Keyword],
    ) -> CardId {
        let mut card = Card::new(CardId::new(0), name, owner);
        card.types.push(CardType::Creature);
        card.power = Some(power);
        card.toughness = Some(toughness);
        card.keywords.extend(keywords.iter().copied());
        self.put_onto_battlefield(card)
    }

    pub fn create_planeswalker(&mut self, owner: PlayerId, name: &str, loyalty: u32) -> CardId {
        let mut card = Card::new(CardId::new(0), name, owner);
        card.types.push(CardType::Planeswalker);
        card.add_counter(CounterType::loyalty(), loyalty);
        self.put_onto_battlefield(card)
    }

    pub fn create_battle(&mut self, owner: PlayerId, name: &str, defense: u32) -> CardId {
        let mut card = Card::new(CardId::new(0), name, owner);
        card.types.push(CardType::Battle);
        card.subtypes.push(Subtype::new("Siege"));
        card.add_counter(CounterType::defense(), defense);
        self.put_onto_battlefield(card)
    }

    pub fn create_aura(&mut self, owner: PlayerId, name: &str, enchanted: CardId, keywords: &[Keyword]) -> CardId {
        let mut card = Card::new(CardId::new(0), name, owner);
        card.types.push(CardType::Enchantment);
        card.subtypes.push(Subtype::aura());
        card.attached_to = Some(enchanted);
        card.keywords.extend(keywords.iter().copied());
        self.put_onto_battlefield(card)
    }

    /// Permanents attached to `card`, in battlefield order
    pub fn attachments_of(&self, card: CardId) -> SmallVec<[CardId; 2]> {
        self.battlefield
            .cards
            .iter()
            .copied()
            .filter(|&id| self.cards.get(id).is_ok_and(|c| c.attached_to == Some(card)))
            .collect()
    }

    fn zone_mut(&mut self, zone: Zone, owner: PlayerId) -> Option<&mut CardZone> {
        match zone {
            Zone::Battlefield => Some(&mut self.battlefield),
            _ => self.get_player_zones_mut(owner)?.get_zone_mut(zone),
        }
    }

    /// Move a card between zones
    pub fn move_card(&mut self, card_id: CardId, from: Zone, to: Zone, owner: PlayerId) -> HookResult<()> {
        let from_position = self
            .zone_mut(from, owner)
            .and_then(|zone| zone.remove(card_id))
            .ok_or(HookError::NotInZone {
                card: card_id,
                zone: from,
            })?;
        self.zone_mut(to, owner)
            .ok_or_else(|| HookError::InvalidTarget(format!("no {to:?} zone for player {owner}")))?
            .add(card_id);

        self.undo_log.log(GameAction::MoveCard {
            card_id,
            from_zone: from,
            to_zone: to,
            owner,
            from_position,
        });
        Ok(())
    }

    fn change_life(&mut self, player: PlayerId, delta: i32) -> HookResult<()> {
        let p = self.get_player_mut(player)?;
        let was_lost = p.has_lost;
        if delta < 0 {
            p.lose_life(-delta);
        } else {
            p.gain_life(delta);
        }
        self.undo_log.log(GameAction::ModifyLife {
            player_id: player,
            delta,
            was_lost,
        });
        Ok(())
    }

    fn change_counters(&mut self, card_id: CardId, counter_type: CounterType, delta: i32) -> HookResult<()> {
        let card = self.cards.get_mut(card_id)?;
        if delta >= 0 {
            card.add_counter(counter_type.clone(), delta as u32);
            self.undo_log.log(GameAction::AddCounter {
                card_id,
                counter_type,
                amount: delta as u32,
            });
        } else {
            let removed = card.remove_counter(&counter_type, delta.unsigned_abs());
            self.undo_log.log(GameAction::RemoveCounter {
                card_id,
                counter_type,
                amount: removed,
            });
        }
        Ok(())
    }

    /// Position to rewind to with [`rewind_to`](Self::rewind_to)
    pub fn checkpoint(&self) -> usize {
        self.undo_log.checkpoint()
    }

    /// Undo every action logged since `checkpoint`
    pub fn rewind_to(&mut self, checkpoint: usize) {
        while self.undo_log.len() > checkpoint {
            if !self.undo() {
                break;
            }
        }
    }

    /// Undo the most recent action; `false` when the log is empty
    ///
    /// Inconsistencies (a card missing from the zone it was logged in) are
    /// reported as warnings and skipped.
    pub fn undo(&mut self) -> bool {
        let Some(action) = self.undo_log.pop() else {
            return false;
        };
        match action {
            GameAction::MoveCard {
                card_id,
                from_zone,
                to_zone,
                owner,
                from_position,
            } => {
                let removed = self.zone_mut(to_zone, owner).and_then(|zone| zone.remove(card_id));
                let restored = removed.is_some()
                    && self
                        .zone_mut(from_zone, owner)
                        .map(|zone| zone.insert_at(from_position, card_id))
                        .is_some();
                if !restored {
                    self.logger.warning(
                        "undo",
                        &format!("cannot undo move of {card_id} from {from_zone:?} to {to_zone:?}"),
                    );
                }
            }
            GameAction::TapCard { card_id, was_tapped } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.tapped = was_tapped;
                }
            }
            GameAction::ModifyLife {
                player_id,
                delta,
                was_lost,
            } => {
                if let Ok(player) = self.get_player_mut(player_id) {
                    player.life -= delta;
                    player.has_lost = was_lost;
                }
            }
            GameAction::AddPoison {
                player_id,
                amount,
                was_lost,
            } => {
                if let Ok(player) = self.get_player_mut(player_id) {
                    player.poison_counters = player.poison_counters.saturating_sub(amount);
                    player.has_lost = was_lost;
                }
            }
            GameAction::MarkDamage { card_id, amount } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.damage = card.damage.saturating_sub(amount);
                }
            }
            GameAction::MarkDeathtouch { card_id, was_marked } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.deathtouch_damaged = was_marked;
                }
            }
            GameAction::ClearDamage {
                card_id,
                damage,
                deathtouch,
            } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.damage = damage;
                    card.deathtouch_damaged = deathtouch;
                }
            }
            GameAction::AddCounter {
                card_id,
                counter_type,
                amount,
            } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.remove_counter(&counter_type, amount);
                }
            }
            GameAction::RemoveCounter {
                card_id,
                counter_type,
                amount,
            } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.add_counter(counter_type, amount);
                }
            }
            GameAction::ConsumeShield { card_id } => {
                if let Ok(card) = self.cards.get_mut(card_id) {
                    card.regeneration_shields += 1;
                }
            }
            GameAction::UpdateReplacement { index, previous } => {
                self.replacements.restore(index, previous);
            }
            GameAction::RecordTrigger { .. } => {
                self.fired_triggers.pop();
            }
            GameAction::SetCombatDamageDealt { previous } => {
                self.combat_damage_dealt = previous;
            }
        }
        true
    }
}

impl CharacteristicResolver for GameState {
    fn permanent(&self, id: CardId) -> Option<PermanentSnapshot> {
        if !self.battlefield.contains(id) {
            return None;
        }
        let card = self.cards.get(id).ok()?;
        Some(PermanentSnapshot {
            id,
            owner: card.owner,
            controller: card.controller,
            is_creature: card.is_creature(),
            is_planeswalker: card.is_planeswalker(),
            is_battle: card.is_battle(),
            is_aura: card.is_aura(),
            power: card.current_power(),
            toughness: card.current_toughness(),
            damage_marked: card.damage,
            deathtouch_damaged: card.deathtouch_damaged,
            regeneration_shields: card.regeneration_shields,
            loyalty: card.loyalty(),
            defense: card.defense(),
            attached_to: card.attached_to,
            attachments: self.attachments_of(id),
        })
    }

    fn has_keyword(&self, id: CardId, keyword: Keyword) -> bool {
        self.cards.get(id).is_ok_and(|card| card.has_keyword(keyword))
    }

    fn oracle_text(&self, id: CardId) -> Option<&str> {
        self.cards.get(id).ok().map(|card| card.text.as_str())
    }

    fn player_exists(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    fn battlefield(&self) -> Vec<CardId> {
        self.battlefield.cards.clone()
    }
}

impl SubstitutionHook for GameState {
    fn substitute_damage(&mut self, event: DamageEvent) -> HookResult<(DamageEvent, bool)> {
        let (event, substituted, changes) = self.replacements.apply_damage(event);
        for (index, previous) in changes {
            self.undo_log.log(GameAction::UpdateReplacement { index, previous });
        }
        Ok((event, substituted))
    }

    fn substitute_life_gain(&mut self, event: LifeGainEvent) -> HookResult<(LifeGainEvent, bool)> {
        Ok(self.replacements.apply_life_gain(event))
    }
}

impl GameMutator for GameState {
    fn mark_damage(&mut self, card_id: CardId, amount: u32) -> HookResult<()> {
        self.cards.get_mut(card_id)?.damage += amount;
        self.undo_log.log(GameAction::MarkDamage { card_id, amount });
        Ok(())
    }

    fn mark_deathtouch(&mut self, card_id: CardId) -> HookResult<()> {
        let card = self.cards.get_mut(card_id)?;
        let was_marked = card.deathtouch_damaged;
        card.deathtouch_damaged = true;
        self.undo_log.log(GameAction::MarkDeathtouch { card_id, was_marked });
        Ok(())
    }

    fn clear_damage(&mut self, card_id: CardId) -> HookResult<()> {
        if self.persistent_damage.contains(&card_id) {
            return Ok(());
        }
        let card = self.cards.get_mut(card_id)?;
        let (damage, deathtouch) = (card.damage, card.deathtouch_damaged);
        card.clear_damage();
        self.undo_log.log(GameAction::ClearDamage {
            card_id,
            damage,
            deathtouch,
        });
        Ok(())
    }

    fn add_counters(&mut self, card_id: CardId, counter: CounterType, amount: u32) -> HookResult<()> {
        self.change_counters(card_id, counter, i32::try_from(amount).unwrap_or(i32::MAX))
    }

    fn adjust_life(&mut self, player: PlayerId, delta: i32) -> HookResult<()> {
        self.change_life(player, delta)
    }

    fn add_poison(&mut self, player_id: PlayerId, amount: u32) -> HookResult<()> {
        let player = self.get_player_mut(player_id)?;
        let was_lost = player.has_lost;
        player.add_poison(amount);
        self.undo_log.log(GameAction::AddPoison {
            player_id,
            amount,
            was_lost,
        });
        Ok(())
    }

    fn gain_life(&mut self, player: PlayerId, _source: CardId, amount: u32) -> HookResult<()> {
        self.change_life(player, i32::try_from(amount).unwrap_or(i32::MAX))
    }

    fn adjust_loyalty(&mut self, planeswalker: CardId, delta: i32) -> HookResult<()> {
        self.change_counters(planeswalker, CounterType::loyalty(), delta)
    }

    fn adjust_defense(&mut self, battle: CardId, delta: i32) -> HookResult<()> {
        self.change_counters(battle, CounterType::defense(), delta)
    }

    fn consume_regeneration_shield(&mut self, card_id: CardId) -> HookResult<bool> {
        let card = self.cards.get_mut(card_id)?;
        if card.regeneration_shields == 0 {
            return Ok(false);
        }
        card.regeneration_shields -= 1;
        self.undo_log.log(GameAction::ConsumeShield { card_id });
        Ok(true)
    }

    fn tap(&mut self, card_id: CardId) -> HookResult<()> {
        let card = self.cards.get_mut(card_id)?;
        let was_tapped = card.tapped;
        card.tap();
        self.undo_log.log(GameAction::TapCard { card_id, was_tapped });
        Ok(())
    }

    fn combat_damage_dealt(&self) -> bool {
        self.combat_damage_dealt
    }

    fn set_combat_damage_dealt(&mut self, dealt: bool) {
        let previous = self.combat_damage_dealt;
        self.combat_damage_dealt = dealt;
        self.undo_log.log(GameAction::SetCombatDamageDealt { previous });
    }
}

impl ZoneMover for GameState {
    fn move_to_zone(&mut self, card: CardId, from: Zone, to: Zone, _cause: ZoneChangeCause) -> HookResult<Zone> {
        let owner = self.cards.get(card)?.owner;
        let destination = if to == Zone::Graveyard && self.replacements.exile_instead_of_dying(card) {
            Zone::Exile
        } else {
            to
        };
        self.move_card(card, from, destination, owner)?;
        // A permanent that leaves the battlefield loses its damage
        if from == Zone::Battlefield {
            self.clear_damage(card)?;
        }
        Ok(destination)
    }
}

impl TriggerSink for GameState {
    fn trigger_ability(&mut self, card_id: CardId, event: CombatTrigger) -> HookResult<()> {
        self.fired_triggers.push((card_id, event.clone()));
        self.undo_log.log(GameAction::RecordTrigger { card_id, event });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_creation() {
        let game = GameState::new_two_player("Alice", "Bob", 20);
        assert_eq!(game.players.len(), 2);
        assert_eq!(game.players[0].life, 20);
        assert!(game.battlefield.is_empty());
        assert!(!game.combat_damage_dealt);
    }

    #[test]
    fn test_snapshot_reflects_counters_and_attachments() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let p1 = game.players[0].id;
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);
        let aura = game.create_aura(p1, "Rancor", bear, &[]);
        game.cards
            .get_mut(bear)
            .unwrap()
            .add_counter(CounterType::plus_one_plus_one(), 1);

        let snapshot = game.permanent(bear).unwrap();
        assert_eq!((snapshot.power, snapshot.toughness), (3, 3));
        assert_eq!(snapshot.attachments.as_slice(), &[aura]);
        assert!(game.permanent(aura).unwrap().is_aura);
        assert!(game.permanent(CardId::new(77)).is_none());
    }

    #[test]
    fn test_move_to_zone_honors_exile_replacement() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let p1 = game.players[0].id;
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);
        game.replacements
            .add(crate::game::ReplacementEffect::ExileInsteadOfDying(bear));

        let zone = game
            .move_to_zone(bear, Zone::Battlefield, Zone::Graveyard, ZoneChangeCause::LethalDamage)
            .unwrap();
        assert_eq!(zone, Zone::Exile);
        assert!(game.permanent(bear).is_none());

        let err = game
            .move_to_zone(bear, Zone::Battlefield, Zone::Graveyard, ZoneChangeCause::LethalDamage)
            .unwrap_err();
        assert!(matches!(err, HookError::NotInZone { zone: Zone::Battlefield, .. }));
    }

    #[test]
    fn test_rewind_restores_everything() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let first = game.create_creature(p1, "First", 2, 2, &[]);
        let second = game.create_creature(p1, "Second", 2, 2, &[]);
        let walker = game.create_planeswalker(p2, "Walker", 3);

        let checkpoint = game.checkpoint();
        game.mark_damage(first, 2).unwrap();
        game.adjust_life(p2, -25).unwrap();
        game.add_poison(p2, 3).unwrap();
        game.adjust_loyalty(walker, -5).unwrap();
        game.tap(second).unwrap();
        game.set_combat_damage_dealt(true);
        game.trigger_ability(first, CombatTrigger::Dies { cause: ZoneChangeCause::LethalDamage })
            .unwrap();
        game.move_to_zone(first, Zone::Battlefield, Zone::Graveyard, ZoneChangeCause::LethalDamage)
            .unwrap();
        assert!(game.get_player(p2).unwrap().has_lost);

        game.rewind_to(checkpoint);

        assert_eq!(game.battlefield.cards, vec![first, second, walker]);
        assert!(game.get_player_zones(p1).unwrap().graveyard.is_empty());
        let bob = game.get_player(p2).unwrap();
        assert_eq!((bob.life, bob.poison_counters, bob.has_lost), (20, 0, false));
        assert_eq!(game.cards.get(first).unwrap().damage, 0);
        assert!(!game.cards.get(second).unwrap().tapped);
        assert_eq!(game.cards.get(walker).unwrap().loyalty(), 3);
        assert!(!game.combat_damage_dealt);
        assert!(game.fired_triggers.is_empty());
        assert_eq!(game.undo_log.len(), checkpoint);
    }
}
