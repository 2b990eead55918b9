//! Permanents on the battlefield

use crate::core::{CardId, CardName, CounterType, GameEntity, Keyword, PlayerId, Subtype};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Card types that combat damage distinguishes between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Creature,
    Planeswalker,
    Battle,
    Enchantment,
    Artifact,
    Land,
}

/// A card instance during gameplay
///
/// `keywords` holds the keyword set after continuous effects have been
/// applied; `text` is the printed oracle text and is only consulted by the
/// text-heuristic keyword oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    pub name: CardName,

    /// Card types (a card can be multiple types)
    pub types: SmallVec<[CardType; 2]>,

    pub subtypes: SmallVec<[Subtype; 2]>,

    /// Base power (for creatures)
    pub power: Option<i32>,

    /// Base toughness (for creatures)
    pub toughness: Option<i32>,

    /// Oracle text
    pub text: String,

    pub owner: PlayerId,

    /// Current controller (can differ from owner)
    pub controller: PlayerId,

    pub tapped: bool,

    /// Counters on this card: +1/+1, -1/-1, loyalty, defense
    pub counters: SmallVec<[(CounterType, u32); 2]>,

    /// Current (layered) keyword abilities
    pub keywords: SmallVec<[Keyword; 4]>,

    /// Damage marked this turn
    pub damage: u32,

    /// Set when a source with deathtouch dealt this permanent damage
    pub deathtouch_damaged: bool,

    pub regeneration_shields: u32,

    /// Permanent this Aura is attached to
    pub attached_to: Option<CardId>,
}

impl Card {
    pub fn new(id: CardId, name: impl Into<CardName>, owner: PlayerId) -> Self {
        Card {
            id,
            name: name.into(),
            types: SmallVec::new(),
            subtypes: SmallVec::new(),
            power: None,
            toughness: None,
            text: String::new(),
            owner,
            controller: owner,
            tapped: false,
            counters: SmallVec::new(),
            keywords: SmallVec::new(),
            damage: 0,
            deathtouch_damaged: false,
            regeneration_shields: 0,
            attached_to: None,
        }
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    pub fn is_creature(&self) -> bool {
        self.is_type(CardType::Creature)
    }

    pub fn is_planeswalker(&self) -> bool {
        self.is_type(CardType::Planeswalker)
    }

    pub fn is_battle(&self) -> bool {
        self.is_type(CardType::Battle)
    }

    pub fn is_aura(&self) -> bool {
        self.subtypes.iter().any(|s| s == &Subtype::aura())
    }

    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.keywords.contains(&keyword)
    }

    pub fn grant_keyword(&mut self, keyword: Keyword) {
        if !self.has_keyword(keyword) {
            self.keywords.push(keyword);
        }
    }

    pub fn remove_keyword(&mut self, keyword: Keyword) {
        self.keywords.retain(|k| *k != keyword);
    }

    pub fn tap(&mut self) {
        self.tapped = true;
    }

    pub fn untap(&mut self) {
        self.tapped = false;
    }

    pub fn add_counter(&mut self, counter_type: CounterType, amount: u32) {
        if let Some((_, count)) = self.counters.iter_mut().find(|(t, _)| t == &counter_type) {
            *count += amount;
        } else {
            self.counters.push((counter_type, amount));
        }
    }

    /// Remove up to `amount` counters, returning how many were removed
    pub fn remove_counter(&mut self, counter_type: &CounterType, amount: u32) -> u32 {
        match self.counters.iter_mut().find(|(t, _)| t == counter_type) {
            Some((_, count)) => {
                let removed = amount.min(*count);
                *count -= removed;
                removed
            }
            None => 0,
        }
    }

    pub fn get_counter(&self, counter_type: &CounterType) -> u32 {
        self.counters
            .iter()
            .find(|(t, _)| t == counter_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    fn counter_modifier(&self) -> i32 {
        let plus = i32::try_from(self.get_counter(&CounterType::plus_one_plus_one())).unwrap_or(i32::MAX);
        let minus = i32::try_from(self.get_counter(&CounterType::minus_one_minus_one())).unwrap_or(i32::MAX);
        plus.saturating_sub(minus)
    }

    /// Current power (including counters)
    pub fn current_power(&self) -> i32 {
        self.power.unwrap_or(0) + self.counter_modifier()
    }

    /// Current toughness (including counters)
    pub fn current_toughness(&self) -> i32 {
        self.toughness.unwrap_or(0) + self.counter_modifier()
    }

    pub fn loyalty(&self) -> u32 {
        self.get_counter(&CounterType::loyalty())
    }

    pub fn defense(&self) -> u32 {
        self.get_counter(&CounterType::defense())
    }

    pub fn clear_damage(&mut self) {
        self.damage = 0;
        self.deathtouch_damaged = false;
    }
}

impl GameEntity<Card> for Card {
    fn id(&self) -> CardId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_creation() {
        let id = CardId::new(1);
        let owner = PlayerId::new(100);
        let card = Card::new(id, "Grizzly Bears", owner);

        assert_eq!(card.id, id);
        assert_eq!(card.name(), "Grizzly Bears");
        assert_eq!(card.owner, owner);
        assert_eq!(card.controller, owner);
        assert!(!card.tapped);
        assert_eq!(card.damage, 0);
    }

    #[test]
    fn test_card_counters() {
        let mut card = Card::new(CardId::new(1), "Test Creature", PlayerId::new(100));
        card.power = Some(2);
        card.toughness = Some(2);

        card.add_counter(CounterType::plus_one_plus_one(), 2);
        assert_eq!(card.current_power(), 4);
        assert_eq!(card.current_toughness(), 4);

        card.add_counter(CounterType::minus_one_minus_one(), 5);
        assert_eq!(card.current_toughness(), -1);
    }

    #[test]
    fn test_loyalty_removal_is_capped() {
        let mut walker = Card::new(CardId::new(2), "Test Walker", PlayerId::new(100));
        walker.types.push(CardType::Planeswalker);
        walker.add_counter(CounterType::loyalty(), 3);

        assert_eq!(walker.remove_counter(&CounterType::loyalty(), 5), 3);
        assert_eq!(walker.loyalty(), 0);
    }

    #[test]
    fn test_keyword_grant_and_remove() {
        let mut card = Card::new(CardId::new(3), "Test", PlayerId::new(100));
        card.grant_keyword(Keyword::Trample);
        card.grant_keyword(Keyword::Trample);
        assert_eq!(card.keywords.len(), 1);
        card.remove_keyword(Keyword::Trample);
        assert!(!card.has_keyword(Keyword::Trample));
    }
}
