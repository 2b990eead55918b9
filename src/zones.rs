//! Game zones a permanent can be in or be moved to by combat

use crate::core::{CardId, PlayerId};
use serde::{Deserialize, Serialize};

/// Zones where cards can exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Battlefield,
    Graveyard,
    Exile,
}

/// A zone containing cards (ordered: the graveyard keeps arrival order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardZone {
    pub zone_type: Zone,

    /// Owner of this zone (the battlefield uses a shared placeholder id)
    pub owner: PlayerId,

    pub cards: Vec<CardId>,
}

impl CardZone {
    pub fn new(zone_type: Zone, owner: PlayerId) -> Self {
        CardZone {
            zone_type,
            owner,
            cards: Vec::new(),
        }
    }

    pub fn add(&mut self, card_id: CardId) {
        self.cards.push(card_id);
    }

    /// Remove a card, returning its former position
    pub fn remove(&mut self, card_id: CardId) -> Option<usize> {
        // remove() rather than swap_remove(): iteration order of the
        // battlefield drives the order of lethality checks
        let pos = self.cards.iter().position(|&id| id == card_id)?;
        self.cards.remove(pos);
        Some(pos)
    }

    /// Put a card back at a previous position (used when rewinding)
    pub fn insert_at(&mut self, pos: usize, card_id: CardId) {
        let pos = pos.min(self.cards.len());
        self.cards.insert(pos, card_id);
    }

    pub fn contains(&self, card_id: CardId) -> bool {
        self.cards.contains(&card_id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Per-player zones that combat can move permanents into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerZones {
    pub graveyard: CardZone,
    pub exile: CardZone,
}

impl PlayerZones {
    pub fn new(player_id: PlayerId) -> Self {
        PlayerZones {
            graveyard: CardZone::new(Zone::Graveyard, player_id),
            exile: CardZone::new(Zone::Exile, player_id),
        }
    }

    pub fn get_zone(&self, zone: Zone) -> Option<&CardZone> {
        match zone {
            Zone::Graveyard => Some(&self.graveyard),
            Zone::Exile => Some(&self.exile),
            Zone::Battlefield => None,
        }
    }

    pub fn get_zone_mut(&mut self, zone: Zone) -> Option<&mut CardZone> {
        match zone {
            Zone::Graveyard => Some(&mut self.graveyard),
            Zone::Exile => Some(&mut self.exile),
            Zone::Battlefield => None,
        }
    }
}
