//! Player representation

use crate::core::{GameEntity, PlayerId, PlayerName};
use serde::{Deserialize, Serialize};

/// Poison counters at which a player loses the game
pub const POISON_LIMIT: u32 = 10;

/// Represents a player in the game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,

    pub name: PlayerName,

    pub life: i32,

    /// Poison counters (dealt by infect damage)
    pub poison_counters: u32,

    /// Has the player lost?
    pub has_lost: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<PlayerName>, starting_life: i32) -> Self {
        Player {
            id,
            name: name.into(),
            life: starting_life,
            poison_counters: 0,
            has_lost: false,
        }
    }

    pub fn gain_life(&mut self, amount: i32) {
        self.life += amount;
    }

    pub fn lose_life(&mut self, amount: i32) {
        self.life -= amount;
        if self.life <= 0 {
            self.has_lost = true;
        }
    }

    pub fn add_poison(&mut self, amount: u32) {
        self.poison_counters += amount;
        if self.poison_counters >= POISON_LIMIT {
            self.has_lost = true;
        }
    }
}

impl GameEntity<Player> for Player {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}
