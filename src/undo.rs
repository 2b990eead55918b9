//! Undo log for what-if combat previews
//!
//! Every mutation the reference host performs is logged here with enough
//! information to reverse it. A preview takes a checkpoint, resolves combat
//! for real, and rewinds to the checkpoint, which is much cheaper than
//! cloning the whole game for each configuration tried.

use crate::combat::CombatTrigger;
use crate::core::{CardId, CounterType, PlayerId};
use crate::game::ReplacementEffect;
use crate::zones::Zone;
use serde::{Deserialize, Serialize};

/// Atomic game actions that can be logged and undone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameAction {
    /// Move a card between zones
    MoveCard {
        card_id: CardId,
        from_zone: Zone,
        to_zone: Zone,
        owner: PlayerId,
        /// Index in the source zone, restored on undo
        from_position: usize,
    },

    TapCard { card_id: CardId, was_tapped: bool },

    /// Life total change (damage or life gain)
    ModifyLife {
        player_id: PlayerId,
        delta: i32,
        was_lost: bool,
    },

    AddPoison {
        player_id: PlayerId,
        amount: u32,
        was_lost: bool,
    },

    MarkDamage { card_id: CardId, amount: u32 },

    MarkDeathtouch { card_id: CardId, was_marked: bool },

    /// Damage removed by regeneration or totem armor
    ClearDamage {
        card_id: CardId,
        damage: u32,
        deathtouch: bool,
    },

    AddCounter {
        card_id: CardId,
        counter_type: CounterType,
        amount: u32,
    },

    /// Counters actually removed (may be fewer than requested)
    RemoveCounter {
        card_id: CardId,
        counter_type: CounterType,
        amount: u32,
    },

    ConsumeShield { card_id: CardId },

    /// A replacement effect changed state (e.g. a prevention shield was used)
    UpdateReplacement {
        index: usize,
        previous: ReplacementEffect,
    },

    RecordTrigger { card_id: CardId, event: CombatTrigger },

    SetCombatDamageDealt { previous: bool },
}

/// Undo log for tracking and rewinding game actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoLog {
    /// Stack of actions (most recent at end)
    actions: Vec<GameAction>,

    /// Is logging enabled? (disabled for benchmarks)
    enabled: bool,
}

impl UndoLog {
    pub fn new() -> Self {
        UndoLog {
            actions: Vec::new(),
            enabled: true,
        }
    }

    /// Create a disabled undo log (for benchmarking)
    pub fn disabled() -> Self {
        UndoLog {
            actions: Vec::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&mut self, action: GameAction) {
        if self.enabled {
            self.actions.push(action);
        }
    }

    /// Current position, to rewind to later
    pub fn checkpoint(&self) -> usize {
        self.actions.len()
    }

    pub fn peek(&self) -> Option<&GameAction> {
        self.actions.last()
    }

    pub fn pop(&mut self) -> Option<GameAction> {
        self.actions.pop()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Get all actions (for debugging/serialization)
    pub fn actions(&self) -> &[GameAction] {
        &self.actions
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn life_loss() -> GameAction {
        GameAction::ModifyLife {
            player_id: PlayerId::new(1),
            delta: -3,
            was_lost: false,
        }
    }

    #[test]
    fn test_undo_log() {
        let mut log = UndoLog::new();
        assert!(log.is_empty());

        log.log(life_loss());
        assert_eq!(log.len(), 1);
        assert_eq!(log.peek(), Some(&life_loss()));

        let popped = log.pop().unwrap();
        assert!(matches!(popped, GameAction::ModifyLife { delta: -3, .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn test_checkpoint_marks_position() {
        let mut log = UndoLog::new();
        log.log(life_loss());
        let checkpoint = log.checkpoint();
        log.log(GameAction::MarkDamage {
            card_id: CardId::new(4),
            amount: 2,
        });
        assert_eq!(checkpoint, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_disabled_log() {
        let mut log = UndoLog::disabled();
        log.log(life_loss());
        assert_eq!(log.len(), 0);
        assert!(!log.is_enabled());
    }
}
