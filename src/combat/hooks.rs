//! Interfaces the host game supplies to the combat damage core
//!
//! The core owns no game state. Everything it reads comes through
//! [`CharacteristicResolver`] and everything it changes goes through the
//! mutation traits below. Callers must guarantee exclusive, single-threaded
//! access to the host for the duration of one resolution; the core itself
//! takes no locks.
//!
//! Every mutating hook is a plain synchronous call. A host is free to run
//! further rules processing inside it (a trigger that modifies combat, for
//! instance) before returning.

use crate::combat::{DamageEvent, DamageRecipient, LifeGainEvent};
use crate::core::{CardId, CounterType, Keyword, PlayerId};
use crate::error::HookResult;
use crate::zones::Zone;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A permanent's post-layer characteristics at the moment it was read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentSnapshot {
    pub id: CardId,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub is_creature: bool,
    pub is_planeswalker: bool,
    pub is_battle: bool,
    pub is_aura: bool,
    pub power: i32,
    pub toughness: i32,
    pub damage_marked: u32,
    pub deathtouch_damaged: bool,
    pub regeneration_shields: u32,
    pub loyalty: u32,
    pub defense: u32,
    /// The permanent this one is attached to (Auras)
    pub attached_to: Option<CardId>,
    /// Auras and other permanents attached to this one
    pub attachments: SmallVec<[CardId; 2]>,
}

impl PermanentSnapshot {
    /// Damage still needed before marked damage becomes lethal
    pub fn remaining_toughness(&self) -> u32 {
        let damage = i32::try_from(self.damage_marked).unwrap_or(i32::MAX);
        u32::try_from(self.toughness.saturating_sub(damage)).unwrap_or(0)
    }
}

/// Read-only access to the current, layered game state
pub trait CharacteristicResolver {
    /// Snapshot of a permanent, or `None` if it is not on the battlefield
    fn permanent(&self, id: CardId) -> Option<PermanentSnapshot>;

    fn has_keyword(&self, id: CardId, keyword: Keyword) -> bool;

    /// Printed oracle text, used only by the text-heuristic oracle
    fn oracle_text(&self, id: CardId) -> Option<&str>;

    fn player_exists(&self, id: PlayerId) -> bool;

    /// Every permanent on the battlefield, in battlefield order
    fn battlefield(&self) -> Vec<CardId>;
}

/// The external replacement-effect engine, for DAMAGE and LIFE_GAIN events
///
/// Implementations may lower the amount (down to 0), mark the event
/// prevented, change the damage target, or leave it untouched. The returned
/// flag reports whether any replacement applied.
pub trait SubstitutionHook {
    fn substitute_damage(&mut self, event: DamageEvent) -> HookResult<(DamageEvent, bool)>;

    fn substitute_life_gain(&mut self, event: LifeGainEvent) -> HookResult<(LifeGainEvent, bool)>;
}

/// Counter, life and damage-mark mutators
pub trait GameMutator {
    /// Mark combat damage on a creature
    fn mark_damage(&mut self, card: CardId, amount: u32) -> HookResult<()>;

    /// Record that a deathtouch source dealt this creature damage
    fn mark_deathtouch(&mut self, card: CardId) -> HookResult<()>;

    /// Remove all marked damage (and the deathtouch mark)
    fn clear_damage(&mut self, card: CardId) -> HookResult<()>;

    fn add_counters(&mut self, card: CardId, counter: CounterType, amount: u32) -> HookResult<()>;

    /// Change a player's life total by `delta` (damage passes a negative delta)
    fn adjust_life(&mut self, player: PlayerId, delta: i32) -> HookResult<()>;

    fn add_poison(&mut self, player: PlayerId, amount: u32) -> HookResult<()>;

    /// Life gain after substitution (lifelink); distinct from `adjust_life`
    fn gain_life(&mut self, player: PlayerId, source: CardId, amount: u32) -> HookResult<()>;

    fn adjust_loyalty(&mut self, planeswalker: CardId, delta: i32) -> HookResult<()>;

    fn adjust_defense(&mut self, battle: CardId, delta: i32) -> HookResult<()>;

    /// Use up one regeneration shield; `false` if none was left
    fn consume_regeneration_shield(&mut self, card: CardId) -> HookResult<bool>;

    fn tap(&mut self, card: CardId) -> HookResult<()>;

    /// Idempotency flag: has combat damage already been dealt this turn?
    fn combat_damage_dealt(&self) -> bool;

    fn set_combat_damage_dealt(&mut self, dealt: bool);
}

/// Why a permanent is leaving the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneChangeCause {
    LethalDamage,
    Deathtouch,
    ZeroToughness,
    ZeroLoyalty,
    ZeroDefense,
    /// An Aura with totem armor destroyed in place of its creature
    TotemArmor,
    /// An Aura whose enchanted permanent left the battlefield
    UnattachedAura,
}

/// Zone movement
pub trait ZoneMover {
    /// Move a permanent; returns the zone it actually ended up in, which can
    /// differ from `to` when a replacement effect applies
    fn move_to_zone(
        &mut self,
        card: CardId,
        from: Zone,
        to: Zone,
        cause: ZoneChangeCause,
    ) -> HookResult<Zone>;
}

/// Events the core reports to the host's trigger dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatTrigger {
    DealsCombatDamage {
        to: DamageRecipient,
        amount: u32,
        first_strike_step: bool,
    },
    DealtCombatDamage {
        from: CardId,
        amount: u32,
        first_strike_step: bool,
    },
    Dies {
        cause: ZoneChangeCause,
    },
}

/// Fire-and-forget ability triggers
pub trait TriggerSink {
    fn trigger_ability(&mut self, card: CardId, event: CombatTrigger) -> HookResult<()>;
}

/// Everything `resolve_combat` needs from the host
pub trait CombatHost:
    CharacteristicResolver + SubstitutionHook + GameMutator + ZoneMover + TriggerSink
{
}

impl<T> CombatHost for T where
    T: CharacteristicResolver + SubstitutionHook + GameMutator + ZoneMover + TriggerSink + ?Sized
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(toughness: i32, damage: u32) -> PermanentSnapshot {
        PermanentSnapshot {
            id: CardId::new(1),
            owner: PlayerId::new(0),
            controller: PlayerId::new(0),
            is_creature: true,
            is_planeswalker: false,
            is_battle: false,
            is_aura: false,
            power: 2,
            toughness,
            damage_marked: damage,
            deathtouch_damaged: false,
            regeneration_shields: 0,
            loyalty: 0,
            defense: 0,
            attached_to: None,
            attachments: SmallVec::new(),
        }
    }

    #[test]
    fn test_remaining_toughness_floors_at_zero() {
        assert_eq!(snapshot(4, 1).remaining_toughness(), 3);
        assert_eq!(snapshot(2, 5).remaining_toughness(), 0);
        assert_eq!(snapshot(-1, 0).remaining_toughness(), 0);
        assert_eq!(snapshot(3, u32::MAX).remaining_toughness(), 0);
    }
}
