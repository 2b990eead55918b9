//! Declared combat configuration
//!
//! Built upstream when attackers and blockers are declared, then handed to
//! the resolver. Attacks keep their declaration order so resolution is
//! deterministic.

use crate::combat::{CharacteristicResolver, DamageRecipient};
use crate::core::{CardId, PlayerId};
use crate::error::InvalidConfiguration;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What an attacking creature is attacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackTarget {
    Player(PlayerId),
    Planeswalker(CardId),
    Battle(CardId),
}

impl AttackTarget {
    pub fn recipient(&self) -> DamageRecipient {
        match self {
            AttackTarget::Player(id) => DamageRecipient::Player(*id),
            AttackTarget::Planeswalker(id) => DamageRecipient::Planeswalker(*id),
            AttackTarget::Battle(id) => DamageRecipient::Battle(*id),
        }
    }
}

/// One attacker with its target and blockers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDeclaration {
    pub attacker: CardId,
    pub target: AttackTarget,
    /// Blockers in declaration order
    pub blockers: SmallVec<[CardId; 4]>,
    /// Damage assignment order chosen by the attacking player
    pub assignment_order: Option<SmallVec<[CardId; 4]>>,
    /// Set once any blocker is declared; survives blockers leaving combat
    pub blocked: bool,
}

/// Combat state for the current combat damage step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatConfiguration {
    pub attacks: Vec<AttackDeclaration>,
}

impl CombatConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a creature as an attacker
    ///
    /// Declaring the same creature twice is kept as-is and rejected by
    /// [`validate`](Self::validate).
    pub fn declare_attacker(&mut self, attacker: CardId, target: AttackTarget) {
        self.attacks.push(AttackDeclaration {
            attacker,
            target,
            blockers: SmallVec::new(),
            assignment_order: None,
            blocked: false,
        });
    }

    /// Declare a creature as a blocker; `false` if `attacker` isn't attacking
    pub fn declare_blocker(&mut self, blocker: CardId, attacker: CardId) -> bool {
        match self.attack_mut(attacker) {
            Some(attack) => {
                attack.blockers.push(blocker);
                attack.blocked = true;
                true
            }
            None => false,
        }
    }

    /// Record the attacking player's damage assignment order
    pub fn set_assignment_order(&mut self, attacker: CardId, order: &[CardId]) -> bool {
        match self.attack_mut(attacker) {
            Some(attack) => {
                attack.assignment_order = Some(order.iter().copied().collect());
                true
            }
            None => false,
        }
    }

    pub fn attack(&self, attacker: CardId) -> Option<&AttackDeclaration> {
        self.attacks.iter().find(|a| a.attacker == attacker)
    }

    fn attack_mut(&mut self, attacker: CardId) -> Option<&mut AttackDeclaration> {
        self.attacks.iter_mut().find(|a| a.attacker == attacker)
    }

    pub fn is_attacking(&self, card_id: CardId) -> bool {
        self.attack(card_id).is_some()
    }

    /// Check if an attacker was blocked (even if its blockers are gone)
    pub fn is_blocked(&self, attacker: CardId) -> bool {
        self.attack(attacker).is_some_and(|a| a.blocked)
    }

    /// Get the blockers for a given attacker
    pub fn get_blockers(&self, attacker: CardId) -> SmallVec<[CardId; 4]> {
        self.attack(attacker)
            .map(|a| a.blockers.clone())
            .unwrap_or_default()
    }

    /// Get all attacking creatures, in declaration order
    pub fn attackers(&self) -> Vec<CardId> {
        self.attacks.iter().map(|a| a.attacker).collect()
    }

    /// Get all blocking creatures
    pub fn blockers_list(&self) -> Vec<CardId> {
        self.attacks
            .iter()
            .flat_map(|a| a.blockers.iter().copied())
            .collect()
    }

    /// Remove a creature from combat (regeneration)
    ///
    /// An attacker that loses all its blockers this way remains blocked.
    pub fn remove_from_combat(&mut self, card_id: CardId) -> bool {
        let before = self.attacks.len();
        self.attacks.retain(|a| a.attacker != card_id);
        let mut removed = self.attacks.len() != before;

        for attack in &mut self.attacks {
            if let Some(pos) = attack.blockers.iter().position(|&b| b == card_id) {
                attack.blockers.remove(pos);
                removed = true;
            }
            if let Some(order) = attack.assignment_order.as_mut() {
                order.retain(|b| *b != card_id);
            }
        }
        removed
    }

    /// Clear all combat state (called at end of combat)
    pub fn clear(&mut self) {
        self.attacks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    /// Check every reference against the current game state
    ///
    /// Runs before resolution mutates anything, so a rejected configuration
    /// leaves the game untouched.
    pub fn validate(&self, state: &dyn CharacteristicResolver) -> Result<(), InvalidConfiguration> {
        let mut seen_attackers: FxHashSet<CardId> = FxHashSet::default();
        let all_attackers: FxHashSet<CardId> = self.attacks.iter().map(|attack| attack.attacker).collect();
        let mut blocker_of: FxHashMap<CardId, CardId> = FxHashMap::default();

        for attack in &self.attacks {
            let attacker = attack.attacker;
            if !seen_attackers.insert(attacker) {
                return Err(InvalidConfiguration::DuplicateAttacker(attacker));
            }
            if state.permanent(attacker).is_none() {
                return Err(InvalidConfiguration::UnknownAttacker(attacker));
            }

            match attack.target {
                AttackTarget::Player(player) => {
                    if !state.player_exists(player) {
                        return Err(InvalidConfiguration::UnknownPlayer(player));
                    }
                }
                AttackTarget::Planeswalker(target) => {
                    let snapshot = state
                        .permanent(target)
                        .ok_or(InvalidConfiguration::UnknownTarget(target))?;
                    if !snapshot.is_planeswalker {
                        return Err(InvalidConfiguration::WrongTargetKind {
                            target,
                            expected: "planeswalker",
                        });
                    }
                }
                AttackTarget::Battle(target) => {
                    let snapshot = state
                        .permanent(target)
                        .ok_or(InvalidConfiguration::UnknownTarget(target))?;
                    if !snapshot.is_battle {
                        return Err(InvalidConfiguration::WrongTargetKind {
                            target,
                            expected: "battle",
                        });
                    }
                }
            }

            for &blocker in &attack.blockers {
                if blocker == attacker {
                    return Err(InvalidConfiguration::SelfBlock(attacker));
                }
                if all_attackers.contains(&blocker) {
                    return Err(InvalidConfiguration::AttackerBlocks { attacker, blocker });
                }
                if state.permanent(blocker).is_none() {
                    return Err(InvalidConfiguration::UnknownBlocker { attacker, blocker });
                }
                if let Some(first) = blocker_of.insert(blocker, attacker) {
                    return Err(InvalidConfiguration::BlockerReused {
                        blocker,
                        first,
                        second: attacker,
                    });
                }
            }

            if let Some(order) = &attack.assignment_order {
                let is_permutation = order.len() == attack.blockers.len()
                    && attack.blockers.iter().all(|b| order.contains(b));
                if !is_permutation {
                    return Err(InvalidConfiguration::BadAssignmentOrder(attacker));
                }
            }
        }
        Ok(())
    }
}
