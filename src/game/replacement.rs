//! A small replacement-effect registry for the reference host
//!
//! Stands in for a full replacement engine. Damage effects apply in a fixed
//! order: redirection, then source prevention, then doubling, then
//! prevention on the recipient.

use crate::combat::{DamageEvent, DamageRecipient, LifeGainEvent};
use crate::core::{CardId, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementEffect {
    PreventAllDamageTo(DamageRecipient),
    /// Prevention shield: prevents the next `remaining` damage
    PreventDamageTo { target: DamageRecipient, remaining: u32 },
    PreventCombatDamageFrom(CardId),
    /// Damage that would be dealt to `from` is dealt to `to` instead
    RedirectDamage { from: DamageRecipient, to: DamageRecipient },
    DoubleDamageFrom(CardId),
    PreventLifeGain(PlayerId),
    DoubleLifeGain(PlayerId),
    /// If this permanent would die, exile it instead
    ExileInsteadOfDying(CardId),
}

/// Effects whose state changed while substituting, as (index, previous value)
pub type ReplacementChanges = Vec<(usize, ReplacementEffect)>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRegistry {
    effects: Vec<ReplacementEffect>,
}

impl ReplacementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect, returning its index
    pub fn add(&mut self, effect: ReplacementEffect) -> usize {
        self.effects.push(effect);
        self.effects.len() - 1
    }

    pub fn effects(&self) -> &[ReplacementEffect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub(crate) fn restore(&mut self, index: usize, previous: ReplacementEffect) {
        if let Some(slot) = self.effects.get_mut(index) {
            *slot = previous;
        }
    }

    pub fn apply_damage(&mut self, mut event: DamageEvent) -> (DamageEvent, bool, ReplacementChanges) {
        let mut substituted = false;
        let mut changes = Vec::new();

        // At most one redirection per event, so redirects cannot loop
        let redirect = self.effects.iter().find_map(|effect| match effect {
            ReplacementEffect::RedirectDamage { from, to } if *from == event.target => Some(*to),
            _ => None,
        });
        if let Some(to) = redirect {
            event.target = to;
            substituted = true;
        }

        for effect in &self.effects {
            match effect {
                ReplacementEffect::PreventCombatDamageFrom(source) if event.combat => {
                    for contribution in event.contributions.iter_mut().filter(|c| c.source == *source) {
                        if contribution.amount > 0 {
                            contribution.amount = 0;
                            substituted = true;
                        }
                    }
                }
                ReplacementEffect::DoubleDamageFrom(source) => {
                    for contribution in event.contributions.iter_mut().filter(|c| c.source == *source) {
                        contribution.amount = contribution.amount.saturating_mul(2);
                        substituted = true;
                    }
                }
                _ => {}
            }
        }
        if substituted {
            event.amount = event.contributions.iter().fold(0u32, |total, c| total.saturating_add(c.amount));
        }

        for (index, effect) in self.effects.iter_mut().enumerate() {
            if event.prevented || event.amount == 0 {
                break;
            }
            match effect {
                ReplacementEffect::PreventAllDamageTo(target) if *target == event.target => {
                    event.prevented = true;
                    event.amount = 0;
                    substituted = true;
                }
                ReplacementEffect::PreventDamageTo { target, remaining } if *target == event.target && *remaining > 0 => {
                    let previous = ReplacementEffect::PreventDamageTo {
                        target: *target,
                        remaining: *remaining,
                    };
                    let prevented = (*remaining).min(event.amount);
                    *remaining -= prevented;
                    event.amount -= prevented;
                    changes.push((index, previous));
                    substituted = true;
                }
                _ => {}
            }
        }

        (event, substituted, changes)
    }

    pub fn apply_life_gain(&self, mut event: LifeGainEvent) -> (LifeGainEvent, bool) {
        let mut substituted = false;
        for effect in &self.effects {
            match effect {
                ReplacementEffect::PreventLifeGain(player) if *player == event.player => {
                    event.prevented = true;
                    event.amount = 0;
                    substituted = true;
                }
                ReplacementEffect::DoubleLifeGain(player) if *player == event.player && !event.prevented => {
                    event.amount = event.amount.saturating_mul(2);
                    substituted = true;
                }
                _ => {}
            }
        }
        (event, substituted)
    }

    pub fn exile_instead_of_dying(&self, card: CardId) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, ReplacementEffect::ExileInsteadOfDying(id) if *id == card))
    }
}
