//! The lethality loop (state-based actions for combat damage, MTG Rules 704.5)
//!
//! Each pass decides on a whole batch from one snapshot of the board, then
//! applies it, so simultaneous deaths stay simultaneous. Passes repeat until
//! one changes nothing or the configured cap is reached.

use crate::combat::{
    CharacteristicResolver, CombatConfiguration, CombatHost, CombatTrigger, DamageStep, KeywordOracle,
    PermanentSnapshot, ZoneChangeCause,
};
use crate::config::{LethalitySweep, ResolverConfig};
use crate::core::{CardId, Keyword};
use crate::error::{CombatError, HookOperation, Result};
use crate::game::GameLogger;
use crate::zones::Zone;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why a permanent is about to leave the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LethalityReason {
    ZeroToughness,
    LethalDamage,
    Deathtouch,
    ZeroLoyalty,
    ZeroDefense,
    UnattachedAura,
}

impl LethalityReason {
    /// Destruction can be stopped by indestructible, regeneration and totem
    /// armor; the other reasons put the permanent into the graveyard directly
    pub fn is_destruction(&self) -> bool {
        matches!(self, LethalityReason::LethalDamage | LethalityReason::Deathtouch)
    }

    pub fn cause(&self) -> ZoneChangeCause {
        match self {
            LethalityReason::ZeroToughness => ZoneChangeCause::ZeroToughness,
            LethalityReason::LethalDamage => ZoneChangeCause::LethalDamage,
            LethalityReason::Deathtouch => ZoneChangeCause::Deathtouch,
            LethalityReason::ZeroLoyalty => ZoneChangeCause::ZeroLoyalty,
            LethalityReason::ZeroDefense => ZoneChangeCause::ZeroDefense,
            LethalityReason::UnattachedAura => ZoneChangeCause::UnattachedAura,
        }
    }

    /// Which check, if any, this permanent fails
    pub fn check(snapshot: &PermanentSnapshot, state: &dyn CharacteristicResolver) -> Option<Self> {
        if snapshot.is_creature {
            if snapshot.toughness <= 0 {
                return Some(LethalityReason::ZeroToughness);
            }
            if snapshot.remaining_toughness() == 0 {
                return Some(LethalityReason::LethalDamage);
            }
            if snapshot.deathtouch_damaged {
                return Some(LethalityReason::Deathtouch);
            }
        }
        if snapshot.is_planeswalker && snapshot.loyalty == 0 {
            return Some(LethalityReason::ZeroLoyalty);
        }
        if snapshot.is_battle && snapshot.defense == 0 {
            return Some(LethalityReason::ZeroDefense);
        }
        if snapshot.is_aura {
            if let Some(enchanted) = snapshot.attached_to {
                if state.permanent(enchanted).is_none() {
                    return Some(LethalityReason::UnattachedAura);
                }
            }
        }
        None
    }
}

impl fmt::Display for LethalityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LethalityReason::ZeroToughness => "zero toughness",
            LethalityReason::LethalDamage => "lethal damage",
            LethalityReason::Deathtouch => "deathtouch",
            LethalityReason::ZeroLoyalty => "zero loyalty",
            LethalityReason::ZeroDefense => "zero defense",
            LethalityReason::UnattachedAura => "enchanted permanent left",
        };
        f.write_str(text)
    }
}

/// What the loop did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LethalityOutcome {
    /// Permanents that ended up in a graveyard, in order
    pub died: Vec<CardId>,
    /// Every permanent moved off the battlefield, with its actual destination
    pub removed: Vec<(CardId, Zone)>,
    pub regenerated: Vec<CardId>,
    /// (creature saved, aura destroyed instead)
    pub totem_saves: Vec<(CardId, CardId)>,
    pub iterations: u32,
    pub cap_hit: bool,
}

impl LethalityOutcome {
    pub fn merge(&mut self, other: LethalityOutcome) {
        self.died.extend(other.died);
        self.removed.extend(other.removed);
        self.regenerated.extend(other.regenerated);
        self.totem_saves.extend(other.totem_saves);
        self.iterations += other.iterations;
        self.cap_hit |= other.cap_hit;
    }
}

pub struct LethalityResolver<'a> {
    config: &'a ResolverConfig,
    logger: &'a GameLogger,
    step: DamageStep,
}

impl<'a> LethalityResolver<'a> {
    pub fn new(config: &'a ResolverConfig, logger: &'a GameLogger, step: DamageStep) -> Self {
        LethalityResolver { config, logger, step }
    }

    /// Run passes until the board is stable
    ///
    /// `touched` seeds the scan in [`LethalitySweep::Touched`] mode. When
    /// `combat` is given, regenerated and dead creatures are removed from it.
    pub fn resolve<H: CombatHost>(
        &self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        touched: &BTreeSet<CardId>,
        mut combat: Option<&mut CombatConfiguration>,
    ) -> Result<LethalityOutcome> {
        let mut outcome = LethalityOutcome::default();
        let mut scope: BTreeSet<CardId> = touched.clone();
        let mut moved: FxHashSet<CardId> = FxHashSet::default();
        let max = self.config.max_lethality_iterations;

        for pass in 1..=max {
            outcome.iterations = pass;

            let ids: Vec<CardId> = match self.config.lethality_sweep {
                LethalitySweep::Battlefield => host.battlefield(),
                LethalitySweep::Touched => scope.iter().copied().collect(),
            };
            let batch: Vec<(PermanentSnapshot, LethalityReason)> = {
                let view: &dyn CharacteristicResolver = &*host;
                ids.into_iter()
                    .filter_map(|id| view.permanent(id))
                    .filter_map(|snapshot| LethalityReason::check(&snapshot, view).map(|r| (snapshot, r)))
                    .collect()
            };

            let mut actions = 0;
            for (snapshot, reason) in batch {
                if moved.contains(&snapshot.id) {
                    self.logger.warning(
                        "lethality",
                        &format!("{} already left the battlefield; skipping second move", snapshot.id),
                    );
                    continue;
                }
                if self.apply_one(host, oracle, &snapshot, reason, &mut outcome, &mut moved, &mut scope, combat.as_deref_mut())? {
                    actions += 1;
                }
            }

            if actions == 0 {
                return Ok(outcome);
            }
        }

        outcome.cap_hit = true;
        self.logger.warning(
            "lethality",
            &format!("{}: lethality loop stopped after {} passes without stabilizing", self.step, max),
        );
        Ok(outcome)
    }

    /// Handle one candidate; returns whether anything changed
    #[allow(clippy::too_many_arguments)]
    fn apply_one<H: CombatHost>(
        &self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        snapshot: &PermanentSnapshot,
        reason: LethalityReason,
        outcome: &mut LethalityOutcome,
        moved: &mut FxHashSet<CardId>,
        scope: &mut BTreeSet<CardId>,
        mut combat: Option<&mut CombatConfiguration>,
    ) -> Result<bool> {
        let id = snapshot.id;
        let step = self.step;

        if reason.is_destruction() {
            if oracle.has_keyword(&*host, id, Keyword::Indestructible) {
                return Ok(false);
            }

            if snapshot.regeneration_shields > 0
                && host
                    .consume_regeneration_shield(id)
                    .map_err(CombatError::hook(step, HookOperation::Regenerate, id))?
            {
                host.clear_damage(id)
                    .map_err(CombatError::hook(step, HookOperation::Regenerate, id))?;
                host.tap(id).map_err(CombatError::hook(step, HookOperation::Regenerate, id))?;
                if let Some(combat) = combat.as_deref_mut() {
                    combat.remove_from_combat(id);
                }
                self.logger.normal(&format!("{id} regenerates ({reason})"));
                outcome.regenerated.push(id);
                return Ok(true);
            }

            let totem = snapshot.attachments.iter().copied().find(|&aura| {
                !moved.contains(&aura)
                    && host.permanent(aura).is_some()
                    && oracle.has_keyword(&*host, aura, Keyword::TotemArmor)
            });
            if let Some(aura) = totem {
                self.move_off_battlefield(host, aura, ZoneChangeCause::TotemArmor, outcome, moved)?;
                host.clear_damage(id)
                    .map_err(CombatError::hook(step, HookOperation::MarkDamage, id))?;
                self.logger.normal(&format!("{aura} is destroyed instead of {id} (totem armor)"));
                outcome.totem_saves.push((id, aura));
                return Ok(true);
            }
        }

        self.move_off_battlefield(host, id, reason.cause(), outcome, moved)?;
        if let Some(combat) = combat {
            combat.remove_from_combat(id);
        }
        scope.extend(snapshot.attachments.iter().copied());
        Ok(true)
    }

    fn move_off_battlefield<H: CombatHost>(
        &self,
        host: &mut H,
        id: CardId,
        cause: ZoneChangeCause,
        outcome: &mut LethalityOutcome,
        moved: &mut FxHashSet<CardId>,
    ) -> Result<()> {
        let zone = host
            .move_to_zone(id, Zone::Battlefield, Zone::Graveyard, cause)
            .map_err(CombatError::hook(self.step, HookOperation::MoveToZone, id))?;
        moved.insert(id);
        outcome.removed.push((id, zone));

        if zone == Zone::Graveyard {
            self.logger.normal(&format!("{id} is put into the graveyard ({cause:?})"));
            outcome.died.push(id);
            // Any permanent put into a graveyard from the battlefield dies (Rule 700.4)
            host.trigger_ability(id, CombatTrigger::Dies { cause })
                .map_err(CombatError::hook(self.step, HookOperation::TriggerAbility, id))?;
        } else {
            self.logger.normal(&format!("{id} goes to {zone:?} instead of dying"));
        }
        Ok(())
    }
}
