//! Damage application
//!
//! Turns assignment plans into damage events, runs each through the host's
//! substitution hook, and applies whatever survives. All damage in a step is
//! dealt simultaneously: keyword flags and controllers are read once, before
//! the first mutation, and recipients hit by several sources get a single
//! combined event.

use crate::combat::{
    CharacteristicResolver, CombatHost, CombatTrigger, DamageAssignmentPlan, DamageRecipient, DamageStep,
    KeywordFlags, KeywordOracle,
};
use crate::core::{CardId, CounterType, PlayerId};
use crate::error::{CombatError, HookOperation, Result};
use crate::game::logger::{log_if_verbose, GameLogger};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeMap, BTreeSet};

/// One source's share of a damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageContribution {
    pub source: CardId,
    pub amount: u32,
    pub deathtouch: bool,
    pub infect: bool,
    pub wither: bool,
}

/// Damage about to be dealt to one recipient, as seen by the substitution hook
///
/// Event-level flags are set when any contribution carries them. A hook
/// clears a flag to strip that property from every contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub target: DamageRecipient,
    pub contributions: SmallVec<[DamageContribution; 2]>,
    /// Total proposed amount
    pub amount: u32,
    pub combat: bool,
    pub first_strike_step: bool,
    pub deathtouch: bool,
    pub infect: bool,
    pub wither: bool,
    pub prevented: bool,
}

impl DamageEvent {
    pub fn new(
        target: DamageRecipient,
        contributions: SmallVec<[DamageContribution; 2]>,
        first_strike_step: bool,
    ) -> Self {
        DamageEvent {
            target,
            amount: contributions.iter().fold(0u32, |total, c| total.saturating_add(c.amount)),
            combat: true,
            first_strike_step,
            deathtouch: contributions.iter().any(|c| c.deathtouch),
            infect: contributions.iter().any(|c| c.infect),
            wither: contributions.iter().any(|c| c.wither),
            prevented: false,
            contributions,
        }
    }
}

/// Life about to be gained through lifelink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeGainEvent {
    pub source: CardId,
    pub player: PlayerId,
    pub amount: u32,
    pub prevented: bool,
}

/// What became of one damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Nothing to damage: the recipient is gone
    None,
    Applied(u32),
    /// Prevented or reduced to zero by substitution
    Prevented,
}

impl DamageOutcome {
    pub fn applied(&self) -> u32 {
        match self {
            DamageOutcome::Applied(amount) => *amount,
            DamageOutcome::None | DamageOutcome::Prevented => 0,
        }
    }
}

/// One damage event after substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRecord {
    /// Recipient before substitution
    pub planned_target: DamageRecipient,
    /// The event as returned by the substitution hook
    pub event: DamageEvent,
    pub outcome: DamageOutcome,
    /// Applied damage attributed to each source
    pub shares: SmallVec<[(CardId, u32); 2]>,
}

/// Lifelink result for one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifelinkGain {
    pub source: CardId,
    pub player: PlayerId,
    pub damage_dealt: u32,
    pub life_gained: u32,
}

/// Everything one damage step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDamageReport {
    pub step: DamageStep,
    pub records: Vec<DamageRecord>,
    /// Damage actually dealt, per source
    pub dealt_by_source: BTreeMap<CardId, u32>,
    pub damage_to_players: BTreeMap<PlayerId, u32>,
    pub lifelink: Vec<LifelinkGain>,
    pub life_gained: BTreeMap<PlayerId, u32>,
    /// Permanents that were dealt damage
    pub touched: BTreeSet<CardId>,
}

impl StepDamageReport {
    pub fn new(step: DamageStep) -> Self {
        StepDamageReport {
            step,
            records: Vec::new(),
            dealt_by_source: BTreeMap::new(),
            damage_to_players: BTreeMap::new(),
            lifelink: Vec::new(),
            life_gained: BTreeMap::new(),
            touched: BTreeSet::new(),
        }
    }

    pub fn dealt_by(&self, source: CardId) -> u32 {
        self.dealt_by_source.get(&source).copied().unwrap_or(0)
    }

    pub fn total_applied(&self) -> u32 {
        self.records.iter().map(|r| r.outcome.applied()).sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct SourceInfo {
    flags: KeywordFlags,
    controller: Option<PlayerId>,
}

/// Applies one step's assignment plans
pub struct DamageApplier<'a> {
    step: DamageStep,
    logger: &'a GameLogger,
}

impl<'a> DamageApplier<'a> {
    pub fn new(step: DamageStep, logger: &'a GameLogger) -> Self {
        DamageApplier { step, logger }
    }

    pub fn apply<H: CombatHost>(
        &self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        plans: &[DamageAssignmentPlan],
    ) -> Result<StepDamageReport> {
        let first_strike_step = self.step.is_first_strike();
        let mut report = StepDamageReport::new(self.step);

        let mut sources: BTreeMap<CardId, SourceInfo> = BTreeMap::new();
        for plan in plans.iter().filter(|p| !p.is_empty()) {
            let view: &dyn CharacteristicResolver = &*host;
            sources.entry(plan.source).or_insert_with(|| SourceInfo {
                flags: KeywordFlags::read(oracle, view, plan.source),
                controller: view.permanent(plan.source).map(|p| p.controller),
            });
        }

        let mut grouped: BTreeMap<DamageRecipient, SmallVec<[DamageContribution; 2]>> = BTreeMap::new();
        for plan in plans {
            let Some(info) = sources.get(&plan.source) else {
                continue;
            };
            for &(recipient, amount) in &plan.assignments {
                grouped.entry(recipient).or_default().push(DamageContribution {
                    source: plan.source,
                    amount,
                    deathtouch: info.flags.deathtouch,
                    infect: info.flags.infect,
                    wither: info.flags.wither,
                });
            }
        }

        for (target, contributions) in grouped {
            let event = DamageEvent::new(target, contributions, first_strike_step);
            let (event, substituted) = host
                .substitute_damage(event)
                .map_err(CombatError::hook(self.step, HookOperation::Substitution, target.entity()))?;
            if substituted {
                log_if_verbose!(
                    self.logger,
                    "Damage to {} replaced: {} to {}{}",
                    target,
                    event.amount,
                    event.target,
                    if event.prevented { " (prevented)" } else { "" }
                );
            }
            let record = self.apply_event(host, target, event)?;

            for &(source, share) in &record.shares {
                *report.dealt_by_source.entry(source).or_default() += share;
            }
            match record.event.target {
                DamageRecipient::Player(player) if record.outcome.applied() > 0 => {
                    *report.damage_to_players.entry(player).or_default() += record.outcome.applied();
                }
                recipient => {
                    if let (Some(card), DamageOutcome::Applied(_)) = (recipient.card(), record.outcome) {
                        report.touched.insert(card);
                    }
                }
            }
            report.records.push(record);
        }

        self.apply_lifelink(host, &sources, &mut report)?;
        self.fire_triggers(host, &report)?;
        Ok(report)
    }

    fn apply_event<H: CombatHost>(
        &self,
        host: &mut H,
        planned_target: DamageRecipient,
        event: DamageEvent,
    ) -> Result<DamageRecord> {
        let mut shares: SmallVec<[(CardId, u32); 2]> = SmallVec::new();

        let outcome = if event.prevented || event.amount == 0 {
            log_if_verbose!(self.logger, "Damage to {} prevented", event.target);
            DamageOutcome::Prevented
        } else if event.contributions.is_empty() || !recipient_exists(&*host, event.target) {
            DamageOutcome::None
        } else {
            let weights: SmallVec<[u32; 2]> = event.contributions.iter().map(|c| c.amount).collect();
            let split = distribute(event.amount, &weights);
            for (contribution, share) in event.contributions.iter().zip(split) {
                if share == 0 {
                    continue;
                }
                self.deal(host, &event, contribution, share)?;
                log_if_verbose!(
                    self.logger,
                    "{} deals {} damage to {}",
                    contribution.source,
                    share,
                    event.target
                );
                shares.push((contribution.source, share));
            }
            DamageOutcome::Applied(event.amount)
        };

        Ok(DamageRecord {
            planned_target,
            event,
            outcome,
            shares,
        })
    }

    fn deal<H: CombatHost>(
        &self,
        host: &mut H,
        event: &DamageEvent,
        contribution: &DamageContribution,
        share: u32,
    ) -> Result<()> {
        let step = self.step;
        let infect = event.infect && contribution.infect;
        let wither = event.wither && contribution.wither;
        let loss = i32::try_from(share).unwrap_or(i32::MAX);

        match event.target {
            DamageRecipient::Creature(card) => {
                if infect || wither {
                    host.add_counters(card, CounterType::minus_one_minus_one(), share)
                        .map_err(CombatError::hook(step, HookOperation::AdjustCounters, card))?;
                } else {
                    host.mark_damage(card, share)
                        .map_err(CombatError::hook(step, HookOperation::MarkDamage, card))?;
                }
                if event.deathtouch && contribution.deathtouch {
                    host.mark_deathtouch(card)
                        .map_err(CombatError::hook(step, HookOperation::MarkDamage, card))?;
                }
            }
            DamageRecipient::Player(player) => {
                if infect {
                    host.add_poison(player, share)
                        .map_err(CombatError::hook(step, HookOperation::AdjustPoison, player))?;
                } else {
                    host.adjust_life(player, -loss)
                        .map_err(CombatError::hook(step, HookOperation::AdjustLife, player))?;
                }
            }
            DamageRecipient::Planeswalker(walker) => {
                host.adjust_loyalty(walker, -loss)
                    .map_err(CombatError::hook(step, HookOperation::AdjustLoyalty, walker))?;
            }
            DamageRecipient::Battle(battle) => {
                host.adjust_defense(battle, -loss)
                    .map_err(CombatError::hook(step, HookOperation::AdjustDefense, battle))?;
            }
        }
        Ok(())
    }

    /// One life-gain event per lifelink source, for the damage it actually dealt
    fn apply_lifelink<H: CombatHost>(
        &self,
        host: &mut H,
        sources: &BTreeMap<CardId, SourceInfo>,
        report: &mut StepDamageReport,
    ) -> Result<()> {
        for (&source, info) in sources {
            let dealt = report.dealt_by(source);
            if !info.flags.lifelink || dealt == 0 {
                continue;
            }
            let Some(controller) = info.controller else {
                continue;
            };

            let event = LifeGainEvent {
                source,
                player: controller,
                amount: dealt,
                prevented: false,
            };
            let (event, _) = host
                .substitute_life_gain(event)
                .map_err(CombatError::hook(self.step, HookOperation::Substitution, controller))?;
            let gained = if event.prevented { 0 } else { event.amount };
            if gained > 0 {
                host.gain_life(event.player, source, gained)
                    .map_err(CombatError::hook(self.step, HookOperation::GainLife, event.player))?;
                *report.life_gained.entry(event.player).or_default() += gained;
            }
            log_if_verbose!(self.logger, "Lifelink: {} gains {} life from {}", event.player, gained, source);
            report.lifelink.push(LifelinkGain {
                source,
                player: event.player,
                damage_dealt: dealt,
                life_gained: gained,
            });
        }
        Ok(())
    }

    fn fire_triggers<H: CombatHost>(&self, host: &mut H, report: &StepDamageReport) -> Result<()> {
        let first_strike_step = self.step.is_first_strike();
        for record in &report.records {
            for &(source, amount) in &record.shares {
                host.trigger_ability(
                    source,
                    CombatTrigger::DealsCombatDamage {
                        to: record.event.target,
                        amount,
                        first_strike_step,
                    },
                )
                .map_err(CombatError::hook(self.step, HookOperation::TriggerAbility, source))?;

                if let Some(card) = record.event.target.card() {
                    host.trigger_ability(
                        card,
                        CombatTrigger::DealtCombatDamage {
                            from: source,
                            amount,
                            first_strike_step,
                        },
                    )
                    .map_err(CombatError::hook(self.step, HookOperation::TriggerAbility, card))?;
                }
            }
        }
        Ok(())
    }
}

fn recipient_exists(state: &dyn CharacteristicResolver, recipient: DamageRecipient) -> bool {
    match recipient {
        DamageRecipient::Player(player) => state.player_exists(player),
        DamageRecipient::Creature(card)
        | DamageRecipient::Planeswalker(card)
        | DamageRecipient::Battle(card) => state.permanent(card).is_some(),
    }
}

/// Split `amount` in proportion to `weights` (largest remainder method)
///
/// Leftover units go to the largest fractional parts, earlier entries
/// winning ties. All-zero weights give everything to the first entry.
pub fn distribute(amount: u32, weights: &[u32]) -> SmallVec<[u32; 2]> {
    let mut shares: SmallVec<[u32; 2]> = smallvec![0; weights.len()];
    if weights.is_empty() {
        return shares;
    }
    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total == 0 {
        shares[0] = amount;
        return shares;
    }

    let mut assigned = 0u32;
    let mut remainders: SmallVec<[(u64, usize); 2]> = SmallVec::new();
    for (i, &weight) in weights.iter().enumerate() {
        let exact = u64::from(amount) * u64::from(weight);
        shares[i] = (exact / total) as u32;
        assigned += shares[i];
        remainders.push((exact % total, i));
    }
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take((amount - assigned) as usize) {
        shares[i] += 1;
    }
    shares
}
