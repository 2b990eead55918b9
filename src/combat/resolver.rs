//! Combat damage step sequencing (MTG Rules 510)
//!
//! `Init -> FirstStrikeStep (only if needed) -> RegularStep -> Done`.
//! Each step plans every participating creature's damage from one board
//! snapshot, applies it, then runs the lethality loop to completion before
//! the next step begins.

use crate::combat::assignment::{plan_attacker_damage, plan_blocker_damage, AttackerAssignment};
use crate::combat::{
    AttackTarget, BlockerState, CharacteristicResolver, CombatConfiguration, CombatHost, DamageApplier,
    DamageAssignmentPlan, DamageStep, KeywordFlags, KeywordOracle, LethalityOutcome, LethalityResolver,
    OracleFidelity, StepDamageReport,
};
use crate::config::ResolverConfig;
use crate::core::{CardId, PlayerId};
use crate::error::{CombatError, Result};
use crate::game::logger::{log_if_verbose, GameLogger};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the resolver is in the damage sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    Init,
    FirstStrikeStep,
    RegularStep,
    Done,
}

/// Everything one damage step produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: DamageStep,
    pub plans: Vec<DamageAssignmentPlan>,
    pub damage: StepDamageReport,
    pub lethality: LethalityOutcome,
}

/// Result of resolving combat damage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResult {
    /// Damage dealt to players who control no attacker
    pub damage_to_defender: u32,
    pub damage_to_players: BTreeMap<PlayerId, u32>,
    pub attackers_died: Vec<CardId>,
    pub blockers_died: Vec<CardId>,
    /// Every permanent put into a graveyard, attackers and blockers included
    pub permanents_died: Vec<CardId>,
    /// Total lifelink gain, all players (informational)
    pub life_gained: u32,
    pub life_gained_by_player: BTreeMap<PlayerId, u32>,
    pub steps: Vec<StepReport>,
    pub lethality_cap_hit: bool,
}

impl CombatResult {
    /// Did resolution change nothing at all?
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, step: DamageStep) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Facts fixed when resolution starts
struct CombatContext {
    attackers: FxHashSet<CardId>,
    blockers: FxHashSet<CardId>,
    attacking_players: FxHashSet<PlayerId>,
    /// Creatures with first strike or double strike as the first-strike step began
    had_first_strike: FxHashSet<CardId>,
}

pub struct CombatResolver {
    config: ResolverConfig,
    logger: GameLogger,
    phase: CombatPhase,
}

impl CombatResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let logger = GameLogger::with_verbosity(config.verbosity);
        Self::with_logger(config, logger)
    }

    pub fn with_logger(config: ResolverConfig, logger: GameLogger) -> Self {
        CombatResolver {
            config,
            logger,
            phase: CombatPhase::Init,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn logger(&self) -> &GameLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut GameLogger {
        &mut self.logger
    }

    /// The phase reached by the last call; on error, the phase that failed
    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Resolve combat damage for the declared configuration
    ///
    /// Does nothing if combat damage was already dealt this turn. An invalid
    /// configuration or rejected oracle is reported before any mutation. On
    /// a hook failure the game may be partly updated; the error names the
    /// step, hook, and entity involved.
    pub fn resolve_combat<H: CombatHost>(
        &mut self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        combat: &mut CombatConfiguration,
    ) -> Result<CombatResult> {
        self.phase = CombatPhase::Init;
        match self.run(host, oracle, combat) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.logger.warning("combat", &format!("combat damage resolution failed: {e}"));
                Err(e)
            }
        }
    }

    fn run<H: CombatHost>(
        &mut self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        combat: &mut CombatConfiguration,
    ) -> Result<CombatResult> {
        if host.combat_damage_dealt() {
            self.logger.normal("Combat damage was already dealt this turn");
            self.phase = CombatPhase::Done;
            return Ok(CombatResult::default());
        }

        if oracle.fidelity() == OracleFidelity::TextHeuristic {
            if !self.config.allow_heuristic_oracle {
                return Err(CombatError::HeuristicOracleRejected);
            }
            self.logger.warning(
                "oracle",
                "keyword oracle is reading printed text; granted and removed keywords are ignored",
            );
        }

        if combat.is_empty() {
            self.logger.normal("No attackers; no combat damage");
            return Ok(self.finish(host, combat, Vec::new(), &CombatContext::empty()));
        }

        combat.validate(&*host)?;

        let context = CombatContext::capture(&*host, oracle, combat);
        let needs_first_strike = !context.had_first_strike.is_empty();
        self.logger.normal(&format!(
            "Combat damage: {} attacker(s), {} blocker(s){}",
            context.attackers.len(),
            context.blockers.len(),
            if needs_first_strike { ", first strike step" } else { "" }
        ));

        let mut steps = Vec::with_capacity(2);
        if needs_first_strike {
            self.phase = CombatPhase::FirstStrikeStep;
            steps.push(self.run_step(host, oracle, combat, &context, DamageStep::FirstStrike)?);
        }
        self.phase = CombatPhase::RegularStep;
        steps.push(self.run_step(host, oracle, combat, &context, DamageStep::Regular)?);

        Ok(self.finish(host, combat, steps, &context))
    }

    fn run_step<H: CombatHost>(
        &self,
        host: &mut H,
        oracle: &dyn KeywordOracle,
        combat: &mut CombatConfiguration,
        context: &CombatContext,
        step: DamageStep,
    ) -> Result<StepReport> {
        self.logger.normal(&format!("--- {step} ---"));

        let plans = self.plan_step(&*host, oracle, combat, context, step);
        let damage = DamageApplier::new(step, &self.logger).apply(host, oracle, &plans)?;
        let lethality = LethalityResolver::new(&self.config, &self.logger, step).resolve(
            host,
            oracle,
            &damage.touched,
            Some(combat),
        )?;

        Ok(StepReport {
            step,
            plans,
            damage,
            lethality,
        })
    }

    /// Plans for every creature that deals damage in this step
    fn plan_step(
        &self,
        state: &dyn CharacteristicResolver,
        oracle: &dyn KeywordOracle,
        combat: &CombatConfiguration,
        context: &CombatContext,
        step: DamageStep,
    ) -> Vec<DamageAssignmentPlan> {
        let deals_damage = |id: CardId, flags: &KeywordFlags| match step {
            DamageStep::FirstStrike => flags.strikes_first(),
            DamageStep::Regular => !context.had_first_strike.contains(&id) || flags.double_strike,
        };

        let mut plans = Vec::new();
        for attack in &combat.attacks {
            let Some(attacker) = state.permanent(attack.attacker) else {
                continue;
            };
            let flags = KeywordFlags::read(oracle, state, attack.attacker);

            if deals_damage(attack.attacker, &flags) {
                let blockers = blocker_states(state, &attack.blockers);
                let plan = plan_attacker_damage(&AttackerAssignment {
                    source: attack.attacker,
                    power: attacker.power,
                    blockers: &blockers,
                    deathtouch: flags.deathtouch,
                    trample: flags.trample,
                    blocked: attack.blocked,
                    overflow_target: attack.target.recipient(),
                    order_override: attack.assignment_order.as_deref(),
                    default_order: self.config.default_assignment_order,
                });
                log_if_verbose!(
                    self.logger,
                    "{} assigns {:?} (discarded {})",
                    attack.attacker,
                    plan.assignments.as_slice(),
                    plan.discarded
                );
                plans.push(plan);
            }

            for &blocker in &attack.blockers {
                let Some(snapshot) = state.permanent(blocker) else {
                    continue;
                };
                let blocker_flags = KeywordFlags::read(oracle, state, blocker);
                if deals_damage(blocker, &blocker_flags) {
                    plans.push(plan_blocker_damage(blocker, snapshot.power, attack.attacker));
                }
            }
        }
        plans
    }

    fn finish<H: CombatHost>(
        &mut self,
        host: &mut H,
        combat: &mut CombatConfiguration,
        steps: Vec<StepReport>,
        context: &CombatContext,
    ) -> CombatResult {
        self.phase = CombatPhase::Done;
        host.set_combat_damage_dealt(true);
        combat.clear();

        let mut result = CombatResult::default();
        for report in &steps {
            for (&player, &amount) in &report.damage.damage_to_players {
                *result.damage_to_players.entry(player).or_default() += amount;
            }
            for (&player, &amount) in &report.damage.life_gained {
                *result.life_gained_by_player.entry(player).or_default() += amount;
            }
            for &id in &report.lethality.died {
                result.permanents_died.push(id);
                if context.attackers.contains(&id) {
                    result.attackers_died.push(id);
                }
                if context.blockers.contains(&id) {
                    result.blockers_died.push(id);
                }
            }
            result.lethality_cap_hit |= report.lethality.cap_hit;
        }
        result.damage_to_defender = result
            .damage_to_players
            .iter()
            .filter(|(player, _)| !context.attacking_players.contains(player))
            .map(|(_, amount)| amount)
            .sum();
        result.life_gained = result.life_gained_by_player.values().sum();
        result.steps = steps;

        self.logger.normal(&format!(
            "Combat damage done: {} to defender, {} attacker(s) and {} blocker(s) died",
            result.damage_to_defender,
            result.attackers_died.len(),
            result.blockers_died.len()
        ));
        result
    }

    /// Preview one attacker's assignment without touching the game
    ///
    /// Blockers no longer on the battlefield are ignored; the attacker is
    /// treated as blocked whenever `blockers` is non-empty.
    pub fn assign_damage(
        &self,
        state: &dyn CharacteristicResolver,
        oracle: &dyn KeywordOracle,
        attacker: CardId,
        blockers: &[CardId],
        target: AttackTarget,
        order_override: Option<&[CardId]>,
    ) -> DamageAssignmentPlan {
        let Some(snapshot) = state.permanent(attacker) else {
            return DamageAssignmentPlan::empty(attacker);
        };
        let flags = KeywordFlags::read(oracle, state, attacker);
        let blocker_list = blocker_states(state, blockers);
        plan_attacker_damage(&AttackerAssignment {
            source: attacker,
            power: snapshot.power,
            blockers: &blocker_list,
            deathtouch: flags.deathtouch,
            trample: flags.trample,
            blocked: !blockers.is_empty(),
            overflow_target: target.recipient(),
            order_override,
            default_order: self.config.default_assignment_order,
        })
    }
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl CombatContext {
    fn empty() -> Self {
        CombatContext {
            attackers: FxHashSet::default(),
            blockers: FxHashSet::default(),
            attacking_players: FxHashSet::default(),
            had_first_strike: FxHashSet::default(),
        }
    }

    fn capture(state: &dyn CharacteristicResolver, oracle: &dyn KeywordOracle, combat: &CombatConfiguration) -> Self {
        let mut context = CombatContext::empty();
        for attack in &combat.attacks {
            context.attackers.insert(attack.attacker);
            if let Some(snapshot) = state.permanent(attack.attacker) {
                context.attacking_players.insert(snapshot.controller);
            }
            context.blockers.extend(attack.blockers.iter().copied());
        }
        for &id in context.attackers.iter().chain(context.blockers.iter()) {
            if KeywordFlags::read(oracle, state, id).strikes_first() {
                context.had_first_strike.insert(id);
            }
        }
        context
    }
}

/// Blockers still on the battlefield, in the given order
fn blocker_states(state: &dyn CharacteristicResolver, blockers: &[CardId]) -> Vec<BlockerState> {
    blockers
        .iter()
        .filter_map(|&id| state.permanent(id))
        .map(|snapshot| BlockerState {
            id: snapshot.id,
            toughness: snapshot.toughness,
            damage_marked: snapshot.damage_marked,
            deathtouch_damaged: snapshot.deathtouch_damaged,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{DamageRecipient, LayeredOracle, TextHeuristicOracle};
    use crate::core::Keyword;
    use crate::error::InvalidConfiguration;
    use crate::game::GameState;

    fn quiet_resolver() -> CombatResolver {
        let mut resolver = CombatResolver::default();
        resolver.logger_mut().enable_capture();
        resolver
    }

    #[test]
    fn test_unblocked_attack() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);
        let mut combat = CombatConfiguration::new();
        combat.declare_attacker(bear, AttackTarget::Player(p2));

        let mut resolver = quiet_resolver();
        let result = resolver.resolve_combat(&mut game, &LayeredOracle, &mut combat).unwrap();

        assert_eq!(result.damage_to_defender, 2);
        assert_eq!(game.get_player(p2).unwrap().life, 18);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(resolver.phase(), CombatPhase::Done);
        assert!(game.combat_damage_dealt);
        assert!(combat.is_empty());
    }

    #[test]
    fn test_no_attackers_goes_straight_to_done() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let mut combat = CombatConfiguration::new();
        let mut resolver = quiet_resolver();

        let result = resolver.resolve_combat(&mut game, &LayeredOracle, &mut combat).unwrap();
        assert_eq!(result, CombatResult::default());
        assert!(game.combat_damage_dealt);
        assert_eq!(resolver.phase(), CombatPhase::Done);
    }

    #[test]
    fn test_heuristic_oracle_rejected_by_default() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);
        let mut combat = CombatConfiguration::new();
        combat.declare_attacker(bear, AttackTarget::Player(p2));

        let mut resolver = quiet_resolver();
        let err = resolver
            .resolve_combat(&mut game, &TextHeuristicOracle, &mut combat)
            .unwrap_err();
        assert!(matches!(err, CombatError::HeuristicOracleRejected));
        assert!(!game.combat_damage_dealt);
        assert_eq!(game.get_player(p2).unwrap().life, 20);
    }

    #[test]
    fn test_heuristic_oracle_allowed_logs_warning() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let knight = game.create_creature(p1, "Knight", 2, 2, &[]);
        game.cards.get_mut(knight).unwrap().text = "First strike".to_string();
        let blocker = game.create_creature(p2, "Bear", 2, 2, &[]);
        let mut combat = CombatConfiguration::new();
        combat.declare_attacker(knight, AttackTarget::Player(p2));
        combat.declare_blocker(blocker, knight);

        let config = ResolverConfig {
            allow_heuristic_oracle: true,
            ..ResolverConfig::default()
        };
        let mut resolver = CombatResolver::new(config);
        resolver.logger_mut().enable_capture();
        let result = resolver
            .resolve_combat(&mut game, &TextHeuristicOracle, &mut combat)
            .unwrap();

        // Printed first strike is honored: the blocker dies before striking back
        assert_eq!(result.blockers_died, vec![blocker]);
        assert!(game.battlefield.contains(knight));
        assert!(resolver
            .logger()
            .logs()
            .iter()
            .any(|log| log.category.as_deref() == Some("oracle")));
    }

    #[test]
    fn test_invalid_configuration_mutates_nothing() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);
        let mut combat = CombatConfiguration::new();
        combat.declare_attacker(bear, AttackTarget::Player(p2));
        combat.declare_attacker(bear, AttackTarget::Player(p2));

        let mut resolver = quiet_resolver();
        let err = resolver.resolve_combat(&mut game, &LayeredOracle, &mut combat).unwrap_err();
        assert!(matches!(
            err,
            CombatError::InvalidCombatConfiguration(InvalidConfiguration::DuplicateAttacker(id)) if id == bear
        ));
        assert_eq!(game.get_player(p2).unwrap().life, 20);
        assert!(!game.combat_damage_dealt);
        assert_eq!(combat.attacks.len(), 2);
    }

    #[test]
    fn test_assign_damage_preview_is_pure() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let trampler = game.create_creature(p1, "Craw Wurm", 6, 4, &[Keyword::Trample]);
        let wall = game.create_creature(p2, "Wall", 0, 2, &[]);
        let undo_len = game.undo_log.len();

        let resolver = CombatResolver::default();
        let plan = resolver.assign_damage(&game, &LayeredOracle, trampler, &[wall], AttackTarget::Player(p2), None);

        assert_eq!(plan.amount_to(DamageRecipient::Creature(wall)), 2);
        assert_eq!(plan.amount_to(DamageRecipient::Player(p2)), 4);
        assert_eq!(game.undo_log.len(), undo_len);
        assert_eq!(game.cards.get(wall).unwrap().damage, 0);
    }
}
