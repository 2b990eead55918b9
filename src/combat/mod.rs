//! Combat damage resolution
//!
//! Attackers and blockers have already been declared when this module runs.
//! It assigns combat damage, applies it through the host's substitution
//! hook, and repeatedly checks which permanents die as a result.
//!
//! Data flows one way per damage step:
//! configuration -> [`assignment`] -> [`application`] -> [`lethality`],
//! sequenced by [`resolver::CombatResolver`].

pub mod application;
pub mod assignment;
pub mod configuration;
pub mod hooks;
pub mod lethality;
pub mod oracle;
pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use application::{
    DamageApplier, DamageContribution, DamageEvent, DamageOutcome, DamageRecord, LifeGainEvent, LifelinkGain,
    StepDamageReport,
};
pub use assignment::{
    plan_attacker_damage, plan_blocker_damage, AssignmentOrder, AttackerAssignment, BlockerState,
    DamageAssignmentPlan, DamageRecipient,
};
pub use configuration::{AttackDeclaration, AttackTarget, CombatConfiguration};
pub use hooks::{
    CharacteristicResolver, CombatHost, CombatTrigger, GameMutator, PermanentSnapshot,
    SubstitutionHook, TriggerSink, ZoneChangeCause, ZoneMover,
};
pub use lethality::{LethalityOutcome, LethalityReason, LethalityResolver};
pub use oracle::{KeywordFlags, KeywordOracle, LayeredOracle, OracleFidelity, TextHeuristicOracle};
pub use resolver::{CombatPhase, CombatResolver, CombatResult, StepReport};

/// The two combat damage steps (MTG Rules 510.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageStep {
    FirstStrike,
    Regular,
}

impl DamageStep {
    pub fn is_first_strike(&self) -> bool {
        matches!(self, DamageStep::FirstStrike)
    }
}

impl fmt::Display for DamageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageStep::FirstStrike => write!(f, "first strike damage step"),
            DamageStep::Regular => write!(f, "combat damage step"),
        }
    }
}
