//! Error types for combat damage resolution

use crate::combat::DamageStep;
use crate::core::{CardId, EntityRef, PlayerId};
use crate::zones::Zone;
use thiserror::Error;

/// Errors returned by the combat damage core
#[derive(Error, Debug)]
pub enum CombatError {
    /// Rejected before any state was mutated
    #[error("Invalid combat configuration: {0}")]
    InvalidCombatConfiguration(#[from] InvalidConfiguration),

    /// An external hook failed while a damage step was running
    #[error("Hook {operation} failed during {step} for {subject}: {source}")]
    HookFailure {
        step: DamageStep,
        operation: HookOperation,
        subject: EntityRef,
        #[source]
        source: HookError,
    },

    #[error("Text-heuristic keyword oracle supplied but reduced-fidelity mode is disabled")]
    HeuristicOracleRejected,

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CombatError {
    /// Tag a hook error with where it happened, for use with `map_err`
    pub fn hook(
        step: DamageStep,
        operation: HookOperation,
        subject: impl Into<EntityRef>,
    ) -> impl FnOnce(HookError) -> CombatError {
        let subject = subject.into();
        move |source| CombatError::HookFailure {
            step,
            operation,
            subject,
            source,
        }
    }
}

/// Why a combat configuration was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfiguration {
    #[error("attacker {0} is not on the battlefield")]
    UnknownAttacker(CardId),

    #[error("blocker {blocker} of attacker {attacker} is not on the battlefield")]
    UnknownBlocker { attacker: CardId, blocker: CardId },

    #[error("attack target player {0} does not exist")]
    UnknownPlayer(PlayerId),

    #[error("attack target {0} is not on the battlefield")]
    UnknownTarget(CardId),

    #[error("attack target {target} is not a {expected}")]
    WrongTargetKind { target: CardId, expected: &'static str },

    #[error("attacker {0} is declared more than once")]
    DuplicateAttacker(CardId),

    #[error("attacker {0} is listed as its own blocker")]
    SelfBlock(CardId),

    #[error("attacking creature {blocker} is also declared as a blocker of {attacker}")]
    AttackerBlocks { attacker: CardId, blocker: CardId },

    #[error("blocker {blocker} is declared for both {first} and {second}")]
    BlockerReused {
        blocker: CardId,
        first: CardId,
        second: CardId,
    },

    #[error("damage assignment order for attacker {0} is not a permutation of its blockers")]
    BadAssignmentOrder(CardId),
}

/// The external hook that was being called when something went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOperation {
    Substitution,
    MarkDamage,
    AdjustLife,
    AdjustPoison,
    AdjustCounters,
    AdjustLoyalty,
    AdjustDefense,
    GainLife,
    MoveToZone,
    Regenerate,
    TriggerAbility,
}

impl std::fmt::Display for HookOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HookOperation::Substitution => "apply_substitution",
            HookOperation::MarkDamage => "mark_damage",
            HookOperation::AdjustLife => "adjust_life",
            HookOperation::AdjustPoison => "add_poison",
            HookOperation::AdjustCounters => "add_counters",
            HookOperation::AdjustLoyalty => "adjust_loyalty",
            HookOperation::AdjustDefense => "adjust_defense",
            HookOperation::GainLife => "gain_life",
            HookOperation::MoveToZone => "move_to_zone",
            HookOperation::Regenerate => "regenerate",
            HookOperation::TriggerAbility => "trigger_ability",
        };
        write!(f, "{name}")
    }
}

/// Errors raised by host implementations of the combat hooks
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Card {card} is not in {zone:?}")]
    NotInZone { card: CardId, zone: Zone },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;

/// Result type for host hook implementations
pub type HookResult<T> = std::result::Result<T, HookError>;
