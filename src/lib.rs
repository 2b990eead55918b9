//! MTG combat damage resolution
//!
//! Resolves the combat damage steps of a Magic: The Gathering turn: assigns
//! each attacker's and blocker's damage, applies it through host-supplied
//! hooks (with substitution, lifelink, infect and wither), and finds the
//! permanents that die as a result. A first-strike step runs before the
//! regular step whenever any combatant has first strike or double strike.
//!
//! The core in [`combat`] talks to the game only through the hook traits in
//! [`combat::hooks`]. [`game::GameState`] implements all of them and can
//! rewind its mutations, which is what [`game::preview_combat`] builds on.

pub mod combat;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod undo;
pub mod zones;

pub use error::{CombatError, HookError, Result};
