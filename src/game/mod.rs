//! Reference game state and the services around it

pub mod logger;
pub mod preview;
pub mod replacement;
pub mod state;

pub use logger::{GameLogger, LogEntry, OutputFormat, OutputMode, VerbosityLevel};
pub use preview::{preview_combat, preview_many};
pub use replacement::{ReplacementEffect, ReplacementRegistry};
pub use state::GameState;
