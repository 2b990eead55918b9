//! Core game types and entities

pub mod card;
pub mod entity;
pub mod keyword;
pub mod player;
pub mod types;

pub use card::{Card, CardType};
pub use entity::{CardId, EntityId, EntityRef, EntityStore, GameEntity, PlayerId};
pub use keyword::Keyword;
pub use player::{Player, POISON_LIMIT};
pub use types::{CardName, CounterType, PlayerName, Subtype};
