//! Strongly-typed wrappers for game concepts
//!
//! Newtypes keep card names, player names, subtypes and counter kinds from
//! being mixed up with each other or with arbitrary strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Card subtype ("Aura", "Goblin", "Siege", ...)
    Subtype
);

string_newtype!(
    /// Counter kind placed on a permanent ("+1/+1", "-1/-1", "loyalty", "defense")
    CounterType
);

string_newtype!(
    /// Card name (distinct from other string types)
    CardName
);

string_newtype!(
    /// Player name (distinct from other string types)
    PlayerName
);

impl CounterType {
    pub fn plus_one_plus_one() -> Self {
        CounterType::new("+1/+1")
    }

    /// Placed by wither and infect damage to creatures
    pub fn minus_one_minus_one() -> Self {
        CounterType::new("-1/-1")
    }

    pub fn loyalty() -> Self {
        CounterType::new("loyalty")
    }

    /// Battles enter with defense counters; damage removes them
    pub fn defense() -> Self {
        CounterType::new("defense")
    }
}

impl Subtype {
    pub fn aura() -> Self {
        Subtype::new("Aura")
    }
}
