//! Keyword abilities that matter to combat damage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyword abilities consulted while assigning and applying combat damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Keyword {
    FirstStrike,
    DoubleStrike,
    Deathtouch,
    Trample,
    Lifelink,
    Infect,
    Wither,
    Indestructible,
    /// Carried by an Aura: destroy the Aura instead of the enchanted creature
    TotemArmor,
}

impl Keyword {
    pub const ALL: [Keyword; 9] = [
        Keyword::FirstStrike,
        Keyword::DoubleStrike,
        Keyword::Deathtouch,
        Keyword::Trample,
        Keyword::Lifelink,
        Keyword::Infect,
        Keyword::Wither,
        Keyword::Indestructible,
        Keyword::TotemArmor,
    ];

    /// The keyword as printed in oracle text (lowercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::FirstStrike => "first strike",
            Keyword::DoubleStrike => "double strike",
            Keyword::Deathtouch => "deathtouch",
            Keyword::Trample => "trample",
            Keyword::Lifelink => "lifelink",
            Keyword::Infect => "infect",
            Keyword::Wither => "wither",
            Keyword::Indestructible => "indestructible",
            Keyword::TotemArmor => "totem armor",
        }
    }

    pub fn parse(s: &str) -> Option<Keyword> {
        let lowered = s.trim().to_ascii_lowercase();
        Keyword::ALL.into_iter().find(|k| k.as_str() == lowered)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_keyword() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::parse(keyword.as_str()), Some(keyword));
        }
        assert_eq!(Keyword::parse("  Double Strike "), Some(Keyword::DoubleStrike));
        assert_eq!(Keyword::parse("flying"), None);
    }
}
