//! Keyword queries against current characteristics
//!
//! [`LayeredOracle`] is the authoritative implementation: it asks the host's
//! characteristic resolver, so keywords granted or removed by continuous
//! effects are honored. [`TextHeuristicOracle`] scans printed oracle text
//! and is only meant for test doubles and tooling; the resolver refuses it
//! unless reduced-fidelity mode is explicitly enabled, and logs a warning
//! when it is.

use crate::combat::CharacteristicResolver;
use crate::core::{CardId, Keyword};

/// How trustworthy an oracle's answers are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleFidelity {
    Layered,
    TextHeuristic,
}

/// Answers "does permanent X currently have keyword K"
pub trait KeywordOracle: Send + Sync {
    fn has_keyword(&self, state: &dyn CharacteristicResolver, card: CardId, keyword: Keyword) -> bool;

    fn fidelity(&self) -> OracleFidelity;
}

/// Delegates to the host's layered characteristics
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredOracle;

impl KeywordOracle for LayeredOracle {
    fn has_keyword(&self, state: &dyn CharacteristicResolver, card: CardId, keyword: Keyword) -> bool {
        state.has_keyword(card, keyword)
    }

    fn fidelity(&self) -> OracleFidelity {
        OracleFidelity::Layered
    }
}

/// Reduced-fidelity oracle reading printed text
///
/// Recognizes keywords that appear as their own comma- or line-separated
/// item ("Flying, first strike"). Ignores every continuous effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextHeuristicOracle;

impl KeywordOracle for TextHeuristicOracle {
    fn has_keyword(&self, state: &dyn CharacteristicResolver, card: CardId, keyword: Keyword) -> bool {
        let Some(text) = state.oracle_text(card) else {
            return false;
        };
        text.lines()
            .flat_map(|line| line.split(','))
            .filter_map(Keyword::parse)
            .any(|k| k == keyword)
    }

    fn fidelity(&self) -> OracleFidelity {
        OracleFidelity::TextHeuristic
    }
}

/// The combat-relevant keywords of one permanent, read once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordFlags {
    pub first_strike: bool,
    pub double_strike: bool,
    pub deathtouch: bool,
    pub trample: bool,
    pub lifelink: bool,
    pub infect: bool,
    pub wither: bool,
}

impl KeywordFlags {
    pub fn read(oracle: &dyn KeywordOracle, state: &dyn CharacteristicResolver, card: CardId) -> Self {
        let has = |keyword| oracle.has_keyword(state, card, keyword);
        KeywordFlags {
            first_strike: has(Keyword::FirstStrike),
            double_strike: has(Keyword::DoubleStrike),
            deathtouch: has(Keyword::Deathtouch),
            trample: has(Keyword::Trample),
            lifelink: has(Keyword::Lifelink),
            infect: has(Keyword::Infect),
            wither: has(Keyword::Wither),
        }
    }

    /// First strike or double strike
    pub fn strikes_first(&self) -> bool {
        self.first_strike || self.double_strike
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;

    #[test]
    fn test_layered_oracle_sees_granted_and_removed_keywords() {
        let mut game = GameState::new_two_player("P1", "P2", 20);
        let p1 = game.players[0].id;
        let bear = game.create_creature(p1, "Grizzly Bears", 2, 2, &[]);

        let card = game.cards.get_mut(bear).unwrap();
        card.text = "Trample".to_string();
        card.grant_keyword(Keyword::Lifelink);

        let oracle = LayeredOracle;
        assert!(oracle.has_keyword(&game, bear, Keyword::Lifelink));
        // Printed trample was removed by an effect: layered view says no
        assert!(!oracle.has_keyword(&game, bear, Keyword::Trample));
        assert_eq!(oracle.fidelity(), OracleFidelity::Layered);
    }

    #[test]
    fn test_text_heuristic_reads_printed_keywords_only() {
        let mut game = GameState::new_two_player("P1", "P2", 20);
        let p1 = game.players[0].id;
        let knight = game.create_creature(p1, "White Knight", 2, 2, &[Keyword::Lifelink]);
        game.cards.get_mut(knight).unwrap().text =
            "First strike, protection from black\nTrample".to_string();

        let oracle = TextHeuristicOracle;
        assert!(oracle.has_keyword(&game, knight, Keyword::FirstStrike));
        assert!(oracle.has_keyword(&game, knight, Keyword::Trample));
        assert!(!oracle.has_keyword(&game, knight, Keyword::DoubleStrike));
        // Granted keyword is invisible to the heuristic
        assert!(!oracle.has_keyword(&game, knight, Keyword::Lifelink));
        assert_eq!(oracle.fidelity(), OracleFidelity::TextHeuristic);
    }

    #[test]
    fn test_keyword_flags() {
        let mut game = GameState::new_two_player("P1", "P2", 20);
        let p1 = game.players[0].id;
        let id = game.create_creature(p1, "Blightsteel", 3, 3, &[Keyword::DoubleStrike, Keyword::Wither]);

        let flags = KeywordFlags::read(&LayeredOracle, &game, id);
        assert!(flags.strikes_first());
        assert!(flags.wither && !flags.infect);
        assert!(!flags.trample);
    }
}
