//! What-if combat evaluation
//!
//! `preview_combat` resolves a configuration for real and then rewinds the
//! state through the undo log. `preview_many` fans several configurations
//! out over rayon, one cloned state each.

use crate::combat::{CombatConfiguration, CombatResolver, CombatResult, KeywordOracle};
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::game::{GameLogger, GameState, VerbosityLevel};
use rayon::prelude::*;

fn silent_resolver(config: &ResolverConfig) -> CombatResolver {
    CombatResolver::with_logger(config.clone(), GameLogger::with_verbosity(VerbosityLevel::Silent))
}

/// Resolve `combat` against `game` and leave `game` as it was
///
/// With the undo log disabled the preview runs on a clone instead.
pub fn preview_combat(
    game: &mut GameState,
    config: &ResolverConfig,
    oracle: &dyn KeywordOracle,
    combat: &CombatConfiguration,
) -> Result<CombatResult> {
    let mut resolver = silent_resolver(config);
    let mut combat = combat.clone();

    if !game.undo_log.is_enabled() {
        let mut scratch = game.clone();
        return resolver.resolve_combat(&mut scratch, oracle, &mut combat);
    }

    let checkpoint = game.checkpoint();
    let result = resolver.resolve_combat(game, oracle, &mut combat);
    game.rewind_to(checkpoint);
    result
}

/// Preview each configuration against its own copy of `game`, in parallel
///
/// Results come back in the order of `configs`.
pub fn preview_many(
    game: &GameState,
    config: &ResolverConfig,
    oracle: &dyn KeywordOracle,
    configs: &[CombatConfiguration],
) -> Vec<Result<CombatResult>> {
    let states: Vec<GameState> = configs.iter().map(|_| game.clone()).collect();
    states
        .into_par_iter()
        .zip(configs.par_iter())
        .map(|(mut state, combat)| {
            let mut resolver = silent_resolver(config);
            let mut combat = combat.clone();
            resolver.resolve_combat(&mut state, oracle, &mut combat)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{AttackTarget, LayeredOracle};
    use crate::core::Keyword;
    use crate::undo::UndoLog;

    fn board() -> (GameState, CombatConfiguration) {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        let giant = game.create_creature(p1, "Hill Giant", 3, 3, &[Keyword::Lifelink]);
        let bear = game.create_creature(p2, "Grizzly Bears", 2, 2, &[]);
        let mut combat = CombatConfiguration::new();
        combat.declare_attacker(giant, AttackTarget::Player(p2));
        combat.declare_blocker(bear, giant);
        (game, combat)
    }

    #[test]
    fn test_preview_leaves_state_untouched() {
        let (mut game, combat) = board();
        let bear = combat.blockers_list()[0];
        let before = serde_json::to_string(&game).unwrap();

        let result = preview_combat(&mut game, &ResolverConfig::default(), &LayeredOracle, &combat).unwrap();

        assert_eq!(result.blockers_died, vec![bear]);
        assert_eq!(result.life_gained, 3);
        assert_eq!(serde_json::to_string(&game).unwrap(), before);
        assert!(game.undo_log.is_empty());
    }

    #[test]
    fn test_preview_without_undo_log_uses_clone() {
        let (mut game, combat) = board();
        game.undo_log = UndoLog::disabled();

        let result = preview_combat(&mut game, &ResolverConfig::default(), &LayeredOracle, &combat).unwrap();

        assert_eq!(result.blockers_died.len(), 1);
        assert!(!game.combat_damage_dealt);
        assert_eq!(game.battlefield.len(), 2);
    }

    #[test]
    fn test_preview_many_keeps_order() {
        let (game, blocked) = board();
        let giant = blocked.attackers()[0];
        let p2 = game.players[1].id;
        let mut unblocked = CombatConfiguration::new();
        unblocked.declare_attacker(giant, AttackTarget::Player(p2));
        let configs = vec![unblocked, blocked, CombatConfiguration::new()];

        let results = preview_many(&game, &ResolverConfig::default(), &LayeredOracle, &configs);

        let damage: Vec<u32> = results.iter().map(|r| r.as_ref().unwrap().damage_to_defender).collect();
        assert_eq!(damage, vec![3, 0, 0]);
        assert!(!game.combat_damage_dealt);
    }
}
