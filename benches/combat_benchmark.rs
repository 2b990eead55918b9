//! Performance benchmarks for combat damage resolution
//!
//! Two iteration modes:
//!
//! 1. **Fresh** - Clone the prepared board for each iteration and resolve
//! 2. **Rewind** - Resolve in place, then rewind through the undo log
//!
//! plus a batch preview of several blocking configurations in parallel.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mtg_combat_damage::combat::{AttackTarget, CombatConfiguration, CombatResolver, LayeredOracle};
use mtg_combat_damage::config::ResolverConfig;
use mtg_combat_damage::core::{CardId, Keyword};
use mtg_combat_damage::game::{preview_many, GameState, VerbosityLevel};

/// A board with `width` attackers, each blocked by two creatures
fn wide_board(width: usize) -> (GameState, CombatConfiguration) {
    let mut game = GameState::new_two_player("Attacker", "Defender", 1000);
    let (p1, p2) = (game.players[0].id, game.players[1].id);
    let keyword_sets: [&[Keyword]; 4] = [
        &[],
        &[Keyword::Trample],
        &[Keyword::FirstStrike, Keyword::Deathtouch],
        &[Keyword::DoubleStrike, Keyword::Lifelink],
    ];

    let mut combat = CombatConfiguration::new();
    for i in 0..width {
        let attacker = game.create_creature(p1, &format!("Attacker {i}"), 4, 4, keyword_sets[i % 4]);
        combat.declare_attacker(attacker, AttackTarget::Player(p2));
        for j in 0..2 {
            let blocker = game.create_creature(p2, &format!("Blocker {i}.{j}"), 1 + j as i32, 2, &[]);
            combat.declare_blocker(blocker, attacker);
        }
    }
    (game, combat)
}

fn silent_config() -> ResolverConfig {
    ResolverConfig {
        verbosity: VerbosityLevel::Silent,
        ..ResolverConfig::default()
    }
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_combat");

    for width in [4, 16, 64] {
        let (game, combat) = wide_board(width);

        group.bench_with_input(BenchmarkId::new("fresh", width), &width, |b, _| {
            b.iter(|| {
                let mut game = game.clone();
                let mut combat = combat.clone();
                let mut resolver = CombatResolver::new(silent_config());
                black_box(resolver.resolve_combat(&mut game, &LayeredOracle, &mut combat))
            })
        });

        let mut rewound = game.clone();
        group.bench_with_input(BenchmarkId::new("rewind", width), &width, |b, _| {
            b.iter(|| {
                let checkpoint = rewound.checkpoint();
                let mut combat = combat.clone();
                let mut resolver = CombatResolver::new(silent_config());
                let result = resolver.resolve_combat(&mut rewound, &LayeredOracle, &mut combat);
                rewound.rewind_to(checkpoint);
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_preview_many(c: &mut Criterion) {
    let (game, combat) = wide_board(16);
    let config = silent_config();

    // Same attack, each variant drops a different attacker's blockers
    let configs: Vec<CombatConfiguration> = combat
        .attackers()
        .into_iter()
        .map(|attacker: CardId| {
            let mut variant = combat.clone();
            for blocker in variant.get_blockers(attacker) {
                variant.remove_from_combat(blocker);
            }
            variant
        })
        .collect();

    c.bench_function("preview_many/16x16", |b| {
        b.iter(|| black_box(preview_many(&game, &config, &LayeredOracle, &configs)))
    });
}

criterion_group!(benches, bench_resolve, bench_preview_many);
criterion_main!(benches);
