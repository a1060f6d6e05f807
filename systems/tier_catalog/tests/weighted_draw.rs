use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use simulacra_core::{TierDefinition, TierId};
use simulacra_system_tier_catalog::TierCatalog;

const DRAWS: usize = 100_000;

fn histogram(catalog: &TierCatalog, seed: u64) -> HashMap<TierId, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = HashMap::new();
    for _ in 0..DRAWS {
        let tier = catalog
            .draw_weighted_tier(&mut rng)
            .expect("weights are positive");
        *counts.entry(tier).or_insert(0usize) += 1;
    }
    counts
}

#[test]
fn selection_frequency_tracks_weights() {
    let catalog = TierCatalog::new(vec![
        TierDefinition::new(TierId::new(1), "common", 0.7),
        TierDefinition::new(TierId::new(2), "rare", 0.25),
        TierDefinition::new(TierId::new(3), "legendary", 0.05),
    ])
    .expect("valid catalog");

    let counts = histogram(&catalog, 0x5eed_1234);
    for tier in catalog.iter() {
        let observed = counts.get(&tier.id).copied().unwrap_or(0) as f64 / DRAWS as f64;
        let expected = f64::from(tier.probability);
        assert!(
            (observed - expected).abs() < 0.01,
            "tier {} drawn {observed:.4}, expected {expected:.4}",
            tier.name
        );
    }
}

#[test]
fn weights_are_normalised_by_their_live_sum() {
    let catalog = TierCatalog::new(vec![
        TierDefinition::new(TierId::new(1), "low", 0.2),
        TierDefinition::new(TierId::new(2), "high", 0.6),
    ])
    .expect("valid catalog");

    let counts = histogram(&catalog, 42);
    let low = counts.get(&TierId::new(1)).copied().unwrap_or(0) as f64 / DRAWS as f64;
    assert!((low - 0.25).abs() < 0.01, "low tier drawn {low:.4}");
}

#[test]
fn zero_weight_tiers_are_never_drawn() {
    let catalog = TierCatalog::new(vec![
        TierDefinition::new(TierId::new(1), "only", 1.0),
        TierDefinition::new(TierId::new(2), "disabled", 0.0),
    ])
    .expect("valid catalog");

    let counts = histogram(&catalog, 7);
    assert_eq!(counts.get(&TierId::new(2)), None);
    assert_eq!(counts.get(&TierId::new(1)), Some(&DRAWS));
}

#[test]
fn seeded_draws_replay_identically() {
    let catalog = TierCatalog::new(vec![
        TierDefinition::new(TierId::new(1), "a", 0.5),
        TierDefinition::new(TierId::new(2), "b", 0.5),
    ])
    .expect("valid catalog");

    let draw = |seed| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..64)
            .map(|_| catalog.draw_weighted_tier(&mut rng))
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(99), draw(99));
}
