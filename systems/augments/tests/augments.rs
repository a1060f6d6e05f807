use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use simulacra_core::{AugmentDefinition, AugmentId, Command, Event, TierBehaviour, TierDefinition, TierId};
use simulacra_system_augments::{
    ActivationOutcome, AugmentError, AugmentRegistry, AugmentState, ShardMeter,
};
use simulacra_system_tier_catalog::TierCatalog;

const BRONZE: TierId = TierId::new(1);
const SILVER: TierId = TierId::new(2);
const GOLD: TierId = TierId::new(3);

const HASTE: AugmentId = AugmentId::new(10);
const SHIELD: AugmentId = AugmentId::new(11);

fn catalog() -> TierCatalog {
    TierCatalog::new(vec![
        TierDefinition::new(BRONZE, "bronze", 0.6),
        TierDefinition::new(SILVER, "silver", 0.3)
            .with_priority(1)
            .with_level_down(BRONZE),
        TierDefinition::new(GOLD, "gold", 0.1).with_priority(2),
    ])
    .expect("valid catalog")
}

fn registry() -> AugmentRegistry {
    registry_with(Vec::new())
}

/// Registry where every listed tier has a behaviour, so pickups never fail.
fn fully_bound_registry() -> AugmentRegistry {
    registry_with(vec![(HASTE, TierBehaviour::new(GOLD, "haste_gold"))])
}

fn registry_with(extra: Vec<(AugmentId, TierBehaviour)>) -> AugmentRegistry {
    let mut bindings = vec![
        (HASTE, TierBehaviour::new(BRONZE, "haste_bronze")),
        (HASTE, TierBehaviour::new(SILVER, "haste_silver")),
        (SHIELD, TierBehaviour::new(BRONZE, "shield_bronze")),
        (SHIELD, TierBehaviour::new(SILVER, "shield_silver")),
    ];
    bindings.extend(extra);

    AugmentRegistry::new(
        catalog(),
        vec![
            AugmentDefinition::new(HASTE, "haste", 1.0, vec![BRONZE, SILVER, GOLD]),
            AugmentDefinition::new(SHIELD, "shield", 4.0, vec![BRONZE, SILVER]),
        ],
        bindings,
    )
    .expect("valid registry")
}

fn behaviour_activated(tier: TierId, effect: &str) -> Event {
    Event::TierBehaviourActivated {
        augment: HASTE,
        tier,
        effect: effect.to_owned(),
    }
}

fn behaviour_deactivated(tier: TierId, effect: &str) -> Event {
    Event::TierBehaviourDeactivated {
        augment: HASTE,
        tier,
        effect: effect.to_owned(),
    }
}

fn count_deactivations(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::AugmentDeactivated { .. }))
        .count()
}

#[test]
fn first_activation_fires_the_full_activation_pass() {
    let mut registry = registry();
    let mut events = Vec::new();

    let outcome = registry
        .activate(HASTE, BRONZE, &mut events)
        .expect("known augment");

    assert_eq!(outcome, ActivationOutcome::Activated { tier: BRONZE });
    assert_eq!(
        events,
        vec![
            Event::AugmentFirstActivated { augment: HASTE },
            Event::AugmentTierChanged {
                augment: HASTE,
                tier: BRONZE,
            },
            Event::AnyTierActivated { augment: HASTE },
            behaviour_activated(BRONZE, "haste_bronze"),
            Event::TierAnnounced {
                augment: HASTE,
                tier: BRONZE,
            },
        ]
    );

    let runtime = registry.runtime(HASTE).expect("registered");
    assert_eq!(runtime.state(), AugmentState::Active(BRONZE));
    assert!(runtime.is_counting_down());
}

#[test]
fn lower_priority_pickup_keeps_the_active_tier_and_resets_the_countdown() {
    let mut registry = registry();
    let mut events = Vec::new();
    let _ = registry
        .activate(HASTE, SILVER, &mut events)
        .expect("known augment");
    registry.tick(Duration::from_millis(500), &mut events);
    events.clear();

    let outcome = registry
        .activate(HASTE, BRONZE, &mut events)
        .expect("known augment");

    assert_eq!(outcome, ActivationOutcome::Absorbed { kept: SILVER });
    assert_eq!(
        events,
        vec![
            Event::AnyTierDeactivated { augment: HASTE },
            behaviour_deactivated(SILVER, "haste_silver"),
            Event::AnyTierActivated { augment: HASTE },
            behaviour_activated(SILVER, "haste_silver"),
            Event::TierAnnounced {
                augment: HASTE,
                tier: SILVER,
            },
        ]
    );

    let runtime = registry.runtime(HASTE).expect("registered");
    assert_eq!(runtime.active_tier(), Some(SILVER));
    assert!((runtime.remaining_progress() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn equal_or_higher_priority_pickup_replaces_the_active_tier() {
    let mut registry = registry();
    let mut events = Vec::new();
    let _ = registry
        .activate(HASTE, BRONZE, &mut events)
        .expect("known augment");
    events.clear();

    let outcome = registry
        .activate(HASTE, SILVER, &mut events)
        .expect("known augment");

    assert_eq!(outcome, ActivationOutcome::Activated { tier: SILVER });
    assert!(events.contains(&Event::AugmentTierChanged {
        augment: HASTE,
        tier: SILVER,
    }));
    assert!(!events.contains(&Event::AugmentFirstActivated { augment: HASTE }));
}

#[test]
fn expiry_levels_down_without_ending_the_augment() {
    let mut registry = registry();
    let mut events = Vec::new();
    let _ = registry
        .activate(HASTE, SILVER, &mut events)
        .expect("known augment");
    events.clear();

    registry.tick(Duration::from_secs(1), &mut events);

    assert_eq!(count_deactivations(&events), 0);
    assert!(events.contains(&Event::AugmentTierChanged {
        augment: HASTE,
        tier: BRONZE,
    }));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::TierAnnounced { .. })),
        "automatic level-downs are not announced"
    );
    assert_eq!(
        registry.runtime(HASTE).expect("registered").active_tier(),
        Some(BRONZE)
    );

    events.clear();
    registry.tick(Duration::from_secs(1), &mut events);
    assert_eq!(count_deactivations(&events), 1);
    assert_eq!(
        registry.runtime(HASTE).expect("registered").state(),
        AugmentState::Inactive
    );

    events.clear();
    registry.tick(Duration::from_secs(1), &mut events);
    assert!(events.is_empty(), "an ended augment stops counting down");
}

#[test]
fn cyclic_level_down_chain_ends_after_catalog_size_steps() {
    let first = TierId::new(1);
    let second = TierId::new(2);
    let catalog = TierCatalog::new(vec![
        TierDefinition::new(first, "ember", 0.5).with_level_down(second),
        TierDefinition::new(second, "ash", 0.5).with_level_down(first),
    ])
    .expect("cycles are allowed");
    let mut registry = AugmentRegistry::new(
        catalog,
        vec![AugmentDefinition::new(HASTE, "haste", 1.0, vec![first, second])],
        vec![
            (HASTE, TierBehaviour::new(first, "ember")),
            (HASTE, TierBehaviour::new(second, "ash")),
        ],
    )
    .expect("valid registry");

    let mut events = Vec::new();
    let _ = registry
        .activate(HASTE, first, &mut events)
        .expect("known augment");
    for _ in 0..5 {
        registry.tick(Duration::from_secs(1), &mut events);
    }

    assert_eq!(count_deactivations(&events), 1);
    let level_downs = events
        .iter()
        .filter(|event| matches!(event, Event::AugmentTierChanged { .. }))
        .count();
    assert_eq!(level_downs, 3, "one pickup plus two automatic level-downs");
    assert!(!registry.runtime(HASTE).expect("registered").is_active());
}

#[test]
fn unbound_tier_cancels_an_active_augment() {
    let mut registry = registry();
    let mut events = Vec::new();
    let _ = registry
        .activate(HASTE, BRONZE, &mut events)
        .expect("known augment");
    events.clear();

    let outcome = registry
        .activate(HASTE, GOLD, &mut events)
        .expect("known augment");

    assert_eq!(outcome, ActivationOutcome::Cancelled);
    assert_eq!(
        events,
        vec![
            Event::AnyTierDeactivated { augment: HASTE },
            behaviour_deactivated(BRONZE, "haste_bronze"),
            Event::AugmentDeactivated { augment: HASTE },
        ]
    );
    let runtime = registry.runtime(HASTE).expect("registered");
    assert!(!runtime.is_active());
    assert!(!runtime.is_counting_down());
}

#[test]
fn unbound_tier_is_rejected_on_an_inactive_augment() {
    let mut registry = registry();
    let mut events = Vec::new();
    let outcome = registry
        .activate(HASTE, GOLD, &mut events)
        .expect("known augment");
    assert_eq!(outcome, ActivationOutcome::Rejected);
    assert!(events.is_empty());
}

#[test]
fn unknown_augments_are_reported() {
    let mut registry = registry();
    let mut events = Vec::new();
    let missing = AugmentId::new(99);
    assert_eq!(
        registry.activate(missing, BRONZE, &mut events),
        Err(AugmentError::UnknownAugment(missing))
    );
    assert_eq!(
        registry.deactivate(missing, &mut events),
        Err(AugmentError::UnknownAugment(missing))
    );
    assert!(events.is_empty());
}

#[test]
fn invalid_registries_are_refused() {
    let duplicate = AugmentRegistry::new(
        catalog(),
        vec![
            AugmentDefinition::new(HASTE, "haste", 1.0, vec![BRONZE]),
            AugmentDefinition::new(HASTE, "haste again", 1.0, vec![BRONZE]),
        ],
        Vec::new(),
    );
    assert_eq!(duplicate.err(), Some(AugmentError::DuplicateAugment(HASTE)));

    let unknown_tier = AugmentRegistry::new(
        catalog(),
        vec![AugmentDefinition::new(HASTE, "haste", 1.0, vec![TierId::new(42)])],
        Vec::new(),
    );
    assert_eq!(
        unknown_tier.err(),
        Some(AugmentError::UnknownTier {
            augment: HASTE,
            tier: TierId::new(42),
        })
    );

    let zero_duration = AugmentRegistry::new(
        catalog(),
        vec![AugmentDefinition::new(HASTE, "haste", 0.0, vec![BRONZE])],
        Vec::new(),
    );
    assert!(matches!(zero_duration, Err(AugmentError::Definition(_))));
}

#[test]
fn tier_index_lists_supporting_augments() {
    let registry = registry();
    assert_eq!(registry.augments_for_tier(BRONZE), &[HASTE, SHIELD]);
    assert_eq!(registry.augments_for_tier(GOLD), &[HASTE]);
    assert!(registry.augments_for_tier(TierId::new(42)).is_empty());
}

#[test]
fn failed_draws_surface_as_errors() {
    let catalog = TierCatalog::new(vec![TierDefinition::new(BRONZE, "bronze", 0.0)])
        .expect("valid catalog");
    let mut registry = AugmentRegistry::new(
        catalog,
        vec![AugmentDefinition::new(HASTE, "haste", 1.0, vec![BRONZE])],
        vec![(HASTE, TierBehaviour::new(BRONZE, "haste_bronze"))],
    )
    .expect("valid registry");

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut events = Vec::new();
    assert_eq!(
        registry.activate_random(&mut rng, &mut events),
        Err(AugmentError::NoTierSelected { attempts: 3 })
    );
    assert!(events.is_empty());
}

#[test]
fn drawn_tier_without_augments_is_reported() {
    let catalog = TierCatalog::new(vec![TierDefinition::new(GOLD, "gold", 1.0)])
        .expect("valid catalog");
    let mut registry =
        AugmentRegistry::new(catalog, Vec::new(), Vec::new()).expect("empty registry");

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut events = Vec::new();
    assert_eq!(
        registry.activate_random(&mut rng, &mut events),
        Err(AugmentError::NoAugmentForTier(GOLD))
    );
}

#[test]
fn random_activation_targets_an_augment_supporting_the_drawn_tier() {
    let mut registry = fully_bound_registry();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for _ in 0..32 {
        let mut events = Vec::new();
        let activation = registry
            .activate_random(&mut rng, &mut events)
            .expect("catalog always yields a tier");
        assert!(registry
            .augments_for_tier(activation.tier)
            .contains(&activation.augment));
        registry.tick(Duration::from_secs(10), &mut events);
    }
}

#[test]
fn crystals_hold_their_draw_until_opened() {
    let mut registry = fully_bound_registry();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let crystal = registry.draw(&mut rng).expect("catalog always yields a tier");
    assert!(registry.augments_for_tier(crystal.tier).contains(&crystal.augment));
    assert!(registry.runtimes().all(|runtime| !runtime.is_active()));

    let mut events = Vec::new();
    registry.handle(
        &[Command::OpenCrystal {
            augment: crystal.augment,
            tier: crystal.tier,
        }],
        &mut rng,
        &mut events,
    );

    let runtime = registry.runtime(crystal.augment).expect("drawn augment exists");
    assert_eq!(runtime.state(), AugmentState::Active(crystal.tier));
    assert!(events.contains(&Event::TierAnnounced {
        augment: crystal.augment,
        tier: crystal.tier,
    }));
}

#[test]
fn shard_level_ups_grant_random_augments_through_commands() {
    let mut registry = fully_bound_registry();
    let mut meter = ShardMeter::new(5.0).expect("positive threshold");
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut events = Vec::new();

    let level_ups = meter.absorb(11.0, &mut events);
    let commands = vec![Command::ActivateRandomAugment; level_ups as usize];
    registry.handle(&commands, &mut rng, &mut events);

    assert_eq!(level_ups, 2);
    let pickups = events
        .iter()
        .filter(|event| matches!(event, Event::TierAnnounced { .. }))
        .count();
    assert_eq!(pickups, 2);
}

#[test]
fn deterministic_replay_produces_identical_event_logs() {
    let first = replay(42);
    let second = replay(42);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert!(!first.is_empty());
}

fn replay(seed: u64) -> Vec<Event> {
    let mut registry = registry();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut events = Vec::new();

    let script = [
        Command::ActivateRandomAugment,
        Command::Tick {
            dt: Duration::from_millis(250),
        },
        Command::ActivateAugment {
            augment: SHIELD,
            tier: SILVER,
        },
        Command::ActivateRandomAugment,
        Command::Tick {
            dt: Duration::from_millis(750),
        },
        Command::DeactivateAugment { augment: SHIELD },
        Command::ActivateRandomAugment,
        Command::Tick {
            dt: Duration::from_secs(2),
        },
    ];
    for command in script {
        registry.handle(&[command], &mut rng, &mut events);
    }
    events
}

fn fingerprint(events: &[Event]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for event in events {
        format!("{event:?}").hash(&mut hasher);
    }
    hasher.finish()
}
