#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timed, tiered augments that race for priority and decay over time.
//!
//! Every augment definition gets one [`AugmentRuntime`], owned by the
//! [`AugmentRegistry`]. Runtimes are driven by commands (pickups, debug
//! requests, clock ticks) and report their lifecycle as [`Event`] values
//! consumed by UI and gameplay collaborators. The [`ShardMeter`] turns
//! absorbed shards into random augment grants.
//!
//! [`Event`]: simulacra_core::Event

mod registry;
mod runtime;
mod shards;

use simulacra_core::{AugmentId, DefinitionError, TierId};
use thiserror::Error;

pub use registry::{AugmentDraw, AugmentRegistry, RandomActivation};
pub use runtime::{ActivationOutcome, AugmentRuntime, AugmentState};
pub use shards::ShardMeter;

/// Errors reported while building or driving augments.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AugmentError {
    /// The augment definition is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// Two definitions share an identifier.
    #[error("augment {0:?} is defined more than once")]
    DuplicateAugment(AugmentId),
    /// No augment is registered under the identifier.
    #[error("augment {0:?} is not registered")]
    UnknownAugment(AugmentId),
    /// An augment lists a tier missing from the catalog.
    #[error("augment {augment:?} lists tier {tier:?} which the catalog does not define")]
    UnknownTier {
        /// Augment listing the tier.
        augment: AugmentId,
        /// Missing tier.
        tier: TierId,
    },
    /// A behaviour was bound to a tier the augment does not list.
    #[error("augment {augment:?} does not list tier {tier:?}")]
    TierNotListed {
        /// Augment receiving the behaviour.
        augment: AugmentId,
        /// Tier of the behaviour.
        tier: TierId,
    },
    /// The weighted draw failed to pick a tier.
    #[error("no tier selected after {attempts} weighted draws")]
    NoTierSelected {
        /// Number of draws attempted.
        attempts: u32,
    },
    /// No augment lists the drawn tier.
    #[error("no augment supports tier {0:?}")]
    NoAugmentForTier(TierId),
    /// A shard meter needs a positive, finite threshold.
    #[error("shard threshold must be positive, got {0}")]
    InvalidShardThreshold(f32),
}
