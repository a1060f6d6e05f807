//! Shard accumulation that grants augments on level-up.

use log::warn;
use simulacra_core::Event;

use crate::AugmentError;

const MAX_LEVEL_UPS_PER_ABSORB: u32 = 32;

/// Accumulates absorbed shard value toward the next augment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShardMeter {
    accumulated: f32,
    threshold: f32,
}

impl ShardMeter {
    /// Creates an empty meter levelling up once `threshold` is exceeded.
    pub fn new(threshold: f32) -> Result<Self, AugmentError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AugmentError::InvalidShardThreshold(threshold));
        }
        Ok(Self {
            accumulated: 0.0,
            threshold,
        })
    }

    /// Value accumulated toward the next level-up.
    #[must_use]
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Value that must be exceeded to level up.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Adds `value` and returns the number of level-ups it granted.
    ///
    /// The threshold must be strictly exceeded; the surplus carries over.
    /// A single absorb grants at most a bounded number of level-ups, the
    /// value past that bound is discarded.
    pub fn absorb(&mut self, value: f32, out: &mut Vec<Event>) -> u32 {
        if !value.is_finite() || value <= 0.0 {
            return 0;
        }

        let total = (self.accumulated + value).min(f32::MAX);
        let ratio = total / self.threshold;
        let earned = if ratio > 1.0 { ratio.ceil() - 1.0 } else { 0.0 };
        self.accumulated = (total - earned * self.threshold).clamp(0.0, self.threshold);

        let level_ups = if earned > MAX_LEVEL_UPS_PER_ABSORB as f32 {
            warn!("absorbing {value} shards earned {earned} level-ups, granting {MAX_LEVEL_UPS_PER_ABSORB}");
            MAX_LEVEL_UPS_PER_ABSORB
        } else {
            earned as u32
        };
        out.extend((0..level_ups).map(|_| Event::ShardLevelUp));

        out.push(Event::ShardValueChanged {
            accumulated: self.accumulated,
            threshold: self.threshold,
        });
        level_ups
    }
}
