//! Maps a motor counter to the values written to its two polarity pins.
//!
//! Counter magnitudes at or above the deceleration cutoff saturate at full
//! output. Below the cutoff the output drops by `FULL_OUTPUT / cutoff` per
//! unit of magnitude, truncated to an integer.
use core::cmp::Ordering;

/// Maximum value of a pin write
pub const FULL_OUTPUT: u8 = 255;

/// Counter magnitude at which deceleration begins
pub const DEFAULT_DECELERATION_CUTOFF: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationMapper {
    /// Magnitudes at or above this value write full output
    deceleration_cutoff: u32,
}

/// Output values for one decay round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actuation {
    pub positive: u8,
    pub negative: u8,
}

impl Actuation {
    pub const IDLE: Self = Self {
        positive: 0,
        negative: 0,
    };

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

impl ActuationMapper {
    pub fn new(deceleration_cutoff: u32) -> Self {
        Self {
            deceleration_cutoff,
        }
    }

    pub fn map(&self, counter: i32) -> Actuation {
        let magnitude = counter.unsigned_abs();
        match counter.cmp(&0) {
            Ordering::Greater => Actuation {
                positive: self.scale(magnitude),
                negative: 0,
            },
            Ordering::Less => Actuation {
                positive: 0,
                negative: self.scale(magnitude),
            },
            Ordering::Equal => Actuation::IDLE,
        }
    }

    fn scale(&self, magnitude: u32) -> u8 {
        if magnitude >= self.deceleration_cutoff {
            return FULL_OUTPUT;
        }

        // 255 - diff * (255 / cutoff), truncated. Computed in integers as
        // 255 minus the product rounded up, so a rate of 5.1 stays exact.
        let cutoff = u64::from(self.deceleration_cutoff);
        let diff = u64::from(self.deceleration_cutoff - magnitude);
        let full = u64::from(FULL_OUTPUT);
        let drop = (diff * full + cutoff - 1) / cutoff;
        full.saturating_sub(drop) as u8
    }
}

impl Default for ActuationMapper {
    fn default() -> Self {
        Self::new(DEFAULT_DECELERATION_CUTOFF)
    }
}
