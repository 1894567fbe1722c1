//! Provides [`Smoothing`], the exponential moving average applied to every multiplexed analog channel.

use crate::configuration::ConfigError;

/// Fixed-point scale of the stored coefficient (Q16).
const ONE: u32 = 1 << 16;

/// An exponential moving average with a fixed coefficient.
///
/// Each update yields `s * previous + (1 - s) * raw`, where `s` is the weight of the previous value. The coefficient is
/// kept in Q16 fixed point so updates need no floating point on the hot path.
///
/// Rounding alone can stall a few codes short of a held input (e.g., with `s = 0.9`, a value one code away moves by
/// 0.1, which rounds to nothing), so whenever the rounded result equals `previous` while `raw` differs, the value is
/// moved one code toward `raw`. The result therefore always lies between `previous` and `raw` and reaches a constant
/// input exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Smoothing {
    /// Weight of the previous value, in 1/65536ths.
    retain: u32,
}

impl Smoothing {
    /// No smoothing at all: every sample replaces the previous value.
    pub const NONE: Self = Self { retain: 0 };

    /// Constructs a [`Smoothing`] from a coefficient in `[0, 1)`.
    pub fn new(coefficient: f32) -> Result<Self, ConfigError> {
        // written so that NaN fails the check
        if !(0.0..1.0).contains(&coefficient) {
            return Err(ConfigError::SmoothingOutOfRange);
        }

        let retain = (coefficient * ONE as f32) as u32;
        // coefficients a hair below 1.0 can round up to ONE in f32, which would freeze the channel
        Ok(Self {
            retain: retain.min(ONE - 1),
        })
    }

    /// Returns the smoothed value given the channel's `previous` value and a new `raw` sample.
    pub fn apply(&self, previous: u16, raw: u16) -> u16 {
        let weighted = self.retain * u32::from(previous) + (ONE - self.retain) * u32::from(raw);
        // round to nearest; the sum never exceeds 65535 * 65536, so adding half a code cannot overflow
        let next = ((weighted + ONE / 2) >> 16) as u16;

        if next == previous && previous != raw {
            if raw > previous {
                previous + 1
            } else {
                previous - 1
            }
        } else {
            next
        }
    }
}

impl Default for Smoothing {
    /// The coefficient the board ships with.
    fn default() -> Self {
        Self { retain: 19_660 } // 0.3
    }
}
