//! This module contains the board's startup configuration, the errors raised when that configuration is unusable, and
//! a trait for user-cyclable settings (implemented as enums).

use crate::analog::Smoothing;
use embassy_time::Duration;
use num_traits::{FromPrimitive, ToPrimitive};

/// A trait which allows infinite cycling of an enum's variants.
///
/// Useful for switch- or pulse-driven user interfaces, allowing each trigger to advance from the current to the next
/// variant, cycling back to the beginning when all variants have been exhausted.
pub trait CycleConfig {
    /// Return the next variant, cycling back to the beginning as needed.
    fn cycle(self) -> Self
    where
        Self: FromPrimitive + ToPrimitive + Sized,
    {
        let index = self
            .to_u8()
            .expect("enum variants should be castable to u8");
        match <Self as FromPrimitive>::from_u8(index + 1) {
            Some(new_selection) => new_selection,
            None => FromPrimitive::from_u8(0).expect("enum should not be empty"),
        }
    }
}

/// Reasons a [`Config`] is rejected at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The smoothing coefficient must lie in `[0, 1)`; NaN is rejected too.
    SmoothingOutOfRange,
    /// A zero-length debounce window would let contact bounce through as a burst of edges.
    ZeroDebounce,
    /// PWM outputs cannot run at 0 Hz.
    ZeroPwmFrequency,
    /// The switch's "down" threshold must sit below its "up" threshold, otherwise the middle position is unreachable.
    SwitchThresholdsInverted,
}

/// Settings read once at startup and handed to the components that need them.
///
/// The defaults describe the hardware as shipped; the firmware validates its configuration before touching any
/// peripheral so that a bad value aborts with a diagnostic instead of producing a board that misbehaves quietly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Weight given to the previous value of each analog channel when a new sample arrives.
    pub smoothing: f32,
    /// How long a pulse input ignores further falling edges after one is detected.
    pub debounce: Duration,
    /// Carrier frequency of the CV and LED PWM outputs.
    pub pwm_frequency_hz: u32,
    /// Raw switch readings above this are [`SwitchPosition::Up`][crate::computer::SwitchPosition::Up].
    pub switch_up_threshold: u16,
    /// Raw switch readings below this are [`SwitchPosition::Down`][crate::computer::SwitchPosition::Down].
    pub switch_down_threshold: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing: 0.3,
            debounce: Duration::from_millis(30),
            pwm_frequency_hz: 60_000,
            // 50% and 10% of full scale
            switch_up_threshold: 32_767,
            switch_down_threshold: 6_553,
        }
    }
}

impl Config {
    /// Checks every field, returning the configuration unchanged if it is usable.
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.smoothing()?;

        if self.debounce == Duration::from_ticks(0) {
            error!("Debounce window must be longer than zero");
            return Err(ConfigError::ZeroDebounce);
        }

        if self.pwm_frequency_hz == 0 {
            error!("PWM frequency must be greater than zero");
            return Err(ConfigError::ZeroPwmFrequency);
        }

        if self.switch_down_threshold >= self.switch_up_threshold {
            error!(
                "Switch down threshold ({}) must be below the up threshold ({})",
                self.switch_down_threshold,
                self.switch_up_threshold
            );
            return Err(ConfigError::SwitchThresholdsInverted);
        }

        Ok(self)
    }

    /// Returns the configured smoothing in the form the multiplexer consumes.
    pub fn smoothing(&self) -> Result<Smoothing, ConfigError> {
        Smoothing::new(self.smoothing).inspect_err(|_| {
            error!(
                "Smoothing coefficient {} is outside [0, 1)",
                self.smoothing
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_derive::{FromPrimitive, ToPrimitive};

    #[derive(Debug, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq)]
    enum Alpha {
        A,
        B,
        C,
    }
    impl CycleConfig for Alpha {}

    #[test]
    fn cycle() {
        let config = Alpha::A.cycle();
        assert_eq!(
            Alpha::B,
            config,
            "Should advance to next variant; expected left but got right"
        );

        let config = config.cycle();
        assert_eq!(
            Alpha::C,
            config,
            "Should advance to next variant; expected left but got right"
        );

        let config = config.cycle();
        assert_eq!(
            Alpha::A,
            config,
            "Should wrap around to first variant; expected left but got right"
        );
    }

    #[test]
    fn default_is_valid() {
        assert_eq!(
            Ok(Config::default()),
            Config::default().validate(),
            "Expected left but got right"
        );
    }

    #[test]
    fn rejects_smoothing_of_one() {
        let config = Config {
            smoothing: 1.0,
            ..Config::default()
        };
        assert_eq!(
            Err(ConfigError::SmoothingOutOfRange),
            config.validate(),
            "Expected left but got right"
        );
    }

    #[test]
    fn rejects_negative_and_nan_smoothing() {
        for smoothing in [-0.1, f32::NAN] {
            let config = Config {
                smoothing,
                ..Config::default()
            };
            assert_eq!(Err(ConfigError::SmoothingOutOfRange), config.validate());
        }
    }

    #[test]
    fn rejects_zero_debounce() {
        let config = Config {
            debounce: Duration::from_millis(0),
            ..Config::default()
        };
        assert_eq!(
            Err(ConfigError::ZeroDebounce),
            config.validate(),
            "Expected left but got right"
        );
    }

    #[test]
    fn rejects_zero_pwm_frequency() {
        let config = Config {
            pwm_frequency_hz: 0,
            ..Config::default()
        };
        assert_eq!(Err(ConfigError::ZeroPwmFrequency), config.validate());
    }

    #[test]
    fn rejects_inverted_switch_thresholds() {
        let config = Config {
            switch_up_threshold: 1_000,
            switch_down_threshold: 1_000,
            ..Config::default()
        };
        assert_eq!(
            Err(ConfigError::SwitchThresholdsInverted),
            config.validate(),
            "Expected left but got right"
        );
    }
}
