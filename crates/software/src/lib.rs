//! This crate contains architecture-agnostic logic for the Music Thing Modular Workshop System
//! [Computer](https://www.musicthing.co.uk/workshopsystem/), a eurorack-style card with three knobs, a three-position
//! switch, two CV inputs and outputs, two pulse inputs and outputs, six LEDs and a two-channel SPI DAC.
//!
//! Hardware is reached only through [`embedded_hal`] traits, so everything here runs (and is tested) on the host.

#![deny(missing_docs)]
#![no_std]

// must come first so the logging macros are visible to the modules below
#[macro_use]
mod fmt;

/// Multiplexed analog inputs: the knobs, the switch and the CV inputs.
pub mod analog;

/// Voltage calibration for the CV output paths.
pub mod calibration;

/// The card as a whole, with named controls and outputs.
pub mod computer;

pub mod configuration;

/// The SPI DAC.
pub mod dac;

/// LED helpers and patterns.
pub mod lights;

/// Debounced edge detection on the pulse inputs.
pub mod pulse;

/// Graceful stopping of long-running loops.
pub mod shutdown;
