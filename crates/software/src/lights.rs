//! Helpers for showing things on the six front-panel LEDs.

use crate::{computer::SwitchPosition, configuration::CycleConfig};
use embassy_time::{Duration, Instant};
use num_derive::{FromPrimitive, ToPrimitive};

/// Number of LEDs on the front panel.
pub const LED_COUNT: usize = 6;

/// Largest number [`binary_frame()`] can show.
pub const MAX_BINARY: u8 = (1 << LED_COUNT) - 1;

/// Simple perceptual correction: squares the brightness so low settings are not washed out.
pub fn gamma_correct(x: u16) -> u16 {
    (u32::from(x) * u32::from(x) / u32::from(u16::MAX)) as u16
}

/// Lights LED `i` when bit `i` of `n` is set. Bits beyond the sixth are not shown.
pub fn binary_frame(n: u8) -> [bool; LED_COUNT] {
    core::array::from_fn(|i| n & (1 << i) != 0)
}

const SPINNER: &[&[usize]] = &[&[0], &[1], &[3], &[5], &[4], &[2]];
const PING_PONG: &[&[usize]] = &[&[0, 4, 2], &[1, 3, 5]];
const RED_ARROWS: &[&[usize]] = &[&[0, 3, 4], &[1, 2, 5]];

/// Animations played by lighting groups of LEDs one frame at a time.
#[derive(Debug, Clone, Copy, PartialEq, ToPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightPattern {
    /// One LED at a time, going around the panel.
    Spinner,
    /// Alternates between the diagonals.
    PingPong,
    /// Alternates between two arrowheads.
    RedArrows,
}

impl LightPattern {
    /// Number of patterns.
    pub const COUNT: usize = 3;

    /// Returns the LEDs lit in each frame, in order.
    pub fn frames(self) -> &'static [&'static [usize]] {
        match self {
            LightPattern::Spinner => SPINNER,
            LightPattern::PingPong => PING_PONG,
            LightPattern::RedArrows => RED_ARROWS,
        }
    }

    /// Returns the LED states of one frame.
    pub fn frame(self, n: usize) -> [bool; LED_COUNT] {
        let frames = self.frames();
        let lit = frames[n % frames.len()];
        core::array::from_fn(|i| lit.contains(&i))
    }
}

impl CycleConfig for LightPattern {}

/// How often a held-up switch adds one to a [`SwitchCounter`].
pub const COUNT_PERIOD: Duration = Duration::from_millis(500);

/// Counts while the switch is held up, and resets when it is pushed down.
///
/// Moving the switch up counts once straight away and then once per [`COUNT_PERIOD`] for as long as it stays up. The
/// down position is momentary, so it is acted on at every update, however short the press.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchCounter {
    count: u8,
    /// When the count last went up, while the switch has been up since.
    last_step: Option<Instant>,
}

impl SwitchCounter {
    /// Constructs a [`SwitchCounter`] at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one reading of the switch taken at `now`; returns the new count if it changed.
    ///
    /// The count saturates at [`MAX_BINARY`] so it always fits on the LEDs.
    pub fn update(&mut self, position: SwitchPosition, now: Instant) -> Option<u8> {
        let next = match position {
            SwitchPosition::Up => match self.last_step {
                Some(at) if now.saturating_duration_since(at) < COUNT_PERIOD => self.count,
                _ => {
                    self.last_step = Some(now);
                    (self.count + 1).min(MAX_BINARY)
                }
            },
            SwitchPosition::Down => {
                self.last_step = None;
                0
            }
            SwitchPosition::Middle => {
                self.last_step = None;
                self.count
            }
        };
        let changed = next != self.count;
        self.count = next;
        changed.then_some(next)
    }

    /// Getter.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Returns the count as LED states, one bit per LED.
    pub fn frame(&self) -> [bool; LED_COUNT] {
        binary_frame(self.count)
    }
}
