//! Reads the knobs, the switch, and the CV inputs through the board's 4052 analog multiplexer.
//!
//! Two ADC lines are shared by six controls. A 2-bit selector decides which knob (or the switch) appears on the first
//! line and which CV input appears on the second; the [`AnalogMultiplexer`] steps that selector once per tick and folds
//! each reading into a per-channel [`Smoothing`] average.

use embedded_hal::digital::OutputPin;

mod selector;
pub use selector::*;

mod smoothing;
pub use smoothing::*;

/// Size of the raw value table.
///
/// Slots 0 and 1 belong to the two audio inputs, which have ADC pins of their own and are never multiplexed; they stay
/// in the table so the remaining indices match the board's channel numbering.
pub const CHANNEL_COUNT: usize = 8;

/// A logical analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// The large knob.
    MainKnob,
    /// The small knob marked X.
    XKnob,
    /// The small knob marked Y.
    YKnob,
    /// The three-position Z switch (up, middle, momentary down), read as an analog level.
    Switch,
    /// CV input 1, inverted by the input conditioning circuit.
    Cv1,
    /// CV input 2, inverted by the input conditioning circuit.
    Cv2,
}

impl Channel {
    /// All multiplexed channels.
    pub const ALL: [Channel; 6] = [
        Channel::MainKnob,
        Channel::XKnob,
        Channel::YKnob,
        Channel::Switch,
        Channel::Cv1,
        Channel::Cv2,
    ];

    /// Position of the channel in the raw value table.
    pub const fn index(self) -> usize {
        match self {
            Channel::Cv1 => 2,
            Channel::Cv2 => 3,
            Channel::MainKnob => 4,
            Channel::XKnob => 5,
            Channel::YKnob => 6,
            Channel::Switch => 7,
        }
    }
}

/// One of the two ADC lines shared through the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcLine {
    /// Carries the knobs and the switch.
    Mux1,
    /// Carries the CV inputs.
    Mux2,
}

/// Access to the two ADC lines behind the multiplexer.
///
/// Implementations return readings scaled to the full 16-bit range regardless of the converter's native resolution.
pub trait MuxedAdc {
    /// Error raised by a failed conversion.
    type Error;

    /// Samples one line.
    fn read(&mut self, line: AdcLine) -> Result<u16, Self::Error>;
}

/// Cycles the multiplexer selector and keeps a smoothed value for every channel.
///
/// Every tick is one [`advance()`][Self::advance] followed by one [`sample_and_smooth()`][Self::sample_and_smooth].
/// Until a full sweep ([`SWEEP_LEN`] ticks) has run, channels that have not been visited read as 0.
pub struct AnalogMultiplexer<ADC, SEL> {
    adc: ADC,
    /// Select lines, "logic A" first.
    select: [SEL; 2],
    selector: MuxSelector,
    smoothing: Smoothing,
    values: [u16; CHANNEL_COUNT],
}

impl<ADC, SEL> AnalogMultiplexer<ADC, SEL>
where
    ADC: MuxedAdc,
    SEL: OutputPin,
{
    /// Constructs an [`AnalogMultiplexer`] with the selector at 0 and every channel reading 0.
    pub fn new(adc: ADC, logic_a: SEL, logic_b: SEL, smoothing: Smoothing) -> Self {
        let mut mux = Self {
            adc,
            select: [logic_a, logic_b],
            selector: MuxSelector::default(),
            smoothing,
            values: [0; CHANNEL_COUNT],
        };
        mux.drive_select_lines();
        mux
    }

    /// Moves the selector to the next state and drives the select lines to match.
    pub fn advance(&mut self) {
        self.selector = self.selector.next();
        self.drive_select_lines();
    }

    /// Reads both ADC lines and folds the readings into the channels exposed by the current selector state.
    ///
    /// A failed conversion leaves that channel's value untouched for this tick.
    pub fn sample_and_smooth(&mut self) {
        let (knob, cv) = self.selector.channels();
        self.sample(AdcLine::Mux1, knob);
        self.sample(AdcLine::Mux2, cv);
    }

    /// Advances and samples, i.e., runs one full tick.
    pub fn tick(&mut self) {
        self.advance();
        self.sample_and_smooth();
    }

    /// Returns the smoothed value of a channel.
    pub fn value(&self, channel: Channel) -> u16 {
        self.values[channel.index()]
    }

    /// Returns the whole raw value table, indexed by [`Channel::index()`].
    pub fn values(&self) -> &[u16; CHANNEL_COUNT] {
        &self.values
    }

    /// Getter.
    pub fn selector(&self) -> MuxSelector {
        self.selector
    }

    fn sample(&mut self, line: AdcLine, channel: Channel) {
        match self.adc.read(line) {
            Ok(raw) => {
                let slot = &mut self.values[channel.index()];
                *slot = self.smoothing.apply(*slot, raw);
            }
            Err(_) => {
                warn!("ADC read on {} failed; keeping {} as is", line, channel);
            }
        }
    }

    fn drive_select_lines(&mut self) {
        let [a, b] = &mut self.select;
        let result = a
            .set_state(self.selector.logic_a().into())
            .and_then(|_| b.set_state(self.selector.logic_b().into()));
        if result.is_err() {
            error!("Could not drive mux select lines for {}", self.selector);
        }
    }
}
