//! The [`Computer`]: every control and output on the card under one owner, addressed by name.
//!
//! Inputs are only as fresh as the last [`Computer::update()`]; nothing samples them in the background, so the caller
//! decides how often the multiplexer moves. Outputs are driven immediately.

use crate::{
    analog::{AnalogMultiplexer, Channel, MuxedAdc, SWEEP_LEN},
    calibration::CV_ZERO_POINT,
    configuration::{Config, ConfigError},
    lights::{LED_COUNT, gamma_correct},
};
use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

/// Where the Z switch sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchPosition {
    /// Held in the momentary down position.
    Down,
    /// Resting in the middle.
    Middle,
    /// Latched up.
    Up,
}

/// One of the two CV inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CvInput {
    /// CV input 1.
    One,
    /// CV input 2.
    Two,
}

impl CvInput {
    const fn channel(self) -> Channel {
        match self {
            CvInput::One => Channel::Cv1,
            CvInput::Two => Channel::Cv2,
        }
    }
}

/// One of the two PWM-driven CV outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CvOutput {
    /// CV output 1.
    One,
    /// CV output 2.
    Two,
}

impl CvOutput {
    /// Both outputs, in order.
    pub const ALL: [CvOutput; 2] = [CvOutput::One, CvOutput::Two];

    const fn index(self) -> usize {
        match self {
            CvOutput::One => 0,
            CvOutput::Two => 1,
        }
    }
}

/// One of the two pulse outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseOutput {
    /// Pulse output 1.
    One,
    /// Pulse output 2.
    Two,
}

impl PulseOutput {
    const fn index(self) -> usize {
        match self {
            PulseOutput::One => 0,
            PulseOutput::Two => 1,
        }
    }
}

/// A front-panel LED, numbered left to right, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// LED 1.
    One,
    /// LED 2.
    Two,
    /// LED 3.
    Three,
    /// LED 4.
    Four,
    /// LED 5.
    Five,
    /// LED 6.
    Six,
}

impl Led {
    /// All LEDs, in panel order.
    pub const ALL: [Led; LED_COUNT] = [Led::One, Led::Two, Led::Three, Led::Four, Led::Five, Led::Six];

    /// Position of the LED in [`Led::ALL`] and in the frames produced by [`crate::lights`].
    pub const fn index(self) -> usize {
        match self {
            Led::One => 0,
            Led::Two => 1,
            Led::Three => 2,
            Led::Four => 3,
            Led::Five => 4,
            Led::Six => 5,
        }
    }
}

/// The peripherals a [`Computer`] takes ownership of.
pub struct Hardware<ADC, SEL, PWM, PULSE> {
    /// The two multiplexed ADC lines.
    pub adc: ADC,
    /// Multiplexer select line A.
    pub mux_logic_a: SEL,
    /// Multiplexer select line B.
    pub mux_logic_b: SEL,
    /// CV outputs 1 and 2.
    pub cv_out: [PWM; 2],
    /// The LEDs, in panel order.
    pub leds: [PWM; LED_COUNT],
    /// Pulse outputs 1 and 2.
    pub pulse_out: [PULSE; 2],
}

/// The whole card.
///
/// Owns the multiplexer (and with it every analog reading), the PWM outputs and the pulse outputs. There is exactly one
/// per board, so it is built once at startup and shared by reference (or behind a mutex) with whatever needs it.
pub struct Computer<ADC, SEL, PWM, PULSE> {
    mux: AnalogMultiplexer<ADC, SEL>,
    cv_out: [PWM; 2],
    cv_out_values: [u16; 2],
    leds: [PWM; LED_COUNT],
    /// `None` while lent out with [`Computer::take_pulse_outputs()`].
    pulse_out: Option<[PULSE; 2]>,
    pulse_levels: [bool; 2],
    switch_up_threshold: u16,
    switch_down_threshold: u16,
}

impl<ADC, SEL, PWM, PULSE> Computer<ADC, SEL, PWM, PULSE>
where
    ADC: MuxedAdc,
    SEL: OutputPin,
    PWM: SetDutyCycle,
    PULSE: OutputPin,
{
    /// Takes over the hardware, parks the CV outputs at 0 V, turns the LEDs and pulse outputs off, and runs one full
    /// multiplexer sweep so every reading is populated before it is returned.
    pub fn new(hardware: Hardware<ADC, SEL, PWM, PULSE>, config: &Config) -> Result<Self, ConfigError> {
        let Hardware {
            adc,
            mux_logic_a,
            mux_logic_b,
            cv_out,
            leds,
            pulse_out,
        } = hardware;

        let mut computer = Self {
            mux: AnalogMultiplexer::new(adc, mux_logic_a, mux_logic_b, config.smoothing()?),
            cv_out,
            cv_out_values: [CV_ZERO_POINT; 2],
            leds,
            pulse_out: Some(pulse_out),
            pulse_levels: [false; 2],
            switch_up_threshold: config.switch_up_threshold,
            switch_down_threshold: config.switch_down_threshold,
        };

        for output in CvOutput::ALL {
            computer.set_cv_out(output, CV_ZERO_POINT);
        }
        for led in Led::ALL {
            computer.set_led(led, 0);
        }
        computer.drive_pulse_outputs();

        for _ in 0..SWEEP_LEN {
            computer.update();
        }

        Ok(computer)
    }

    /// Moves the multiplexer on by one state and takes its readings.
    pub fn update(&mut self) {
        self.mux.tick();
    }

    /// The large knob, 0 (fully counterclockwise) to 65535.
    pub fn knob_main(&self) -> u16 {
        self.mux.value(Channel::MainKnob)
    }

    /// The X knob.
    pub fn knob_x(&self) -> u16 {
        self.mux.value(Channel::XKnob)
    }

    /// The Y knob.
    pub fn knob_y(&self) -> u16 {
        self.mux.value(Channel::YKnob)
    }

    /// The raw level of the Z switch; see [`Computer::switch_position()`].
    pub fn switch(&self) -> u16 {
        self.mux.value(Channel::Switch)
    }

    /// Interprets the switch level using the configured thresholds.
    pub fn switch_position(&self) -> SwitchPosition {
        let level = self.switch();
        if level > self.switch_up_threshold {
            SwitchPosition::Up
        } else if level < self.switch_down_threshold {
            SwitchPosition::Down
        } else {
            SwitchPosition::Middle
        }
    }

    /// A CV input, corrected for the inverting input stage so that higher voltages read higher.
    pub fn cv_in(&self, input: CvInput) -> u16 {
        u16::MAX - self.mux.value(input.channel())
    }

    /// Sets the PWM duty cycle (full scale 65535) of a CV output; see [`crate::calibration`] for volts.
    pub fn set_cv_out(&mut self, output: CvOutput, duty: u16) {
        self.cv_out_values[output.index()] = duty;
        set_duty(&mut self.cv_out[output.index()], duty);
    }

    /// Returns the duty cycle last written to a CV output.
    pub fn cv_out(&self, output: CvOutput) -> u16 {
        self.cv_out_values[output.index()]
    }

    /// Sets the brightness (full scale 65535) of an LED.
    pub fn set_led(&mut self, led: Led, brightness: u16) {
        set_duty(&mut self.leds[led.index()], brightness);
    }

    /// Like [`Computer::set_led()`], but gamma corrected so that brightness looks linear.
    pub fn set_led_gamma(&mut self, led: Led, brightness: u16) {
        self.set_led(led, gamma_correct(brightness));
    }

    /// Shows a frame from [`crate::lights`] with every lit LED at full brightness.
    pub fn show_frame(&mut self, frame: [bool; LED_COUNT]) {
        for (led, on) in Led::ALL.into_iter().zip(frame) {
            self.set_led(led, if on { u16::MAX } else { 0 });
        }
    }

    /// Drives a pulse output high or low. Does nothing while the outputs are taken.
    pub fn set_pulse_out(&mut self, output: PulseOutput, high: bool) {
        let Some(pins) = self.pulse_out.as_mut() else {
            return;
        };

        if pins[output.index()].set_state(high.into()).is_err() {
            error!("Could not drive pulse output {}", output);
            return;
        }
        self.pulse_levels[output.index()] = high;
    }

    /// Flips a pulse output. Does nothing while the outputs are taken.
    pub fn toggle_pulse_out(&mut self, output: PulseOutput) {
        self.set_pulse_out(output, !self.pulse_levels[output.index()]);
    }

    /// Returns the level last driven on a pulse output.
    pub fn pulse_out(&self, output: PulseOutput) -> bool {
        self.pulse_levels[output.index()]
    }

    /// Lends the pulse outputs out, e.g. to an audio driver that wants to run PWM on them. Returns `None` if they are
    /// already taken.
    pub fn take_pulse_outputs(&mut self) -> Option<[PULSE; 2]> {
        self.pulse_out.take()
    }

    /// Takes back pulse outputs lent out with [`Computer::take_pulse_outputs()`] and restores their last levels.
    pub fn restore_pulse_outputs(&mut self, pins: [PULSE; 2]) {
        self.pulse_out = Some(pins);
        self.drive_pulse_outputs();
    }

    /// Gives read access to the multiplexer, e.g. for its raw value table.
    pub fn mux(&self) -> &AnalogMultiplexer<ADC, SEL> {
        &self.mux
    }

    fn drive_pulse_outputs(&mut self) {
        for (output, high) in [PulseOutput::One, PulseOutput::Two].into_iter().zip(self.pulse_levels) {
            self.set_pulse_out(output, high);
        }
    }
}

fn set_duty<PWM: SetDutyCycle>(pwm: &mut PWM, value: u16) {
    if pwm.set_duty_cycle_fraction(value, u16::MAX).is_err() {
        error!("Could not set PWM duty cycle to {}", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analog::{
        MuxSelector,
        tests::{FakeAdc, FakePin},
    };
    use embedded_hal::pwm::{self, ErrorKind};

    /// PWM channel that remembers its duty cycle.
    #[derive(Default)]
    struct FakePwm {
        duty: u16,
        failing: bool,
    }

    impl pwm::ErrorType for FakePwm {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            u16::MAX
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            if self.failing {
                return Err(ErrorKind::Other);
            }
            self.duty = duty;
            Ok(())
        }
    }

    type TestComputer = Computer<FakeAdc, FakePin, FakePwm, FakePin>;

    /// A computer with no smoothing whose knob line reads `knobs` and whose CV line reads `cvs`.
    fn computer(knobs: u16, cvs: u16) -> TestComputer {
        let config = Config {
            smoothing: 0.0,
            ..Config::default()
        };
        Computer::new(
            Hardware {
                adc: FakeAdc {
                    levels: [knobs, cvs],
                    ..FakeAdc::default()
                },
                mux_logic_a: FakePin::default(),
                mux_logic_b: FakePin::default(),
                cv_out: Default::default(),
                leds: Default::default(),
                pulse_out: Default::default(),
            },
            &config,
        )
        .unwrap()
    }

    #[test]
    fn warmed_up_on_construction() {
        let computer = computer(40_000, 1_000);
        assert_eq!(MuxSelector::new(0), computer.mux().selector(), "One full sweep should have run");
        assert_eq!(40_000, computer.knob_main());
        assert_eq!(40_000, computer.knob_x());
        assert_eq!(40_000, computer.knob_y());
        assert_eq!(40_000, computer.switch());
    }

    #[test]
    fn outputs_start_at_rest() {
        let computer = computer(0, 0);
        for output in CvOutput::ALL {
            assert_eq!(CV_ZERO_POINT, computer.cv_out(output), "Expected left but got right");
            assert_eq!(CV_ZERO_POINT, computer.cv_out[output.index()].duty);
        }
        assert!(computer.leds.iter().all(|led| led.duty == 0), "LEDs should start off");
        assert!(!computer.pulse_out(PulseOutput::One));
    }

    #[test]
    fn rejects_bad_smoothing() {
        let config = Config {
            smoothing: 1.5,
            ..Config::default()
        };
        let hardware: Hardware<FakeAdc, FakePin, FakePwm, FakePin> = Hardware {
            adc: FakeAdc::default(),
            mux_logic_a: FakePin::default(),
            mux_logic_b: FakePin::default(),
            cv_out: Default::default(),
            leds: Default::default(),
            pulse_out: Default::default(),
        };
        assert!(matches!(
            Computer::new(hardware, &config),
            Err(ConfigError::SmoothingOutOfRange)
        ));
    }

    #[test]
    fn update_advances_once() {
        let mut computer = computer(0, 0);
        computer.update();
        assert_eq!(MuxSelector::new(1), computer.mux().selector(), "Expected left but got right");
        computer.update();
        assert_eq!(MuxSelector::new(2), computer.mux().selector(), "Expected left but got right");
    }

    #[test]
    fn cv_inputs_are_inverted() {
        let computer = computer(0, 1_000);
        assert_eq!(64_535, computer.cv_in(CvInput::One), "Expected left but got right");
        assert_eq!(64_535, computer.cv_in(CvInput::Two), "Expected left but got right");
        assert_eq!(1_000, computer.mux().value(Channel::Cv1), "Raw value should be kept as read");

        let computer = self::computer(0, 0);
        assert_eq!(u16::MAX, computer.cv_in(CvInput::One));
    }

    #[test]
    fn switch_positions() {
        assert_eq!(SwitchPosition::Up, computer(50_000, 0).switch_position());
        assert_eq!(SwitchPosition::Middle, computer(20_000, 0).switch_position());
        assert_eq!(SwitchPosition::Down, computer(1_000, 0).switch_position());
        // thresholds themselves read as the middle
        assert_eq!(SwitchPosition::Middle, computer(32_767, 0).switch_position());
        assert_eq!(SwitchPosition::Middle, computer(6_553, 0).switch_position());
    }

    #[test]
    fn sets_cv_and_leds() {
        let mut computer = computer(0, 0);
        computer.set_cv_out(CvOutput::Two, 12_345);
        assert_eq!(12_345, computer.cv_out(CvOutput::Two));
        assert_eq!(12_345, computer.cv_out[1].duty, "Expected left but got right");

        computer.set_led(Led::Three, 1_000);
        assert_eq!(1_000, computer.leds[2].duty, "Expected left but got right");

        computer.set_led_gamma(Led::Four, 32_767);
        assert_eq!(16_383, computer.leds[3].duty, "Expected left but got right");

        computer.show_frame([true, false, false, false, false, true]);
        assert_eq!(
            [u16::MAX, 0, 0, 0, 0, u16::MAX],
            core::array::from_fn::<_, LED_COUNT, _>(|i| computer.leds[i].duty)
        );
    }

    #[test]
    fn pwm_failure_still_records_cv() {
        let mut computer = computer(0, 0);
        computer.cv_out[0].failing = true;
        computer.set_cv_out(CvOutput::One, 100);
        assert_eq!(100, computer.cv_out(CvOutput::One), "Expected left but got right");
    }

    #[test]
    fn toggles_pulse_outputs() {
        let mut computer = computer(0, 0);
        computer.toggle_pulse_out(PulseOutput::Two);
        assert!(computer.pulse_out(PulseOutput::Two));
        assert!(computer.pulse_out.as_ref().unwrap()[1].high);
        computer.toggle_pulse_out(PulseOutput::Two);
        assert!(!computer.pulse_out.as_ref().unwrap()[1].high);
    }

    #[test]
    fn pulse_outputs_can_be_lent_out() {
        let mut computer = computer(0, 0);
        computer.set_pulse_out(PulseOutput::One, true);

        let mut pins = computer.take_pulse_outputs().unwrap();
        assert!(computer.take_pulse_outputs().is_none(), "Outputs can only be taken once");

        // the borrower is free to do as it likes with the pins
        pins[0].high = false;
        computer.toggle_pulse_out(PulseOutput::Two);
        assert!(!computer.pulse_out(PulseOutput::Two), "Setters should be ignored while taken");

        computer.restore_pulse_outputs(pins);
        let pins = computer.pulse_out.as_ref().unwrap();
        assert!(pins[0].high, "Last level should be restored");
        assert!(!pins[1].high);
    }
}
