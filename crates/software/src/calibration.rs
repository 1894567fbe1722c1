//! Conversion between voltages and the codes written to the CV outputs.
//!
//! Both output paths were calibrated by hand on a single board, so the constants are rough. The DAC constants describe
//! the MCP4822 as actually fitted: its gain is configured for roughly ±5 V rather than the ±6 V the PWM path reaches,
//! and, unlike the PWM path, higher codes produce *lower* voltages. These are facts about the hardware and are kept as
//! measured.

use measurements::Voltage;

/// PWM duty cycle (16-bit) that produces 0 V on a CV output.
pub const CV_ZERO_POINT: u16 = 2085 * 16;
/// PWM duty cycle (16-bit) that produces -6 V on a CV output.
pub const CV_LOW_POINT: u16 = 100 * 16;
/// PWM duty cycle (16-bit) that produces +6 V on a CV output.
pub const CV_HIGH_POINT: u16 = 4065 * 16;

/// DAC code (12-bit) that produces 0 V.
pub const DAC_ZERO_POINT: u16 = 1657;
/// DAC code (12-bit) that produces -5 V; the DAC gain was meant to give ±6 V but does not.
pub const DAC_LOW_POINT: u16 = 3031;
/// DAC code (12-bit) that produces +5 V.
pub const DAC_HIGH_POINT: u16 = 281;

/// Maps `x` from the range `a1..a2` onto `b1..b2`, like Arduino's `map()`. Does not clamp.
pub fn map_range(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

/// Three calibration points of a CV output path, symmetric around 0 V.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvCalibration {
    /// Code producing 0 V.
    pub zero: u16,
    /// Code producing `-span`.
    pub low: u16,
    /// Code producing `+span`.
    pub high: u16,
    /// Largest magnitude the path can produce, in volts.
    pub span: f32,
}

/// The PWM-filtered CV outputs.
pub const PWM_CALIBRATION: CvCalibration = CvCalibration {
    zero: CV_ZERO_POINT,
    low: CV_LOW_POINT,
    high: CV_HIGH_POINT,
    span: 6.0,
};

/// The SPI DAC outputs.
pub const DAC_CALIBRATION: CvCalibration = CvCalibration {
    zero: DAC_ZERO_POINT,
    low: DAC_LOW_POINT,
    high: DAC_HIGH_POINT,
    span: 5.0,
};

impl CvCalibration {
    /// Returns the code for `voltage`, clamping to the path's span.
    ///
    /// Negative voltages interpolate between `low` and `zero`, positive ones between `zero` and `high`, so the zero
    /// point is hit exactly even when the path is not perfectly linear.
    pub fn code_for(&self, voltage: Voltage) -> u16 {
        let span = self.span;
        let volts = (voltage.as_volts() as f32).clamp(-span, span);

        let code = if volts < 0.0 {
            map_range(volts, -span, 0.0, self.low.into(), self.zero.into())
        } else {
            map_range(volts, 0.0, span, self.zero.into(), self.high.into())
        };

        // codes are non-negative after clamping; adding a half rounds to nearest
        (code + 0.5) as u16
    }
}
