//! Binds the card's peripherals on the RP2040 to the hardware abstractions in [`hello_computer_lib`].

use embassy_rp::{
    Peri,
    adc::{self, Adc, Blocking},
    clocks::clk_sys_freq,
    gpio::{Output, Pull},
    peripherals::SPI0,
    pwm::{self, Pwm, PwmOutput},
    spi::{self, Spi},
};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex};
use hello_computer_lib::{
    analog::{AdcLine, MuxedAdc},
    computer::Computer,
    dac::Dac,
    pulse::PulseEdgeWatcher,
    shutdown::{Shutdown, ShutdownListener},
};

/// SPI clock for the DAC; the MCP4822 tops out at 20 MHz.
pub const DAC_SPI_FREQUENCY: u32 = 20_000_000;

pub type Board = Computer<MuxAdc, Output<'static>, PwmOutput<'static>, Output<'static>>;
pub type BoardAsyncMutex = mutex::Mutex<CriticalSectionRawMutex, Board>;

pub type DacSpi = Spi<'static, SPI0, spi::Blocking>;
pub type DacSpiAsyncMutex = mutex::Mutex<CriticalSectionRawMutex, DacSpi>;
pub type BoardDac = Dac<'static, CriticalSectionRawMutex, DacSpi, Output<'static>>;

pub type PulseWatcher = PulseEdgeWatcher<CriticalSectionRawMutex>;

/// Every task that runs until told to stop holds one listener.
pub const SHUTDOWN_LISTENER_CNT: usize = 6;
pub type BoardShutdown = Shutdown<CriticalSectionRawMutex, SHUTDOWN_LISTENER_CNT>;
pub type BoardShutdownListener = ShutdownListener<'static, CriticalSectionRawMutex, SHUTDOWN_LISTENER_CNT>;

/// The RP2040's ADC with the two multiplexer outputs attached (GPIO 28 and 29).
pub struct MuxAdc {
    adc: Adc<'static, Blocking>,
    mux_io: [adc::Channel<'static>; 2],
}

impl MuxAdc {
    pub fn new(adc: Adc<'static, Blocking>, mux_io_1: adc::Channel<'static>, mux_io_2: adc::Channel<'static>) -> Self {
        Self {
            adc,
            mux_io: [mux_io_1, mux_io_2],
        }
    }
}

impl MuxedAdc for MuxAdc {
    type Error = adc::Error;

    fn read(&mut self, line: AdcLine) -> Result<u16, Self::Error> {
        let channel = match line {
            AdcLine::Mux1 => &mut self.mux_io[0],
            AdcLine::Mux2 => &mut self.mux_io[1],
        };
        let sample = self.adc.blocking_read(channel)?;
        // stretch 12 bits across the full 16-bit range, so that 0xFFF reads as 0xFFFF
        Ok((sample << 4) | (sample >> 8))
    }
}

/// Sets `pin` up as an ADC input with the pull resistors disabled.
pub fn adc_channel(pin: Peri<'static, impl adc::AdcPin>) -> adc::Channel<'static> {
    adc::Channel::new_pin(pin, Pull::None)
}

/// PWM configuration whose counter wraps at `frequency_hz`; duty cycles set on the slice's channels are scaled to the
/// resulting `top`.
pub fn pwm_config(frequency_hz: u32) -> pwm::Config {
    let mut config = pwm::Config::default();
    let period = (clk_sys_freq() / frequency_hz).saturating_sub(1);
    config.top = u16::try_from(period).unwrap_or(u16::MAX);
    config.compare_a = 0;
    config.compare_b = 0;
    config
}

/// Splits a slice driving both of its pins into its two outputs, `(A, B)`.
pub fn pwm_pair(pwm: Pwm<'static>) -> (PwmOutput<'static>, PwmOutput<'static>) {
    match pwm.split() {
        (Some(a), Some(b)) => (a, b),
        // slices built with `new_output_ab` always have both outputs
        _ => defmt::panic!("PWM slice is missing an output"),
    }
}
