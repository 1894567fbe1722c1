//! Hello Computer is [Embassy](https://embassy.dev)-based firmware for the Music Thing Modular Workshop System
//! [Computer](https://www.musicthing.co.uk/workshopsystem/), a eurorack-style card built around the RP2040.
//!
//! It is a tour of the card's controls: the X and Y knobs are echoed on the CV outputs, the main knob sweeps the DAC,
//! the LEDs mirror the knobs (or, with the switch away from the middle, count in binary), and each pulse input flashes
//! an LED and flips its pulse output.
//!
//! For details about the hardware, see the `README`.

#![no_std]
#![no_main]

mod board;
mod controls;
mod cv_dac;
mod pulse;

use crate::board::{
    BoardAsyncMutex, BoardShutdown, DAC_SPI_FREQUENCY, DacSpiAsyncMutex, MuxAdc, PulseWatcher, adc_channel,
    pwm_config, pwm_pair,
};
use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::{
    adc::{self, Adc},
    gpio::{Input, Level, Output, Pull},
    pwm::Pwm,
    spi::{self, Spi},
};
use embassy_sync::mutex;
use embassy_time::{Duration, Timer};
use hello_computer_lib::{
    computer::{Computer, Hardware, Led, PulseOutput},
    configuration::{Config, CycleConfig},
    dac::Dac,
    lights::{LED_COUNT, LightPattern},
    pulse::{PulseChannel, PulseEdgeWatcher},
    shutdown::Shutdown,
};
use static_cell::StaticCell;

use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

/// How long each frame of the startup animation is shown.
const ANIMATION_FRAME: Duration = Duration::from_millis(80);

/// Tells every long-running task to wind down.
static SHUTDOWN: BoardShutdown = Shutdown::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Hello Computer");

    let config = unwrap!(Config::default().validate());
    let p = embassy_rp::init(Default::default());

    // mux outputs land on ADC2 and ADC3; the audio inputs on ADC0 and ADC1 are not used here
    let adc = MuxAdc::new(
        Adc::new_blocking(p.ADC, adc::Config::default()),
        adc_channel(p.PIN_28),
        adc_channel(p.PIN_29),
    );

    let pwm = pwm_config(config.pwm_frequency_hz);
    // CV 2 is on the A side of the slice, CV 1 on the B side
    let (cv_2_out, cv_1_out) = pwm_pair(Pwm::new_output_ab(p.PWM_SLICE3, p.PIN_22, p.PIN_23, pwm.clone()));
    let (led_1, led_2) = pwm_pair(Pwm::new_output_ab(p.PWM_SLICE5, p.PIN_10, p.PIN_11, pwm.clone()));
    let (led_3, led_4) = pwm_pair(Pwm::new_output_ab(p.PWM_SLICE6, p.PIN_12, p.PIN_13, pwm.clone()));
    let (led_5, led_6) = pwm_pair(Pwm::new_output_ab(p.PWM_SLICE7, p.PIN_14, p.PIN_15, pwm));

    let hardware = Hardware {
        adc,
        mux_logic_a: Output::new(p.PIN_24, Level::Low),
        mux_logic_b: Output::new(p.PIN_25, Level::Low),
        cv_out: [cv_1_out, cv_2_out],
        leds: [led_1, led_2, led_3, led_4, led_5, led_6],
        pulse_out: [Output::new(p.PIN_8, Level::Low), Output::new(p.PIN_9, Level::Low)],
    };

    static COMPUTER: StaticCell<BoardAsyncMutex> = StaticCell::new();
    let computer: &'static BoardAsyncMutex =
        COMPUTER.init(mutex::Mutex::new(unwrap!(Computer::new(hardware, &config))));

    play_startup_animation(computer).await;

    static PULSES: StaticCell<PulseWatcher> = StaticCell::new();
    let pulses: &'static PulseWatcher = PULSES.init(PulseEdgeWatcher::new(config.debounce));

    let pulse_inputs = [
        (Input::new(p.PIN_2, Pull::Up), PulseChannel::One, Led::Five, PulseOutput::One),
        (Input::new(p.PIN_3, Pull::Up), PulseChannel::Two, Led::Six, PulseOutput::Two),
    ];
    for (pin, channel, led, output) in pulse_inputs {
        unwrap!(spawner.spawn(pulse::pulse_input(
            pin,
            channel,
            pulses,
            unwrap!(SHUTDOWN.listener())
        )));
        unwrap!(spawner.spawn(pulse::pulse_handler(
            channel,
            led,
            output,
            computer,
            pulses,
            unwrap!(SHUTDOWN.listener())
        )));
    }

    unwrap!(spawner.spawn(controls::update_inputs(computer, unwrap!(SHUTDOWN.listener()))));

    let mut dac_spi_config = spi::Config::default();
    dac_spi_config.frequency = DAC_SPI_FREQUENCY;
    static DAC_SPI: StaticCell<DacSpiAsyncMutex> = StaticCell::new();
    let dac_spi: &'static DacSpiAsyncMutex = DAC_SPI.init(mutex::Mutex::new(Spi::new_blocking_txonly(
        p.SPI0,
        p.PIN_18,
        p.PIN_19,
        dac_spi_config,
    )));
    let dac = Dac::acquire(dac_spi, Output::new(p.PIN_21, Level::High));
    unwrap!(spawner.spawn(cv_dac::dac_output(dac, computer, unwrap!(SHUTDOWN.listener()))));
}

/// Plays every [`LightPattern`] once, then turns the LEDs off.
async fn play_startup_animation(computer: &'static BoardAsyncMutex) {
    let mut pattern = LightPattern::Spinner;
    for _ in 0..LightPattern::COUNT {
        info!("Playing {}", pattern);
        for n in 0..pattern.frames().len() {
            computer.lock().await.show_frame(pattern.frame(n));
            Timer::after(ANIMATION_FRAME).await;
        }
        pattern = pattern.cycle();
    }
    computer.lock().await.show_frame([false; LED_COUNT]);
}
