//! Drives the DAC from the main knob.

use crate::board::{BoardAsyncMutex, BoardDac, BoardShutdownListener};
use defmt::*;
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Ticker};
use hello_computer_lib::{
    calibration::{DAC_CALIBRATION, map_range},
    computer::SwitchPosition,
    dac::DacChannel,
};
use measurements::Voltage;

const WRITE_PERIOD: Duration = Duration::from_millis(1);

/// Sweeps DAC channel A from -5 V to +5 V as the main knob turns, with channel B as its mirror image. Holding the switch
/// up parks both channels at 0 V.
#[embassy_executor::task]
pub async fn dac_output(
    mut dac: BoardDac,
    computer: &'static BoardAsyncMutex,
    mut shutdown: BoardShutdownListener,
) {
    if dac.is_degraded() {
        warn!("DAC is unavailable; its outputs will not change");
    }

    let span = f64::from(DAC_CALIBRATION.span);
    let mut ticker = Ticker::every(WRITE_PERIOD);
    loop {
        if let Either::Second(()) = select(ticker.next(), shutdown.requested()).await {
            info!("Stopped driving the DAC");
            break;
        }

        let (knob, position) = {
            let computer = computer.lock().await;
            (computer.knob_main(), computer.switch_position())
        };

        let volts = match position {
            SwitchPosition::Up => 0.0,
            _ => f64::from(map_range(f32::from(knob), 0.0, f32::from(u16::MAX), -1.0, 1.0)) * span,
        };
        dac.write_voltage(DacChannel::A, Voltage::from_volts(volts));
        dac.write_voltage(DacChannel::B, Voltage::from_volts(-volts));
    }

    // park at 0 V before letting go of the bus
    dac.write_voltage(DacChannel::A, Voltage::from_volts(0.0));
    dac.write_voltage(DacChannel::B, Voltage::from_volts(0.0));
    dac.release();
}
