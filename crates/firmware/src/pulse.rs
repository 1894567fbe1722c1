//! Tasks for the pulse inputs: one per input watching the pin, one per input acting on what it saw.

use crate::board::{BoardAsyncMutex, BoardShutdownListener, PulseWatcher};
use defmt::*;
use embassy_futures::select::{Either, select};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Instant, Timer};
use hello_computer_lib::{
    computer::{Led, PulseOutput},
    pulse::PulseChannel,
};

/// How long an LED stays lit after a pulse.
const BLINK_LENGTH: Duration = Duration::from_millis(15);

/// Reports falling edges on a pulse input to the [`PulseWatcher`].
///
/// The inputs are pulled up and the jack pulls them low, so a pulse arriving shows up as a falling edge. After each
/// edge the pin is left alone for the debounce window, which is what keeps contact bounce from reaching the handlers.
#[embassy_executor::task(pool_size = 2)]
pub async fn pulse_input(
    mut pin: Input<'static>,
    channel: PulseChannel,
    pulses: &'static PulseWatcher,
    mut shutdown: BoardShutdownListener,
) {
    info!("Watching pulse input {}", channel);
    loop {
        if let Either::Second(()) = select(pin.wait_for_falling_edge(), shutdown.requested()).await {
            info!("Stopped watching pulse input {}", channel);
            return;
        }

        pulses.notify(channel, Instant::now());
        Timer::after(pulses.debounce()).await;
    }
}

/// Flashes an LED and flips the matching pulse output for every pulse received.
#[embassy_executor::task(pool_size = 2)]
pub async fn pulse_handler(
    channel: PulseChannel,
    led: Led,
    output: PulseOutput,
    computer: &'static BoardAsyncMutex,
    pulses: &'static PulseWatcher,
    mut shutdown: BoardShutdownListener,
) {
    pulses
        .handle(
            channel,
            |edge| async move {
                debug!("Pulse on {} at {}", edge.channel, edge.at);
                {
                    let mut computer = computer.lock().await;
                    computer.toggle_pulse_out(output);
                    computer.set_led(led, u16::MAX);
                }
                Timer::after(BLINK_LENGTH).await;
                computer.lock().await.set_led(led, 0);
            },
            &mut shutdown,
        )
        .await;
}
