//! The polling loop that keeps the analog readings fresh, and the front-panel behavior built on top of it.

use crate::board::{BoardAsyncMutex, BoardShutdownListener};
use defmt::*;
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Ticker};
use hello_computer_lib::{
    computer::{CvInput, CvOutput, Led, SwitchPosition},
    lights::SwitchCounter,
};

/// One multiplexer step per tick, so every control is refreshed every four ticks.
const UPDATE_PERIOD: Duration = Duration::from_millis(1);

/// LEDs used to show the knobs; the remaining two belong to the pulse inputs.
const DISPLAY_LEDS: [Led; 4] = [Led::One, Led::Two, Led::Three, Led::Four];

/// Updates the inputs and reflects them on the outputs.
///
/// CV outputs 1 and 2 follow the X and Y knobs. With the switch in the middle, the first four LEDs show the main knob,
/// X, Y and CV input 1. With the switch up the counter climbs every half second; pushing it down resets the counter, and
/// while the switch is away from the middle all six LEDs show the count in binary, taking over the pulse LEDs.
#[embassy_executor::task]
pub async fn update_inputs(computer: &'static BoardAsyncMutex, mut shutdown: BoardShutdownListener) {
    info!("Updating inputs every {} ms", UPDATE_PERIOD.as_millis());

    let mut ticker = Ticker::every(UPDATE_PERIOD);
    let mut counter = SwitchCounter::new();

    loop {
        if let Either::Second(()) = select(ticker.next(), shutdown.requested()).await {
            info!("Stopped updating inputs");
            return;
        }

        let mut computer = computer.lock().await;
        computer.update();

        let (x, y) = (computer.knob_x(), computer.knob_y());
        computer.set_cv_out(CvOutput::One, x);
        computer.set_cv_out(CvOutput::Two, y);

        let position = computer.switch_position();
        if let Some(count) = counter.update(position, Instant::now()) {
            info!("Switch is {}, count is now {}", position, count);
        }

        match position {
            SwitchPosition::Middle => {
                let levels = [computer.knob_main(), x, y, computer.cv_in(CvInput::One)];
                for (led, level) in DISPLAY_LEDS.into_iter().zip(levels) {
                    computer.set_led_gamma(led, level);
                }
            }
            SwitchPosition::Up | SwitchPosition::Down => computer.show_frame(counter.frame()),
        }
    }
}
