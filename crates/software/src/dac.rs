//! Driver for the MCP4822, the two-channel 12-bit DAC that offers a second CV output path over SPI.
//!
//! Each write is one 16-bit word, sent MSB first: the top nibble holds the channel select and gain/shutdown flags,
//! the bottom twelve bits hold the sample.

use crate::calibration::DAC_CALIBRATION;
use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    mutex::{Mutex, MutexGuard},
};
use embedded_hal::{digital::OutputPin, spi::SpiBus};
use measurements::Voltage;

/// Configuration bits for channel A: select A, gain 2x, output enabled.
pub const CHANNEL_A_CONFIG: u16 = 0b0001_0000_0000_0000;
/// Configuration bits for channel B: select B, gain 2x, output enabled.
pub const CHANNEL_B_CONFIG: u16 = 0b1001_0000_0000_0000;

const VALUE_MASK: u16 = 0x0FFF;

/// One of the DAC's two outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacChannel {
    /// Channel A.
    A,
    /// Channel B.
    B,
}

impl DacChannel {
    /// Returns the configuration bits placed above the sample for this channel.
    pub const fn config(self) -> u16 {
        match self {
            DacChannel::A => CHANNEL_A_CONFIG,
            DacChannel::B => CHANNEL_B_CONFIG,
        }
    }
}

/// Builds the word for writing `value` to `channel`. Bits of `value` above the twelfth are discarded.
pub const fn encode(channel: DacChannel, value: u16) -> u16 {
    channel.config() | (value & VALUE_MASK)
}

/// Splits a word into the bytes sent on the wire, most significant first.
pub const fn to_bytes(word: u16) -> [u8; 2] {
    word.to_be_bytes()
}

/// A failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// The SPI bus reported an error.
    Bus,
    /// The chip select line could not be driven.
    ChipSelect,
}

/// The DAC, holding the SPI bus for as long as it lives.
///
/// The bus is taken with [`Mutex::try_lock`] when the DAC is acquired. If another owner already holds it, the DAC runs
/// degraded: it reports the contention once and every write becomes a no-op, rather than stalling the board.
pub struct Dac<'a, M: RawMutex, SPI, CS> {
    bus: Option<MutexGuard<'a, M, SPI>>,
    cs: CS,
}

impl<'a, M, SPI, CS> Dac<'a, M, SPI, CS>
where
    M: RawMutex,
    SPI: SpiBus,
    CS: OutputPin,
{
    /// Takes the bus and deselects the chip.
    pub fn acquire(bus: &'a Mutex<M, SPI>, mut cs: CS) -> Self {
        if cs.set_high().is_err() {
            error!("Could not deselect DAC");
        }

        let bus = match bus.try_lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("could not configure DAC SPI; DAC writes will be ignored");
                None
            }
        };

        Self { bus, cs }
    }

    /// Returns `true` if the bus could not be acquired and writes are being ignored.
    pub fn is_degraded(&self) -> bool {
        self.bus.is_none()
    }

    /// Writes a raw 12-bit code. Failures are logged, not returned, and writes in degraded mode do nothing.
    pub fn write(&mut self, channel: DacChannel, value: u16) {
        if self.is_degraded() {
            return;
        }

        if let Err(e) = self.transfer(encode(channel, value)) {
            error!("DAC write to channel {} failed: {}", channel, e);
        }
    }

    /// Writes the code that makes `channel` output `voltage`, as far as the DAC's calibration allows.
    pub fn write_voltage(&mut self, channel: DacChannel, voltage: Voltage) {
        self.write(channel, DAC_CALIBRATION.code_for(voltage));
    }

    /// Sends one word framed by the chip select. Does nothing in degraded mode.
    pub fn transfer(&mut self, word: u16) -> Result<(), DacError> {
        let Some(bus) = self.bus.as_mut() else {
            return Ok(());
        };

        self.cs.set_low().map_err(|_| DacError::ChipSelect)?;
        let sent = bus
            .write(&to_bytes(word))
            .and_then(|_| bus.flush())
            .map_err(|_| DacError::Bus);
        // deselect even if the bus failed, so the next write starts a fresh frame
        let deselected = self.cs.set_high().map_err(|_| DacError::ChipSelect);
        sent.and(deselected)
    }

    /// Gives the bus back and returns the chip select line.
    pub fn release(self) -> CS {
        self.cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embedded_hal::{digital, spi};

    /// Records every byte written.
    #[derive(Default)]
    struct FakeSpi {
        written: [u8; 8],
        len: usize,
        fail: bool,
    }

    impl spi::ErrorType for FakeSpi {
        type Error = spi::ErrorKind;
    }

    impl SpiBus for FakeSpi {
        fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(spi::ErrorKind::Other);
            }
            self.written[self.len..self.len + words.len()].copy_from_slice(words);
            self.len += words.len();
            Ok(())
        }

        fn transfer(&mut self, _read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            self.write(write)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.write(words)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// Chip select that counts how often it was asserted.
    #[derive(Default)]
    struct FakeCs {
        high: bool,
        selections: usize,
    }

    impl digital::ErrorType for FakeCs {
        type Error = Infallible;
    }

    impl OutputPin for FakeCs {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.selections += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    type TestBus = Mutex<CriticalSectionRawMutex, FakeSpi>;

    #[test]
    fn encodes_channel_a() {
        let word = encode(DacChannel::A, 0x0ABC);
        assert_eq!([0x1A, 0xBC], to_bytes(word), "Expected left but got right");
    }

    #[test]
    fn encodes_channel_b() {
        assert_eq!(0x9ABC, encode(DacChannel::B, 0x0ABC), "Expected left but got right");
    }

    #[test]
    fn masks_to_twelve_bits() {
        assert_eq!(CHANNEL_A_CONFIG | 0x0FFF, encode(DacChannel::A, 0xFFFF));
        assert_eq!(CHANNEL_B_CONFIG, encode(DacChannel::B, 0xF000));
    }

    #[test]
    fn writes_framed_word() {
        let bus = TestBus::new(FakeSpi::default());
        {
            let mut dac = Dac::acquire(&bus, FakeCs::default());
            assert!(!dac.is_degraded());
            dac.write(DacChannel::B, 0x0123);
            dac.write(DacChannel::A, 0x0FFF);

            let cs = dac.release();
            assert!(cs.high, "Chip select should be released after each write");
            assert_eq!(2, cs.selections, "Expected left but got right");
        }

        let spi = bus.try_lock().unwrap();
        assert_eq!([0x91, 0x23, 0x1F, 0xFF], spi.written[..spi.len], "Expected left but got right");
    }

    #[test]
    fn degrades_when_bus_is_taken() {
        let bus = TestBus::new(FakeSpi::default());
        let held = bus.try_lock().unwrap();

        let mut dac = Dac::acquire(&bus, FakeCs::default());
        assert!(dac.is_degraded());
        dac.write_voltage(DacChannel::A, Voltage::from_volts(1.0));
        assert_eq!(Ok(()), dac.transfer(0x1234));

        let cs = dac.release();
        assert_eq!(0, cs.selections, "Degraded writes should not touch the chip");
        assert_eq!(0, held.len, "Nothing should reach the bus");
    }

    #[test]
    fn release_frees_bus() {
        let bus = TestBus::new(FakeSpi::default());
        let dac = Dac::acquire(&bus, FakeCs::default());
        assert!(bus.try_lock().is_err(), "Bus should be held while the DAC lives");
        dac.release();
        assert!(bus.try_lock().is_ok(), "Bus should be free after release");
    }

    #[test]
    fn bus_failure_is_reported_and_frame_closed() {
        let bus = TestBus::new(FakeSpi {
            fail: true,
            ..FakeSpi::default()
        });
        let mut dac = Dac::acquire(&bus, FakeCs::default());
        assert_eq!(Err(DacError::Bus), dac.transfer(encode(DacChannel::A, 1)));
        // write swallows the same failure
        dac.write(DacChannel::A, 1);
        assert!(dac.release().high);
    }
}
