//! Provides [`MuxSelector`] and the fixed table describing which channels each selector state exposes.

use super::Channel;

/// Number of selector states in one full sweep of the multiplexer.
pub const SWEEP_LEN: usize = 4;

/// Which pair of channels appears on the two shared ADC lines for each selector state, as `(Mux1, Mux2)`.
///
/// The CV inputs sit on the second line in every state, so each one is sampled twice per sweep while the knobs and the
/// switch are sampled once.
const MUX_TABLE: [(Channel, Channel); SWEEP_LEN] = [
    (Channel::MainKnob, Channel::Cv1),
    (Channel::XKnob, Channel::Cv2),
    (Channel::YKnob, Channel::Cv1),
    (Channel::Switch, Channel::Cv2),
];

/// The state of the multiplexer's 2-bit selector, always in `0..=3`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MuxSelector(u8);

impl MuxSelector {
    /// Constructs a [`MuxSelector`], wrapping values outside `0..=3`.
    pub const fn new(value: u8) -> Self {
        Self(value % SWEEP_LEN as u8)
    }

    /// Returns the selector state that follows this one in round-robin order.
    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Getter.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Level of the "logic A" select line (bit 0).
    pub const fn logic_a(self) -> bool {
        self.0 & 0b01 != 0
    }

    /// Level of the "logic B" select line (bit 1).
    pub const fn logic_b(self) -> bool {
        self.0 & 0b10 != 0
    }

    /// Returns the channels exposed on `(Mux1, Mux2)` in this state.
    pub const fn channels(self) -> (Channel, Channel) {
        MUX_TABLE[self.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_after_four_states() {
        let mut selector = MuxSelector::default();
        let mut visited = [0_u8; SWEEP_LEN];
        for _ in 0..SWEEP_LEN {
            selector = selector.next();
            visited[selector.value() as usize] += 1;
        }
        assert_eq!(MuxSelector::new(0), selector, "Expected left but got right");
        assert_eq!([1; SWEEP_LEN], visited, "Each state should be visited once");
    }

    #[test]
    fn select_lines() {
        let levels = [0, 1, 2, 3].map(|n| {
            let selector = MuxSelector::new(n);
            (selector.logic_a(), selector.logic_b())
        });
        assert_eq!(
            [(false, false), (true, false), (false, true), (true, true)],
            levels,
            "Expected left but got right"
        );
    }

    #[test]
    fn table() {
        assert_eq!((Channel::MainKnob, Channel::Cv1), MuxSelector::new(0).channels());
        assert_eq!((Channel::XKnob, Channel::Cv2), MuxSelector::new(1).channels());
        assert_eq!((Channel::YKnob, Channel::Cv1), MuxSelector::new(2).channels());
        assert_eq!((Channel::Switch, Channel::Cv2), MuxSelector::new(3).channels());
    }
}
