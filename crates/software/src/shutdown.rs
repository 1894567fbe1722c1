//! A stop signal shared by every long-running loop on the board.

use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    watch::{Receiver, Watch},
};

/// Broadcasts a request for running loops to wind down.
///
/// Once requested, the request stays in effect; each of the (up to `N`) [`ShutdownListener`]s observes it exactly as if
/// it had been waiting all along.
pub struct Shutdown<M: RawMutex, const N: usize> {
    requested: Watch<M, bool, N>,
}

impl<M: RawMutex, const N: usize> Shutdown<M, N> {
    /// Constructs a [`Shutdown`] that has not been requested.
    pub const fn new() -> Self {
        Self {
            requested: Watch::new_with(false),
        }
    }

    /// Asks every listener to stop.
    pub fn request(&self) {
        info!("Shutdown requested");
        self.requested.sender().send(true);
    }

    /// Hands out a listener, or `None` once all `N` have been taken.
    pub fn listener(&self) -> Option<ShutdownListener<'_, M, N>> {
        self.requested
            .receiver()
            .map(|receiver| ShutdownListener {
                receiver,
                stopped: false,
            })
    }
}

impl<M: RawMutex, const N: usize> Default for Shutdown<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The receiving end of a [`Shutdown`], owned by a single loop.
pub struct ShutdownListener<'a, M: RawMutex, const N: usize> {
    receiver: Receiver<'a, M, bool, N>,
    /// Latches the request, since the receiver only reports each change once.
    stopped: bool,
}

impl<M: RawMutex, const N: usize> ShutdownListener<'_, M, N> {
    /// Resolves once a shutdown has been requested.
    pub async fn requested(&mut self) {
        if !self.stopped {
            self.receiver.changed_and(|requested| *requested).await;
            self.stopped = true;
        }
    }

    /// Returns `true` if a shutdown has been requested, without waiting.
    pub fn is_requested(&mut self) -> bool {
        if !self.stopped {
            self.stopped = self
                .receiver
                .try_changed_and(|requested| *requested)
                .is_some();
        }
        self.stopped
    }
}
