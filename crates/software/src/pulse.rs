//! Falling-edge detection for the two pulse inputs.
//!
//! The interrupt side (a task awaiting the pin's falling edge) reports each edge with [`PulseEdgeWatcher::notify()`].
//! Edges pass a per-channel [`Debouncer`] and land in a one-slot queue; application tasks consume them with
//! [`PulseEdgeWatcher::wait()`] or hand a handler to [`PulseEdgeWatcher::handle()`]. Nothing is shared with the
//! interrupt side apart from the queue itself and the (briefly locked) debounce state.

use crate::shutdown::ShutdownListener;
use core::{cell::RefCell, future::Future};
use embassy_futures::select::{Either, select};
use embassy_sync::{
    blocking_mutex::{self, raw::RawMutex},
    channel::Channel,
};
use embassy_time::{Duration, Instant};

/// At most one edge per channel waits to be consumed.
const EDGE_QUEUE_DEPTH: usize = 1;

/// One of the two pulse inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseChannel {
    /// Pulse input 1.
    One,
    /// Pulse input 2.
    Two,
}

impl PulseChannel {
    /// Both channels, in order.
    pub const ALL: [PulseChannel; 2] = [PulseChannel::One, PulseChannel::Two];

    const fn index(self) -> usize {
        match self {
            PulseChannel::One => 0,
            PulseChannel::Two => 1,
        }
    }
}

/// A falling edge that made it through debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvent {
    /// Where the edge occurred.
    pub channel: PulseChannel,
    /// When the edge occurred.
    pub at: Instant,
}

/// Where a [`Debouncer`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// Listening; the next edge is accepted.
    Idle,
    /// An edge was accepted recently; edges before `until` are dropped.
    Suppressed {
        /// End of the suppression window.
        until: Instant,
    },
}

/// Per-channel debounce bookkeeping.
///
/// An accepted edge opens a suppression window; edges arriving inside it are dropped, and the first edge at or after its
/// end is accepted again. Dropping the second of two close edges is the intended denoising, not a lost event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    state: DebounceState,
    last_trigger: Option<Instant>,
}

impl Debouncer {
    /// Constructs an idle [`Debouncer`].
    pub const fn new() -> Self {
        Self {
            state: DebounceState::Idle,
            last_trigger: None,
        }
    }

    /// Decides whether an edge at `at` counts, opening a new window of length `window` if it does.
    pub fn accept(&mut self, at: Instant, window: Duration) -> bool {
        if let DebounceState::Suppressed { until } = self.state {
            if at < until {
                return false;
            }
        }

        self.state = DebounceState::Suppressed { until: at + window };
        self.last_trigger = Some(at);
        true
    }

    /// Getter.
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Returns when the last accepted edge occurred, if any.
    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// Debounces falling edges on both pulse inputs and delivers them to waiting tasks.
pub struct PulseEdgeWatcher<M: RawMutex> {
    debounce: Duration,
    debouncers: blocking_mutex::Mutex<M, RefCell<[Debouncer; 2]>>,
    edges: [Channel<M, EdgeEvent, EDGE_QUEUE_DEPTH>; 2],
}

impl<M: RawMutex> PulseEdgeWatcher<M> {
    /// Constructs a [`PulseEdgeWatcher`] that ignores edges for `debounce` after each accepted one.
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            debouncers: blocking_mutex::Mutex::new(RefCell::new([Debouncer::new(); 2])),
            edges: [Channel::new(), Channel::new()],
        }
    }

    /// Getter.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Reports a falling edge seen on `channel` at `at`. Returns `true` if it was queued for consumers.
    ///
    /// Edges inside the debounce window are dropped, as are edges arriving while an earlier one is still waiting to be
    /// consumed. Never blocks, so it is safe to call from the edge-detecting task.
    pub fn notify(&self, channel: PulseChannel, at: Instant) -> bool {
        let accepted = self.debouncers.lock(|debouncers| {
            debouncers.borrow_mut()[channel.index()].accept(at, self.debounce)
        });
        if !accepted {
            return false;
        }

        match self.edges[channel.index()].try_send(EdgeEvent { channel, at }) {
            Ok(()) => true,
            Err(_) => {
                debug!("Edge on {} dropped; previous edge not consumed yet", channel);
                false
            }
        }
    }

    /// Returns a snapshot of a channel's debounce bookkeeping.
    pub fn debouncer(&self, channel: PulseChannel) -> Debouncer {
        self.debouncers
            .lock(|debouncers| debouncers.borrow()[channel.index()])
    }

    /// Waits for the next edge on `channel`. Each edge is delivered once.
    pub async fn wait(&self, channel: PulseChannel) -> EdgeEvent {
        self.edges[channel.index()].receive().await
    }

    /// Takes the pending edge on `channel`, if there is one.
    pub fn try_take(&self, channel: PulseChannel) -> Option<EdgeEvent> {
        self.edges[channel.index()].try_receive().ok()
    }

    /// Runs `handler` once per edge on `channel` until a shutdown is requested.
    ///
    /// An edge already waiting when the shutdown arrives is still handled.
    pub async fn handle<F, Fut, const N: usize>(
        &self,
        channel: PulseChannel,
        mut handler: F,
        shutdown: &mut ShutdownListener<'_, M, N>,
    ) where
        F: FnMut(EdgeEvent) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("Handling edges on {}", channel);
        loop {
            match select(self.wait(channel), shutdown.requested()).await {
                Either::First(edge) => handler(edge).await,
                Either::Second(()) => {
                    info!("Stopped handling edges on {}", channel);
                    return;
                }
            }
        }
    }
}
