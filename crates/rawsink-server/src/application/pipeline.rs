//! Pipeline: the event queue and the drain loop.
//!
//! The capture callback runs on the OS message thread and must return quickly,
//! so it only decodes and enqueues.  Everything else (key state tracking,
//! encoding, network I/O) happens on the drain thread:
//!
//! ```text
//! capture thread                      drain thread
//! ──────────────                      ────────────
//! decode ─▶ EventProducer::enqueue ─▶ recv_timeout ─▶ KeyStateTracker ─▶ encode ─▶ Transport
//! ```
//!
//! # Architecture
//!
//! The drain loop depends only on the [`Transport`] trait.  The infrastructure
//! implementation is the UDP broadcaster; tests inject a recording fake.
//!
//! The tracker and the transport are *moved* into the drain thread, so neither
//! needs a lock.  When the loop stops it hands the transport back through the
//! join handle and the caller closes it; the socket is therefore never closed
//! while a send is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rawsink_core::{encode_message, KeyStateTracker, KeyTransition, KeyboardEvent};
use tracing::{debug, info, trace, warn};

/// Default upper bound on how long one drain iteration waits for an event.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Name of the background drain thread.
pub const DRAIN_THREAD_NAME: &str = "rawsink-drain";

/// Capability to accept decoded events from the capture side.
///
/// Implementations must never block.
pub trait EventSink {
    fn enqueue(&self, event: KeyboardEvent);
}

/// Best-effort delivery of one encoded datagram.
///
/// Returns `false` on any failure; the caller logs and moves on.
pub trait Transport: Send {
    fn try_send(&mut self, datagram: &[u8]) -> bool;
}

/// Drain loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOptions {
    /// Maximum wait for the next event before re-checking the running flag.
    pub poll_interval: Duration,
    /// Log every sent event at `info` and every send failure at `warn`.
    pub verbose: bool,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            verbose: false,
        }
    }
}

/// Counters accumulated by one drain loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Events that passed the tracker and were handed to the transport successfully.
    pub forwarded: u64,
    /// Key-repeat down-events dropped by the tracker.
    pub suppressed: u64,
    /// Forwarded events the transport failed to send.
    pub send_failures: u64,
    /// Events still queued when the loop was stopped.
    pub discarded: u64,
    /// Devices that still had a key held when the loop stopped.
    pub devices_with_held_keys: usize,
}

/// What the drain thread returns when it stops.
#[derive(Debug)]
pub struct DrainOutcome<T> {
    pub transport: T,
    pub stats: DrainStats,
}

/// Cloneable, non-blocking producer side of the event queue.
#[derive(Debug, Clone)]
pub struct EventProducer {
    tx: Sender<KeyboardEvent>,
}

impl EventSink for EventProducer {
    fn enqueue(&self, event: KeyboardEvent) {
        if self.tx.send(event).is_err() {
            trace!("drain loop has stopped; dropping {}", event);
        }
    }
}

/// Consumer side of the event queue plus everything the drain thread owns.
pub struct DrainLoop<T> {
    rx: Receiver<KeyboardEvent>,
    transport: T,
    tracker: KeyStateTracker,
    options: DrainOptions,
    stats: DrainStats,
}

/// A freshly wired pipeline, ready to be split into its two halves.
pub struct Pipeline<T> {
    producer: EventProducer,
    drain: DrainLoop<T>,
}

impl<T: Transport> Pipeline<T> {
    /// Creates the unbounded queue and binds its consumer to `transport`.
    pub fn new(transport: T, options: DrainOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            producer: EventProducer { tx },
            drain: DrainLoop {
                rx,
                transport,
                tracker: KeyStateTracker::new(),
                options,
                stats: DrainStats::default(),
            },
        }
    }

    /// Returns a producer handle for the capture side.
    pub fn producer(&self) -> EventProducer {
        self.producer.clone()
    }

    /// Splits the pipeline into its producer and consumer halves.
    pub fn split(self) -> (EventProducer, DrainLoop<T>) {
        (self.producer, self.drain)
    }
}

impl<T: Transport + 'static> DrainLoop<T> {
    /// Runs the loop on a named background thread.
    ///
    /// The thread stops when `running` is cleared or every producer has been
    /// dropped, and returns the transport and stats through the join handle.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<DrainOutcome<T>>> {
        thread::Builder::new()
            .name(DRAIN_THREAD_NAME.to_string())
            .spawn(move || self.run(&running))
    }
}

impl<T: Transport> DrainLoop<T> {
    /// Runs the loop on the calling thread until `running` is cleared or every
    /// producer has been dropped.
    pub fn run(mut self, running: &AtomicBool) -> DrainOutcome<T> {
        debug!(poll_interval = ?self.options.poll_interval, "drain loop started");

        while running.load(Ordering::Relaxed) {
            match self.rx.recv_timeout(self.options.poll_interval) {
                Ok(event) => self.process(&event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("all event producers dropped; drain loop exiting");
                    break;
                }
            }
        }

        self.stats.discarded = self.rx.try_iter().count() as u64;
        self.stats.devices_with_held_keys = self.tracker.active_devices();
        info!(
            forwarded = self.stats.forwarded,
            suppressed = self.stats.suppressed,
            send_failures = self.stats.send_failures,
            discarded = self.stats.discarded,
            devices_with_held_keys = self.stats.devices_with_held_keys,
            "drain loop stopped"
        );

        DrainOutcome {
            transport: self.transport,
            stats: self.stats,
        }
    }

    /// Applies the tracker rule to one event and sends it if it is forwarded.
    fn process(&mut self, event: &KeyboardEvent) {
        if self.tracker.apply(event) == KeyTransition::Suppress {
            self.stats.suppressed += 1;
            trace!("suppressed key-repeat {}", event);
            return;
        }

        let datagram = encode_message(event);
        if self.transport.try_send(&datagram) {
            self.stats.forwarded += 1;
            if self.options.verbose {
                info!("Sent {}", event);
            } else {
                trace!("sent {}", event);
            }
        } else {
            self.stats.send_failures += 1;
            if self.options.verbose {
                warn!("Failed to send {}", event);
            } else {
                debug!("failed to send {}", event);
            }
        }
    }
}
