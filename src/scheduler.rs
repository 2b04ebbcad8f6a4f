// src/scheduler.rs
//
// The heart of the bridge: the drain/transmit cycle and its fixed cadence.
//
// Inbound events arrive whenever they like; frames leave at exactly one per
// period. Each tick drains everything queued since the last tick into the
// parameter vector (latest value per slot wins), then transmits a single
// snapshot. A silent inbound channel still produces a frame per tick, and a
// flooding one still produces only one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatch::{dispatch, AddressTable};
use crate::io::codec::{FrameCodec, ParamFrameCodec};
use crate::io::serial::SerialLink;
use crate::io::{EventReceiver, IoError};
use crate::params::ParamVector;

/// Granularity of the deadline wait, so shutdown is never more than one
/// slice away even at low frame rates.
const WAIT_SLICE: Duration = Duration::from_millis(1);

// ============================================================================
// Pacing
// ============================================================================

/// Fixed-cadence deadline generator. Each deadline is derived from the
/// previous scheduled deadline, never from the current time, so per-tick
/// jitter does not accumulate into drift: after N ticks the Nth deadline is
/// exactly `start + N * period` regardless of when the ticks actually ran.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    next_deadline: Instant,
}

impl Pacer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Pacer {
            period,
            next_deadline: now + period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Schedule the next tick, one period after the one just served.
    pub fn advance(&mut self) {
        self.next_deadline += self.period;
    }
}

// ============================================================================
// Frame sink
// ============================================================================

/// Where finished snapshots go. The production sink is the serial link;
/// tests substitute a collector.
pub trait FrameSink {
    fn send_snapshot(&mut self, payload: &[u8]) -> Result<(), IoError>;
}

impl FrameSink for SerialLink {
    fn send_snapshot(&mut self, payload: &[u8]) -> Result<(), IoError> {
        let frame = ParamFrameCodec::encode(payload);
        self.write_frame(&frame)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Owns the authoritative parameter vector and the receiving end of the
/// event channel. Single owner, no locking: sources only ever hold senders.
pub struct Scheduler {
    table: AddressTable,
    params: ParamVector,
    rx: EventReceiver,
}

impl Scheduler {
    pub fn new(table: AddressTable, params: ParamVector, rx: EventReceiver) -> Self {
        Scheduler { table, params, rx }
    }

    /// Apply every queued event to the parameter vector. Returns the number
    /// of events consumed. Later events for the same slot overwrite earlier
    /// ones; untracked addresses fall through without effect.
    fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(ev) = self.rx.try_recv() {
            applied += 1;
            if let Err(e) = dispatch(&self.table, &mut self.params, &ev.address, ev.value) {
                // A resolvable address pointing past the vector means the
                // table and vector were built from different route lists.
                tlog!("[scheduler] dropped event for '{}': {}", ev.address, e);
            }
        }
        applied
    }

    /// One full cycle: drain, then transmit the current snapshot.
    pub fn tick<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), IoError> {
        self.drain();
        sink.send_snapshot(self.params.snapshot())
    }
}

// ============================================================================
// Bridge loop
// ============================================================================

/// Run the paced transmit loop over one serial session. Returns `Ok` on
/// cancellation, or the first unrecoverable-at-this-level write error so the
/// caller can reconnect.
fn run_connected(
    scheduler: &mut Scheduler,
    link: &mut SerialLink,
    period: Duration,
    cancel: &Arc<AtomicBool>,
) -> Result<(), IoError> {
    let mut pacer = Pacer::new(period, Instant::now());
    loop {
        // Sleep in slices so a cancel request lands promptly.
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= pacer.deadline() {
                break;
            }
            std::thread::sleep((pacer.deadline() - now).min(WAIT_SLICE));
        }
        scheduler.tick(link)?;
        pacer.advance();
    }
}

/// Top-level serial side: connect, pace frames, and on a recoverable I/O
/// failure tear the session down and reconnect. Only setup failures (the
/// retry ceiling, a bad port name) propagate out and end the bridge.
pub fn run_bridge(
    mut scheduler: Scheduler,
    mut link: SerialLink,
    period: Duration,
    cancel: Arc<AtomicBool>,
) -> Result<(), IoError> {
    while !cancel.load(Ordering::Relaxed) {
        if let Err(e) = link.connect(&cancel) {
            // An interrupt during the retry schedule aborts the connect; the
            // flag check turns it into a clean shutdown instead of an error.
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            return Err(e);
        }
        match run_connected(&mut scheduler, &mut link, period, &cancel) {
            Ok(()) => break,
            Err(e) if e.is_recoverable() => {
                tlog!("[bridge] serial session lost ({}), reconnecting", e);
                link.invalidate();
            }
            Err(e) => return Err(e),
        }
    }
    tlog!("[bridge] transmit loop stopped");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
