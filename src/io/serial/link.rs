// src/io/serial/link.rs
//
// Connection lifecycle manager for the outbound serial link.
//
// USB serial endpoints disconnect under normal operating conditions (sleep,
// power loss, replug), so reconnection is a first-class loop here rather than
// error handling bolted onto the writer. The manager owns the port handle and
// lends write access to the scheduler for the duration of a connected
// session; any write failure invalidates the handle and returns control to
// the caller.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::io::error::IoError;
use crate::io::serial::{
    to_serialport_data_bits, to_serialport_parity, to_serialport_stop_bits, Parity,
};

/// How long a single open attempt may block before it counts as a failure.
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// Granularity of backoff and settle waits, so an interrupt lands within one
/// slice instead of riding out the full retry schedule.
const WAIT_SLICE: Duration = Duration::from_millis(50);

// ============================================================================
// Types and Configuration
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Debug)]
pub struct SerialLinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Open attempts before `connect` gives up with a fatal `Setup` error.
    pub max_retries: u32,
    /// Fixed wait between failed open attempts.
    pub retry_backoff: Duration,
    /// Wait after a successful open. Boards that reset on USB serial open
    /// (Teensy, most Arduinos) drop the first bytes written before the reset
    /// finishes.
    pub settle_delay: Duration,
}

/// Owns the serial handle and its `Disconnected → Connecting → Connected`
/// lifecycle.
pub struct SerialLink {
    config: SerialLinkConfig,
    handle: Option<Box<dyn SerialPort>>,
    state: LinkState,
}

// ============================================================================
// Retry helper
// ============================================================================

/// Drive `attempt` up to `max_retries` times with a fixed backoff between
/// failures. The wait function is injected so tests can count backoff waits
/// without sleeping; it returns `false` to abort the retry loop (operator
/// interrupt), which surfaces as a recoverable error rather than the fatal
/// `Setup` of an exhausted ceiling.
pub(crate) fn retry_connect<T, F, W>(
    device: &str,
    max_retries: u32,
    backoff: Duration,
    mut attempt: F,
    wait: &mut W,
) -> Result<T, IoError>
where
    F: FnMut() -> Result<T, IoError>,
    W: FnMut(Duration) -> bool,
{
    let attempts = max_retries.max(1);
    for n in 1..=attempts {
        match attempt() {
            Ok(t) => return Ok(t),
            Err(e) => {
                tlog!("[serial] connect attempt {}/{} failed: {}", n, attempts, e);
                if n < attempts && !wait(backoff) {
                    return Err(IoError::connection(device, "connect interrupted"));
                }
            }
        }
    }
    Err(IoError::setup(format!(
        "{}: unavailable after {} attempts",
        device, attempts
    )))
}

/// Sleep for `total` in slices, returning `false` as soon as `cancel` is set.
fn sliced_wait(total: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}

// ============================================================================
// SerialLink
// ============================================================================

impl SerialLink {
    pub fn new(config: SerialLinkConfig) -> Self {
        SerialLink {
            config,
            handle: None,
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Open the port, retrying with backoff up to the configured ceiling.
    /// Exhausting the ceiling is fatal (`Setup`); the caller is expected to
    /// terminate, not loop. Backoff and settle waits watch `cancel` and abort
    /// with a recoverable error, so an interrupt while the device is away
    /// never waits out the remaining schedule.
    pub fn connect(&mut self, cancel: &AtomicBool) -> Result<(), IoError> {
        self.connect_with(&mut |d| sliced_wait(d, cancel))
    }

    fn connect_with<W: FnMut(Duration) -> bool>(&mut self, wait: &mut W) -> Result<(), IoError> {
        if self.state == LinkState::Connected {
            return Ok(());
        }
        self.state = LinkState::Connecting;

        let cfg = self.config.clone();
        let opened = retry_connect(
            &cfg.port,
            cfg.max_retries,
            cfg.retry_backoff,
            || {
                serialport::new(&cfg.port, cfg.baud_rate)
                    .data_bits(to_serialport_data_bits(cfg.data_bits))
                    .stop_bits(to_serialport_stop_bits(cfg.stop_bits))
                    .parity(to_serialport_parity(cfg.parity))
                    .timeout(OPEN_TIMEOUT)
                    .open()
                    .map_err(|e| IoError::connection(&cfg.port, e))
            },
            wait,
        );

        match opened {
            Ok(handle) => {
                if !cfg.settle_delay.is_zero() && !wait(cfg.settle_delay) {
                    self.state = LinkState::Disconnected;
                    return Err(IoError::connection(&cfg.port, "connect interrupted"));
                }
                self.handle = Some(handle);
                self.state = LinkState::Connected;
                tlog!("[serial] connected to {} at {} baud", cfg.port, cfg.baud_rate);
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                Err(e)
            }
        }
    }

    /// Drop the handle and return to `Disconnected`. Idempotent.
    pub fn invalidate(&mut self) {
        if self.handle.take().is_some() {
            tlog!("[serial] link to {} invalidated", self.config.port);
        }
        self.state = LinkState::Disconnected;
    }

    /// Write one whole frame. Any I/O failure invalidates the handle so the
    /// caller falls back into the reconnect path.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), IoError> {
        let port = self
            .handle
            .as_mut()
            .ok_or_else(|| IoError::connection(&self.config.port, "not connected"))?;

        let result = port.write_all(frame).and_then(|_| port.flush());
        if let Err(e) = result {
            self.invalidate();
            return Err(IoError::write(&self.config.port, e));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flaky_attempt(failures: u32) -> impl FnMut() -> Result<u32, IoError> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls <= failures {
                Err(IoError::connection("/dev/fake", "no such device"))
            } else {
                Ok(calls)
            }
        }
    }

    #[test]
    fn test_retry_counts_one_backoff_per_failure() {
        let mut waits = 0;
        let result = retry_connect(
            "/dev/fake",
            5,
            Duration::from_secs(10),
            flaky_attempt(3),
            &mut |_| {
                waits += 1;
                true
            },
        );
        assert_eq!(result.unwrap(), 4);
        assert_eq!(waits, 3);
    }

    #[test]
    fn test_retry_immediate_success_never_waits() {
        let mut waits = 0;
        let result = retry_connect(
            "/dev/fake",
            5,
            Duration::from_secs(10),
            flaky_attempt(0),
            &mut |_| {
                waits += 1;
                true
            },
        );
        assert!(result.is_ok());
        assert_eq!(waits, 0);
    }

    #[test]
    fn test_retry_ceiling_is_fatal_setup_error() {
        let mut waits = 0;
        let result: Result<u32, _> = retry_connect(
            "/dev/fake",
            3,
            Duration::from_secs(10),
            flaky_attempt(99),
            &mut |_| {
                waits += 1;
                true
            },
        );
        let err = result.unwrap_err();
        assert!(matches!(err, IoError::Setup { .. }));
        assert!(!err.is_recoverable());
        // No wait after the final failure.
        assert_eq!(waits, 2);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let result = retry_connect(
            "/dev/fake",
            0,
            Duration::ZERO,
            flaky_attempt(0),
            &mut |_| true,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_interrupted_wait_aborts_retries_recoverably() {
        // An aborted wait ends the retry loop immediately with a recoverable
        // error, not the fatal Setup of an exhausted ceiling.
        let mut attempts_made = 0;
        let result: Result<u32, _> = retry_connect(
            "/dev/fake",
            5,
            Duration::from_secs(10),
            || {
                attempts_made += 1;
                Err(IoError::connection("/dev/fake", "no such device"))
            },
            &mut |_| false,
        );
        let err = result.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(attempts_made, 1);
    }

    #[test]
    fn test_sliced_wait_returns_early_when_cancelled() {
        let cancel = AtomicBool::new(true);
        let start = Instant::now();
        assert!(!sliced_wait(Duration::from_secs(10), &cancel));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_link_starts_disconnected_and_invalidate_is_idempotent() {
        let mut link = SerialLink::new(SerialLinkConfig {
            port: "/dev/fake".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            max_retries: 1,
            retry_backoff: Duration::ZERO,
            settle_delay: Duration::ZERO,
        });
        assert_eq!(link.state(), LinkState::Disconnected);
        link.invalidate();
        link.invalidate();
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_write_without_connection_fails_recoverably() {
        let mut link = SerialLink::new(SerialLinkConfig {
            port: "/dev/fake".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            max_retries: 1,
            retry_backoff: Duration::ZERO,
            settle_delay: Duration::ZERO,
        });
        let err = link.write_frame(&[254, 0, 255]).unwrap_err();
        assert!(err.is_recoverable());
    }
}
