// src/io/gamepad/reader.rs
//
// Gamepad discovery, event pump, and keep-alive pulse.
//
// The endpoint is a wireless controller that comes and goes under normal
// conditions (power saving, out of range), so discovery retries indefinitely
// with a fixed backoff. Unlike the serial link there is no retry ceiling,
// because a missing controller is not fatal to the bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evdev::{Device, EventType, FFEffect, FFEffectData, FFEffectKind, FFReplay, FFTrigger};

use crate::io::gamepad::map::event_name;
use crate::io::{ControlEvent, EventSender};

/// How often the event loop wakes to re-check the cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Keep-alive pulse length and magnitudes. Short and weak: the point is to
/// reset the controller's idle timer, not to be felt.
const PULSE_LENGTH_MS: u16 = 150;
const PULSE_STRONG: u16 = 0x0800;
const PULSE_WEAK: u16 = 0x0400;

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    /// Substring matched against evdev device names.
    pub name: String,
    /// Prefix joined with the mapped event name to form the address.
    pub route_prefix: String,
    /// Wait between discovery scans while the controller is absent.
    pub scan_backoff: Duration,
    /// Interval between keep-alive pulses. Zero disables the pulse.
    pub keepalive: Duration,
}

/// Discover the controller, pump its events into the channel, and rediscover
/// on loss. Runs until cancelled.
pub async fn run_reader(config: GamepadConfig, tx: EventSender, cancel: Arc<AtomicBool>) {
    while !cancel.load(Ordering::Relaxed) {
        let device = match find_device(&config.name) {
            Some((path, device)) => {
                tlog!(
                    "[gamepad] found '{}' at {}",
                    device.name().unwrap_or("?"),
                    path.display()
                );
                device
            }
            None => {
                tlog!(
                    "[gamepad] '{}' not found, retrying in {:?}",
                    config.name,
                    config.scan_backoff
                );
                tokio::time::sleep(config.scan_backoff).await;
                continue;
            }
        };

        run_session(device, &config, &tx, &cancel).await;
    }
    tlog!("[gamepad] reader stopped");
}

/// Scan available input devices for a name match, in discovery order.
fn find_device(name: &str) -> Option<(std::path::PathBuf, Device)> {
    evdev::enumerate().find(|(_, device)| device.name().is_some_and(|n| n.contains(name)))
}

/// Pump one connected session. Returns when the device is lost (to
/// rediscover) or the bridge is cancelled.
async fn run_session(
    mut device: Device,
    config: &GamepadConfig,
    tx: &EventSender,
    cancel: &Arc<AtomicBool>,
) {
    let mut rumble = if config.keepalive.is_zero() {
        None
    } else {
        upload_pulse_effect(&mut device)
    };

    let mut stream = match device.into_event_stream() {
        Ok(s) => s,
        Err(e) => {
            tlog!("[gamepad] failed to open event stream: {}", e);
            return;
        }
    };

    // Long interval when the pulse is disabled so the select arm stays cheap.
    let keepalive_period = if config.keepalive.is_zero() {
        Duration::from_secs(3600)
    } else {
        config.keepalive
    };
    let mut keepalive = tokio::time::interval(keepalive_period);
    keepalive.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            ev = stream.next_event() => match ev {
                Ok(ev) => forward_event(&ev, config, tx),
                Err(e) => {
                    tlog!("[gamepad] device lost ({}); rescanning", e);
                    return;
                }
            },
            _ = keepalive.tick() => {
                if let Some(ref mut effect) = rumble {
                    // Never fatal: a controller that refuses the pulse still works.
                    if let Err(e) = effect.play(1) {
                        tlog!("[gamepad] keep-alive pulse failed: {}", e);
                    }
                }
            }
            _ = tokio::time::sleep(CANCEL_POLL) => {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
            }
        }
    }
}

fn forward_event(ev: &evdev::InputEvent, config: &GamepadConfig, tx: &EventSender) {
    if ev.event_type() == EventType::SYNCHRONIZATION {
        return;
    }
    if let Some(name) = event_name(ev.event_type().0, ev.code()) {
        let _ = tx.send(ControlEvent {
            address: format!("{}/{}", config.route_prefix, name),
            value: ev.value(),
        });
    }
}

/// Upload the short low-intensity rumble used as a keep-alive. Controllers
/// without force feedback just skip the pulse.
fn upload_pulse_effect(device: &mut Device) -> Option<FFEffect> {
    let data = FFEffectData {
        direction: 0,
        trigger: FFTrigger::default(),
        replay: FFReplay {
            length: PULSE_LENGTH_MS,
            delay: 0,
        },
        kind: FFEffectKind::Rumble {
            strong_magnitude: PULSE_STRONG,
            weak_magnitude: PULSE_WEAK,
        },
    };
    match device.upload_ff_effect(data) {
        Ok(effect) => Some(effect),
        Err(e) => {
            tlog!("[gamepad] no keep-alive pulse (force feedback unavailable: {})", e);
            None
        }
    }
}
