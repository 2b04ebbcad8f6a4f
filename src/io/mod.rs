// src/io/mod.rs
//
// I/O layer: inbound control sources (OSC, gamepad), the outbound serial
// link, the frame codec, and the shared error type.

pub mod codec;
mod error;
#[cfg(target_os = "linux")]
pub mod gamepad;
pub mod osc;
pub mod serial;

pub use codec::VALUE_MAX;
pub use error::IoError;

/// One inbound control update: a routing address and its raw value, exactly
/// as the source produced it. Range handling happens at dispatch, not here.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlEvent {
    pub address: String,
    pub value: i32,
}

/// Inbound sources hold a sender; the scheduler drains the receiver between
/// frames. The channel is unbounded on purpose: bursts are absorbed here and
/// collapsed to latest-value-wins when drained.
pub type EventSender = std::sync::mpsc::Sender<ControlEvent>;
pub type EventReceiver = std::sync::mpsc::Receiver<ControlEvent>;
