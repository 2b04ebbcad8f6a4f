// src/io/osc/mod.rs
//
// Inbound OSC control channel.

mod receiver;

pub use receiver::{bind_listener, run_receiver, OscReceiverConfig};
