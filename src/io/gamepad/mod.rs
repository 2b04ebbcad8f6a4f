// src/io/gamepad/mod.rs
//
// Alternative inbound source: a gamepad's raw evdev event stream, mapped to
// the same (address, value) shape the dispatcher consumes. Linux only.

mod map;
mod reader;

pub use map::event_name;
pub use reader::{run_reader, GamepadConfig};
