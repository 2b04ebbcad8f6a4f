// src/io/error.rs
//
// Typed I/O errors for the bridge. Recoverable conditions (endpoint loss,
// failed reads/writes) are distinguished from fatal setup failures at the
// type level so callers can decide between reconnecting and exiting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// The endpoint could not be opened or was lost. Retried by the
    /// connection lifecycle manager.
    #[error("{device}: connection failed: {msg}")]
    Connection { device: String, msg: String },

    #[error("{device}: read failed: {msg}")]
    Read { device: String, msg: String },

    #[error("{device}: write failed: {msg}")]
    Write { device: String, msg: String },

    /// Malformed wire data (bad markers, wrong length).
    #[error("{device}: protocol error: {msg}")]
    Protocol { device: String, msg: String },

    /// Fatal: an endpoint stayed unavailable past the retry ceiling, or a
    /// listening socket could not be bound. Terminates the process.
    #[error("setup failed: {msg}")]
    Setup { msg: String },

    /// A slot index outside the parameter vector. The vector is never
    /// partially mutated on this error.
    #[error("invalid parameter slot {index} (vector has {len} slots)")]
    InvalidSlot { index: usize, len: usize },
}

impl IoError {
    pub fn connection(device: impl Into<String>, msg: impl ToString) -> Self {
        IoError::Connection {
            device: device.into(),
            msg: msg.to_string(),
        }
    }

    pub fn read(device: impl Into<String>, msg: impl ToString) -> Self {
        IoError::Read {
            device: device.into(),
            msg: msg.to_string(),
        }
    }

    pub fn write(device: impl Into<String>, msg: impl ToString) -> Self {
        IoError::Write {
            device: device.into(),
            msg: msg.to_string(),
        }
    }

    pub fn protocol(device: impl Into<String>, msg: impl ToString) -> Self {
        IoError::Protocol {
            device: device.into(),
            msg: msg.to_string(),
        }
    }

    pub fn setup(msg: impl ToString) -> Self {
        IoError::Setup {
            msg: msg.to_string(),
        }
    }

    pub fn invalid_slot(index: usize, len: usize) -> Self {
        IoError::InvalidSlot { index, len }
    }

    /// Whether reconnecting the endpoint can clear this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IoError::Connection { .. } | IoError::Read { .. } | IoError::Write { .. }
        )
    }
}

impl From<IoError> for String {
    fn from(e: IoError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_is_recoverable() {
        assert!(IoError::write("/dev/ttyACM0", "broken pipe").is_recoverable());
    }

    #[test]
    fn test_setup_is_fatal() {
        assert!(!IoError::setup("port unavailable after 5 attempts").is_recoverable());
        assert!(!IoError::invalid_slot(99, 12).is_recoverable());
    }

    #[test]
    fn test_display_includes_device() {
        let msg: String = IoError::connection("/dev/ttyACM0", "no such device").into();
        assert!(msg.contains("/dev/ttyACM0"));
        assert!(msg.contains("no such device"));
    }
}
