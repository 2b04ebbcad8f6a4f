// src/params.rs
//
// Parameter state buffer: the single authoritative snapshot of every tracked
// parameter, stored as clamped bytes ready for framing.
//
// The vector is created once at startup and never resized. It has exactly one
// writer (the dispatcher, called from the scheduler's drain phase) and one
// reader (the frame encoder, called from the transmit phase); both run on the
// same loop, so no lock guards it.

use crate::io::{IoError, VALUE_MAX};

/// Clamp an inbound integer into the valid payload range.
///
/// 254 and 255 alias the frame markers; a payload byte carrying either would
/// desynchronise the receiver's framing with no recovery short of a restart.
/// Out-of-range input is therefore normalised, never rejected.
pub fn clamp_value(raw: i32) -> u8 {
    raw.clamp(0, VALUE_MAX as i32) as u8
}

/// Fixed-size, named-slot byte vector holding the latest known value of every
/// tracked parameter.
pub struct ParamVector {
    names: Vec<String>,
    values: Vec<u8>,
}

impl ParamVector {
    /// Build the vector from `(name, default)` pairs. Defaults are clamped so
    /// a misconfigured default can never alias a marker byte.
    pub fn new<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = (String, u8)>,
    {
        let (names, values) = slots
            .into_iter()
            .map(|(name, default)| (name, default.min(VALUE_MAX)))
            .unzip();
        ParamVector { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Slot name, for diagnostics.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Store a clamped value. An out-of-range index fails with `InvalidSlot`
    /// and leaves the vector untouched.
    pub fn set(&mut self, index: usize, raw: i32) -> Result<(), IoError> {
        let len = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = clamp_value(raw);
                Ok(())
            }
            None => Err(IoError::invalid_slot(index, len)),
        }
    }

    /// The ordered payload bytes. Never blocks, never fails.
    pub fn snapshot(&self) -> &[u8] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vector() -> ParamVector {
        ParamVector::new(
            [("brightness", 90u8), ("radius", 253), ("palette", 0)]
                .into_iter()
                .map(|(n, d)| (n.to_string(), d)),
        )
    }

    #[test]
    fn test_clamp_value_bounds() {
        assert_eq!(clamp_value(-1), 0);
        assert_eq!(clamp_value(0), 0);
        assert_eq!(clamp_value(253), 253);
        assert_eq!(clamp_value(254), 253);
        assert_eq!(clamp_value(500), 253);
        assert_eq!(clamp_value(i32::MIN), 0);
        assert_eq!(clamp_value(i32::MAX), 253);
    }

    #[test]
    fn test_set_clamps_before_storing() {
        let mut params = test_vector();
        params.set(0, 500).unwrap();
        assert_eq!(params.snapshot()[0], 253);
        params.set(0, -10).unwrap();
        assert_eq!(params.snapshot()[0], 0);
        params.set(0, 42).unwrap();
        assert_eq!(params.snapshot()[0], 42);
    }

    #[test]
    fn test_set_bad_index_is_noop() {
        let mut params = test_vector();
        let before = params.snapshot().to_vec();
        let err = params.set(3, 100).unwrap_err();
        assert!(matches!(err, IoError::InvalidSlot { index: 3, len: 3 }));
        assert_eq!(params.snapshot(), before.as_slice());
    }

    #[test]
    fn test_defaults_are_clamped() {
        let params = ParamVector::new(vec![("bad".to_string(), 255u8)]);
        assert_eq!(params.snapshot(), &[253]);
    }

    #[test]
    fn test_names() {
        let params = test_vector();
        assert_eq!(params.name(1), Some("radius"));
        assert_eq!(params.name(9), None);
        assert_eq!(params.len(), 3);
        assert!(!params.is_empty());
    }
}
