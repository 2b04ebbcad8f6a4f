// src/io/codec.rs
//
// Frame codec trait and the parameter-frame implementation.
//
// The wire format is deliberately trivial so the microcontroller can resync
// on a single byte: a start marker, one payload byte per parameter slot, and
// an end marker. Payload bytes are clamped to [0, 253] before they reach the
// encoder, so the marker values never appear inside the payload.

use crate::io::error::IoError;

/// Start-of-frame marker.
pub const FRAME_START: u8 = 254;
/// End-of-frame marker.
pub const FRAME_END: u8 = 255;
/// Largest value a payload byte may carry without aliasing a marker.
pub const VALUE_MAX: u8 = 253;

// ============================================================================
// Frame Codec Trait
// ============================================================================

/// Trait for wire frame codecs.
///
/// `encode` is pure and infallible: the parameter buffer guarantees in-range
/// bytes, so there is no failure mode. `decode` validates framing and is used
/// for diagnostics and tests.
pub trait FrameCodec {
    /// The raw frame type for decoding (e.g., byte slice)
    type RawFrame: ?Sized;

    /// The encoded frame type for transmission
    type EncodedFrame;

    /// Decode a raw frame, returning the payload bytes.
    fn decode(raw: &Self::RawFrame) -> Result<Vec<u8>, IoError>;

    /// Encode a payload snapshot for the wire.
    fn encode(payload: &[u8]) -> Self::EncodedFrame;
}

// ============================================================================
// Parameter Frame Codec
// ============================================================================

/// Codec for the bridge's parameter frames: `[254, payload.., 255]`.
pub struct ParamFrameCodec;

impl FrameCodec for ParamFrameCodec {
    type RawFrame = [u8];
    type EncodedFrame = Vec<u8>;

    /// Validate markers and return the payload between them.
    fn decode(raw: &[u8]) -> Result<Vec<u8>, IoError> {
        if raw.len() < 2 {
            return Err(IoError::protocol(
                "frame",
                format!("frame too short: {} bytes, need at least 2", raw.len()),
            ));
        }
        if raw[0] != FRAME_START {
            return Err(IoError::protocol(
                "frame",
                format!("bad start marker: {:#04x}", raw[0]),
            ));
        }
        if raw[raw.len() - 1] != FRAME_END {
            return Err(IoError::protocol(
                "frame",
                format!("bad end marker: {:#04x}", raw[raw.len() - 1]),
            ));
        }
        let payload = &raw[1..raw.len() - 1];
        if let Some(&b) = payload.iter().find(|&&b| b > VALUE_MAX) {
            return Err(IoError::protocol(
                "frame",
                format!("marker byte {:#04x} inside payload", b),
            ));
        }
        Ok(payload.to_vec())
    }

    /// Frame a payload snapshot. Output length is always `payload.len() + 2`.
    fn encode(payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(payload.len() + 2);
        frame.push(FRAME_START);
        frame.extend_from_slice(payload);
        frame.push(FRAME_END);
        frame
    }
}

// ============================================================================
// Tests
// ============================================================================
