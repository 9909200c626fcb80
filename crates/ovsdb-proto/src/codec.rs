//! Stream codec for back-to-back JSON values.
//!
//! OVSDB JSON-RPC frames are concatenated JSON objects with no length
//! prefix or delimiter, so the decoder scans for the end of a balanced
//! top-level value (string- and escape-aware) before handing the bytes
//! to serde. Partial frames stay buffered across reads.

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtoError;

/// Codec turning a byte stream into [`serde_json::Value`] frames and back.
#[derive(Debug, Default)]
pub struct JsonCodec {
    _priv: (),
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the first complete JSON value in `buf`, if any.
    fn frame_end(buf: &[u8]) -> Option<usize> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in buf.iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

impl Decoder for JsonCodec {
    type Item = Value;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, ProtoError> {
        // Drop inter-frame whitespace and anything that cannot start a
        // frame, so one malformed frame does not wedge the stream.
        while let Some(&b) = src.first() {
            if b == b'{' || b == b'[' {
                break;
            }
            if !b.is_ascii_whitespace() {
                let skipped = src
                    .iter()
                    .position(|&c| c == b'{' || c == b'[')
                    .unwrap_or(src.len());
                src.advance(skipped);
                return Err(ProtoError::Frame(format!(
                    "skipped {skipped} bytes of non-JSON input"
                )));
            }
            src.advance(1);
        }

        let Some(end) = Self::frame_end(src) else {
            return Ok(None);
        };

        let frame = src.split_to(end);
        let value = serde_json::from_slice(&frame)?;
        Ok(Some(value))
    }
}

impl Encoder<&Value> for JsonCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: &Value, dst: &mut BytesMut) -> Result<(), ProtoError> {
        let bytes = serde_json::to_vec(item)?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}
