//! Wire format of one append.
//!
//! Request: `u32` big-endian body length, then a JSON body. Response: one
//! status byte, `0` for acknowledged, anything else a store-side rejection
//! code.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::client::SinkError;

/// Upper bound on one frame body; a flush batch larger than this indicates
/// a misconfigured queue capacity.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub const ACK_OK: u8 = 0;

/// Body of one append: the target stream, the record-kind key and the
/// serialized batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendRequest {
    pub stream: String,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Encode a request into a length-prefixed frame.
pub fn encode(request: &AppendRequest) -> Result<Bytes, SinkError> {
    let body = serde_json::to_vec(request)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(SinkError::FrameTooLarge(body.len()));
    }
    let mut frame = BytesMut::with_capacity(4 + body.len());
    frame.put_u32(body.len() as u32);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Decode a frame body back into a request. Used by tests and by any
/// in-process mock of the store.
pub fn decode(body: &[u8]) -> Result<AppendRequest, SinkError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(SinkError::FrameTooLarge(body.len()));
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AppendRequest {
        AppendRequest {
            stream: "host-1".into(),
            kind: "packets".into(),
            payload: serde_json::json!([{"timestamp": "2026-01-01T00:00:00Z", "data": [1, 2, 3]}]),
        }
    }

    #[test]
    fn frame_roundtrip() {
        let encoded = encode(&request()).unwrap();
        let len = u32::from_be_bytes(encoded[..4].try_into().unwrap()) as usize;
        assert_eq!(len, encoded.len() - 4);

        let decoded = decode(&encoded[4..]).unwrap();
        assert_eq!(decoded, request());
    }

    #[test]
    fn empty_payload_is_a_valid_frame() {
        let mut req = request();
        req.payload = serde_json::json!([]);
        let encoded = encode(&req).unwrap();
        assert_eq!(decode(&encoded[4..]).unwrap().payload, serde_json::json!([]));
    }
}
