//! JSON codec for envelope frames
//!
//! One envelope per WebSocket frame, UTF-8 JSON. Decoding checks only the
//! top-level shape; payload contents are left to the handlers.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::envelope::Envelope;

/// Maximum accepted frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encoding error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoding error
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Envelope is not a JSON object")]
    NotAnObject,

    #[error("Envelope has no string `type` field")]
    MissingType,

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Encode a `(type, payload)` pair
pub fn encode(msg_type: &str, payload: &Value) -> Result<Bytes, CodecError> {
    encode_envelope(&Envelope::new(msg_type, payload.clone()))
}

/// Encode an envelope to bytes
pub fn encode_envelope(envelope: &Envelope) -> Result<Bytes, CodecError> {
    Ok(Bytes::from(serde_json::to_vec(envelope)?))
}

/// Encode an envelope for a text frame
pub fn encode_text(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode a frame into an envelope
///
/// Unknown extra top-level fields are ignored. An absent or `null` payload
/// becomes `{}`.
pub fn decode(src: &[u8]) -> Result<Envelope, DecodeError> {
    if src.len() > MAX_FRAME_SIZE {
        return Err(DecodeError::FrameTooLarge {
            size: src.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let value: Value = serde_json::from_slice(src)?;
    let Value::Object(mut fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let msg_type = match fields.remove("type") {
        Some(Value::String(t)) => t,
        _ => return Err(DecodeError::MissingType),
    };

    let payload = match fields.remove("payload") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(payload) => payload,
    };

    Ok(Envelope { msg_type, payload })
}

/// Decode a text frame
pub fn decode_str(src: &str) -> Result<Envelope, DecodeError> {
    decode(src.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip_preserves_envelope() {
        let envelopes = vec![
            Envelope::new("EXECUTE_TOOL", json!({"tool": "figma", "action": "launch"})),
            Envelope::new("DESIGN_COMMAND", json!([{"type": "RECT", "width": 10}])),
            Envelope::new("CHAT_MESSAGE", json!({"text": "애니메이션 만들어줘"})),
            Envelope::new("CUSTOM", json!({})),
        ];

        for env in envelopes {
            let bytes = encode(&env.msg_type, &env.payload).unwrap();
            assert_eq!(decode(&bytes).unwrap(), env);
        }
    }

    #[test]
    fn test_encode_has_exactly_two_fields() {
        let bytes = encode("TOOL_STATUS", &json!({"tool": "x"})).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("type"));
        assert!(obj.contains_key("payload"));
    }

    #[test]
    fn test_missing_payload_is_empty_mapping() {
        let env = decode(br#"{"type":"UPDATE_PREVIEW"}"#).unwrap();
        assert_eq!(env.payload, json!({}));

        let env = decode(br#"{"type":"UPDATE_PREVIEW","payload":null}"#).unwrap();
        assert_eq!(env.payload, json!({}));
    }

    #[test]
    fn test_non_json_is_syntax_error() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Syntax(_))));
        assert!(matches!(decode(b""), Err(DecodeError::Syntax(_))));
        assert!(matches!(decode(&[0xff, 0xfe]), Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(decode(b"[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(b"\"TOOL_STATUS\""), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_type_must_be_string() {
        assert!(matches!(decode(br#"{"payload":{}}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode(br#"{"type":7}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode(br#"{"type":null}"#), Err(DecodeError::MissingType)));
    }

    #[test]
    fn test_malformed_nested_payload_tolerated() {
        let env = decode(br#"{"type":"EXECUTE_TOOL","payload":{"tool":[],"data":"oops"}}"#).unwrap();
        assert_eq!(env.msg_type, "EXECUTE_TOOL");
        assert_eq!(env.payload["data"], "oops");
    }

    #[test]
    fn test_extra_top_level_fields_ignored() {
        let env = decode(br#"{"type":"X","payload":{"a":1},"id":99}"#).unwrap();
        assert_eq!(env, Envelope::new("X", json!({"a": 1})));
    }

    #[test]
    fn test_decode_str_and_encode_text_agree() {
        let env = Envelope::chat("hello");
        let text = encode_text(&env).unwrap();
        assert_eq!(decode_str(&text).unwrap(), env);
    }
}
