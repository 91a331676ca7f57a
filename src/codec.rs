//! Body serialization used by [`Context::bind`](crate::Context::bind) and
//! [`Context::respond`](crate::Context::respond).
//!
//! A codec is picked per call site through a type parameter, so the payload
//! type and the wire format are both fixed at compile time.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {content_type} body: {reason}")]
    Encode {
        content_type: &'static str,
        reason: String,
    },
    #[error("failed to decode {content_type} body: {reason}")]
    Decode {
        content_type: &'static str,
        reason: String,
    },
    #[error("request body is empty")]
    EmptyBody,
}

/// A wire format for request and response bodies.
pub trait Codec {
    /// Value sent in the `Content-Type` header of encoded responses.
    const CONTENT_TYPE: &'static str;

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    const CONTENT_TYPE: &'static str = "application/json";

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            content_type: Self::CONTENT_TYPE,
            reason: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyBody);
        }
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            content_type: Self::CONTENT_TYPE,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Login {
        user: String,
        remember: bool,
    }

    #[test]
    fn json_decode_reports_syntax_errors() {
        let err = JsonCodec::decode::<Login>(b"{\"user\":").unwrap_err();
        assert!(matches!(err, CodecError::Decode { content_type: "application/json", .. }));
    }

    #[test]
    fn json_decode_rejects_empty_body() {
        let err = JsonCodec::decode::<Login>(b"").unwrap_err();
        assert!(matches!(err, CodecError::EmptyBody));
    }

    #[test]
    fn json_encode_produces_compact_output() {
        let bytes = JsonCodec::encode(&Login {
            user: "ann".into(),
            remember: true,
        })
        .unwrap();
        assert_eq!(bytes, br#"{"user":"ann","remember":true}"#);
    }
}
