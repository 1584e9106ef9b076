//! The persisted/transmitted form of an erased value.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::tag::TypeTag;

/// `{ type_tag, payload }`: everything needed to rebuild an erased value in a
/// process that has the tagged type registered.
///
/// Both fields are mandatory. In JSON (and other human-readable formats) the
/// payload is a standard base64 string; binary formats carry it as raw bytes.
///
/// ```text
/// {"type_tag":"shop.Order","payload":"eyJpZCI6N30="}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireRecord {
    pub type_tag: TypeTag,
    /// Canonical JSON bytes of the concrete value.
    #[serde(with = "payload")]
    pub payload: Vec<u8>,
}

impl WireRecord {
    pub fn new(type_tag: impl Into<TypeTag>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            type_tag: type_tag.into(),
            payload: payload.into(),
        }
    }

    pub fn to_json_vec(&self) -> EncodeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(EncodeError::from_json)
    }

    /// Parse a JSON record. Any structural problem (not JSON, missing field,
    /// payload not base64) is a [`DecodeError::MalformedRecord`].
    pub fn from_json_slice(bytes: &[u8]) -> DecodeResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::malformed_record(e.to_string()))
    }
}

mod payload {
    use core::fmt;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(PayloadVisitor)
        } else {
            deserializer.deserialize_byte_buf(PayloadVisitor)
        }
    }

    struct PayloadVisitor;

    impl<'de> Visitor<'de> for PayloadVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a base64 string or a byte sequence")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<u8>, E> {
            STANDARD
                .decode(v)
                .map_err(|e| E::custom(format_args!("payload is not valid base64: {e}")))
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}
