//! Error model for encoding, decoding and type registration.

use thiserror::Error;

use crate::tag::TypeTag;

/// Result of encoding an erased value.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result of decoding a wire record.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// The canonical encoder rejected the wrapped value.
///
/// Encoding is deterministic: retrying the same value fails the same way.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value contained a NaN or infinite float, which JSON cannot represent.
    #[error("value is not representable: non-finite float {0}")]
    NonFiniteFloat(f64),

    /// The value's `Serialize` implementation reported an error.
    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl EncodeError {
    pub(crate) fn from_json(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

/// A wire record could not be turned back into an erased value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No type is registered under the record's tag in this process.
    ///
    /// The record may still be valid in a process where the type is registered.
    #[error("unknown type tag: {type_tag}")]
    UnknownType { type_tag: TypeTag },

    /// The payload is not a valid encoding of the registered type.
    #[error("malformed payload for {type_tag}: {source}")]
    Malformed {
        type_tag: TypeTag,
        #[source]
        source: serde_json::Error,
    },

    /// The record itself is unusable (missing field, invalid base64, not an object).
    #[error("malformed wire record: {0}")]
    MalformedRecord(String),
}

impl DecodeError {
    pub fn unknown_type(type_tag: TypeTag) -> Self {
        Self::UnknownType { type_tag }
    }

    pub fn malformed_record(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// True for both a bad payload and a bad record envelope.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::MalformedRecord(_))
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType { .. })
    }
}

/// Registering a type in a [`TypeRegistry`](crate::TypeRegistry) failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The tag is already bound to a different concrete type.
    #[error("type tag {type_tag} is already bound to {existing}, refusing to rebind it to {attempted}")]
    DuplicateTag {
        type_tag: TypeTag,
        existing: &'static str,
        attempted: &'static str,
    },
}
