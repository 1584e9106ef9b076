//! `ErasedValue`: a serializable value with its concrete type erased.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical;
use crate::error::{DecodeResult, EncodeResult};
use crate::registry::{self, Decoder, TypeRegistry};
use crate::tag::TypeTag;
use crate::wire::WireRecord;

/// Object-safe view of a wrapped concrete value.
pub(crate) trait ErasedBase: Any + Send + Sync {
    fn encode(&self) -> EncodeResult<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> ErasedBase for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn encode(&self) -> EncodeResult<Vec<u8>> {
        canonical::to_vec(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) type SharedBase = Arc<dyn ErasedBase>;

/// A value of some serializable type, behind a uniform interface.
///
/// - The concrete value (`base`) is owned and can be recovered by downcasting.
/// - The [`TypeTag`] names the concrete type; it is fixed at construction.
/// - The canonical encoding is computed on first demand and memoized. Only a
///   successful encoding is kept: after a failure the next [`encode`](Self::encode)
///   runs the serializer again.
///
/// ## Equality
///
/// Two values are equal when their tags match and their canonical bytes are
/// identical, regardless of the concrete type's own `PartialEq`. A value that
/// cannot be encoded is equal only to itself and its clones (they share the same
/// base); it never equals another instance, even one that fails the same way.
/// Hashing follows the same rule, feeding an absence marker instead of bytes.
///
/// Serializers are assumed to be deterministic.
///
/// ## Concurrency
///
/// `ErasedValue` is `Send + Sync`. Concurrent first encodes are serialized
/// internally; the serializer runs once per successful fill.
///
/// ## Serde
///
/// Serializing an `ErasedValue` writes its [`WireRecord`]; deserializing reads
/// one and resolves the tag in the process-wide registry.
#[derive(Clone)]
pub struct ErasedValue {
    base: SharedBase,
    type_tag: TypeTag,
    encoded: OnceCell<Arc<[u8]>>,
}

impl ErasedValue {
    /// Wrap `value`, tagging it through the process-wide registry.
    ///
    /// Nothing is serialized yet, so this cannot fail; encoding problems show up
    /// on the first [`encode`](Self::encode).
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        let type_tag = registry::with_global(|registry| registry.tag_of::<T>());
        Self::with_tag(type_tag, value)
    }

    /// Wrap `value`, tagging it through `registry`.
    pub fn new_in<T>(registry: &TypeRegistry, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::with_tag(registry.tag_of::<T>(), value)
    }

    /// Wrap `value` under a caller-chosen tag, bypassing registry lookup.
    pub fn with_tag<T>(type_tag: impl Into<TypeTag>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            base: Arc::new(value),
            type_tag: type_tag.into(),
            encoded: OnceCell::new(),
        }
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    /// The wrapped value as `dyn Any`.
    pub fn base(&self) -> &dyn Any {
        (*self.base).as_any()
    }

    /// `TypeId` of the wrapped concrete value.
    pub fn base_type_id(&self) -> TypeId {
        self.base().type_id()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.base().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.base().downcast_ref::<T>()
    }

    /// Take the wrapped value out.
    ///
    /// Fails (returning `self` untouched) when the concrete type is not `T`, or
    /// when a clone of this value still shares the base.
    pub fn try_into_base<T>(self) -> Result<T, Self>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let typed = match Arc::clone(&self.base).into_any().downcast::<T>() {
            Ok(typed) => typed,
            Err(_) => return Err(self),
        };

        let Self {
            base,
            type_tag,
            encoded,
        } = self;
        drop(base);

        Arc::try_unwrap(typed).map_err(|typed| Self {
            base: typed,
            type_tag,
            encoded,
        })
    }

    /// Canonical bytes of the wrapped value, computed on first call.
    ///
    /// A successful result is cached for the lifetime of the instance (and of
    /// clones made afterwards). A failure is returned as is and not cached.
    pub fn encode(&self) -> EncodeResult<&[u8]> {
        self.encoded
            .get_or_try_init(|| (*self.base).encode().map(Arc::from))
            .map(|bytes| &**bytes)
    }

    /// Cached bytes, without triggering an encode.
    pub fn cached_bytes(&self) -> Option<&[u8]> {
        self.encoded.get().map(|bytes| &**bytes)
    }

    /// Whether a successful encoding is cached.
    pub fn is_encoded(&self) -> bool {
        self.encoded.get().is_some()
    }

    /// `{ type_tag, payload }` for this value. Encodes if needed.
    pub fn to_wire_record(&self) -> EncodeResult<WireRecord> {
        let payload = self.encode()?;
        Ok(WireRecord::new(self.type_tag.clone(), payload))
    }

    /// The wire record as JSON bytes.
    pub fn to_json_vec(&self) -> EncodeResult<Vec<u8>> {
        self.to_wire_record()?.to_json_vec()
    }

    /// Rebuild a value from `record`, resolving its tag in the process-wide registry.
    ///
    /// The global lock is released before the payload is deserialized, so
    /// payloads holding erased fields of their own decode while another thread
    /// waits to register a type.
    pub fn from_wire_record(record: WireRecord) -> DecodeResult<Self> {
        let decoder = registry::with_global(|registry| registry.decoder(&record.type_tag))?;
        Self::from_decoder(decoder, record)
    }

    /// Rebuild a value from `record`, resolving its tag in `registry`.
    ///
    /// The received payload seeds the cache, so encoding the result again
    /// returns exactly these bytes without running the serializer.
    pub fn from_wire_record_in(registry: &TypeRegistry, record: WireRecord) -> DecodeResult<Self> {
        let decoder = registry.decoder(&record.type_tag)?;
        Self::from_decoder(decoder, record)
    }

    fn from_decoder(decoder: Decoder, record: WireRecord) -> DecodeResult<Self> {
        let WireRecord { type_tag, payload } = record;
        let base = decoder.decode(&type_tag, &payload)?;

        Ok(Self {
            base,
            type_tag,
            encoded: OnceCell::with_value(Arc::from(payload)),
        })
    }

    /// Parse a JSON wire record and rebuild the value via the process-wide registry.
    pub fn from_json_slice(bytes: &[u8]) -> DecodeResult<Self> {
        Self::from_wire_record(WireRecord::from_json_slice(bytes)?)
    }

    /// Parse a JSON wire record and rebuild the value via `registry`.
    pub fn from_json_slice_in(registry: &TypeRegistry, bytes: &[u8]) -> DecodeResult<Self> {
        Self::from_wire_record_in(registry, WireRecord::from_json_slice(bytes)?)
    }
}

impl PartialEq for ErasedValue {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.base, &other.base) {
            return true;
        }
        if self.type_tag != other.type_tag {
            return false;
        }
        match (self.encode(), other.encode()) {
            (Ok(lhs), Ok(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Eq for ErasedValue {}

impl Hash for ErasedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag.hash(state);
        match self.encode() {
            Ok(bytes) => {
                state.write_u8(1);
                bytes.hash(state);
            }
            Err(_) => state.write_u8(0),
        }
    }
}

impl core::fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("ErasedValue");
        s.field("type_tag", &self.type_tag.as_str());
        match self.cached_bytes() {
            Some(bytes) => s.field("encoded", &String::from_utf8_lossy(bytes)),
            None => s.field("encoded", &format_args!("<pending>")),
        };
        s.finish()
    }
}

impl Serialize for ErasedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.to_wire_record().map_err(serde::ser::Error::custom)?;
        record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ErasedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = WireRecord::deserialize(deserializer)?;
        Self::from_wire_record(record).map_err(serde::de::Error::custom)
    }
}
