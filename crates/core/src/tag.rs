//! Process-stable type identifiers.

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifies the concrete type behind an [`ErasedValue`](crate::ErasedValue).
///
/// Tags come from one of two schemes:
/// - an explicit name given at registration (`"shop.Order"`), stable for as
///   long as the program keeps registering it under that name;
/// - the best-effort fallback, [`std::any::type_name`], which is unique per type
///   within one build but may change between compiler versions.
///
/// Cloning is cheap (shared string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTag(Arc<str>);

impl TypeTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Arc::from(tag.into()))
    }

    /// Fallback tag for `T`: its compiler-provided type name.
    pub fn type_name_of<T: ?Sized + 'static>() -> Self {
        Self(Arc::from(std::any::type_name::<T>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for TypeTag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for TypeTag {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for TypeTag {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
