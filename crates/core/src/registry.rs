//! Tag → decoder table used to bring erased values back from the wire.
//!
//! Rust has no runtime lookup from a type name to a type, so every type that
//! should be decodable must be registered explicitly, usually once at startup:
//!
//! ```ignore
//! erasure_core::register_global_as::<Order>("shop.Order")?;
//! erasure_core::register_global::<String>()?;
//! ```
//!
//! Encoding never needs the registry; it only decides which tag a freshly
//! wrapped value gets (explicit tag when registered, `type_name` otherwise).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::canonical;
use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::error::{DecodeError, DecodeResult, RegistryError};
use crate::tag::TypeTag;
use crate::value::SharedBase;

type DecodeFn = fn(&[u8]) -> Result<SharedBase, serde_json::Error>;

fn decode_as<T>(bytes: &[u8]) -> Result<SharedBase, serde_json::Error>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let value: T = canonical::from_slice(bytes)?;
    Ok(Arc::new(value))
}

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
    /// Entry added under the type-name fallback, not registered explicitly.
    alias: bool,
}

impl Registration {
    fn of<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: decode_as::<T>,
            alias: false,
        }
    }
}

/// Registered decodable types, keyed by tag.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    config: RegistryConfig,
    by_tag: HashMap<TypeTag, Registration>,
    /// Primary (explicit) tag of each registered type.
    by_type: HashMap<TypeId, TypeTag>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register `T` under its fallback tag (`std::any::type_name::<T>()`).
    pub fn register<T>(&mut self) -> Result<(), RegistryError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.register_as::<T>(TypeTag::type_name_of::<T>())
    }

    /// Register `T` under an explicit, stable tag.
    ///
    /// Values of `T` wrapped after this call carry `tag`. Registering the same
    /// type under the same tag again is a no-op.
    pub fn register_as<T>(&mut self, tag: impl Into<TypeTag>) -> Result<(), RegistryError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let tag = tag.into();
        let registration = Registration::of::<T>();

        if let Some(existing) = self.by_tag.get(&tag) {
            if existing.type_id != registration.type_id && !existing.alias {
                match self.config.duplicate_policy {
                    DuplicatePolicy::Reject => {
                        return Err(RegistryError::DuplicateTag {
                            type_tag: tag,
                            existing: existing.type_name,
                            attempted: registration.type_name,
                        });
                    }
                    DuplicatePolicy::Replace => {
                        let displaced = existing.type_id;
                        if self.by_type.get(&displaced) == Some(&tag) {
                            self.by_type.remove(&displaced);
                        }
                        tracing::debug!(
                            type_tag = %tag,
                            displaced = existing.type_name,
                            type_name = registration.type_name,
                            "rebinding type tag"
                        );
                    }
                }
            }
        }

        self.by_tag.insert(tag.clone(), registration);
        self.by_type.insert(registration.type_id, tag.clone());

        if self.config.alias_type_names {
            let fallback = TypeTag::type_name_of::<T>();
            if fallback != tag {
                // Explicit bindings of the alias string win, before or after.
                self.by_tag.entry(fallback).or_insert(Registration {
                    alias: true,
                    ..registration
                });
            }
        }

        tracing::debug!(
            type_tag = %tag,
            type_name = registration.type_name,
            "registered type"
        );
        Ok(())
    }

    /// Tag a freshly wrapped `T` receives from this registry.
    pub fn tag_of<T: ?Sized + 'static>(&self) -> TypeTag {
        self.by_type
            .get(&TypeId::of::<T>())
            .cloned()
            .unwrap_or_else(TypeTag::type_name_of::<T>)
    }

    /// Whether `tag` resolves to a decodable type.
    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Number of resolvable tags, aliases included.
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// All resolvable tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.by_tag.keys()
    }

    /// Decoder for the type registered under `tag`.
    ///
    /// The returned [`Decoder`] does not borrow the registry, so callers holding
    /// the global lock can release it before running user `Deserialize` code.
    pub(crate) fn decoder(&self, tag: &TypeTag) -> DecodeResult<Decoder> {
        self.by_tag
            .get(tag)
            .map(|registration| Decoder(registration.decode))
            .ok_or_else(|| DecodeError::unknown_type(tag.clone()))
    }

    #[cfg(test)]
    pub(crate) fn decode(&self, tag: &TypeTag, payload: &[u8]) -> DecodeResult<SharedBase> {
        self.decoder(tag)?.decode(tag, payload)
    }
}

/// Decode function resolved from a registry entry.
#[derive(Clone, Copy)]
pub(crate) struct Decoder(DecodeFn);

impl Decoder {
    pub(crate) fn decode(self, tag: &TypeTag, payload: &[u8]) -> DecodeResult<SharedBase> {
        (self.0)(payload).map_err(|source| DecodeError::Malformed {
            type_tag: tag.clone(),
            source,
        })
    }
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut tags: Vec<(&str, &str)> = self
            .by_tag
            .iter()
            .map(|(tag, reg)| (tag.as_str(), reg.type_name))
            .collect();
        tags.sort_unstable();

        f.debug_struct("TypeRegistry")
            .field("config", &self.config)
            .field("tags", &tags)
            .finish()
    }
}

static GLOBAL: Lazy<RwLock<TypeRegistry>> = Lazy::new(|| RwLock::new(TypeRegistry::new()));

/// Run `f` against the process-wide registry.
///
/// `f` runs under the registry's read lock: it must not register types, and
/// should not run user code that might (such as `Deserialize` impls).
///
/// The registry is only ever modified by whole insertions, so a lock poisoned
/// by a panicking reader or writer still holds consistent data and is reused.
pub fn with_global<R>(f: impl FnOnce(&TypeRegistry) -> R) -> R {
    let registry = GLOBAL.read().unwrap_or_else(PoisonError::into_inner);
    f(&registry)
}

fn with_global_mut<R>(f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
    let mut registry = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut registry)
}

/// Register `T` in the process-wide registry under its fallback tag.
pub fn register_global<T>() -> Result<(), RegistryError>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    with_global_mut(|registry| registry.register::<T>())
}

/// Register `T` in the process-wide registry under an explicit tag.
pub fn register_global_as<T>(tag: impl Into<TypeTag>) -> Result<(), RegistryError>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    with_global_mut(|registry| registry.register_as::<T>(tag))
}

/// Replace the process-wide registry's configuration.
///
/// Applies to registrations made afterwards; existing bindings are kept.
pub fn configure_global(config: RegistryConfig) {
    with_global_mut(|registry| registry.config = config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Order {
        id: u64,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Invoice {
        id: u64,
    }

    #[test]
    fn unregistered_types_use_fallback_tag() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.tag_of::<Order>(), TypeTag::type_name_of::<Order>());
        assert!(registry.is_empty());
    }

    #[test]
    fn explicit_tag_becomes_primary_and_fallback_aliases() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Order").unwrap();

        assert_eq!(registry.tag_of::<Order>(), "shop.Order");
        assert!(registry.contains("shop.Order"));
        assert!(registry.contains(std::any::type_name::<Order>()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn strict_config_does_not_alias() {
        let mut registry = TypeRegistry::with_config(RegistryConfig::strict());
        registry.register_as::<Order>("shop.Order").unwrap();

        assert!(registry.contains("shop.Order"));
        assert!(!registry.contains(std::any::type_name::<Order>()));
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Order").unwrap();
        registry.register_as::<Order>("shop.Order").unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_tag_for_other_type_is_rejected_by_default() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Doc").unwrap();

        let err = registry.register_as::<Invoice>("shop.Doc").unwrap_err();
        match err {
            RegistryError::DuplicateTag {
                type_tag,
                existing,
                attempted,
            } => {
                assert_eq!(type_tag, "shop.Doc");
                assert!(existing.ends_with("Order"));
                assert!(attempted.ends_with("Invoice"));
            }
        }
        assert_eq!(registry.tag_of::<Order>(), "shop.Doc");
    }

    #[test]
    fn replace_policy_rebinds_tag() {
        let mut registry = TypeRegistry::with_config(RegistryConfig::lenient());
        registry.register_as::<Order>("shop.Doc").unwrap();
        registry.register_as::<Invoice>("shop.Doc").unwrap();

        assert_eq!(registry.tag_of::<Invoice>(), "shop.Doc");
        // Order lost its explicit tag and falls back to its type name.
        assert_eq!(registry.tag_of::<Order>(), TypeTag::type_name_of::<Order>());

        let base = registry
            .decode(&TypeTag::new("shop.Doc"), br#"{"id":7}"#)
            .unwrap();
        assert!(base.as_any().downcast_ref::<Invoice>().is_some());
    }

    #[test]
    fn explicit_registration_overrides_fallback_alias() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Order").unwrap();
        let alias = std::any::type_name::<Order>();

        // Reject policy: the alias slot is not an explicit binding.
        registry.register_as::<Invoice>(alias).unwrap();
        assert_eq!(registry.tag_of::<Invoice>(), alias);
        assert_eq!(registry.tag_of::<Order>(), "shop.Order");

        let base = registry.decode(&TypeTag::new(alias), br#"{"id":1}"#).unwrap();
        assert!(base.as_any().downcast_ref::<Invoice>().is_some());

        // A later alias for another type never displaces the explicit binding.
        registry.register_as::<Order>("shop.Order.v2").unwrap();
        let base = registry.decode(&TypeTag::new(alias), br#"{"id":1}"#).unwrap();
        assert!(base.as_any().downcast_ref::<Invoice>().is_some());

        // Once explicit, the string is protected like any other tag.
        let err = registry.register_as::<Order>(alias).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTag { .. }));
    }

    #[test]
    fn decoder_outlives_registry_borrow() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Order").unwrap();
        let tag = TypeTag::new("shop.Order");

        let decoder = registry.decoder(&tag).ok().unwrap();
        drop(registry);

        let base = decoder.decode(&tag, br#"{"id":3}"#).ok().unwrap();
        assert_eq!(base.as_any().downcast_ref::<Order>(), Some(&Order { id: 3 }));
    }

    #[test]
    fn decode_unknown_tag() {
        let registry = TypeRegistry::new();
        let err = registry
            .decode(&TypeTag::new("no.such.Type"), b"{}")
            .err()
            .unwrap();
        assert!(err.is_unknown_type());
    }

    #[test]
    fn decode_malformed_payload() {
        let mut registry = TypeRegistry::new();
        registry.register_as::<Order>("shop.Order").unwrap();

        let err = registry
            .decode(&TypeTag::new("shop.Order"), b"{not valid}")
            .err()
            .unwrap();
        assert!(matches!(err, DecodeError::Malformed { ref type_tag, .. } if type_tag == "shop.Order"));
    }

    #[test]
    fn debug_lists_tags_sorted() {
        let mut registry = TypeRegistry::with_config(RegistryConfig::strict());
        registry.register_as::<Order>("b.Order").unwrap();
        registry.register_as::<Invoice>("a.Invoice").unwrap();

        let debug = format!("{registry:?}");
        let a = debug.find("a.Invoice").unwrap();
        let b = debug.find("b.Order").unwrap();
        assert!(a < b);
    }
}
