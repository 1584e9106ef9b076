//! `erasure-core` — type-erased serializable values.
//!
//! [`ErasedValue`] wraps a value of any `Serialize` type, remembers which type
//! it was through a [`TypeTag`], and encodes it lazily to canonical JSON. The
//! [`TypeRegistry`] maps tags back to decodable types so a [`WireRecord`] can
//! be turned into an `ErasedValue` again in another part of the program (or
//! another run of it).
//!
//! ```ignore
//! erasure_core::register_global_as::<Order>("shop.Order")?;
//!
//! let value = ErasedValue::new(order);
//! let json = value.to_json_vec()?;
//!
//! let back = ErasedValue::from_json_slice(&json)?;
//! assert_eq!(back.downcast_ref::<Order>(), Some(&order));
//! ```

pub mod canonical;
pub mod config;
pub mod error;
pub mod registry;
pub mod tag;
pub mod value;
pub mod wire;

pub use config::{DuplicatePolicy, RegistryConfig};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult, RegistryError};
pub use registry::{TypeRegistry, configure_global, register_global, register_global_as, with_global};
pub use tag::TypeTag;
pub use value::ErasedValue;
pub use wire::WireRecord;
