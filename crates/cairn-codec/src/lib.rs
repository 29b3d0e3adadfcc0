//! # cairn-codec
//!
//! The structural codec layer: typed, schema-driven conversion between
//! the engine's closed value universe and wire terms.
//!
//! ## Architecture
//!
//! ```text
//! Value                 ← the closed universe of engine-exposed shapes
//!     │
//! Schema                ← compositional codec description per type
//!     │
//! encode / decode       ← total encode; decode with a typed error taxonomy
//!     │
//! CodecRegistry         ← stable type tag → schema, one-shot, then frozen
//! ```
//!
//! Opacity is first-class: a type registered as opaque encodes every
//! value to the same `(Opaque "<type-tag>")` placeholder, and decoding
//! that placeholder yields `Value::Opaque` — never the original value.
//! This lossy round trip is a declared per-type contract, documented at
//! the registration site in `builtin`.

pub mod builtin;
pub mod codec;
pub mod error;
pub mod registry;
pub mod schema;
pub mod value;

pub use builtin::builtin_registry;
pub use codec::{MAX_DECODE_DEPTH, decode, encode};
pub use error::{DecodeError, EncodeError, RegistryError};
pub use registry::CodecRegistry;
pub use schema::{Ctor, Schema};
pub use value::Value;
