//! The codec registry: stable type tag → schema.
//!
//! Built once during initialization, then frozen. After `freeze` the
//! registry is immutable and safe for unsynchronized concurrent reads.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{DecodeError, RegistryError};
use crate::schema::Schema;

/// Maps stable type identifiers to their codecs.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the codec for one type tag.
    ///
    /// One-shot: re-registration of an existing tag is a configuration
    /// error, never a silent overwrite.
    pub fn register(
        &mut self,
        type_tag: impl Into<String>,
        schema: Schema,
    ) -> Result<(), RegistryError> {
        let type_tag = type_tag.into();
        if self.schemas.contains_key(&type_tag) {
            return Err(RegistryError::DuplicateCodec { type_tag });
        }
        self.schemas.insert(type_tag, schema);
        Ok(())
    }

    /// Resolve the codec for a type tag.
    pub fn lookup(&self, type_tag: &str) -> Result<&Schema, DecodeError> {
        self.schemas
            .get(type_tag)
            .ok_or_else(|| DecodeError::UnknownType {
                type_tag: type_tag.to_string(),
            })
    }

    /// Registered type tags in stable order.
    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Whether the tag is registered as an opaque type.
    pub fn is_opaque(&self, type_tag: &str) -> bool {
        matches!(self.schemas.get(type_tag), Some(Schema::Opaque(_)))
    }

    /// Seal the registry behind a shared immutable handle.
    pub fn freeze(self) -> Arc<CodecRegistry> {
        Arc::new(self)
    }
}
