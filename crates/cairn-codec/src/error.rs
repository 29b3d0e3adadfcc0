//! Error taxonomy for the codec layer.
//!
//! Decode errors are always recoverable: they are reported to the
//! caller and never corrupt registry state. Registry errors are
//! configuration errors, fatal at initialization only.

/// Errors raised while decoding a wire term under a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No codec registered for the type tag. A missing codec module is
    /// a configuration defect: always fatal to the enclosing request,
    /// never silently defaulted.
    #[error("no codec registered for type `{type_tag}`")]
    UnknownType { type_tag: String },

    #[error("unknown constructor `{ctor}` for type `{type_tag}`")]
    UnknownConstructor { type_tag: String, ctor: String },

    #[error(
        "arity mismatch for `{type_tag}::{ctor}`: expected {expected} fields, got {actual}"
    )]
    ArityMismatch {
        type_tag: String,
        ctor: String,
        expected: usize,
        actual: usize,
    },

    /// Structural recursion exceeded the fixed schema bound. The value
    /// universe is cycle-free; hitting the bound means the input
    /// encodes a dynamic cycle, which decode refuses rather than loops.
    #[error("unsupported cycle while decoding `{type_tag}` (depth {depth})")]
    UnsupportedCycle { type_tag: String, depth: usize },

    /// An opaque type only decodes from its exact placeholder shape.
    #[error("opaque type `{type_tag}` cannot be reconstructed from a non-placeholder term")]
    OpaqueNotReconstructible { type_tag: String },

    #[error("malformed term: expected {expected}, got `{got}`")]
    Malformed { expected: String, got: String },
}

/// Errors raised while encoding a value under a schema.
///
/// Encoding is total for well-formed values; a shape mismatch means the
/// caller paired a value with the wrong schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("no codec registered for type `{type_tag}`")]
    UnknownType { type_tag: String },

    #[error("value does not fit schema: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
}

/// Errors raised while building the codec registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Registration is one-shot per process lifetime.
    #[error("duplicate codec registration for type `{type_tag}`")]
    DuplicateCodec { type_tag: String },
}
