//! Compositional codec descriptions.
//!
//! A `Schema` is the per-type codec: `encode`/`decode` in `codec`
//! interpret it against a value or wire term. Codecs for larger types
//! are built from the codecs of their parts; recursion goes through
//! `Named` so that recursive types resolve via the registry instead of
//! an infinite schema tree.

/// One constructor of a tagged sum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctor {
    pub tag: String,
    pub fields: Vec<Schema>,
}

impl Ctor {
    pub fn new(tag: impl Into<String>, fields: Vec<Schema>) -> Self {
        Self {
            tag: tag.into(),
            fields,
        }
    }

    /// A constructor with no fields; encodes as a bare symbol.
    pub fn nullary(tag: impl Into<String>) -> Self {
        Self::new(tag, Vec::new())
    }
}

/// The codec description for one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Int,
    Str,
    Bool,
    Opt(Box<Schema>),
    Seq(Box<Schema>),
    /// String-keyed, key-ordered map; the schema is the value schema.
    Map(Box<Schema>),
    Record(Vec<(String, Schema)>),
    Variant(Vec<Ctor>),
    /// Registry indirection: decode/encode under the named type's
    /// schema. This is how recursive types terminate.
    Named(String),
    /// Intentionally lossy: encodes as `(Opaque "<type-tag>")` only.
    Opaque(String),
}

impl Schema {
    pub fn opt(inner: Schema) -> Self {
        Schema::Opt(Box::new(inner))
    }

    pub fn seq(inner: Schema) -> Self {
        Schema::Seq(Box::new(inner))
    }

    pub fn map(value: Schema) -> Self {
        Schema::Map(Box::new(value))
    }

    pub fn record(fields: Vec<(&str, Schema)>) -> Self {
        Schema::Record(
            fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        )
    }

    pub fn named(tag: impl Into<String>) -> Self {
        Schema::Named(tag.into())
    }

    pub fn opaque(tag: impl Into<String>) -> Self {
        Schema::Opaque(tag.into())
    }
}
