//! The closed value universe the engine exposes over the wire.

use std::collections::BTreeMap;

/// One engine-exposed value.
///
/// This is deliberately a closed set of shapes: atomic scalars,
/// algebraic variants, product records, ordered containers, and the
/// opaque placeholder. Engine-private state (caches, closures, solver
/// traces) only ever appears as `Opaque`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Optional value. `None` has a distinguished wire token.
    Opt(Option<Box<Value>>),
    /// Homogeneous ordered sequence.
    Seq(Vec<Value>),
    /// Key-ordered map with string keys.
    Map(BTreeMap<String, Value>),
    /// Product record with named fields in declaration order.
    Record(Vec<(String, Value)>),
    /// Tagged sum: one constructor applied to positional fields.
    Variant { tag: String, fields: Vec<Value> },
    /// The placeholder standing in for an engine-private value.
    ///
    /// Identified by type, not by value: every opaque value of one
    /// type encodes to the same wire term.
    Opaque { type_tag: String },
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn some(value: Value) -> Self {
        Value::Opt(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        Value::Opt(None)
    }

    pub fn variant(tag: impl Into<String>, fields: Vec<Value>) -> Self {
        Value::Variant {
            tag: tag.into(),
            fields,
        }
    }

    pub fn record(fields: Vec<(&str, Value)>) -> Self {
        Value::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    pub fn opaque(type_tag: impl Into<String>) -> Self {
        Value::Opaque {
            type_tag: type_tag.into(),
        }
    }
}
