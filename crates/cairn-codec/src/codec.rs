//! Schema interpretation: `encode` and `decode`.
//!
//! Encodings:
//! - atoms as literal tokens
//! - variants as `(Ctor f1 f2 ...)`, nullary constructors as bare symbols
//! - options as `()` / `(Some v)`
//! - sequences as homogeneous lists; the empty list is the valid empty token
//! - maps and records as `((key v) ...)` pair lists
//! - opaque types as `(Opaque "<type-tag>")`, constant per type

use cairn_sexp::{PrintMode, Sexp, print_sexp};

use crate::error::{DecodeError, EncodeError};
use crate::registry::CodecRegistry;
use crate::schema::Schema;
use crate::value::Value;

/// Fixed structural recursion bound for decode.
///
/// The value universe is a statically bounded schema; inputs that
/// recurse past this depth encode a dynamic cycle and are refused.
pub const MAX_DECODE_DEPTH: usize = 512;

const OPAQUE_TAG: &str = "Opaque";

/// Encode a value under a schema. Total for well-formed input.
pub fn encode(
    registry: &CodecRegistry,
    schema: &Schema,
    value: &Value,
) -> Result<Sexp, EncodeError> {
    match (schema, value) {
        (Schema::Int, Value::Int(n)) => Ok(Sexp::int(*n)),
        (Schema::Str, Value::Str(s)) => Ok(Sexp::str(s.clone())),
        (Schema::Bool, Value::Bool(b)) => Ok(Sexp::bool(*b)),

        (Schema::Opt(_), Value::Opt(None)) => Ok(Sexp::nil()),
        (Schema::Opt(inner), Value::Opt(Some(boxed))) => Ok(Sexp::tagged(
            "Some",
            [encode(registry, inner, boxed)?],
        )),

        (Schema::Seq(inner), Value::Seq(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(encode(registry, inner, item)?);
            }
            Ok(Sexp::List(out))
        }

        (Schema::Map(value_schema), Value::Map(entries)) => {
            let mut out = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                out.push(Sexp::List(vec![
                    Sexp::str(key.clone()),
                    encode(registry, value_schema, entry)?,
                ]));
            }
            Ok(Sexp::List(out))
        }

        (Schema::Record(field_schemas), Value::Record(fields)) => {
            if field_schemas.len() != fields.len() {
                return Err(shape_mismatch(schema, value));
            }
            let mut out = Vec::with_capacity(fields.len());
            for ((schema_name, field_schema), (name, field)) in
                field_schemas.iter().zip(fields.iter())
            {
                if schema_name != name {
                    return Err(shape_mismatch(schema, value));
                }
                out.push(Sexp::List(vec![
                    Sexp::sym(name.clone()),
                    encode(registry, field_schema, field)?,
                ]));
            }
            Ok(Sexp::List(out))
        }

        (Schema::Variant(ctors), Value::Variant { tag, fields }) => {
            let ctor = ctors
                .iter()
                .find(|c| &c.tag == tag)
                .ok_or_else(|| shape_mismatch(schema, value))?;
            if ctor.fields.len() != fields.len() {
                return Err(shape_mismatch(schema, value));
            }
            if fields.is_empty() {
                return Ok(Sexp::sym(tag.clone()));
            }
            let mut args = Vec::with_capacity(fields.len());
            for (field_schema, field) in ctor.fields.iter().zip(fields.iter()) {
                args.push(encode(registry, field_schema, field)?);
            }
            Ok(Sexp::tagged(tag, args))
        }

        (Schema::Named(tag), _) => {
            let resolved = registry
                .lookup(tag)
                .map_err(|_| EncodeError::UnknownType {
                    type_tag: tag.clone(),
                })?;
            encode(registry, resolved, value)
        }

        // The placeholder is type-identified: every value of an opaque
        // type produces the same wire term, including re-encoding the
        // placeholder itself.
        (Schema::Opaque(tag), Value::Opaque { type_tag }) if tag == type_tag => {
            Ok(opaque_term(tag))
        }
        (Schema::Opaque(tag), _) => Ok(opaque_term(tag)),

        _ => Err(shape_mismatch(schema, value)),
    }
}

/// Decode a wire term under a schema.
pub fn decode(
    registry: &CodecRegistry,
    schema: &Schema,
    term: &Sexp,
) -> Result<Value, DecodeError> {
    decode_at(registry, schema, term, "<anonymous>", 0)
}

fn decode_at(
    registry: &CodecRegistry,
    schema: &Schema,
    term: &Sexp,
    type_tag: &str,
    depth: usize,
) -> Result<Value, DecodeError> {
    if depth > MAX_DECODE_DEPTH {
        return Err(DecodeError::UnsupportedCycle {
            type_tag: type_tag.to_string(),
            depth,
        });
    }

    match schema {
        Schema::Int => term
            .as_int()
            .map(Value::Int)
            .ok_or_else(|| malformed("an integer atom", term)),
        Schema::Str => term
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| malformed("a string atom", term)),
        Schema::Bool => term
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| malformed("a boolean atom", term)),

        Schema::Opt(inner) => {
            let items = term
                .as_list()
                .ok_or_else(|| malformed("`()` or `(Some v)`", term))?;
            match items {
                [] => Ok(Value::none()),
                [head, payload] if head.as_sym() == Some("Some") => Ok(Value::some(decode_at(
                    registry,
                    inner,
                    payload,
                    type_tag,
                    depth + 1,
                )?)),
                _ => Err(malformed("`()` or `(Some v)`", term)),
            }
        }

        Schema::Seq(inner) => {
            let items = term
                .as_list()
                .ok_or_else(|| malformed("a sequence list", term))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode_at(registry, inner, item, type_tag, depth + 1)?);
            }
            Ok(Value::Seq(out))
        }

        Schema::Map(value_schema) => {
            let items = term
                .as_list()
                .ok_or_else(|| malformed("a map pair list", term))?;
            let mut out = std::collections::BTreeMap::new();
            for item in items {
                let pair = item
                    .as_list()
                    .filter(|pair| pair.len() == 2)
                    .ok_or_else(|| malformed("a `(key value)` pair", item))?;
                let key = pair[0]
                    .as_str()
                    .ok_or_else(|| malformed("a string map key", &pair[0]))?;
                let value = decode_at(registry, value_schema, &pair[1], type_tag, depth + 1)?;
                out.insert(key.to_string(), value);
            }
            Ok(Value::Map(out))
        }

        Schema::Record(field_schemas) => {
            let items = term
                .as_list()
                .ok_or_else(|| malformed("a record field list", term))?;
            if items.len() != field_schemas.len() {
                return Err(DecodeError::ArityMismatch {
                    type_tag: type_tag.to_string(),
                    ctor: "<record>".to_string(),
                    expected: field_schemas.len(),
                    actual: items.len(),
                });
            }
            let mut out = Vec::with_capacity(items.len());
            for ((name, field_schema), item) in field_schemas.iter().zip(items.iter()) {
                let pair = item
                    .as_list()
                    .filter(|pair| pair.len() == 2)
                    .ok_or_else(|| malformed("a `(field value)` pair", item))?;
                if pair[0].as_sym() != Some(name.as_str()) {
                    return Err(malformed(&format!("record field `{name}`"), &pair[0]));
                }
                out.push((
                    name.clone(),
                    decode_at(registry, field_schema, &pair[1], type_tag, depth + 1)?,
                ));
            }
            Ok(Value::Record(out))
        }

        Schema::Variant(ctors) => {
            let (ctor_tag, args): (&str, &[Sexp]) = if let Some(sym) = term.as_sym() {
                (sym, &[])
            } else if let Some((tag, args)) = term.tag_and_args() {
                (tag, args)
            } else {
                return Err(malformed("a constructor application", term));
            };

            let ctor = ctors.iter().find(|c| c.tag == ctor_tag).ok_or_else(|| {
                DecodeError::UnknownConstructor {
                    type_tag: type_tag.to_string(),
                    ctor: ctor_tag.to_string(),
                }
            })?;
            if ctor.fields.len() != args.len() {
                return Err(DecodeError::ArityMismatch {
                    type_tag: type_tag.to_string(),
                    ctor: ctor_tag.to_string(),
                    expected: ctor.fields.len(),
                    actual: args.len(),
                });
            }
            let mut fields = Vec::with_capacity(args.len());
            for (field_schema, arg) in ctor.fields.iter().zip(args.iter()) {
                fields.push(decode_at(registry, field_schema, arg, type_tag, depth + 1)?);
            }
            Ok(Value::Variant {
                tag: ctor_tag.to_string(),
                fields,
            })
        }

        Schema::Named(tag) => {
            let resolved = registry.lookup(tag)?;
            decode_at(registry, resolved, term, tag, depth + 1)
        }

        Schema::Opaque(tag) => {
            // Only the exact placeholder shape is accepted back.
            let is_placeholder = matches!(
                term.tag_and_args(),
                Some((OPAQUE_TAG, [payload])) if payload.as_str() == Some(tag.as_str())
            );
            if is_placeholder {
                Ok(Value::opaque(tag.clone()))
            } else {
                Err(DecodeError::OpaqueNotReconstructible {
                    type_tag: tag.clone(),
                })
            }
        }
    }
}

fn opaque_term(type_tag: &str) -> Sexp {
    Sexp::tagged(OPAQUE_TAG, [Sexp::str(type_tag)])
}

fn malformed(expected: &str, got: &Sexp) -> DecodeError {
    DecodeError::Malformed {
        expected: expected.to_string(),
        got: print_sexp(got, PrintMode::Machine),
    }
}

fn shape_mismatch(schema: &Schema, value: &Value) -> EncodeError {
    EncodeError::ShapeMismatch {
        expected: format!("{schema:?}"),
        got: format!("{value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Ctor;
    use cairn_sexp::parse_sexp;

    fn registry() -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        registry
            .register(
                "tree",
                Schema::Variant(vec![
                    Ctor::nullary("Leaf"),
                    Ctor::new(
                        "Node",
                        vec![Schema::Int, Schema::named("tree"), Schema::named("tree")],
                    ),
                ]),
            )
            .expect("tree");
        registry
            .register("trace", Schema::opaque("trace"))
            .expect("trace");
        registry
    }

    fn round_trip(registry: &CodecRegistry, schema: &Schema, value: &Value) {
        let term = encode(registry, schema, value).expect("encode");
        let back = decode(registry, schema, &term).expect("decode");
        assert_eq!(&back, value);
    }

    #[test]
    fn atoms_round_trip() {
        let registry = registry();
        round_trip(&registry, &Schema::Int, &Value::Int(-3));
        round_trip(&registry, &Schema::Str, &Value::str("forall x, x = x"));
        round_trip(&registry, &Schema::Bool, &Value::Bool(true));
    }

    #[test]
    fn containers_round_trip_including_empty() {
        let registry = registry();
        let seq = Schema::seq(Schema::Int);
        round_trip(&registry, &seq, &Value::Seq(vec![]));
        round_trip(
            &registry,
            &seq,
            &Value::Seq(vec![Value::Int(1), Value::Int(2)]),
        );

        let opt = Schema::opt(Schema::Str);
        round_trip(&registry, &opt, &Value::none());
        round_trip(&registry, &opt, &Value::some(Value::str("x")));

        let map = Schema::map(Schema::Int);
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("a".to_string(), Value::Int(1));
        entries.insert("b".to_string(), Value::Int(2));
        round_trip(&registry, &map, &Value::Map(entries));
        round_trip(&registry, &map, &Value::Map(Default::default()));
    }

    #[test]
    fn empty_seq_encodes_to_the_distinguished_nil_token() {
        let registry = registry();
        let term = encode(&registry, &Schema::seq(Schema::Int), &Value::Seq(vec![]))
            .expect("encode");
        assert_eq!(term, Sexp::nil());
    }

    #[test]
    fn recursive_variant_round_trips_depth_first() {
        let registry = registry();
        let tree = Value::variant(
            "Node",
            vec![
                Value::Int(1),
                Value::variant(
                    "Node",
                    vec![
                        Value::Int(2),
                        Value::variant("Leaf", vec![]),
                        Value::variant("Leaf", vec![]),
                    ],
                ),
                Value::variant("Leaf", vec![]),
            ],
        );
        round_trip(&registry, &Schema::named("tree"), &tree);
    }

    #[test]
    fn nullary_constructor_is_a_bare_symbol() {
        let registry = registry();
        let term = encode(
            &registry,
            &Schema::named("tree"),
            &Value::variant("Leaf", vec![]),
        )
        .expect("encode");
        assert_eq!(term, Sexp::sym("Leaf"));
    }

    #[test]
    fn unknown_constructor_and_arity_errors() {
        let registry = registry();
        let schema = Schema::named("tree");

        let err = decode(&registry, &schema, &parse_sexp("(Branch 1)").unwrap()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownConstructor {
                type_tag: "tree".to_string(),
                ctor: "Branch".to_string()
            }
        );

        let err = decode(&registry, &schema, &parse_sexp("(Node 1 Leaf)").unwrap()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ArityMismatch {
                type_tag: "tree".to_string(),
                ctor: "Node".to_string(),
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn opaque_placeholder_is_constant_and_lossy() {
        let registry = registry();
        let schema = Schema::opaque("trace");

        // Encoding is constant per type, whatever the value was.
        let a = encode(&registry, &schema, &Value::opaque("trace")).expect("encode");
        let b = encode(&registry, &schema, &Value::Int(42)).expect("encode");
        assert_eq!(a, b);
        assert_eq!(a, parse_sexp(r#"(Opaque "trace")"#).unwrap());

        // Decode yields the fixed placeholder, and re-encoding it
        // reproduces the identical wire term.
        let placeholder = decode(&registry, &schema, &a).expect("decode");
        assert_eq!(placeholder, Value::opaque("trace"));
        assert_eq!(
            encode(&registry, &schema, &placeholder).expect("re-encode"),
            a
        );
    }

    #[test]
    fn opaque_rejects_every_other_shape() {
        let registry = registry();
        let schema = Schema::opaque("trace");
        for input in ["42", r#"(Opaque "other")"#, "(Opaque)", "Opaque"] {
            let err = decode(&registry, &schema, &parse_sexp(input).unwrap()).unwrap_err();
            assert_eq!(
                err,
                DecodeError::OpaqueNotReconstructible {
                    type_tag: "trace".to_string()
                },
                "input: {input}"
            );
        }
    }

    #[test]
    fn deep_recursion_fails_with_unsupported_cycle() {
        let registry = registry();
        // (Node 1 (Node 1 (... Leaf Leaf) Leaf) Leaf) nested past the bound.
        let mut term = String::new();
        let depth = MAX_DECODE_DEPTH + 4;
        for _ in 0..depth {
            term.push_str("(Node 1 ");
        }
        term.push_str("Leaf");
        for _ in 0..depth {
            term.push_str(" Leaf)");
        }
        let parsed = parse_sexp(&term).expect("parse");
        let err = decode(&registry, &Schema::named("tree"), &parsed).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedCycle { .. }));
    }

    #[test]
    fn decoding_under_unregistered_named_type_is_unknown_type() {
        let registry = registry();
        let err = decode(&registry, &Schema::named("ghost"), &Sexp::int(1)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownType {
                type_tag: "ghost".to_string()
            }
        );
    }
}
