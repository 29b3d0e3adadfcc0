//! The built-in registry covering every type the engine exposes.
//!
//! Registration happens once per process; `builtin_registry` hands out
//! the frozen shared handle. Opacity is declared per type here, with
//! the non-round-trip contract noted next to each opaque registration.

use std::sync::{Arc, OnceLock};

use crate::registry::CodecRegistry;
use crate::schema::{Ctor, Schema};

/// Build the registry of engine-exposed types.
///
/// Exposed for tests; production code goes through `builtin_registry`.
pub fn build_registry() -> CodecRegistry {
    let mut registry = CodecRegistry::new();

    // A duplicate here would be a programming error in this function,
    // caught by the registry itself on first use.
    let mut register = |tag: &str, schema: Schema| {
        registry
            .register(tag, schema)
            .unwrap_or_else(|err| panic!("builtin registry misconfigured: {err}"));
    };

    register(
        "loc",
        Schema::record(vec![("start", Schema::Int), ("stop", Schema::Int)]),
    );

    register(
        "statement",
        Schema::record(vec![("text", Schema::Str), ("loc", Schema::named("loc"))]),
    );

    register(
        "goal",
        Schema::record(vec![
            ("name", Schema::Str),
            ("conclusion", Schema::Str),
            ("hypotheses", Schema::seq(Schema::Str)),
        ]),
    );

    register("goal.stack", Schema::seq(Schema::named("goal")));

    register(
        "env.summary",
        Schema::record(vec![
            ("modules", Schema::seq(Schema::Str)),
            ("definitions", Schema::seq(Schema::Str)),
            ("theorems", Schema::seq(Schema::Str)),
            ("open_proof", Schema::opt(Schema::Str)),
        ]),
    );

    register(
        "node.state",
        Schema::Variant(vec![
            Ctor::nullary("Unexecuted"),
            Ctor::nullary("Executing"),
            Ctor::new("Failed", vec![Schema::Str]),
            Ctor::nullary("Executed"),
            Ctor::nullary("Canceled"),
        ]),
    );

    register(
        "node.summary",
        Schema::record(vec![
            ("id", Schema::Int),
            ("state", Schema::named("node.state")),
            ("text", Schema::Str),
            ("parent", Schema::opt(Schema::Int)),
            ("added_at", Schema::Str),
            ("executed_at", Schema::opt(Schema::Str)),
        ]),
    );

    register("node.list", Schema::seq(Schema::named("node.summary")));

    register(
        "exec.outcome",
        Schema::Variant(vec![
            Ctor::new("Completed", vec![Schema::Str]),
            Ctor::new("Failed", vec![Schema::Str]),
        ]),
    );

    // Opaque types. Lossy by declared contract: encode collapses every
    // value to the typed placeholder, decode only reproduces the
    // placeholder. Callers needing the real value must drive the
    // engine directly instead of round-tripping the wire format.

    // The universe-consistency graph carries solver-internal state.
    register("universe.graph", Schema::opaque("universe.graph"));

    // Constraint-solving traces reference engine-private closures.
    register("constraint.trace", Schema::opaque("constraint.trace"));

    // Snapshots cross the protocol only as opaque reference ids.
    register("engine.snapshot", Schema::opaque("engine.snapshot"));

    registry
}

/// The process-wide frozen registry.
pub fn builtin_registry() -> Arc<CodecRegistry> {
    static REGISTRY: OnceLock<Arc<CodecRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| build_registry().freeze())
        .clone()
}
