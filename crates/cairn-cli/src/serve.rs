//! The protocol loop: one framed request in, one framed response out.
//!
//! ```text
//! stdin ─ FrameReader ─► dispatch ─► Document / CodecRegistry
//!                                         │
//! stdout ◄─ FrameWriter ◄─ response ◄─────┘
//! ```
//!
//! Responses are written strictly in request order. Protocol-level
//! errors become `(ProtocolError <kind> "<detail>")` frames and leave
//! the document unchanged; only an unreadable frame terminates the
//! process.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use cairn_codec::{CodecRegistry, builtin_registry, decode, encode};
use cairn_doc::{
    DocOptions, Document, ExecOutcome, NodeId, QueryKind, default_deferral_policy,
};
use cairn_engine::{EngineConfig, ToyEngine};
use cairn_sexp::{FrameReader, FrameWriter, Sexp, print_sexp};

use crate::config::Config;

/// Serve the protocol on stdin/stdout. Returns the process exit code.
pub fn run(config: &Config) -> i32 {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(config, stdin.lock(), stdout.lock())
}

pub fn serve<R: BufRead, W: Write>(config: &Config, input: R, output: W) -> i32 {
    let engine = Arc::new(ToyEngine::new());
    let mut document = match Document::new(Arc::clone(&engine), doc_options(config)) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("error: engine boot failed: {err}");
            return 2;
        }
    };
    let registry = builtin_registry();

    let mut reader = FrameReader::new(input, config.framing);
    let mut writer = FrameWriter::new(output, config.framing, config.print_mode);

    loop {
        let request = match reader.read_frame() {
            Ok(Some(term)) => term,
            Ok(None) => return 0,
            Err(err) => {
                eprintln!("error: malformed frame: {err}");
                return 1;
            }
        };
        tracing::debug!(request = %request, "dispatch");
        let response = dispatch(&request, &mut document, &engine, config, &registry);
        if let Err(err) = writer.write_frame(&response) {
            eprintln!("error: cannot write response: {err}");
            return 1;
        }
    }
}

fn doc_options(config: &Config) -> DocOptions {
    DocOptions {
        engine_config: EngineConfig {
            stdlib: config.stdlib.clone(),
            load_paths: config.load_paths.clone(),
            prelude: config.prelude,
        },
        workers: config.workers,
        error_recovery: config.error_recovery,
        deferral: default_deferral_policy(),
    }
}

fn dispatch(
    request: &Sexp,
    document: &mut Document<ToyEngine>,
    engine: &Arc<ToyEngine>,
    config: &Config,
    registry: &CodecRegistry,
) -> Sexp {
    let Some((tag, args)) = request.tag_and_args() else {
        return protocol_error("BadArguments", "expected a (Command ...) list");
    };
    match tag {
        "Add" => cmd_add(args, document),
        "Exec" => cmd_exec(args, document),
        "Cancel" => cmd_cancel(args, document),
        "Query" => cmd_query(args, document, registry),
        "Print" => cmd_print(args, config, registry),
        "NewDoc" => cmd_new_doc(args, document, engine, config),
        other => {
            tracing::warn!(command = other, "unknown command");
            protocol_error("UnknownCommand", other)
        }
    }
}

fn protocol_error(kind: &str, detail: impl Into<String>) -> Sexp {
    Sexp::tagged("ProtocolError", [Sexp::sym(kind), Sexp::str(detail)])
}

fn document_error(err: impl std::fmt::Display) -> Sexp {
    tracing::warn!(%err, "document operation rejected");
    protocol_error("Document", err.to_string())
}

fn node_id(term: &Sexp) -> Option<NodeId> {
    let raw = term.as_int()?;
    u64::try_from(raw).ok().map(NodeId)
}

fn id_list(ids: &[NodeId]) -> Sexp {
    Sexp::list(ids.iter().map(|id| Sexp::int(id.0 as i64)).collect())
}

fn cmd_add(args: &[Sexp], document: &mut Document<ToyEngine>) -> Sexp {
    let parsed = match args {
        [text, after] => text.as_str().zip(node_id(after)),
        _ => None,
    };
    let Some((text, after)) = parsed else {
        return protocol_error("BadArguments", "Add expects a string and a node id");
    };
    match document.add(text, after) {
        Ok(ids) => Sexp::tagged("Added", [id_list(&ids)]),
        Err(err) => document_error(err),
    }
}

fn cmd_exec(args: &[Sexp], document: &mut Document<ToyEngine>) -> Sexp {
    let Some(id) = single_node_id(args) else {
        return protocol_error("BadArguments", "Exec expects a node id");
    };
    match document.execute(id) {
        // A delegated node is accepted for background execution; its
        // failure, if any, surfaces on the node when a dependent or a
        // query settles it.
        Ok(ExecOutcome::Completed { .. }) | Ok(ExecOutcome::Delegated) => {
            Sexp::tagged("Completed", [])
        }
        Ok(ExecOutcome::Failed(failure)) => {
            Sexp::tagged("Failed", [Sexp::str(failure.to_string())])
        }
        Err(err) => document_error(err),
    }
}

fn cmd_cancel(args: &[Sexp], document: &mut Document<ToyEngine>) -> Sexp {
    let Some(id) = single_node_id(args) else {
        return protocol_error("BadArguments", "Cancel expects a node id");
    };
    match document.cancel(id) {
        Ok(ids) => Sexp::tagged("Canceled", [id_list(&ids)]),
        Err(err) => document_error(err),
    }
}

fn single_node_id(args: &[Sexp]) -> Option<NodeId> {
    match args {
        [id] => node_id(id),
        _ => None,
    }
}

fn cmd_query(
    args: &[Sexp],
    document: &mut Document<ToyEngine>,
    registry: &CodecRegistry,
) -> Sexp {
    let kind = match args {
        [kind] => match kind.as_sym() {
            Some("Goals") => Some(QueryKind::Goals),
            Some("Env") => Some(QueryKind::Env),
            Some("Nodes") => Some(QueryKind::Nodes),
            _ => None,
        },
        [kind, id] if kind.as_sym() == Some("Statement") => {
            node_id(id).map(QueryKind::Statement)
        }
        _ => None,
    };
    let Some(kind) = kind else {
        return protocol_error(
            "BadArguments",
            "Query expects Goals, Env, Nodes, or (Statement <id>)",
        );
    };

    let (type_tag, value) = match document.query(kind) {
        Ok(answer) => answer,
        Err(err) => return document_error(err),
    };
    let schema = match registry.lookup(type_tag) {
        Ok(schema) => schema,
        Err(err) => return protocol_error("BadArguments", err.to_string()),
    };
    match encode(registry, schema, &value) {
        Ok(term) => Sexp::tagged("Answer", [term]),
        Err(err) => protocol_error("BadArguments", err.to_string()),
    }
}

fn cmd_print(args: &[Sexp], config: &Config, registry: &CodecRegistry) -> Sexp {
    let parsed = match args {
        [tag, term] => tag.as_sym().or_else(|| tag.as_str()).map(|tag| (tag, term)),
        _ => None,
    };
    let Some((type_tag, term)) = parsed else {
        return protocol_error("BadArguments", "Print expects a type tag and a value");
    };

    let schema = match registry.lookup(type_tag) {
        Ok(schema) => schema,
        Err(err) => return protocol_error("BadArguments", err.to_string()),
    };
    let value = match decode(registry, schema, term) {
        Ok(value) => value,
        Err(err) => return protocol_error("BadArguments", err.to_string()),
    };
    match encode(registry, schema, &value) {
        Ok(canonical) => {
            Sexp::tagged("Printed", [Sexp::str(print_sexp(&canonical, config.print_mode))])
        }
        Err(err) => protocol_error("BadArguments", err.to_string()),
    }
}

fn cmd_new_doc(
    args: &[Sexp],
    document: &mut Document<ToyEngine>,
    engine: &Arc<ToyEngine>,
    config: &Config,
) -> Sexp {
    let mut options = doc_options(config);
    for arg in args {
        let parsed = arg.tag_and_args();
        match parsed {
            Some(("stdlib", [path])) if path.as_str().is_some() => {
                options.engine_config.stdlib =
                    path.as_str().map(PathBuf::from);
            }
            Some(("load_path", [path])) if path.as_str().is_some() => {
                if let Some(path) = path.as_str() {
                    options.engine_config.load_paths.push(PathBuf::from(path));
                }
            }
            Some(("prelude", [flag])) if flag.as_bool().is_some() => {
                options.engine_config.prelude = flag.as_bool().unwrap_or(true);
            }
            _ => {
                return protocol_error(
                    "BadArguments",
                    format!("unrecognized NewDoc option: {arg}"),
                );
            }
        }
    }

    match Document::new(Arc::clone(engine), options) {
        Ok(fresh) => {
            *document = fresh;
            Sexp::tagged("DocCreated", [])
        }
        Err(err) => document_error(err),
    }
}
