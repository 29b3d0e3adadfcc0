//! Parsed statements: the unit of document execution.

use std::sync::OnceLock;

use regex::Regex;

/// Byte span of a statement within the text it was added from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Loc {
    pub start: usize,
    pub stop: usize,
}

/// The recognized head of a statement.
///
/// Heads drive two decisions: what the engine does with the statement,
/// and whether the scheduler may defer it (proof-body heads are the
/// deferrable class by default).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StatementHead {
    Theorem { name: String },
    Definition { name: String },
    Require { module: String },
    ProofOpen,
    ProofStep { tactic: String },
    Qed,
}

/// One executable statement.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Statement {
    pub text: String,
    pub head: StatementHead,
    pub loc: Loc,
}

impl Statement {
    /// Whether this statement belongs to a proof body.
    pub fn is_proof_body(&self) -> bool {
        matches!(
            self.head,
            StatementHead::ProofOpen | StatementHead::ProofStep { .. } | StatementHead::Qed
        )
    }
}

fn ident_after(keyword: &str) -> Regex {
    Regex::new(&format!(r"^{keyword}\s+([A-Za-z_][A-Za-z0-9_.']*)"))
        .unwrap_or_else(|err| panic!("statement-head pattern must compile: {err}"))
}

fn theorem_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ident_after("Theorem"))
}

fn definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ident_after("Definition"))
}

fn require_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ident_after("Require"))
}

fn tactic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_']*)")
            .unwrap_or_else(|err| panic!("tactic pattern must compile: {err}"))
    })
}

/// Classify one segmented sentence into a statement.
///
/// Unrecognized heads parse as proof steps; whether the tactic exists
/// is the engine's call, not the parser's.
pub fn parse_statement(text: &str, loc: Loc) -> Statement {
    let trimmed = text.trim();
    let body = trimmed.strip_suffix('.').unwrap_or(trimmed).trim_end();

    let head = if let Some(caps) = theorem_re().captures(body) {
        StatementHead::Theorem {
            name: caps[1].to_string(),
        }
    } else if let Some(caps) = definition_re().captures(body) {
        StatementHead::Definition {
            name: caps[1].to_string(),
        }
    } else if let Some(caps) = require_re().captures(body) {
        StatementHead::Require {
            module: caps[1].to_string(),
        }
    } else if body == "Proof" {
        StatementHead::ProofOpen
    } else if body == "Qed" {
        StatementHead::Qed
    } else {
        let tactic = tactic_re()
            .captures(body)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| body.to_string());
        StatementHead::ProofStep { tactic }
    };

    Statement {
        text: trimmed.to_string(),
        head,
        loc,
    }
}
