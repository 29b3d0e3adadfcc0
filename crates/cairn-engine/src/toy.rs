//! A deterministic toy engine.
//!
//! Stands in for the real elaboration engine behind the same trait,
//! the way toy worlds stand in for external world implementations in
//! conformance suites. Semantics are small but honest: declarations
//! extend the environment, proofs open a goal stack, a fixed set of
//! closing tactics discharges goals, and `Qed` seals a theorem only
//! when no goals remain.
//!
//! Determinism matters more than realism here: identical statement
//! sequences produce identical snapshots and identical snapshot refs,
//! which is what the document and protocol tests key on.

use sha2::{Digest, Sha256};

use crate::engine::{CancelToken, Engine, EngineConfig, EngineError, EnvSummary, Goal};
use crate::statement::{Statement, StatementHead};

const SNAPSHOT_REF_PREFIX: &str = "snap1_";

/// Tactics that discharge the current goal.
const CLOSING_TACTICS: [&str; 5] = ["reflexivity", "assumption", "exact", "trivial", "auto"];

/// Tactics that are accepted but leave the goal stack unchanged.
const NEUTRAL_TACTICS: [&str; 2] = ["idtac", "intros"];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct OpenProof {
    name: String,
    goals: Vec<Goal>,
}

/// Immutable engine state; one per executed node.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToySnapshot {
    modules: Vec<String>,
    definitions: Vec<String>,
    theorems: Vec<String>,
    open_proof: Option<OpenProof>,
}

impl ToySnapshot {
    fn defines(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d == name)
            || self.theorems.iter().any(|t| t == name)
            || self
                .open_proof
                .as_ref()
                .is_some_and(|proof| proof.name == name)
    }
}

/// The deterministic stand-in engine.
#[derive(Debug, Default)]
pub struct ToyEngine;

impl ToyEngine {
    pub fn new() -> Self {
        Self
    }
}

fn fail(statement: &Statement, message: impl Into<String>) -> EngineError {
    EngineError::Elaboration {
        message: message.into(),
        loc: statement.loc,
    }
}

impl Engine for ToyEngine {
    type Snapshot = ToySnapshot;

    fn boot(&self, config: &EngineConfig) -> Result<ToySnapshot, EngineError> {
        let mut snapshot = ToySnapshot::default();
        if config.prelude {
            if let Some(stdlib) = &config.stdlib
                && !stdlib.exists()
            {
                return Err(EngineError::PreludeUnavailable {
                    path: stdlib.display().to_string(),
                });
            }
            snapshot.modules.push("Init.Prelude".to_string());
        }
        Ok(snapshot)
    }

    fn elaborate(
        &self,
        base: &ToySnapshot,
        statement: &Statement,
        cancel: &CancelToken,
    ) -> Result<ToySnapshot, EngineError> {
        cancel.check()?;
        let mut next = base.clone();

        match &statement.head {
            StatementHead::Require { module } => {
                if !next.modules.iter().any(|m| m == module) {
                    next.modules.push(module.clone());
                }
            }

            StatementHead::Theorem { name } => {
                if next.open_proof.is_some() {
                    return Err(fail(statement, "nested proofs are not supported"));
                }
                if next.defines(name) {
                    return Err(fail(statement, format!("`{name}` is already defined")));
                }
                next.open_proof = Some(OpenProof {
                    name: name.clone(),
                    goals: vec![Goal {
                        name: name.clone(),
                        conclusion: statement.text.clone(),
                        hypotheses: Vec::new(),
                    }],
                });
            }

            StatementHead::Definition { name } => {
                if next.open_proof.is_some() {
                    return Err(fail(statement, "definitions inside proofs are not supported"));
                }
                if next.defines(name) {
                    return Err(fail(statement, format!("`{name}` is already defined")));
                }
                next.definitions.push(name.clone());
            }

            StatementHead::ProofOpen => {
                if next.open_proof.is_none() {
                    return Err(fail(statement, "no theorem to prove"));
                }
            }

            StatementHead::ProofStep { tactic } => {
                let Some(proof) = next.open_proof.as_mut() else {
                    return Err(fail(statement, "no open proof for tactic"));
                };
                cancel.check()?;
                if proof.goals.is_empty() {
                    return Err(fail(statement, "no remaining goals"));
                }
                if CLOSING_TACTICS.contains(&tactic.as_str()) {
                    proof.goals.pop();
                } else if tactic == "split" {
                    let current = proof.goals[proof.goals.len() - 1].clone();
                    proof.goals.push(current);
                } else if !NEUTRAL_TACTICS.contains(&tactic.as_str()) {
                    return Err(fail(statement, format!("unknown tactic `{tactic}`")));
                }
            }

            StatementHead::Qed => {
                let Some(proof) = next.open_proof.take() else {
                    return Err(fail(statement, "Qed outside of a proof"));
                };
                if !proof.goals.is_empty() {
                    return Err(fail(
                        statement,
                        format!("cannot close proof: {} goal(s) remain", proof.goals.len()),
                    ));
                }
                next.theorems.push(proof.name);
            }
        }

        Ok(next)
    }

    fn goals(&self, snapshot: &ToySnapshot) -> Vec<Goal> {
        snapshot
            .open_proof
            .as_ref()
            .map(|proof| proof.goals.clone())
            .unwrap_or_default()
    }

    fn env_summary(&self, snapshot: &ToySnapshot) -> EnvSummary {
        EnvSummary {
            modules: snapshot.modules.clone(),
            definitions: snapshot.definitions.clone(),
            theorems: snapshot.theorems.clone(),
            open_proof: snapshot.open_proof.as_ref().map(|proof| proof.name.clone()),
        }
    }

    fn snapshot_ref(&self, snapshot: &ToySnapshot) -> String {
        let canonical = serde_json::to_string(snapshot)
            .unwrap_or_else(|err| panic!("toy snapshot must serialize: {err}"));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{SNAPSHOT_REF_PREFIX}{:x}", hasher.finalize())
    }
}
