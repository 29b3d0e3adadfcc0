//! The engine seam: trait, configuration, cancellation, errors.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::statement::{Loc, Statement};

/// Startup options the engine consumes (validated by the front end).
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Standard-library location, if one was configured.
    pub stdlib: Option<PathBuf>,
    /// Extra load paths searched by `Require`.
    pub load_paths: Vec<PathBuf>,
    /// Whether the prelude is auto-required at boot.
    pub prelude: bool,
}

/// One open goal.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Goal {
    pub name: String,
    pub conclusion: String,
    pub hypotheses: Vec<String>,
}

/// Read-only summary of the environment at a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnvSummary {
    pub modules: Vec<String>,
    pub definitions: Vec<String>,
    pub theorems: Vec<String>,
    pub open_proof: Option<String>,
}

/// Errors the engine reports per statement.
///
/// Captured into the owning node's `Failed` state; never a process
/// fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("elaboration failed at bytes {}..{}: {message}", loc.start, loc.stop)]
    Elaboration { message: String, loc: Loc },

    /// Cooperative cancellation was observed mid-elaboration.
    #[error("elaboration interrupted by cancellation")]
    Interrupted,

    #[error("prelude not available: no stdlib at `{path}`")]
    PreludeUnavailable { path: String },
}

/// Cooperative cancellation flag handed to each elaboration.
///
/// Workers check it between steps; a canceled elaboration returns
/// `EngineError::Interrupted`, which the scheduler treats as the
/// cancellation acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Bail out with `Interrupted` if cancellation was requested.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_canceled() {
            Err(EngineError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// The elaboration engine as the protocol layer sees it.
///
/// Snapshots are immutable checkpoints; `elaborate` never mutates its
/// base, it produces a successor. That is what makes rollback a pure
/// matter of re-pointing at an older snapshot.
pub trait Engine: Send + Sync + 'static {
    type Snapshot: Clone + Send + Sync + 'static;

    /// Produce the initial snapshot for a fresh document.
    fn boot(&self, config: &EngineConfig) -> Result<Self::Snapshot, EngineError>;

    /// Elaborate one statement against a base snapshot.
    fn elaborate(
        &self,
        base: &Self::Snapshot,
        statement: &Statement,
        cancel: &CancelToken,
    ) -> Result<Self::Snapshot, EngineError>;

    /// Open goals at a snapshot.
    fn goals(&self, snapshot: &Self::Snapshot) -> Vec<Goal>;

    /// Environment summary at a snapshot.
    fn env_summary(&self, snapshot: &Self::Snapshot) -> EnvSummary;

    /// Stable opaque reference id for a snapshot.
    fn snapshot_ref(&self, snapshot: &Self::Snapshot) -> String;
}
