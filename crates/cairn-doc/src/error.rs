//! Error types for document operations.

use cairn_engine::{EngineError, SegmentError};

use crate::node::NodeId;
use crate::schedule::WorkerError;

/// Why a node ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeFailure {
    #[error(transparent)]
    Parse(SegmentError),

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Worker(WorkerError),
}

/// Errors for operations that leave document state unchanged.
///
/// These are reported to the protocol caller as structured errors;
/// engine failures are not here — they are captured into the owning
/// node's `Failed` state instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),

    #[error("cannot execute node {id}: ancestor {ancestor} is not executed")]
    AncestorUnexecuted { id: NodeId, ancestor: NodeId },

    #[error("cannot execute node {id}: ancestor {ancestor} failed")]
    AncestorFailed { id: NodeId, ancestor: NodeId },

    #[error("node {0} is not executable in its current state")]
    NotExecutable(NodeId),
}
