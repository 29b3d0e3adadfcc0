//! Document nodes and their execution states.

use chrono::{DateTime, Utc};

use cairn_engine::{SegmentError, Statement};

use crate::error::NodeFailure;

/// Monotonically increasing sentence id. Id 0 is the document root,
/// the synthetic anchor holding the boot snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal id of a stored engine snapshot. Never crosses the
/// protocol; the wire sees only the engine's opaque snapshot ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotId(pub u64);

/// Execution state of one node.
///
/// `Unexecuted → Executing → {Executed | Failed}`; `Executed` (and
/// every other non-terminal state) `→ Canceled` when an ancestor is
/// canceled. `Failed` is terminal unless a cancel removes the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecState {
    Unexecuted,
    Executing,
    Executed,
    Failed(NodeFailure),
    Canceled,
}

impl ExecState {
    pub fn label(&self) -> &'static str {
        match self {
            ExecState::Unexecuted => "Unexecuted",
            ExecState::Executing => "Executing",
            ExecState::Executed => "Executed",
            ExecState::Failed(_) => "Failed",
            ExecState::Canceled => "Canceled",
        }
    }
}

/// One addressable statement node.
#[derive(Debug, Clone)]
pub struct DocNode {
    pub id: NodeId,
    pub text: String,
    /// Parse result; a segmentation failure is carried here and the
    /// node starts out `Failed`, still addressable for `cancel`.
    pub parsed: Result<Statement, SegmentError>,
    pub state: ExecState,
    /// Immediate predecessor. `None` only for the root.
    pub parent: Option<NodeId>,
    pub snapshot: Option<SnapshotId>,
    pub deferrable: bool,
    pub added_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl DocNode {
    /// Whether the node's statement can still be handed to the engine.
    pub fn is_executable(&self) -> bool {
        self.parsed.is_ok()
            && matches!(self.state, ExecState::Unexecuted | ExecState::Executing)
    }
}
