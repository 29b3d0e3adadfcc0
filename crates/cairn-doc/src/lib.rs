//! # cairn-doc
//!
//! The incremental document: an ordered, addressable sequence of
//! statement nodes with predecessor edges, driven through
//! add/execute/cancel/query without reprocessing from scratch.
//!
//! ## Data model
//!
//! ```text
//! add         → nodes chained after a predecessor (parse errors are
//!               addressable Failed nodes, engine state untouched)
//! execute     → engine elaboration against the parent snapshot;
//!               deferrable nodes go to the worker pool
//! cancel      → cooperative cancel of in-flight work, snapshot
//!               rewind, subtree → Canceled
//! query       → read-only view of the settled cursor snapshot
//! ```
//!
//! Engine snapshots are owned exclusively by the document and cross
//! the protocol only as opaque reference ids.

pub mod document;
pub mod error;
pub mod node;
pub mod schedule;

pub use document::{DeferralPolicy, DocOptions, Document, ExecOutcome, QueryKind, default_deferral_policy};
pub use error::{DocumentError, NodeFailure};
pub use node::{DocNode, ExecState, NodeId, SnapshotId};
pub use schedule::{Scheduler, TaskFailure, WorkerError};
