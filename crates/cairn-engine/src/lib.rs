//! # cairn-engine
//!
//! The boundary to the elaboration engine.
//!
//! The real engine is a black box driven by the protocol layer; this
//! crate defines the seam: the statement grammar and segmenter, the
//! `Engine` trait with cooperative cancellation, content-addressed
//! snapshots, and a deterministic toy engine that implements the trait
//! for the server default and the test suite.

pub mod engine;
pub mod segment;
pub mod statement;
pub mod toy;

pub use engine::{CancelToken, Engine, EngineConfig, EngineError, EnvSummary, Goal};
pub use segment::{SegmentError, segment};
pub use statement::{Loc, Statement, StatementHead};
pub use toy::{ToyEngine, ToySnapshot};
