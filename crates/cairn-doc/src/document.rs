//! The document: ordered statement nodes, the snapshot store, and the
//! four protocol-facing operations (add, execute, cancel, query).
//!
//! The document is the only owner of engine snapshots. Executed nodes
//! hold an internal snapshot id; the wire only ever sees the engine's
//! opaque snapshot ref. Cancellation rewinds by re-pointing the cursor
//! at an older snapshot and garbage-collecting the rest.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use cairn_codec::Value;
use cairn_engine::{
    CancelToken, Engine, EngineConfig, EngineError, EnvSummary, Goal, Loc, Statement,
    StatementHead, segment,
};
use chrono::Utc;

use crate::error::{DocumentError, NodeFailure};
use crate::node::{DocNode, ExecState, NodeId, SnapshotId};
use crate::schedule::{Scheduler, TaskFailure, WorkerError};

/// Predicate deciding whether a statement may run on a background
/// worker. Policy, not mechanism: the front end wires in whatever the
/// configuration asks for.
pub type DeferralPolicy = Arc<dyn Fn(&Statement) -> bool + Send + Sync>;

/// Default deferral class: proof bodies, whose final check can be
/// postponed until a dependent node needs the result.
pub fn default_deferral_policy() -> DeferralPolicy {
    Arc::new(|statement| statement.is_proof_body())
}

/// Options fixed at document creation.
#[derive(Clone)]
pub struct DocOptions {
    pub engine_config: EngineConfig,
    /// Background worker count. Zero means fully synchronous.
    pub workers: usize,
    /// Whether execution may proceed past a `Failed` ancestor against
    /// the last good snapshot.
    pub error_recovery: bool,
    pub deferral: DeferralPolicy,
}

impl Default for DocOptions {
    fn default() -> Self {
        Self {
            engine_config: EngineConfig::default(),
            workers: 0,
            error_recovery: false,
            deferral: default_deferral_policy(),
        }
    }
}

/// What `execute` reports for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Elaboration finished and the snapshot is stored.
    Completed { snapshot_ref: String },
    /// The node was handed to the worker pool and is `Executing`; its
    /// result lands when a dependent settles it.
    Delegated,
    /// Elaboration failed; the error is recorded on the node.
    Failed(NodeFailure),
}

/// Read-only introspection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Goals,
    Env,
    Nodes,
    Statement(NodeId),
}

/// The incremental document over one engine instance.
pub struct Document<E: Engine> {
    engine: Arc<E>,
    options: DocOptions,
    nodes: BTreeMap<NodeId, DocNode>,
    snapshots: BTreeMap<SnapshotId, E::Snapshot>,
    next_node: u64,
    next_snapshot: u64,
    /// The node whose snapshot queries read. Follows the most recent
    /// successful execution; rewound by cancel.
    cursor: NodeId,
    scheduler: Option<Scheduler<E>>,
    tokens: BTreeMap<NodeId, CancelToken>,
}

impl<E: Engine> Document<E> {
    /// Boot the engine and create a fresh document holding only the
    /// root node with the boot snapshot.
    pub fn new(engine: Arc<E>, options: DocOptions) -> Result<Self, EngineError> {
        let boot = engine.boot(&options.engine_config)?;
        let scheduler = (options.workers > 0)
            .then(|| Scheduler::new(Arc::clone(&engine), options.workers));

        let boot_id = SnapshotId(0);
        let mut snapshots = BTreeMap::new();
        snapshots.insert(boot_id, boot);

        let mut nodes = BTreeMap::new();
        nodes.insert(NodeId::ROOT, root_node(boot_id));

        Ok(Self {
            engine,
            options,
            nodes,
            snapshots,
            next_node: 1,
            next_snapshot: 1,
            cursor: NodeId::ROOT,
            scheduler,
            tokens: BTreeMap::new(),
        })
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn node(&self, id: NodeId) -> Option<&DocNode> {
        self.nodes.get(&id)
    }

    /// Split `text` into statements and chain one node per statement
    /// after `after`. Never touches engine state; a segmentation
    /// failure yields a single addressable `Failed` node.
    pub fn add(&mut self, text: &str, after: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        if !self.nodes.contains_key(&after) {
            return Err(DocumentError::UnknownNode(after));
        }

        match segment(text, 0) {
            Ok(statements) => {
                let mut ids = Vec::with_capacity(statements.len());
                let mut parent = after;
                for statement in statements {
                    let id = self.fresh_node_id();
                    let deferrable = (self.options.deferral)(&statement);
                    self.nodes.insert(
                        id,
                        DocNode {
                            id,
                            text: statement.text.clone(),
                            parsed: Ok(statement),
                            state: ExecState::Unexecuted,
                            parent: Some(parent),
                            snapshot: None,
                            deferrable,
                            added_at: Utc::now(),
                            executed_at: None,
                        },
                    );
                    ids.push(id);
                    parent = id;
                }
                Ok(ids)
            }
            Err(err) => {
                let id = self.fresh_node_id();
                self.nodes.insert(
                    id,
                    DocNode {
                        id,
                        text: text.to_string(),
                        state: ExecState::Failed(NodeFailure::Parse(err.clone())),
                        parsed: Err(err),
                        parent: Some(after),
                        snapshot: None,
                        deferrable: false,
                        added_at: Utc::now(),
                        executed_at: None,
                    },
                );
                Ok(vec![id])
            }
        }
    }

    /// Execute one node against its parent snapshot.
    ///
    /// Every ancestor must already be `Executed` (in-flight ancestors
    /// are settled first; with error recovery on, `Failed` ancestors
    /// are skipped and the node rebases onto the last good snapshot).
    /// Deferrable nodes go to the worker pool when one is configured.
    pub fn execute(&mut self, id: NodeId) -> Result<ExecOutcome, DocumentError> {
        if !self.nodes.contains_key(&id) {
            return Err(DocumentError::UnknownNode(id));
        }
        if id.is_root() {
            // The root is permanently executed; report its snapshot.
            return Ok(ExecOutcome::Completed {
                snapshot_ref: self.snapshot_ref_of(NodeId::ROOT),
            });
        }

        self.settle(id);
        match &self.nodes[&id].state {
            ExecState::Executed => {
                // An explicit execute retargets the cursor, even when
                // the node was already settled.
                self.cursor = id;
                return Ok(ExecOutcome::Completed {
                    snapshot_ref: self.snapshot_ref_of(id),
                });
            }
            ExecState::Failed(failure) => return Ok(ExecOutcome::Failed(failure.clone())),
            ExecState::Canceled => return Err(DocumentError::NotExecutable(id)),
            ExecState::Unexecuted | ExecState::Executing => {}
        }

        let base_id = self.base_snapshot_for(id)?;
        let statement = match &self.nodes[&id].parsed {
            Ok(statement) => statement.clone(),
            Err(_) => return Err(DocumentError::NotExecutable(id)),
        };
        let base = self
            .snapshots
            .get(&base_id)
            .cloned()
            .expect("executed ancestor keeps its snapshot alive");

        if self.nodes[&id].deferrable && self.scheduler.is_some() {
            let token = CancelToken::new();
            self.tokens.insert(id, token.clone());
            if let Some(node) = self.nodes.get_mut(&id) {
                node.state = ExecState::Executing;
            }
            if let Some(scheduler) = &self.scheduler {
                scheduler.submit(id, base, statement, token);
            }
            return Ok(ExecOutcome::Delegated);
        }

        let token = CancelToken::new();
        match self.engine.elaborate(&base, &statement, &token) {
            Ok(snapshot) => {
                let snapshot_ref = self.engine.snapshot_ref(&snapshot);
                let snapshot_id = self.store_snapshot(snapshot);
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.snapshot = Some(snapshot_id);
                    node.state = ExecState::Executed;
                    node.executed_at = Some(Utc::now());
                }
                self.cursor = id;
                Ok(ExecOutcome::Completed { snapshot_ref })
            }
            Err(err) => {
                let failure = NodeFailure::Engine(err);
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.state = ExecState::Failed(failure.clone());
                }
                Ok(ExecOutcome::Failed(failure))
            }
        }
    }

    /// Cancel a node and its whole subtree.
    ///
    /// In-flight background work is signaled and its acknowledgment
    /// awaited before any snapshot is dropped, so a stale worker can
    /// never resurrect state the document already rolled back. Returns
    /// the canceled ids in id order. Canceling the root clears every
    /// non-root node and restores the boot snapshot.
    pub fn cancel(&mut self, id: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        if !self.nodes.contains_key(&id) {
            return Err(DocumentError::UnknownNode(id));
        }
        let subtree = self.subtree(id);

        for node_id in &subtree {
            if let Some(token) = self.tokens.get(node_id) {
                token.cancel();
            }
        }
        for node_id in &subtree {
            if matches!(self.nodes[node_id].state, ExecState::Executing) {
                // The join is the acknowledgment; the outcome no longer
                // matters.
                if let Some(scheduler) = self.scheduler.as_mut() {
                    let _ = scheduler.join(*node_id);
                }
                self.tokens.remove(node_id);
            }
        }

        for node_id in &subtree {
            if let Some(node) = self.nodes.get_mut(node_id) {
                node.state = ExecState::Canceled;
                node.snapshot = None;
                node.executed_at = None;
            }
        }

        if id.is_root() {
            self.cursor = NodeId::ROOT;
        } else if subtree.contains(&self.cursor) {
            let parent = self.nodes[&id].parent.unwrap_or(NodeId::ROOT);
            self.cursor = self.nearest_executed(parent);
        }
        self.gc_snapshots();
        Ok(subtree)
    }

    /// Read-only introspection against the settled cursor snapshot.
    ///
    /// All in-flight execution is settled first; queries never observe
    /// partial state. Returns the registered type tag of the answer
    /// alongside the value.
    pub fn query(&mut self, kind: QueryKind) -> Result<(&'static str, Value), DocumentError> {
        self.settle_all();
        match kind {
            QueryKind::Goals => {
                let goals = self.engine.goals(self.cursor_snapshot());
                Ok(("goal.stack", goals_value(&goals)))
            }
            QueryKind::Env => {
                let summary = self.engine.env_summary(self.cursor_snapshot());
                Ok(("env.summary", env_value(&summary)))
            }
            QueryKind::Nodes => {
                let list = Value::Seq(self.nodes.values().map(node_summary_value).collect());
                Ok(("node.list", list))
            }
            QueryKind::Statement(id) => {
                let node = self.nodes.get(&id).ok_or(DocumentError::UnknownNode(id))?;
                let loc = match &node.parsed {
                    Ok(statement) => statement.loc,
                    Err(_) => Loc {
                        start: 0,
                        stop: node.text.len(),
                    },
                };
                let value = Value::record(vec![
                    ("text", Value::str(node.text.as_str())),
                    ("loc", loc_value(loc)),
                ]);
                Ok(("statement", value))
            }
        }
    }

    fn fresh_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn store_snapshot(&mut self, snapshot: E::Snapshot) -> SnapshotId {
        let id = SnapshotId(self.next_snapshot);
        self.next_snapshot += 1;
        self.snapshots.insert(id, snapshot);
        id
    }

    fn snapshot_ref_of(&self, id: NodeId) -> String {
        let snapshot_id = self.nodes[&id]
            .snapshot
            .expect("executed node holds a snapshot");
        let snapshot = self
            .snapshots
            .get(&snapshot_id)
            .expect("live node snapshot is retained");
        self.engine.snapshot_ref(snapshot)
    }

    fn cursor_snapshot(&self) -> &E::Snapshot {
        let snapshot_id = self.nodes[&self.cursor]
            .snapshot
            .expect("cursor rests on an executed node");
        self.snapshots
            .get(&snapshot_id)
            .expect("cursor snapshot is retained")
    }

    /// Wait for `id`'s background task if one is in flight, then fold
    /// the result into the node.
    fn settle(&mut self, id: NodeId) {
        let in_flight = self
            .nodes
            .get(&id)
            .is_some_and(|node| matches!(node.state, ExecState::Executing));
        if !in_flight {
            return;
        }
        let result = match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.join(id),
            None => Err(TaskFailure::Worker(WorkerError::Disconnected)),
        };
        self.apply_result(id, result);
    }

    fn settle_all(&mut self) {
        let in_flight: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| matches!(node.state, ExecState::Executing))
            .map(|node| node.id)
            .collect();
        for id in in_flight {
            self.settle(id);
        }
    }

    fn apply_result(&mut self, id: NodeId, result: Result<E::Snapshot, TaskFailure>) {
        self.tokens.remove(&id);
        match result {
            Ok(snapshot) => {
                let snapshot_id = self.store_snapshot(snapshot);
                let extends_cursor = self.extends_cursor(id);
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.snapshot = Some(snapshot_id);
                    node.state = ExecState::Executed;
                    node.executed_at = Some(Utc::now());
                }
                // A settle is passive: it only advances the cursor when
                // the settled node extends the current cursor chain.
                // Settling a side branch must not re-point queries away
                // from the caller's last explicit execution.
                if extends_cursor {
                    self.cursor = id;
                }
            }
            Err(TaskFailure::Engine(err)) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.state = ExecState::Failed(NodeFailure::Engine(err));
                }
            }
            Err(TaskFailure::Worker(err)) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.state = ExecState::Failed(NodeFailure::Worker(err));
                }
            }
        }
    }

    /// Settle and validate the ancestor chain, returning the snapshot
    /// the node elaborates against.
    fn base_snapshot_for(&mut self, id: NodeId) -> Result<SnapshotId, DocumentError> {
        let mut ancestor = self.nodes[&id]
            .parent
            .expect("non-root node has a parent");
        loop {
            self.settle(ancestor);
            let node = &self.nodes[&ancestor];
            match &node.state {
                ExecState::Executed => {
                    return Ok(node.snapshot.expect("executed node holds a snapshot"));
                }
                ExecState::Failed(_) if self.options.error_recovery => {
                    // Rebase onto the nearest good snapshot above the
                    // failure.
                    ancestor = node.parent.unwrap_or(NodeId::ROOT);
                }
                ExecState::Failed(_) => {
                    return Err(DocumentError::AncestorFailed { id, ancestor });
                }
                ExecState::Unexecuted | ExecState::Executing | ExecState::Canceled => {
                    return Err(DocumentError::AncestorUnexecuted { id, ancestor });
                }
            }
        }
    }

    /// `id` plus every descendant, in id order. The root itself is
    /// never a member; canceling the root means canceling everything
    /// under it.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut members = BTreeSet::new();
        members.insert(id);
        let mut out = Vec::new();
        if !id.is_root() {
            out.push(id);
        }
        // Parents always precede children in id order, so one ordered
        // pass closes the set.
        for node in self.nodes.values() {
            if let Some(parent) = node.parent
                && members.contains(&parent)
            {
                members.insert(node.id);
                out.push(node.id);
            }
        }
        out
    }

    /// True when the cursor lies on `id`'s ancestor chain (or is `id`
    /// itself), so moving the cursor to `id` advances along the same
    /// branch instead of jumping to a sibling one.
    fn extends_cursor(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.cursor {
                return true;
            }
            match self.nodes.get(&current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn nearest_executed(&self, from: NodeId) -> NodeId {
        let mut current = from;
        loop {
            let node = &self.nodes[&current];
            if matches!(node.state, ExecState::Executed) {
                return current;
            }
            current = node.parent.unwrap_or(NodeId::ROOT);
        }
    }

    fn gc_snapshots(&mut self) {
        let live: BTreeSet<SnapshotId> =
            self.nodes.values().filter_map(|node| node.snapshot).collect();
        self.snapshots.retain(|id, _| live.contains(id));
    }
}

fn root_node(boot: SnapshotId) -> DocNode {
    DocNode {
        id: NodeId::ROOT,
        text: String::new(),
        // Synthetic anchor; the root never reaches the engine.
        parsed: Ok(Statement {
            text: String::new(),
            head: StatementHead::ProofStep {
                tactic: String::new(),
            },
            loc: Loc { start: 0, stop: 0 },
        }),
        state: ExecState::Executed,
        parent: None,
        snapshot: Some(boot),
        deferrable: false,
        added_at: Utc::now(),
        executed_at: Some(Utc::now()),
    }
}

fn goals_value(goals: &[Goal]) -> Value {
    Value::Seq(goals.iter().map(goal_value).collect())
}

fn goal_value(goal: &Goal) -> Value {
    Value::record(vec![
        ("name", Value::str(goal.name.as_str())),
        ("conclusion", Value::str(goal.conclusion.as_str())),
        (
            "hypotheses",
            Value::Seq(
                goal.hypotheses
                    .iter()
                    .map(|h| Value::str(h.as_str()))
                    .collect(),
            ),
        ),
    ])
}

fn env_value(summary: &EnvSummary) -> Value {
    let strings = |items: &[String]| {
        Value::Seq(items.iter().map(|s| Value::str(s.as_str())).collect())
    };
    Value::record(vec![
        ("modules", strings(&summary.modules)),
        ("definitions", strings(&summary.definitions)),
        ("theorems", strings(&summary.theorems)),
        (
            "open_proof",
            match &summary.open_proof {
                Some(name) => Value::some(Value::str(name.as_str())),
                None => Value::none(),
            },
        ),
    ])
}

fn node_summary_value(node: &DocNode) -> Value {
    Value::record(vec![
        ("id", Value::Int(node.id.0 as i64)),
        ("state", state_value(&node.state)),
        ("text", Value::str(node.text.as_str())),
        (
            "parent",
            match node.parent {
                Some(parent) => Value::some(Value::Int(parent.0 as i64)),
                None => Value::none(),
            },
        ),
        ("added_at", Value::str(node.added_at.to_rfc3339())),
        (
            "executed_at",
            match &node.executed_at {
                Some(at) => Value::some(Value::str(at.to_rfc3339())),
                None => Value::none(),
            },
        ),
    ])
}

fn state_value(state: &ExecState) -> Value {
    match state {
        ExecState::Failed(failure) => {
            Value::variant("Failed", vec![Value::str(failure.to_string())])
        }
        other => Value::variant(other.label(), Vec::new()),
    }
}

fn loc_value(loc: Loc) -> Value {
    Value::record(vec![
        ("start", Value::Int(loc.start as i64)),
        ("stop", Value::Int(loc.stop as i64)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_engine::ToyEngine;

    fn doc() -> Document<ToyEngine> {
        Document::new(Arc::new(ToyEngine::new()), DocOptions::default()).expect("boot")
    }

    fn doc_with(options: DocOptions) -> Document<ToyEngine> {
        Document::new(Arc::new(ToyEngine::new()), options).expect("boot")
    }

    fn completed(outcome: ExecOutcome) -> String {
        match outcome {
            ExecOutcome::Completed { snapshot_ref } => snapshot_ref,
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn add_chains_nodes_after_the_predecessor() {
        let mut doc = doc();
        let first = doc.add("Definition a. Definition b.", NodeId::ROOT).expect("add");
        assert_eq!(first, vec![NodeId(1), NodeId(2)]);
        assert_eq!(doc.node(NodeId(1)).expect("node").parent, Some(NodeId::ROOT));
        assert_eq!(doc.node(NodeId(2)).expect("node").parent, Some(NodeId(1)));

        let second = doc.add("Definition c.", NodeId(1)).expect("add");
        assert_eq!(second, vec![NodeId(3)]);
        assert_eq!(doc.node(NodeId(3)).expect("node").parent, Some(NodeId(1)));
    }

    #[test]
    fn add_after_unknown_node_fails_without_side_effects() {
        let mut doc = doc();
        assert_eq!(
            doc.add("Definition a.", NodeId(7)),
            Err(DocumentError::UnknownNode(NodeId(7)))
        );
        let (_, nodes) = doc.query(QueryKind::Nodes).expect("query");
        assert_eq!(nodes, Value::Seq(vec![node_summary_value(
            doc.node(NodeId::ROOT).expect("root")
        )]));
    }

    #[test]
    fn parse_failure_yields_an_addressable_failed_node() {
        let mut doc = doc();
        let ids = doc.add("Definition a", NodeId::ROOT).expect("add");
        assert_eq!(ids, vec![NodeId(1)]);

        let node = doc.node(NodeId(1)).expect("node");
        assert!(matches!(node.state, ExecState::Failed(NodeFailure::Parse(_))));

        // Still addressable: execute refuses, cancel works.
        assert_eq!(
            doc.execute(NodeId(1)).expect("execute"),
            ExecOutcome::Failed(match &doc.node(NodeId(1)).expect("node").state {
                ExecState::Failed(failure) => failure.clone(),
                other => panic!("expected Failed, got {other:?}"),
            })
        );
        assert_eq!(doc.cancel(NodeId(1)), Ok(vec![NodeId(1)]));
    }

    #[test]
    fn chain_executes_in_order_and_out_of_order_fails() {
        let mut doc = doc();
        doc.add("Definition a. Definition b.", NodeId::ROOT).expect("add");

        assert_eq!(
            doc.execute(NodeId(2)),
            Err(DocumentError::AncestorUnexecuted {
                id: NodeId(2),
                ancestor: NodeId(1),
            })
        );

        completed(doc.execute(NodeId(1)).expect("exec 1"));
        completed(doc.execute(NodeId(2)).expect("exec 2"));
        assert_eq!(doc.cursor(), NodeId(2));
    }

    #[test]
    fn reexecuting_an_executed_node_is_idempotent() {
        let mut doc = doc();
        doc.add("Definition a.", NodeId::ROOT).expect("add");
        let first = completed(doc.execute(NodeId(1)).expect("exec"));
        let second = completed(doc.execute(NodeId(1)).expect("exec again"));
        assert_eq!(first, second);
    }

    #[test]
    fn failure_is_recorded_without_rolling_back_predecessors() {
        let mut doc = doc();
        doc.add("Definition a. reflexivity. Definition b.", NodeId::ROOT)
            .expect("add");
        completed(doc.execute(NodeId(1)).expect("exec 1"));

        // No open proof, so the tactic fails.
        let outcome = doc.execute(NodeId(2)).expect("exec 2");
        assert!(matches!(outcome, ExecOutcome::Failed(NodeFailure::Engine(_))));
        assert!(matches!(
            doc.node(NodeId(1)).expect("node").state,
            ExecState::Executed
        ));
        assert_eq!(doc.cursor(), NodeId(1));

        // Without error recovery, execution past the failure is refused.
        assert_eq!(
            doc.execute(NodeId(3)),
            Err(DocumentError::AncestorFailed {
                id: NodeId(3),
                ancestor: NodeId(2),
            })
        );
    }

    #[test]
    fn error_recovery_rebases_onto_the_last_good_snapshot() {
        let mut doc = doc_with(DocOptions {
            error_recovery: true,
            ..DocOptions::default()
        });
        doc.add("Definition a. reflexivity. Definition b.", NodeId::ROOT)
            .expect("add");
        completed(doc.execute(NodeId(1)).expect("exec 1"));
        assert!(matches!(
            doc.execute(NodeId(2)).expect("exec 2"),
            ExecOutcome::Failed(_)
        ));
        completed(doc.execute(NodeId(3)).expect("exec 3"));

        let (tag, env) = doc.query(QueryKind::Env).expect("env");
        assert_eq!(tag, "env.summary");
        let expected = Value::Seq(vec![Value::str("a"), Value::str("b")]);
        match env {
            Value::Record(fields) => {
                let definitions = fields
                    .iter()
                    .find(|(name, _)| name == "definitions")
                    .map(|(_, value)| value.clone());
                assert_eq!(definitions, Some(expected));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn cancel_restores_the_pre_add_state() {
        let mut doc = doc();
        let (_, before) = doc.query(QueryKind::Goals).expect("goals");
        let root_ref = completed(doc.execute(NodeId::ROOT).expect("root"));

        doc.add("Theorem t.", NodeId::ROOT).expect("add");
        doc.add("Proof. reflexivity. Qed.", NodeId(1)).expect("add");
        for id in 1..=4 {
            completed(doc.execute(NodeId(id)).expect("exec"));
        }

        let canceled = doc.cancel(NodeId(1)).expect("cancel");
        assert_eq!(canceled, vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
        assert_eq!(doc.cursor(), NodeId::ROOT);
        assert_eq!(completed(doc.execute(NodeId::ROOT).expect("root")), root_ref);

        let (_, after) = doc.query(QueryKind::Goals).expect("goals");
        assert_eq!(after, before);
        assert_eq!(after, Value::Seq(Vec::new()));

        // Only the boot snapshot survives the rewind.
        assert_eq!(doc.snapshots.len(), 1);
    }

    #[test]
    fn subtree_cancel_leaves_no_descendant_executed() {
        let mut doc = doc();
        doc.add("Definition a. Definition b. Definition c.", NodeId::ROOT)
            .expect("add");
        for id in 1..=3 {
            completed(doc.execute(NodeId(id)).expect("exec"));
        }

        let canceled = doc.cancel(NodeId(2)).expect("cancel");
        assert_eq!(canceled, vec![NodeId(2), NodeId(3)]);
        assert!(matches!(
            doc.node(NodeId(1)).expect("node").state,
            ExecState::Executed
        ));
        for id in 2..=3 {
            assert!(matches!(
                doc.node(NodeId(id)).expect("node").state,
                ExecState::Canceled
            ));
        }
        assert_eq!(doc.cursor(), NodeId(1));
    }

    #[test]
    fn root_cancel_clears_everything() {
        let mut doc = doc();
        doc.add("Definition a. Definition b.", NodeId::ROOT).expect("add");
        completed(doc.execute(NodeId(1)).expect("exec"));

        let canceled = doc.cancel(NodeId::ROOT).expect("cancel");
        assert_eq!(canceled, vec![NodeId(1), NodeId(2)]);
        assert!(matches!(
            doc.node(NodeId::ROOT).expect("root").state,
            ExecState::Executed
        ));
        assert_eq!(doc.cursor(), NodeId::ROOT);
    }

    #[test]
    fn cancel_of_unknown_node_fails() {
        let mut doc = doc();
        assert_eq!(doc.cancel(NodeId(9)), Err(DocumentError::UnknownNode(NodeId(9))));
    }

    #[test]
    fn deferred_execution_settles_before_queries_observe_it() {
        let mut doc = doc_with(DocOptions {
            workers: 2,
            ..DocOptions::default()
        });
        doc.add("Theorem t. Proof. reflexivity. Qed.", NodeId::ROOT)
            .expect("add");

        // The declaration runs inline; the proof body is delegated.
        completed(doc.execute(NodeId(1)).expect("exec 1"));
        for id in 2..=4 {
            assert_eq!(doc.execute(NodeId(id)).expect("exec"), ExecOutcome::Delegated);
        }

        let (_, env) = doc.query(QueryKind::Env).expect("env");
        match env {
            Value::Record(fields) => {
                let theorems = fields
                    .iter()
                    .find(|(name, _)| name == "theorems")
                    .map(|(_, value)| value.clone());
                assert_eq!(theorems, Some(Value::Seq(vec![Value::str("t")])));
            }
            other => panic!("expected record, got {other:?}"),
        }
        for id in 1..=4 {
            assert!(matches!(
                doc.node(NodeId(id)).expect("node").state,
                ExecState::Executed
            ));
        }
    }

    #[test]
    fn canceling_inflight_work_acknowledges_before_rewind() {
        let mut doc = doc_with(DocOptions {
            workers: 1,
            ..DocOptions::default()
        });
        doc.add("Theorem t. Proof. idtac.", NodeId::ROOT).expect("add");
        completed(doc.execute(NodeId(1)).expect("exec 1"));
        assert_eq!(doc.execute(NodeId(2)).expect("exec 2"), ExecOutcome::Delegated);

        let canceled = doc.cancel(NodeId(1)).expect("cancel");
        assert_eq!(canceled, vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(doc.cursor(), NodeId::ROOT);

        let (_, goals) = doc.query(QueryKind::Goals).expect("goals");
        assert_eq!(goals, Value::Seq(Vec::new()));
        assert_eq!(doc.snapshots.len(), 1);
    }

    #[test]
    fn settling_a_side_branch_does_not_retarget_the_cursor() {
        let mut doc = doc_with(DocOptions {
            workers: 1,
            ..DocOptions::default()
        });
        doc.add("Theorem t. Proof. idtac.", NodeId::ROOT).expect("add");
        completed(doc.execute(NodeId(1)).expect("exec 1"));
        assert_eq!(doc.execute(NodeId(2)).expect("exec 2"), ExecOutcome::Delegated);

        // A second branch off the root, executed inline.
        let branch = doc.add("Definition d.", NodeId::ROOT).expect("add");
        assert_eq!(branch, vec![NodeId(4)]);
        completed(doc.execute(NodeId(4)).expect("exec 4"));
        assert_eq!(doc.cursor(), NodeId(4));

        // The query settles node 2, but that node sits on a sibling
        // branch; the answer still comes from the last explicit
        // execution.
        let (_, env) = doc.query(QueryKind::Env).expect("env");
        assert_eq!(doc.cursor(), NodeId(4));
        assert!(matches!(
            doc.node(NodeId(2)).expect("node").state,
            ExecState::Executed
        ));
        match env {
            Value::Record(fields) => {
                let definitions = fields
                    .iter()
                    .find(|(name, _)| name == "definitions")
                    .map(|(_, value)| value.clone());
                assert_eq!(definitions, Some(Value::Seq(vec![Value::str("d")])));
                let open_proof = fields
                    .iter()
                    .find(|(name, _)| name == "open_proof")
                    .map(|(_, value)| value.clone());
                assert_eq!(open_proof, Some(Value::none()));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn worker_crash_surfaces_as_node_failure() {
        struct CrashEngine;

        impl Engine for CrashEngine {
            type Snapshot = u64;

            fn boot(&self, _config: &EngineConfig) -> Result<u64, EngineError> {
                Ok(0)
            }

            fn elaborate(
                &self,
                base: &u64,
                statement: &Statement,
                _cancel: &CancelToken,
            ) -> Result<u64, EngineError> {
                if statement.text.contains("crash") {
                    panic!("engine blew up");
                }
                Ok(base + 1)
            }

            fn goals(&self, _snapshot: &u64) -> Vec<Goal> {
                Vec::new()
            }

            fn env_summary(&self, _snapshot: &u64) -> EnvSummary {
                EnvSummary {
                    modules: Vec::new(),
                    definitions: Vec::new(),
                    theorems: Vec::new(),
                    open_proof: None,
                }
            }

            fn snapshot_ref(&self, snapshot: &u64) -> String {
                format!("snap1_{snapshot}")
            }
        }

        let mut doc = Document::new(
            Arc::new(CrashEngine),
            DocOptions {
                workers: 1,
                deferral: Arc::new(|_: &Statement| true),
                ..DocOptions::default()
            },
        )
        .expect("boot");

        doc.add("crash now.", NodeId::ROOT).expect("add");
        assert_eq!(doc.execute(NodeId(1)).expect("exec"), ExecOutcome::Delegated);

        let (_, nodes) = doc.query(QueryKind::Nodes).expect("nodes");
        drop(nodes);
        assert!(matches!(
            doc.node(NodeId(1)).expect("node").state,
            ExecState::Failed(NodeFailure::Worker(WorkerError::Crashed { .. }))
        ));
    }

    #[test]
    fn query_statement_returns_text_and_span() {
        let mut doc = doc();
        doc.add("Definition a. Definition b.", NodeId::ROOT).expect("add");
        let (tag, value) = doc.query(QueryKind::Statement(NodeId(2))).expect("query");
        assert_eq!(tag, "statement");
        assert_eq!(
            value,
            Value::record(vec![
                ("text", Value::str("Definition b.")),
                (
                    "loc",
                    Value::record(vec![
                        ("start", Value::Int(14)),
                        ("stop", Value::Int(27)),
                    ])
                ),
            ])
        );

        assert_eq!(
            doc.query(QueryKind::Statement(NodeId(9))),
            Err(DocumentError::UnknownNode(NodeId(9)))
        );
    }

    #[test]
    fn query_nodes_reports_states_in_id_order() {
        let mut doc = doc();
        doc.add("Definition a. reflexivity.", NodeId::ROOT).expect("add");
        completed(doc.execute(NodeId(1)).expect("exec 1"));
        assert!(matches!(
            doc.execute(NodeId(2)).expect("exec 2"),
            ExecOutcome::Failed(_)
        ));

        let (_, value) = doc.query(QueryKind::Nodes).expect("query");
        let Value::Seq(entries) = value else {
            panic!("expected sequence");
        };
        assert_eq!(entries.len(), 3);
        let labels: Vec<Value> = entries
            .iter()
            .map(|entry| match entry {
                Value::Record(fields) => fields
                    .iter()
                    .find(|(name, _)| name == "state")
                    .map(|(_, state)| match state {
                        Value::Variant { tag, .. } => Value::str(tag.as_str()),
                        other => panic!("expected variant, got {other:?}"),
                    })
                    .expect("state field"),
                other => panic!("expected record, got {other:?}"),
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                Value::str("Executed"),
                Value::str("Executed"),
                Value::str("Failed"),
            ]
        );
    }

    #[test]
    fn boot_failure_propagates_from_new() {
        let options = DocOptions {
            engine_config: EngineConfig {
                prelude: true,
                stdlib: Some(std::path::PathBuf::from("/nonexistent/cairn-stdlib")),
                ..EngineConfig::default()
            },
            ..DocOptions::default()
        };
        assert!(matches!(
            Document::new(Arc::new(ToyEngine::new()), options),
            Err(EngineError::PreludeUnavailable { .. })
        ));
    }
}
