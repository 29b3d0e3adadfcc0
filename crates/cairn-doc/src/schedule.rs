//! The execution scheduler: a bounded pool of worker threads for
//! deferred elaboration.
//!
//! Tasks go in over an mpsc channel shared by the workers; completions
//! come back over a second channel tagged with the owning node id.
//! Completion order may differ from submission order; the document
//! holds a backlog and joins on the node it needs. A panicking task is
//! converted into a `WorkerError` result and the worker slot keeps
//! serving — pool failures never become process faults.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cairn_engine::{CancelToken, Engine, EngineError, Statement};

use crate::node::NodeId;

/// Failures originating in the worker pool itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("background task crashed: {detail}")]
    Crashed { detail: String },

    #[error("worker pool disconnected before the task completed")]
    Disconnected,
}

/// Why a background task did not produce a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    Engine(EngineError),
    Worker(WorkerError),
}

struct Task<S> {
    node: NodeId,
    base: S,
    statement: Statement,
    token: CancelToken,
}

struct Completion<S> {
    node: NodeId,
    result: Result<S, TaskFailure>,
}

/// Bounded worker pool executing elaborations off the front-end thread.
pub struct Scheduler<E: Engine> {
    tasks: Option<Sender<Task<E::Snapshot>>>,
    completions: Receiver<Completion<E::Snapshot>>,
    backlog: BTreeMap<NodeId, Result<E::Snapshot, TaskFailure>>,
    workers: Vec<JoinHandle<()>>,
}

impl<E: Engine> Scheduler<E> {
    pub fn new(engine: Arc<E>, worker_count: usize) -> Self {
        let (task_tx, task_rx) = channel::<Task<E::Snapshot>>();
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (completion_tx, completion_rx) = channel();

        let workers = (0..worker_count.max(1))
            .map(|slot| {
                let engine = Arc::clone(&engine);
                let tasks = Arc::clone(&task_rx);
                let completions = completion_tx.clone();
                std::thread::Builder::new()
                    .name(format!("cairn-worker-{slot}"))
                    .spawn(move || worker_loop(engine, tasks, completions))
                    .unwrap_or_else(|err| panic!("worker thread must spawn: {err}"))
            })
            .collect();

        Self {
            tasks: Some(task_tx),
            completions: completion_rx,
            backlog: BTreeMap::new(),
            workers,
        }
    }

    /// Hand one elaboration to the pool.
    pub fn submit(
        &self,
        node: NodeId,
        base: E::Snapshot,
        statement: Statement,
        token: CancelToken,
    ) {
        if let Some(tasks) = &self.tasks {
            // A send failure means every worker is gone; the node will
            // surface `Disconnected` when joined.
            let _ = tasks.send(Task {
                node,
                base,
                statement,
                token,
            });
        }
    }

    /// Block until `node`'s task completes, buffering other completions.
    pub fn join(&mut self, node: NodeId) -> Result<E::Snapshot, TaskFailure> {
        if let Some(result) = self.backlog.remove(&node) {
            return result;
        }
        loop {
            match self.completions.recv() {
                Ok(completion) if completion.node == node => return completion.result,
                Ok(completion) => {
                    self.backlog.insert(completion.node, completion.result);
                }
                Err(_) => return Err(TaskFailure::Worker(WorkerError::Disconnected)),
            }
        }
    }
}

impl<E: Engine> Drop for Scheduler<E> {
    fn drop(&mut self) {
        // Closing the task channel lets every worker run down.
        self.tasks.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop<E: Engine>(
    engine: Arc<E>,
    tasks: Arc<Mutex<Receiver<Task<E::Snapshot>>>>,
    completions: Sender<Completion<E::Snapshot>>,
) {
    loop {
        let task = {
            let guard = match tasks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        let Ok(task) = task else {
            return;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            engine.elaborate(&task.base, &task.statement, &task.token)
        }));
        let result = match outcome {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(err)) => Err(TaskFailure::Engine(err)),
            Err(panic) => Err(TaskFailure::Worker(WorkerError::Crashed {
                detail: panic_detail(&panic),
            })),
        };

        if completions
            .send(Completion {
                node: task.node,
                result,
            })
            .is_err()
        {
            return;
        }
    }
}

fn panic_detail(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}
