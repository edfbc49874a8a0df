//! Dependency-ordered execution of a selected node set.
//!
//! All bookkeeping lives on one [`Board`] behind a single mutex: the state of
//! every selected node, a per-node count of selected parents that have not
//! yet succeeded, and the ready set ordered by unique id. A fixed pool of
//! worker tasks takes the smallest ready id, runs it without holding the
//! lock, then records the outcome under the lock and wakes idle workers.

use crate::{Error, ExecutionError, NodeExecutor, NodeReport, NodeState, Result, RunReport};
use futures::FutureExt;
use noderun_graph::{NodeGraph, NodeIndex, NodeSet};
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Worker count used when nothing else is configured.
pub const DEFAULT_THREADS: usize = 4;

/// What happens to the rest of the run when a node fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Skip the failed node's selected descendants; keep running
    /// everything else.
    #[default]
    CascadeSkip,
    /// Stop dispatching entirely. In-flight nodes finish; every pending
    /// node is skipped.
    FailFast,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of nodes executing at once (must be at least 1)
    pub threads: usize,
    /// Reaction to node failures
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Runs selected nodes in dependency order with bounded concurrency.
///
/// Only edges between selected nodes gate execution; a parent outside the
/// selection counts as already satisfied. Cancelling the token returned by
/// [`Scheduler::cancellation_token`] stops new dispatch and reports every
/// node still pending as [`NodeState::Cancelled`].
pub struct Scheduler {
    graph: Arc<NodeGraph>,
    executor: Arc<dyn NodeExecutor>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler over `graph` that runs nodes with `executor`.
    #[must_use]
    pub fn new(
        graph: Arc<NodeGraph>,
        executor: Arc<dyn NodeExecutor>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            graph,
            executor,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token, e.g. one wired to an
    /// interrupt handler.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this scheduler's runs. Cancellation is sticky: a
    /// run started after the token fired cancels every node immediately.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Execute every node in `selected` and report the outcome.
    ///
    /// Node failures, skips and cancellations are part of the returned
    /// report, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero, if `selected` holds an index
    /// the graph does not contain, or if a worker task dies.
    pub async fn run(&self, selected: &NodeSet) -> Result<RunReport> {
        if self.config.threads == 0 {
            return Err(Error::configuration("threads must be at least 1"));
        }
        if let Some(foreign) = selected.iter().find(|&&idx| self.graph.node(idx).is_none()) {
            return Err(Error::UnknownNode {
                index: foreign.index(),
            });
        }

        let started = Instant::now();
        if selected.is_empty() {
            info!("No nodes selected, nothing to run");
            return Ok(RunReport {
                elapsed: started.elapsed(),
                ..RunReport::default()
            });
        }

        let workers = self.config.threads.min(selected.len());
        info!(
            nodes = selected.len(),
            threads = workers,
            executor = self.executor.name(),
            policy = ?self.config.failure_policy,
            "Starting run"
        );

        let shared = Arc::new(Shared {
            graph: Arc::clone(&self.graph),
            executor: Arc::clone(&self.executor),
            policy: self.config.failure_policy,
            cancel: self.cancel.clone(),
            board: Mutex::new(Board::new(&self.graph, selected)),
            wake: Notify::new(),
        });

        let mut join_set = JoinSet::new();
        for worker in 0..workers {
            join_set.spawn(work(Arc::clone(&shared), worker));
        }
        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                join_set.abort_all();
                return Err(Error::Worker {
                    message: e.to_string(),
                });
            }
        }

        let mut board = shared.board.lock().await;
        let report = RunReport {
            nodes: std::mem::take(&mut board.entries),
            cancelled: board.cancelled,
            elapsed: started.elapsed(),
        };

        info!(
            succeeded = report.count(NodeState::Succeeded),
            failed = report.count(NodeState::Failed),
            skipped = report.count(NodeState::Skipped),
            cancelled = report.count(NodeState::Cancelled),
            elapsed_ms = report.elapsed.as_millis(),
            "Run finished"
        );
        Ok(report)
    }
}

/// State shared by all workers of one run.
struct Shared {
    graph: Arc<NodeGraph>,
    executor: Arc<dyn NodeExecutor>,
    policy: FailurePolicy,
    cancel: CancellationToken,
    board: Mutex<Board>,
    wake: Notify,
}

impl Shared {
    async fn run_node(&self, index: NodeIndex, worker: usize) {
        let unique_id = self.graph.unique_id(index);
        let started = Instant::now();

        let outcome = match self.graph.node(index) {
            Some(node) => {
                debug!(node = %unique_id, worker, "Dispatching node");
                match AssertUnwindSafe(self.executor.execute(node))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => Err(ExecutionError::from_panic(payload.as_ref())),
                }
            }
            None => Err(ExecutionError::failed("node is not part of the graph")),
        };

        let duration = started.elapsed();
        match &outcome {
            Ok(()) => info!(
                node = %unique_id,
                duration_ms = duration.as_millis(),
                "Node succeeded"
            ),
            Err(e) => warn!(
                node = %unique_id,
                duration_ms = duration.as_millis(),
                error = %e,
                "Node failed"
            ),
        }

        self.board
            .lock()
            .await
            .finish(&self.graph, index, outcome, duration, self.policy);
        self.wake.notify_waiters();
    }
}

/// One worker: take the next ready node, run it, repeat until the board
/// has nothing left unfinished.
async fn work(shared: Arc<Shared>, worker: usize) {
    loop {
        // Registered before inspecting the board so a completion between
        // the check and the wait is not lost.
        let wake = shared.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();

        let next = {
            let mut board = shared.board.lock().await;
            if shared.cancel.is_cancelled() {
                board.cancel(&shared.graph);
            }
            if board.is_done() {
                drop(board);
                shared.wake.notify_waiters();
                debug!(worker, "Worker exiting");
                return;
            }
            board.dispatch()
        };

        match next {
            Some(index) => shared.run_node(index, worker).await,
            None if shared.cancel.is_cancelled() => wake.as_mut().await,
            None => {
                tokio::select! {
                    () = wake.as_mut() => {}
                    () = shared.cancel.cancelled() => {}
                }
            }
        }
    }
}

/// Bookkeeping for one run; only touched under the [`Shared::board`] lock.
struct Board {
    states: HashMap<NodeIndex, NodeState>,
    /// Selected parents that have not succeeded yet.
    waiting_on: HashMap<NodeIndex, usize>,
    ready: BTreeMap<String, NodeIndex>,
    /// Index into `entries` for dispatched nodes.
    slots: HashMap<NodeIndex, usize>,
    entries: Vec<NodeReport>,
    unfinished: usize,
    cancelled: bool,
}

impl Board {
    fn new(graph: &NodeGraph, selected: &NodeSet) -> Self {
        let mut states = HashMap::with_capacity(selected.len());
        let mut waiting_on = HashMap::with_capacity(selected.len());
        let mut ready = BTreeMap::new();

        for &idx in selected {
            let waiting = graph
                .parents(idx)
                .iter()
                .filter(|parent| selected.contains(parent))
                .count();
            if waiting == 0 {
                ready.insert(graph.unique_id(idx).to_string(), idx);
            }
            states.insert(idx, NodeState::Pending);
            waiting_on.insert(idx, waiting);
        }

        Self {
            states,
            waiting_on,
            ready,
            slots: HashMap::new(),
            entries: Vec::with_capacity(selected.len()),
            unfinished: selected.len(),
            cancelled: false,
        }
    }

    const fn is_done(&self) -> bool {
        self.unfinished == 0
    }

    /// Move the smallest ready node to `Running`.
    fn dispatch(&mut self) -> Option<NodeIndex> {
        let (unique_id, idx) = self.ready.pop_first()?;
        self.states.insert(idx, NodeState::Running);
        self.slots.insert(idx, self.entries.len());
        self.entries.push(NodeReport {
            unique_id,
            state: NodeState::Running,
            duration: None,
            error: None,
        });
        Some(idx)
    }

    fn finish(
        &mut self,
        graph: &NodeGraph,
        idx: NodeIndex,
        outcome: std::result::Result<(), ExecutionError>,
        duration: Duration,
        policy: FailurePolicy,
    ) {
        let state = if outcome.is_ok() {
            NodeState::Succeeded
        } else {
            NodeState::Failed
        };
        self.states.insert(idx, state);
        self.unfinished = self.unfinished.saturating_sub(1);

        if let Some(entry) = self
            .slots
            .get(&idx)
            .and_then(|&slot| self.entries.get_mut(slot))
        {
            entry.state = state;
            entry.duration = Some(duration);
            entry.error = outcome.as_ref().err().map(ExecutionError::detail);
        }

        match (outcome, policy) {
            (Ok(()), _) => self.release_children(graph, idx),
            (Err(_), FailurePolicy::CascadeSkip) => self.skip_downstream(graph, idx),
            (Err(_), FailurePolicy::FailFast) => {
                let cause = format!("run halted after '{}' failed", graph.unique_id(idx));
                self.mark_all_pending(graph, NodeState::Skipped, Some(cause.as_str()));
            }
        }
    }

    fn release_children(&mut self, graph: &NodeGraph, idx: NodeIndex) {
        for child in graph.children(idx) {
            if self.states.get(&child) != Some(&NodeState::Pending) {
                continue;
            }
            if let Some(waiting) = self.waiting_on.get_mut(&child) {
                *waiting = waiting.saturating_sub(1);
                if *waiting == 0 {
                    self.ready.insert(graph.unique_id(child).to_string(), child);
                }
            }
        }
    }

    /// Skip every pending node reachable from `failed` through selected
    /// nodes.
    fn skip_downstream(&mut self, graph: &NodeGraph, failed: NodeIndex) {
        let cause = format!("upstream node '{}' failed", graph.unique_id(failed));
        let mut doomed: BTreeMap<&str, NodeIndex> = BTreeMap::new();
        let mut stack = vec![failed];

        while let Some(current) = stack.pop() {
            for child in graph.children(current) {
                if self.states.get(&child) == Some(&NodeState::Pending)
                    && doomed.insert(graph.unique_id(child), child).is_none()
                {
                    stack.push(child);
                }
            }
        }

        for idx in doomed.into_values() {
            self.mark(graph, idx, NodeState::Skipped, Some(cause.as_str()));
        }
    }

    fn cancel(&mut self, graph: &NodeGraph) {
        if self.mark_all_pending(graph, NodeState::Cancelled, None) > 0 {
            self.cancelled = true;
        }
    }

    /// Move every pending node to `state`, in unique-id order.
    fn mark_all_pending(
        &mut self,
        graph: &NodeGraph,
        state: NodeState,
        cause: Option<&str>,
    ) -> usize {
        let mut pending: Vec<(&str, NodeIndex)> = self
            .states
            .iter()
            .filter(|(_, s)| **s == NodeState::Pending)
            .map(|(&idx, _)| (graph.unique_id(idx), idx))
            .collect();
        pending.sort_unstable();

        for &(_, idx) in &pending {
            self.mark(graph, idx, state, cause);
        }
        pending.len()
    }

    /// Terminal transition for a node that never ran.
    fn mark(&mut self, graph: &NodeGraph, idx: NodeIndex, state: NodeState, cause: Option<&str>) {
        let unique_id = graph.unique_id(idx);
        self.ready.remove(unique_id);
        self.states.insert(idx, state);
        self.unfinished = self.unfinished.saturating_sub(1);
        debug!(node = %unique_id, %state, "Node not run");
        self.entries.push(NodeReport {
            unique_id: unique_id.to_string(),
            state,
            duration: None,
            error: cause.map(ToString::to_string),
        });
    }
}
