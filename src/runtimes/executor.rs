use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::checkpointer::{Checkpoint, Checkpointer};
use super::runtime_config::RuntimeConfig;
use crate::event_bus::{Event, EventBus, TerminalEvent};
use crate::graph::Graph;
use crate::node::{HandlerError, NodeContext};
use crate::state::State;
use crate::types::NodeId;
use crate::utils::id_generator::IdGenerator;

/// Fatal runtime condition; halts the execution that raised it.
///
/// Each variant names the offending node so a caller can diagnose exactly
/// where the walk stopped. The executor performs no implicit retry.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionError {
    #[error("handler failed at node {node}: {source}")]
    #[diagnostic(code(loomflow::executor::handler))]
    Handler {
        node: NodeId,
        #[source]
        source: HandlerError,
    },

    #[error("router at node {node} returned unmapped route key {key:?}")]
    #[diagnostic(
        code(loomflow::executor::unknown_route),
        help("add the key to the route map, or fix the decider's declared domain")
    )]
    UnknownRoute { node: NodeId, key: String },

    #[error("visit limit {limit} exceeded at node {node}")]
    #[diagnostic(
        code(loomflow::executor::loop_limit),
        help("raise RuntimeConfig::visit_limit or break the cycle in the graph")
    )]
    LoopLimitExceeded { node: NodeId, limit: u32 },

    #[error("checkpoint references node {node} absent from this graph")]
    #[diagnostic(code(loomflow::executor::stale_checkpoint))]
    StaleCheckpoint { node: NodeId },
}

impl ExecutionError {
    /// The node the failure is attributed to.
    pub fn node(&self) -> &NodeId {
        match self {
            ExecutionError::Handler { node, .. }
            | ExecutionError::UnknownRoute { node, .. }
            | ExecutionError::LoopLimitExceeded { node, .. }
            | ExecutionError::StaleCheckpoint { node } => node,
        }
    }
}

/// Terminal disposition of one execution.
#[derive(Debug)]
pub enum RunOutcome {
    /// The walk reached the terminal marker.
    Completed,
    /// Cooperative cancellation observed at the top of the node loop; not
    /// an error.
    Cancelled,
    Failed(ExecutionError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Everything a caller gets back from a run: the outcome, the last fully
/// merged state, and the shape of the walk.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Last fully merged state; never contains a partial in-flight delta.
    pub state: State,
    /// Handler invocations performed.
    pub steps: u64,
    /// Per-node visit counts at termination.
    pub visits: FxHashMap<NodeId, u32>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }
}

/// Walks a compiled graph from its entry node to a terminal outcome.
///
/// Traversal is strictly sequential: one current node, invoked with a
/// read-only snapshot, its delta merged atomically through the graph's
/// reducers, then a routing decision. Sibling nodes are never dispatched in
/// parallel. The graph itself is shared read-only, so any number of
/// executors (or runs) can work from one `Arc<Graph>` concurrently, each
/// with its own state.
///
/// Cancellation is cooperative: the token is sampled only at the top of the
/// per-node loop, never preempting a handler mid-flight.
pub struct Executor {
    graph: Arc<Graph>,
    config: RuntimeConfig,
    event_bus: EventBus,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    cancel: CancellationToken,
}

impl Executor {
    /// Executor with default config and a stdout event listener.
    pub fn new(graph: Arc<Graph>) -> Self {
        let event_bus = EventBus::default();
        event_bus.listen();
        Self {
            graph,
            config: RuntimeConfig::default(),
            event_bus,
            checkpointer: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the event bus. When `start_listener` is false the caller is
    /// expected to drain [`EventBus::receiver`] itself.
    pub fn with_event_bus(mut self, event_bus: EventBus, start_listener: bool) -> Self {
        if start_listener {
            event_bus.listen();
        }
        self.event_bus = event_bus;
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Use an externally owned cancellation token instead of the default
    /// private one.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle callers use to request cooperative cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the graph from its entry node against an initial state.
    #[instrument(skip(self, initial_state))]
    pub async fn run(&self, initial_state: State) -> RunReport {
        let run_id = self
            .config
            .run_id
            .clone()
            .unwrap_or_else(|| IdGenerator::new().generate_run_id());
        let entry = self.graph.entry().clone();
        self.drive(run_id, entry, initial_state, FxHashMap::default(), 0)
            .await
    }

    /// Continue a previously checkpointed execution.
    #[instrument(skip(self, checkpoint), fields(run_id = %checkpoint.run_id))]
    pub async fn resume(&self, checkpoint: Checkpoint) -> RunReport {
        let current = checkpoint.decode_current_node();
        let visits = checkpoint.decode_visit_counts();
        self.drive(
            checkpoint.run_id,
            current,
            checkpoint.state,
            visits,
            checkpoint.step,
        )
        .await
    }

    async fn drive(
        &self,
        run_id: String,
        mut current: NodeId,
        mut state: State,
        mut visits: FxHashMap<NodeId, u32>,
        mut step: u64,
    ) -> RunReport {
        let emitter = self.event_bus.emitter();
        loop {
            if current.is_end() {
                // Only reachable when resuming a checkpoint taken at the
                // final merge boundary.
                return self.finish(run_id, state, step, visits).await;
            }

            if self.cancel.is_cancelled() {
                let _ = emitter
                    .send(Event::Terminal(TerminalEvent::Cancelled { steps: step }))
                    .await;
                tracing::info!(%run_id, steps = step, "run cancelled");
                return RunReport {
                    run_id,
                    outcome: RunOutcome::Cancelled,
                    state,
                    steps: step,
                    visits,
                };
            }

            // Guard before the handler so the limit-th visit is the last one
            // that ever runs.
            let seen = visits.get(&current).copied().unwrap_or(0);
            if seen >= self.config.visit_limit {
                let error = ExecutionError::LoopLimitExceeded {
                    node: current,
                    limit: self.config.visit_limit,
                };
                return self.fail(run_id, state, step, visits, error).await;
            }

            let handler = match self.graph.handler(&current) {
                Some(handler) => handler.clone(),
                None => {
                    let error = ExecutionError::StaleCheckpoint { node: current };
                    return self.fail(run_id, state, step, visits, error).await;
                }
            };

            step += 1;
            let snapshot = state.snapshot();
            let ctx = NodeContext::new(
                current.clone(),
                step,
                emitter.scoped(current.encode(), step),
            );
            tracing::debug!(node = %current, step, "invoking handler");

            let output = match handler.run(snapshot, ctx).await {
                Ok(output) => output,
                Err(source) => {
                    // Progress events the handler already emitted stay
                    // delivered; only the delta is discarded.
                    let error = ExecutionError::Handler {
                        node: current,
                        source,
                    };
                    return self.fail(run_id, state, step, visits, error).await;
                }
            };

            if let Some(delta) = output.delta {
                self.graph.reducers().merge(&mut state, delta);
            }
            *visits.entry(current.clone()).or_insert(0) += 1;

            let next = match self.next_node(&current, output.route, &state) {
                Ok(next) => next,
                Err(error) => return self.fail(run_id, state, step, visits, error).await,
            };

            if self.config.autosave {
                if let Some(checkpointer) = &self.checkpointer {
                    let checkpoint = Checkpoint::capture(&run_id, &next, &state, &visits, step);
                    if let Err(e) = checkpointer.save(checkpoint).await {
                        tracing::warn!(%run_id, error = %e, "checkpoint save failed");
                    }
                }
            }

            if next.is_end() {
                return self.finish(run_id, state, step, visits).await;
            }
            current = next;
        }
    }

    fn next_node(
        &self,
        current: &NodeId,
        route: Option<String>,
        state: &State,
    ) -> Result<NodeId, ExecutionError> {
        if let Some(edge) = self.graph.conditional_edge(current) {
            // A handler-returned key wins; otherwise the edge's decider runs
            // against the post-merge snapshot.
            let key = match route {
                Some(key) => key,
                None => edge.router.decide(&state.snapshot()),
            };
            match edge.targets.get(&key) {
                Some(target) => Ok(target.clone()),
                None => Err(ExecutionError::UnknownRoute {
                    node: current.clone(),
                    key,
                }),
            }
        } else if let Some(target) = self.graph.edge(current) {
            if route.is_some() {
                tracing::warn!(node = %current, "route key from a non-router node; ignored");
            }
            Ok(target.clone())
        } else {
            // Validation rules this out for freshly built graphs; a
            // checkpoint resumed against a different graph can still get here.
            Err(ExecutionError::StaleCheckpoint {
                node: current.clone(),
            })
        }
    }

    async fn finish(
        &self,
        run_id: String,
        state: State,
        steps: u64,
        visits: FxHashMap<NodeId, u32>,
    ) -> RunReport {
        let _ = self
            .event_bus
            .emitter()
            .send(Event::Terminal(TerminalEvent::Completed { steps }))
            .await;
        tracing::info!(%run_id, steps, "run completed");
        RunReport {
            run_id,
            outcome: RunOutcome::Completed,
            state,
            steps,
            visits,
        }
    }

    async fn fail(
        &self,
        run_id: String,
        state: State,
        steps: u64,
        visits: FxHashMap<NodeId, u32>,
        error: ExecutionError,
    ) -> RunReport {
        let _ = self
            .event_bus
            .emitter()
            .send(Event::Terminal(TerminalEvent::Error {
                node_id: Some(error.node().encode()),
                message: error.to_string(),
            }))
            .await;
        tracing::error!(%run_id, steps, error = %error, "run failed");
        RunReport {
            run_id,
            outcome: RunOutcome::Failed(error),
            state,
            steps,
            visits,
        }
    }
}
