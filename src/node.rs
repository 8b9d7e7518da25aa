//! The handler seam: units of work invoked by the executor.
//!
//! A [`Handler`] consumes a read-only [`StateSnapshot`] and returns a
//! [`NodeOutput`] carrying an optional state delta and, for router nodes, a
//! route key. Handlers may emit progress events through their
//! [`NodeContext`] at any point before returning; they must not hold other
//! runs' state, and any external collaborator (a model client, a database)
//! is injected into the handler at construction, never reached through
//! globals.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use loomflow::node::{Handler, HandlerError, NodeContext, NodeOutput};
//! use loomflow::state::StateSnapshot;
//! use serde_json::json;
//!
//! struct Summarize;
//!
//! #[async_trait]
//! impl Handler for Summarize {
//!     async fn run(
//!         &self,
//!         snapshot: StateSnapshot,
//!         ctx: NodeContext,
//!     ) -> Result<NodeOutput, HandlerError> {
//!         let topic = snapshot
//!             .get("topic")
//!             .and_then(|v| v.as_str())
//!             .ok_or(HandlerError::MissingInput { what: "topic" })?;
//!         ctx.emit("summarize", "starting").await?;
//!         Ok(NodeOutput::new().with_value("summary", json!(format!("about {topic}"))))
//!     }
//! }
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::event_bus::{EmitError, EventEmitter};
use crate::state::{StateDelta, StateSnapshot};
use crate::types::NodeId;

/// What a handler hands back to the executor.
///
/// `delta` is merged through the reducer registry before any routing
/// happens. `route` is meaningful only on nodes carrying a conditional edge
/// and must lie in that edge's declared route-key domain.
#[derive(Clone, Debug, Default)]
pub struct NodeOutput {
    pub delta: Option<StateDelta>,
    pub route: Option<String>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one key to the delta.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.delta
            .get_or_insert_with(StateDelta::default)
            .insert(key.into(), value);
        self
    }

    /// Select the outgoing route for a router node.
    pub fn with_route(mut self, key: impl Into<String>) -> Self {
        self.route = Some(key.into());
        self
    }
}

/// Failure raised by a handler; the executor catches it and terminates the
/// run as `Failed` with the node id attached. Never retried implicitly.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum HandlerError {
    #[error("missing input: {what}")]
    #[diagnostic(code(loomflow::node::missing_input))]
    MissingInput { what: &'static str },

    #[error("collaborator call failed: {reason}")]
    #[diagnostic(
        code(loomflow::node::collaborator),
        help("the external collaborator is opaque to the engine; inspect its own logs")
    )]
    Collaborator { reason: String },

    #[error(transparent)]
    #[diagnostic(code(loomflow::node::emit))]
    Emit(#[from] EmitError),

    #[error("{message}")]
    #[diagnostic(code(loomflow::node::other))]
    Other { message: String },
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        HandlerError::Other {
            message: message.into(),
        }
    }
}

/// Per-invocation context passed alongside the snapshot.
#[derive(Clone)]
pub struct NodeContext {
    node_id: NodeId,
    step: u64,
    emitter: EventEmitter,
}

impl NodeContext {
    pub(crate) fn new(node_id: NodeId, step: u64, emitter: EventEmitter) -> Self {
        Self {
            node_id,
            step,
            emitter,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Ordinal of this handler invocation within the run (1-based).
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Emit a progress event. Ordered and backpressured; see
    /// [`event_bus`](crate::event_bus) for the delivery contract.
    pub async fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), HandlerError> {
        self.emitter.emit(scope, message).await?;
        Ok(())
    }
}

/// An asynchronous unit of work in the graph.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError>;
}
