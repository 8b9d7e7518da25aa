//! Workflow graph definition, validation, and compilation.
//!
//! [`GraphBuilder`] collects nodes, edges, conditional edges, reducers, and
//! an entry point, then `build()` validates the whole definition at once and
//! freezes it into an immutable [`Graph`]. Validation enumerates *every*
//! defect it finds, so a caller fixes all of them in one pass instead of
//! replaying build/fail cycles. All node and route-key references resolve at
//! build time into typed tables, so a typo is a [`ValidationError`], never a
//! runtime surprise.
//!
//! # Examples
//!
//! ```rust
//! use loomflow::graph::{GraphBuilder, Router};
//! use loomflow::testing::{EchoHandler, RouteHandler};
//! use loomflow::types::NodeId;
//! use serde_json::json;
//!
//! let graph = GraphBuilder::new()
//!     .add_node("classify", RouteHandler::new("math"))
//!     .add_node("math", EchoHandler::new("answer", json!("4")))
//!     .add_node("chat", EchoHandler::new("answer", json!("hi")))
//!     .add_conditional_edge(
//!         "classify",
//!         Router::new(["math", "chat"], |_snapshot| "math".to_string()),
//!         [("math", "math"), ("chat", "chat")],
//!     )
//!     .add_edge("math", NodeId::End)
//!     .add_edge("chat", NodeId::End)
//!     .set_entry("classify")
//!     .build()
//!     .expect("valid graph");
//!
//! assert_eq!(graph.entry(), &NodeId::named("classify"));
//! ```

mod builder;
mod validation;

pub use builder::GraphBuilder;
pub use validation::{Defect, DefectKind, ValidationError};

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::node::Handler;
use crate::reducers::ReducerRegistry;
use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Decision function of a conditional edge, evaluated against the post-merge
/// snapshot when the node's handler did not return an explicit route key.
pub type RouteFn = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync>;

/// A conditional edge's decider together with its declared return domain.
///
/// The domain is what `build()` checks the route map against for
/// exhaustiveness. A decider returning a key outside its declared domain is
/// still caught at runtime as `UnknownRoute`.
#[derive(Clone)]
pub struct Router {
    domain: Vec<String>,
    decide: RouteFn,
}

impl Router {
    pub fn new<I, K, F>(domain: I, decide: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        F: Fn(&StateSnapshot) -> String + Send + Sync + 'static,
    {
        Self {
            domain: domain.into_iter().map(Into::into).collect(),
            decide: Arc::new(decide),
        }
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn decide(&self, snapshot: &StateSnapshot) -> String {
        (self.decide)(snapshot)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("domain", &self.domain).finish()
    }
}

/// A guarded transition: route keys mapped to target nodes.
#[derive(Clone, Debug)]
pub struct ConditionalEdge {
    pub router: Router,
    pub targets: FxHashMap<String, NodeId>,
}

/// An immutable, validated workflow graph.
///
/// Built once, then shared read-only (typically via `Arc`) by any number of
/// concurrent execution contexts.
pub struct Graph {
    nodes: FxHashMap<NodeId, Arc<dyn Handler>>,
    edges: FxHashMap<NodeId, NodeId>,
    conditional: FxHashMap<NodeId, ConditionalEdge>,
    entry: NodeId,
    reducers: ReducerRegistry,
}

impl Graph {
    pub fn entry(&self) -> &NodeId {
        &self.entry
    }

    pub fn handler(&self, id: &NodeId) -> Option<&Arc<dyn Handler>> {
        self.nodes.get(id)
    }

    /// Fixed target of the node's unconditional edge, when it has one.
    pub fn edge(&self, id: &NodeId) -> Option<&NodeId> {
        self.edges.get(id)
    }

    pub fn conditional_edge(&self, id: &NodeId) -> Option<&ConditionalEdge> {
        self.conditional.get(id)
    }

    pub fn reducers(&self) -> &ReducerRegistry {
        &self.reducers
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}
