//! # Loomflow: Stateful Workflow Graph Execution
//!
//! Loomflow runs directed workflow graphs over a shared, versioned state
//! map. Nodes are async handlers that read an immutable snapshot and return
//! a delta; per-key reducers merge deltas atomically; conditional edges
//! route the walk; a bounded event channel streams progress as it happens.
//!
//! ## Core Concepts
//!
//! - **Nodes**: async units of work invoked with a [`state::StateSnapshot`]
//! - **State**: a key/value map with per-key merge semantics ([`reducers`])
//! - **Graph**: declarative topology, validated exhaustively at `build()`
//! - **Executor**: sequential walk with loop guards, cancellation, and
//!   optional checkpointing
//! - **Events**: backpressured progress stream ending in one terminal marker
//! - **Review**: a bounded producer/reviewer revision loop composed on top
//!
//! ## Quick Start
//!
//! ```
//! use loomflow::graph::GraphBuilder;
//! use loomflow::runtimes::Executor;
//! use loomflow::state::State;
//! use loomflow::testing::EchoHandler;
//! use loomflow::types::NodeId;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let graph = GraphBuilder::new()
//!     .add_node("greet", EchoHandler::new("greeting", json!("hello")))
//!     .add_edge("greet", NodeId::End)
//!     .set_entry("greet")
//!     .build()
//!     .expect("valid graph");
//!
//! let report = Executor::new(Arc::new(graph)).run(State::new()).await;
//! assert!(report.is_completed());
//! assert_eq!(report.state.get("greeting"), Some(&json!("hello")));
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! GraphBuilder ──build()──▶ Graph (immutable, Arc-shared)
//!                              │
//!                           Executor ──▶ RunReport
//!                              │
//!            ┌────────────────┼──────────────────┐
//!         Handler          ReducerRegistry     EventBus
//!      (snapshot in,     (delta ──▶ state)   (progress +
//!       delta/route out)                      terminal events)
//! ```
//!
//! Validation happens once: `build()` resolves every node and route-key
//! reference into a typed table and reports all defects together, so a
//! graph that compiles never fails at runtime for structural reasons.

pub mod event_bus;
pub mod graph;
pub mod node;
pub mod reducers;
pub mod review;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod testing;
pub mod types;
pub mod utils;
