//! Execution runtime: the engine that walks a compiled graph, plus
//! checkpointing for resumable runs.

mod checkpointer;
mod executor;
mod runtime_config;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
pub use executor::{ExecutionError, Executor, RunOutcome, RunReport};
pub use runtime_config::{DEFAULT_VISIT_LIMIT, RuntimeConfig};
