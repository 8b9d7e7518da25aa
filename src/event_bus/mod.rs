//! Streaming progress events from a running graph to a consumer.
//!
//! Handlers emit zero or more progress events strictly before returning
//! their result; the executor appends exactly one terminal marker per run.
//! The happens-before contract (a node's events are observable before its
//! delta and before the next node runs) falls out of the single bounded
//! FIFO channel: a handler's `emit` calls complete (enqueue) before the
//! handler returns, and the executor merges and advances only after that.

mod bus;
mod emitter;
mod event;
mod sink;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use emitter::{EmitError, EventEmitter};
pub use event::{Event, ProgressEvent, TerminalEvent};
pub use sink::{EventSink, MemorySink, StdOutSink};

#[cfg(test)]
mod tests;
