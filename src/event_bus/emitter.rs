use miette::Diagnostic;
use thiserror::Error;

use super::event::Event;

/// The event channel was closed before the event could be enqueued.
///
/// Happens only when the owning [`EventBus`](super::EventBus) was dropped
/// while a run was still executing.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("event channel closed")]
#[diagnostic(
    code(loomflow::event_bus::closed),
    help("keep the EventBus alive for the whole run")
)]
pub struct EmitError;

/// Producer handle onto a run's event stream.
///
/// `emit` enqueues onto a bounded channel and awaits free capacity when the
/// consumer lags: backpressure, never loss. The executor hands each handler
/// a scoped emitter stamped with its node id and step, so emission order on
/// the single underlying queue is the order the consumer observes.
#[derive(Clone)]
pub struct EventEmitter {
    sender: flume::Sender<Event>,
    node_id: Option<String>,
    step: u64,
}

impl EventEmitter {
    pub(crate) fn new(sender: flume::Sender<Event>) -> Self {
        Self {
            sender,
            node_id: None,
            step: 0,
        }
    }

    /// A copy of this emitter stamped with node metadata for one invocation.
    pub fn scoped(&self, node_id: impl Into<String>, step: u64) -> Self {
        Self {
            sender: self.sender.clone(),
            node_id: Some(node_id.into()),
            step,
        }
    }

    /// Emit one progress event. Blocks (asynchronously) when the channel is
    /// at capacity; events are never dropped to relieve pressure.
    pub async fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), EmitError> {
        let node_id = self.node_id.clone().unwrap_or_default();
        self.send(Event::progress(node_id, self.step, scope, message))
            .await
    }

    pub(crate) async fn send(&self, event: Event) -> Result<(), EmitError> {
        self.sender.send_async(event).await.map_err(|_| EmitError)
    }
}
