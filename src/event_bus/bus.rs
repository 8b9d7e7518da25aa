use std::sync::{Arc, Mutex};

use tokio::{sync::oneshot, task};

use super::emitter::EventEmitter;
use super::event::Event;
use super::sink::{EventSink, StdOutSink};
use crate::telemetry::{PlainFormatter, TelemetryFormatter};

/// Default bound of the event channel. Small enough that a stalled consumer
/// pushes back on producers quickly, large enough to absorb bursts.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Ordered, backpressured conduit between one run and its event consumer.
///
/// Producers enqueue through [`EventEmitter`]; a single background listener
/// dequeues in FIFO order, renders each event through the configured
/// [`TelemetryFormatter`], and writes it to the [`EventSink`]. Because the
/// channel is bounded, a slow sink eventually blocks emitters instead of
/// losing events. A bus belongs to exactly one execution context for its
/// lifetime.
pub struct EventBus {
    sink: Arc<Mutex<dyn EventSink>>,
    formatter: Arc<dyn TelemetryFormatter>,
    sender: flume::Sender<Event>,
    receiver: flume::Receiver<Event>,
    listener: Mutex<Option<ListenerState>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self::with_parts(capacity, StdOutSink::default(), PlainFormatter)
    }

    pub fn with_sink<S>(sink: S) -> Self
    where
        S: EventSink + 'static,
    {
        Self::with_parts(DEFAULT_CHANNEL_CAPACITY, sink, PlainFormatter)
    }

    pub fn with_parts<S, F>(capacity: usize, sink: S, formatter: F) -> Self
    where
        S: EventSink + 'static,
        F: TelemetryFormatter + 'static,
    {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        Self {
            sink: Arc::new(Mutex::new(sink)),
            formatter: Arc::new(formatter),
            sender,
            receiver,
            listener: Mutex::new(None),
        }
    }

    /// Producer handle; the executor scopes it per node invocation.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter::new(self.sender.clone())
    }

    /// Direct access to the consumer side. Useful for tests or callers that
    /// consume the stream themselves instead of starting the listener; do
    /// not combine both, the channel hands each event to one consumer only.
    pub fn receiver(&self) -> flume::Receiver<Event> {
        self.receiver.clone()
    }

    /// Spawn the background task that drains events into the sink.
    /// Idempotent: subsequent calls while a listener runs are no-ops.
    pub fn listen(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }
        let receiver = self.receiver.clone();
        let sink = self.sink.clone();
        let formatter = self.formatter.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = receiver.recv_async() => match received {
                        Err(_) => break,
                        Ok(event) => {
                            let line = formatter.render(&event);
                            let written = sink
                                .lock()
                                .map_err(|poisoned| {
                                    std::io::Error::other(format!("poisoned sink: {poisoned}"))
                                })
                                .and_then(|mut sink| sink.write(&line));
                            if let Err(e) = written {
                                tracing::warn!(error = %e, "event sink write failed");
                            }
                        }
                    }
                }
            }
        });
        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the listener task, draining any events already queued first.
    pub async fn shutdown(&self) {
        // Let the listener catch up before signalling.
        while !self.receiver.is_empty() {
            tokio::task::yield_now().await;
        }
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
