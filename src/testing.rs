//! Reusable handlers for tests and examples.
//!
//! These keep the test modules free of one-off handler structs and give doc
//! examples something concrete to build graphs from.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::node::{Handler, HandlerError, NodeContext, NodeOutput};
use crate::state::StateSnapshot;

/// Writes one fixed key/value pair into state.
#[derive(Clone, Debug)]
pub struct EchoHandler {
    key: String,
    value: Value,
}

impl EchoHandler {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        Ok(NodeOutput::new().with_value(self.key.clone(), self.value.clone()))
    }
}

/// Contributes one element toward an append-reduced key.
#[derive(Clone, Debug)]
pub struct AppendHandler {
    key: String,
    value: Value,
}

impl AppendHandler {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Handler for AppendHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        Ok(NodeOutput::new().with_value(self.key.clone(), self.value.clone()))
    }
}

/// Returns a fixed route key; optionally counts its invocations into the
/// `calls` state key.
#[derive(Debug, Default)]
pub struct RouteHandler {
    route: String,
    calls: Option<AtomicU32>,
}

impl RouteHandler {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            calls: None,
        }
    }

    /// Variant that also records how many times it ran.
    pub fn counting(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            calls: Some(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl Handler for RouteHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        let mut output = NodeOutput::new().with_route(self.route.clone());
        if let Some(calls) = &self.calls {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            output = output.with_value("calls", json!(n));
        }
        Ok(output)
    }
}

/// Emits the given progress messages in order, then writes one delta key.
#[derive(Clone, Debug)]
pub struct EmitHandler {
    messages: Vec<String>,
    key: String,
    value: Value,
}

impl EmitHandler {
    pub fn new(messages: Vec<&str>, key: impl Into<String>, value: Value) -> Self {
        Self {
            messages: messages.into_iter().map(str::to_string).collect(),
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Handler for EmitHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        for message in &self.messages {
            ctx.emit("work", message).await?;
        }
        Ok(NodeOutput::new().with_value(self.key.clone(), self.value.clone()))
    }
}

/// Fails with [`HandlerError::MissingInput`], optionally emitting progress
/// events first; the events stay delivered, the delta never lands.
#[derive(Clone, Debug)]
pub struct FailingHandler {
    what: &'static str,
    events: Vec<String>,
}

impl FailingHandler {
    pub fn new(what: &'static str) -> Self {
        Self {
            what,
            events: Vec::new(),
        }
    }

    pub fn with_events(message: &str) -> Self {
        Self {
            what: "forced failure",
            events: vec![message.to_string()],
        }
    }
}

#[async_trait]
impl Handler for FailingHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        for message in &self.events {
            ctx.emit("failing", message).await?;
        }
        Err(HandlerError::MissingInput { what: self.what })
    }
}

/// Requests cooperative cancellation during its own run, then returns a
/// delta as usual. The executor notices the token at the top of the next
/// node's loop iteration.
#[derive(Clone, Debug)]
pub struct CancelHandler {
    token: CancellationToken,
    key: String,
    value: Value,
}

impl CancelHandler {
    pub fn new(token: CancellationToken, key: impl Into<String>, value: Value) -> Self {
        Self {
            token,
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Handler for CancelHandler {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, HandlerError> {
        self.token.cancel();
        Ok(NodeOutput::new().with_value(self.key.clone(), self.value.clone()))
    }
}
