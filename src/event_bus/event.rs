use std::fmt;

/// An item in a run's event stream.
///
/// A well-formed stream is zero or more `Progress` events followed by exactly
/// one `Terminal` marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Progress(ProgressEvent),
    Terminal(TerminalEvent),
}

impl Event {
    pub fn progress(
        node_id: impl Into<String>,
        step: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Progress(ProgressEvent {
            node_id: node_id.into(),
            step,
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Terminal(_))
    }

    pub fn scope_label(&self) -> Option<&str> {
        match self {
            Event::Progress(p) => Some(p.scope()),
            Event::Terminal(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Progress(p) => write!(f, "[{}@{}] {}", p.node_id, p.step, p.message),
            Event::Terminal(t) => write!(f, "{t}"),
        }
    }
}

/// Emitted by a handler while it is running, before it returns its result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    node_id: String,
    step: u64,
    scope: String,
    message: String,
}

impl ProgressEvent {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Emitted once by the executor when a run reaches a terminal outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalEvent {
    /// The walk reached the terminal marker.
    Completed { steps: u64 },
    /// The run failed; `node_id` names the offending node when one exists.
    Error {
        node_id: Option<String>,
        message: String,
    },
    /// Cooperative cancellation was observed at the top of the node loop.
    Cancelled { steps: u64 },
}

impl fmt::Display for TerminalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalEvent::Completed { steps } => write!(f, "completed after {steps} step(s)"),
            TerminalEvent::Error { node_id, message } => match node_id {
                Some(id) => write!(f, "error at {id}: {message}"),
                None => write!(f, "error: {message}"),
            },
            TerminalEvent::Cancelled { steps } => write!(f, "cancelled after {steps} step(s)"),
        }
    }
}
