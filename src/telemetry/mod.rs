//! Rendering of stream events for human-facing sinks.

use crate::event_bus::Event;

pub const SCOPE_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Renders one event into the line a sink receives.
pub trait TelemetryFormatter: Send + Sync {
    fn render(&self, event: &Event) -> String;
}

/// Single-line rendering with the scope label colored when present.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainFormatter;

impl TelemetryFormatter for PlainFormatter {
    fn render(&self, event: &Event) -> String {
        match event.scope_label() {
            Some(scope) => {
                format!("{SCOPE_COLOR}{scope}{RESET_COLOR}: {LINE_COLOR}{event}{RESET_COLOR}\n")
            }
            None => format!("{LINE_COLOR}{event}{RESET_COLOR}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::TerminalEvent;

    #[test]
    fn progress_renders_with_scope_prefix() {
        let event = Event::progress("Named:n", 3, "llm", "chunk");
        let line = PlainFormatter.render(&event);
        assert!(line.contains("llm"));
        assert!(line.contains("[Named:n@3] chunk"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn terminal_renders_without_scope() {
        let event = Event::Terminal(TerminalEvent::Cancelled { steps: 2 });
        let line = PlainFormatter.render(&event);
        assert!(line.contains("cancelled after 2 step(s)"));
    }
}
