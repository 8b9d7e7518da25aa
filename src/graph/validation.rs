use std::fmt;

use miette::Diagnostic;

/// Category of a single graph defect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefectKind {
    /// A node id was registered twice.
    DuplicateNode,
    /// The terminal marker was used where a handler node is required.
    ReservedNode,
    /// An edge or entry references an unregistered node.
    UnknownNode,
    /// A node has more than one unconditional edge, or both an
    /// unconditional and a conditional edge.
    ConflictingEdges,
    /// A node has no outgoing edge at all, so it can never reach the
    /// terminal marker.
    DeadEnd,
    /// A conditional edge's route map does not cover the decider's declared
    /// return domain.
    IncompleteRouteMap,
    /// `set_entry` was called more than once.
    EntryAlreadySet,
    /// No entry node was designated.
    NoEntryPoint,
    /// A registered node is not reachable from the entry node.
    Unreachable,
    /// The terminal marker is not reachable from the entry node.
    TerminalUnreachable,
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefectKind::DuplicateNode => "duplicate node",
            DefectKind::ReservedNode => "reserved node",
            DefectKind::UnknownNode => "unknown node",
            DefectKind::ConflictingEdges => "conflicting edges",
            DefectKind::DeadEnd => "dead end",
            DefectKind::IncompleteRouteMap => "incomplete route map",
            DefectKind::EntryAlreadySet => "entry already set",
            DefectKind::NoEntryPoint => "no entry point",
            DefectKind::Unreachable => "unreachable node",
            DefectKind::TerminalUnreachable => "terminal unreachable",
        };
        f.write_str(name)
    }
}

/// One defect found while validating a graph definition.
#[derive(Clone, Debug)]
pub struct Defect {
    pub kind: DefectKind,
    /// The node or edge the defect refers to, in display form.
    pub reference: String,
    pub message: String,
}

impl Defect {
    pub fn new(
        kind: DefectKind,
        reference: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            reference: reference.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at `{}`: {}", self.kind, self.reference, self.message)
    }
}

/// All defects found in one validation pass.
///
/// `build()` never stops at the first problem; every defect is listed so a
/// caller can fix the whole definition at once.
#[derive(Debug, Diagnostic)]
#[diagnostic(
    code(loomflow::graph::validation),
    help("every defect is listed; fix them all and rebuild")
)]
pub struct ValidationError {
    defects: Vec<Defect>,
}

impl ValidationError {
    pub(crate) fn new(defects: Vec<Defect>) -> Self {
        Self { defects }
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn contains(&self, kind: DefectKind) -> bool {
        self.defects.iter().any(|d| d.kind == kind)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph validation failed with {} defect(s)", self.defects.len())?;
        for defect in &self.defects {
            write!(f, "\n  - {defect}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
