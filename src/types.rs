use std::fmt;

/// Identity of a node within a workflow graph.
///
/// `End` is the terminal marker: routing to it completes a run. It carries no
/// handler and cannot be registered or given outgoing edges; the builder
/// reports such attempts as defects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// Terminal marker denoting successful completion.
    End,
    /// A named unit of work registered with the builder.
    Named(String),
}

impl NodeId {
    pub fn named(name: impl Into<String>) -> Self {
        NodeId::Named(name.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, NodeId::End)
    }

    /// Stable string form used for checkpoints and event metadata.
    pub fn encode(&self) -> String {
        match self {
            NodeId::End => "End".to_string(),
            NodeId::Named(name) => format!("Named:{name}"),
        }
    }

    /// Inverse of [`encode`](Self::encode). Unprefixed input decodes as a
    /// named node so hand-written checkpoint data stays usable.
    pub fn decode(encoded: &str) -> Self {
        match encoded {
            "End" => NodeId::End,
            other => match other.strip_prefix("Named:") {
                Some(name) => NodeId::Named(name.to_string()),
                None => NodeId::Named(other.to_string()),
            },
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::End => write!(f, "End"),
            NodeId::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        NodeId::Named(name.to_string())
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        NodeId::Named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for id in [NodeId::End, NodeId::named("draft"), NodeId::named("a:b")] {
            assert_eq!(NodeId::decode(&id.encode()), id);
        }
    }

    #[test]
    fn bare_string_decodes_as_named() {
        assert_eq!(NodeId::decode("draft"), NodeId::named("draft"));
    }
}
