use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::validation::{Defect, DefectKind, ValidationError};
use super::{ConditionalEdge, Graph, Router};
use crate::node::Handler;
use crate::reducers::{Reducer, ReducerRegistry};
use crate::types::NodeId;

/// Fluent definition of a workflow graph.
///
/// Calls never fail individually; problems are recorded and surfaced all at
/// once by [`build`](Self::build) so registration order does not matter and
/// a caller sees every defect in one pass.
pub struct GraphBuilder {
    nodes: FxHashMap<NodeId, Arc<dyn Handler>>,
    order: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
    conditional: Vec<(NodeId, ConditionalEdge)>,
    entry: Option<NodeId>,
    reducers: ReducerRegistry,
    defects: Vec<Defect>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            order: Vec::new(),
            edges: Vec::new(),
            conditional: Vec::new(),
            entry: None,
            reducers: ReducerRegistry::new(),
            defects: Vec::new(),
        }
    }

    /// Register a unit of work under a unique id.
    pub fn add_node(mut self, id: impl Into<NodeId>, handler: impl Handler + 'static) -> Self {
        let id = id.into();
        if id.is_end() {
            self.defects.push(Defect::new(
                DefectKind::ReservedNode,
                id.to_string(),
                "the terminal marker cannot carry a handler",
            ));
            return self;
        }
        if self.nodes.contains_key(&id) {
            self.defects.push(Defect::new(
                DefectKind::DuplicateNode,
                id.to_string(),
                "node id registered twice",
            ));
            return self;
        }
        self.order.push(id.clone());
        self.nodes.insert(id, Arc::new(handler));
        self
    }

    /// Add an unconditional edge. The target may be [`NodeId::End`].
    pub fn add_edge(mut self, src: impl Into<NodeId>, dst: impl Into<NodeId>) -> Self {
        self.edges.push((src.into(), dst.into()));
        self
    }

    /// Add a conditional edge: a decider plus a route-key → target mapping.
    ///
    /// `build()` checks the mapping covers the decider's declared domain.
    pub fn add_conditional_edge<K, N>(
        mut self,
        src: impl Into<NodeId>,
        router: Router,
        route_map: impl IntoIterator<Item = (K, N)>,
    ) -> Self
    where
        K: Into<String>,
        N: Into<NodeId>,
    {
        let targets = route_map
            .into_iter()
            .map(|(key, target)| (key.into(), target.into()))
            .collect();
        self.conditional
            .push((src.into(), ConditionalEdge { router, targets }));
        self
    }

    /// Designate the start node. May be called once.
    pub fn set_entry(mut self, id: impl Into<NodeId>) -> Self {
        let id = id.into();
        if self.entry.is_some() {
            self.defects.push(Defect::new(
                DefectKind::EntryAlreadySet,
                id.to_string(),
                "entry node designated twice",
            ));
            return self;
        }
        if id.is_end() {
            self.defects.push(Defect::new(
                DefectKind::ReservedNode,
                id.to_string(),
                "the terminal marker cannot be the entry",
            ));
            return self;
        }
        self.entry = Some(id);
        self
    }

    /// Associate a merge strategy with a state key (default: replace).
    pub fn register_reducer(mut self, key: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        self.reducers.register(key, reducer);
        self
    }

    /// Shorthand for registering the append-preserving-order reducer.
    pub fn register_append_reducer(mut self, key: impl Into<String>) -> Self {
        self.reducers.register_append(key);
        self
    }

    /// Validate the whole definition and freeze it.
    ///
    /// Returns an immutable [`Graph`], or a [`ValidationError`] enumerating
    /// every defect found.
    pub fn build(self) -> Result<Graph, ValidationError> {
        let mut defects = self.defects;

        let entry = match &self.entry {
            None => {
                defects.push(Defect::new(
                    DefectKind::NoEntryPoint,
                    "<graph>",
                    "no entry node designated; call set_entry",
                ));
                None
            }
            Some(id) if !self.nodes.contains_key(id) => {
                defects.push(Defect::new(
                    DefectKind::UnknownNode,
                    id.to_string(),
                    "entry node is not registered",
                ));
                None
            }
            Some(id) => Some(id.clone()),
        };

        // Endpoint existence, one pass over each edge list.
        for (src, dst) in &self.edges {
            check_src(&self.nodes, src, &mut defects);
            if !dst.is_end() && !self.nodes.contains_key(dst) {
                defects.push(Defect::new(
                    DefectKind::UnknownNode,
                    format!("{src} -> {dst}"),
                    "edge target is not registered",
                ));
            }
        }
        for (src, edge) in &self.conditional {
            check_src(&self.nodes, src, &mut defects);
            for (key, target) in &edge.targets {
                if !target.is_end() && !self.nodes.contains_key(target) {
                    defects.push(Defect::new(
                        DefectKind::UnknownNode,
                        format!("{src} -[{key}]-> {target}"),
                        "route target is not registered",
                    ));
                }
            }
            let missing: Vec<&str> = edge
                .router
                .domain()
                .iter()
                .filter(|key| !edge.targets.contains_key(*key))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                defects.push(Defect::new(
                    DefectKind::IncompleteRouteMap,
                    src.to_string(),
                    format!("route map missing declared key(s): {}", missing.join(", ")),
                ));
            }
        }

        // Edge-shape checks per node: at most one way out.
        let mut plain: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut routed: FxHashMap<NodeId, ConditionalEdge> = FxHashMap::default();
        for (src, dst) in &self.edges {
            if plain.insert(src.clone(), dst.clone()).is_some() {
                defects.push(Defect::new(
                    DefectKind::ConflictingEdges,
                    src.to_string(),
                    "more than one unconditional edge; traversal is strictly sequential",
                ));
            }
        }
        for (src, edge) in self.conditional {
            if routed.insert(src.clone(), edge).is_some() {
                defects.push(Defect::new(
                    DefectKind::ConflictingEdges,
                    src.to_string(),
                    "more than one conditional edge on a single node",
                ));
            }
        }
        for id in &self.order {
            match (plain.contains_key(id), routed.contains_key(id)) {
                (true, true) => defects.push(Defect::new(
                    DefectKind::ConflictingEdges,
                    id.to_string(),
                    "node has both an unconditional and a conditional edge",
                )),
                (false, false) => defects.push(Defect::new(
                    DefectKind::DeadEnd,
                    id.to_string(),
                    "no outgoing edge; the terminal marker can never be reached",
                )),
                _ => {}
            }
        }

        // Reachability from the entry, over both edge kinds.
        if let Some(entry) = &entry {
            let mut seen: FxHashSet<NodeId> = FxHashSet::default();
            let mut queue: VecDeque<NodeId> = VecDeque::new();
            seen.insert(entry.clone());
            queue.push_back(entry.clone());
            let mut end_reached = false;
            while let Some(current) = queue.pop_front() {
                let mut visit = |next: &NodeId| {
                    if next.is_end() {
                        end_reached = true;
                    } else if self.nodes.contains_key(next) && seen.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                };
                if let Some(dst) = plain.get(&current) {
                    visit(dst);
                }
                if let Some(edge) = routed.get(&current) {
                    for target in edge.targets.values() {
                        visit(target);
                    }
                }
            }
            for id in &self.order {
                if !seen.contains(id) {
                    defects.push(Defect::new(
                        DefectKind::Unreachable,
                        id.to_string(),
                        "not reachable from the entry node",
                    ));
                }
            }
            if !end_reached {
                defects.push(Defect::new(
                    DefectKind::TerminalUnreachable,
                    entry.to_string(),
                    "no path from the entry reaches the terminal marker",
                ));
            }
        }

        if !defects.is_empty() {
            return Err(ValidationError::new(defects));
        }

        Ok(Graph {
            nodes: self.nodes,
            edges: plain,
            conditional: routed,
            // Entry is present whenever no defect was recorded above.
            entry: entry.expect("entry validated"),
            reducers: self.reducers,
        })
    }

}

fn check_src(
    nodes: &FxHashMap<NodeId, Arc<dyn Handler>>,
    src: &NodeId,
    defects: &mut Vec<Defect>,
) {
    if src.is_end() {
        defects.push(Defect::new(
            DefectKind::ReservedNode,
            src.to_string(),
            "the terminal marker cannot have outgoing edges",
        ));
    } else if !nodes.contains_key(src) {
        defects.push(Defect::new(
            DefectKind::UnknownNode,
            src.to_string(),
            "edge source is not registered",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoHandler, RouteHandler};
    use serde_json::json;

    fn echo() -> EchoHandler {
        EchoHandler::new("out", json!("x"))
    }

    #[test]
    fn builds_a_linear_graph() {
        let graph = GraphBuilder::new()
            .add_node("a", echo())
            .add_node("b", echo())
            .add_edge("a", "b")
            .add_edge("b", NodeId::End)
            .set_entry("a")
            .build()
            .unwrap();
        assert_eq!(graph.entry(), &NodeId::named("a"));
        assert_eq!(graph.edge(&NodeId::named("a")), Some(&NodeId::named("b")));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn enumerates_every_defect_in_one_pass() {
        // Duplicate node, unknown edge target, missing entry, and a dead end
        // all at once.
        let err = GraphBuilder::new()
            .add_node("a", echo())
            .add_node("a", echo())
            .add_edge("a", "ghost")
            .add_node("island", echo())
            .build()
            .unwrap_err();

        assert!(err.contains(DefectKind::DuplicateNode));
        assert!(err.contains(DefectKind::UnknownNode));
        assert!(err.contains(DefectKind::NoEntryPoint));
        assert!(err.contains(DefectKind::DeadEnd));
        assert!(err.defects().len() >= 4);
    }

    #[test]
    fn rejects_unreachable_nodes() {
        let err = GraphBuilder::new()
            .add_node("a", echo())
            .add_node("stranded", echo())
            .add_edge("a", NodeId::End)
            .add_edge("stranded", NodeId::End)
            .set_entry("a")
            .build()
            .unwrap_err();
        assert!(err.contains(DefectKind::Unreachable));
        assert_eq!(
            err.defects()
                .iter()
                .filter(|d| d.kind == DefectKind::Unreachable)
                .map(|d| d.reference.as_str())
                .collect::<Vec<_>>(),
            vec!["stranded"],
        );
    }

    #[test]
    fn rejects_graphs_that_never_reach_the_terminal() {
        // a -> b -> a: every node reachable, End unreachable.
        let err = GraphBuilder::new()
            .add_node("a", echo())
            .add_node("b", echo())
            .add_edge("a", "b")
            .add_edge("b", "a")
            .set_entry("a")
            .build()
            .unwrap_err();
        assert!(err.contains(DefectKind::TerminalUnreachable));
    }

    #[test]
    fn rejects_incomplete_route_maps() {
        let err = GraphBuilder::new()
            .add_node("router", RouteHandler::new("math"))
            .add_node("math", echo())
            .add_conditional_edge(
                "router",
                Router::new(["math", "chat"], |_| "math".to_string()),
                [("math", "math")],
            )
            .add_edge("math", NodeId::End)
            .set_entry("router")
            .build()
            .unwrap_err();
        let defect = err
            .defects()
            .iter()
            .find(|d| d.kind == DefectKind::IncompleteRouteMap)
            .unwrap();
        assert_eq!(defect.reference, "router");
        assert!(defect.message.contains("chat"));
    }

    #[test]
    fn rejects_conflicting_edges() {
        let err = GraphBuilder::new()
            .add_node("a", echo())
            .add_node("b", echo())
            .add_node("c", echo())
            .add_edge("a", "b")
            .add_edge("a", "c")
            .add_edge("b", NodeId::End)
            .add_edge("c", NodeId::End)
            .set_entry("a")
            .build()
            .unwrap_err();
        assert!(err.contains(DefectKind::ConflictingEdges));
    }

    #[test]
    fn rejects_second_entry_and_reserved_ids() {
        let err = GraphBuilder::new()
            .add_node("a", echo())
            .add_edge("a", NodeId::End)
            .set_entry("a")
            .set_entry("a")
            .add_node(NodeId::End, echo())
            .build()
            .unwrap_err();
        assert!(err.contains(DefectKind::EntryAlreadySet));
        assert!(err.contains(DefectKind::ReservedNode));
    }

    #[test]
    fn validation_error_lists_defects_in_display() {
        let err = GraphBuilder::new().add_node("a", echo()).build().unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("defect(s)"));
        assert!(rendered.contains("no entry point"));
    }
}
