use std::collections::HashSet;

use thiserror::Error;

use crate::ir::Graph;

/// Reasons a graph cannot be laid out. Every variant is a reference
/// problem in the input; no partial geometry is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("edge {from} -> {to} references unknown id '{missing}'")]
    UnknownEdgeEndpoint {
        from: String,
        to: String,
        missing: String,
    },
    #[error("subgraph '{subgraph}' lists unknown member '{member}'")]
    UnknownMember { subgraph: String, member: String },
    #[error("composite state '{0}' does not name a node of its graph")]
    UnknownComposite(String),
    #[error("'{member}' is listed by unrelated subgraphs '{first}' and '{second}'")]
    ConflictingMembership {
        member: String,
        first: String,
        second: String,
    },
    #[error("subgraph '{0}' contains itself")]
    NestingCycle(String),
    #[error("id '{0}' is declared more than once")]
    DuplicateId(String),
}

impl LayoutError {
    /// All layout failures are reference errors: the diagram itself is invalid.
    pub fn is_reference_error(&self) -> bool {
        true
    }
}

/// Check ids, edge endpoints and subgraph members across the graph and every
/// nested composite. Membership shape (tree, no cycles) is checked by the
/// scope builder.
pub(super) fn validate(graph: &Graph) -> Result<(), LayoutError> {
    let mut seen = HashSet::new();
    validate_scope(graph, &mut seen)
}

fn validate_scope<'a>(graph: &'a Graph, seen: &mut HashSet<&'a str>) -> Result<(), LayoutError> {
    let mut local: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(LayoutError::DuplicateId(node.id.clone()));
        }
        local.insert(node.id.as_str());
    }
    for sub in &graph.subgraphs {
        if !seen.insert(sub.id.as_str()) {
            return Err(LayoutError::DuplicateId(sub.id.clone()));
        }
        local.insert(sub.id.as_str());
    }

    for edge in &graph.edges {
        for end in [&edge.from, &edge.to] {
            if !local.contains(end.as_str()) {
                return Err(LayoutError::UnknownEdgeEndpoint {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: end.clone(),
                });
            }
        }
    }

    for sub in &graph.subgraphs {
        for member in &sub.members {
            if !local.contains(member.as_str()) {
                return Err(LayoutError::UnknownMember {
                    subgraph: sub.id.clone(),
                    member: member.clone(),
                });
            }
        }
    }

    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut composite_ids: HashSet<&str> = HashSet::new();
    for composite in &graph.composites {
        if !node_ids.contains(composite.id.as_str()) {
            return Err(LayoutError::UnknownComposite(composite.id.clone()));
        }
        if !composite_ids.insert(composite.id.as_str()) {
            return Err(LayoutError::DuplicateId(composite.id.clone()));
        }
        validate_scope(&composite.inner, seen)?;
        for region in &composite.regions {
            validate_scope(region, seen)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompositeState, DiagramKind, Edge, Graph, Node};

    #[test]
    fn unknown_edge_endpoint_is_reported() {
        let mut graph = Graph::new(DiagramKind::Flowchart);
        graph.add_node(Node::new("A", "A"));
        graph.edges.push(Edge::new("A", "Z"));
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err,
            LayoutError::UnknownEdgeEndpoint {
                from: "A".into(),
                to: "Z".into(),
                missing: "Z".into()
            }
        );
        assert!(err.is_reference_error());
    }

    #[test]
    fn unknown_subgraph_member_is_reported() {
        let mut graph = Graph::new(DiagramKind::Flowchart);
        graph.add_node(Node::new("A", "A"));
        graph.add_subgraph("S", "Group", &["A", "ghost"]);
        assert!(matches!(
            validate(&graph),
            Err(LayoutError::UnknownMember { member, .. }) if member == "ghost"
        ));
    }

    #[test]
    fn edges_may_target_subgraphs() {
        let mut graph = Graph::new(DiagramKind::Flowchart);
        graph.add_node(Node::new("A", "A"));
        graph.add_node(Node::new("B", "B"));
        graph.add_subgraph("S", "Group", &["B"]);
        graph.edges.push(Edge::new("A", "S"));
        assert!(validate(&graph).is_ok());
    }

    #[test]
    fn ids_are_unique_across_composites() {
        let mut inner = Graph::new(DiagramKind::State);
        inner.add_node(Node::new("A", "again"));
        let mut graph = Graph::new(DiagramKind::State);
        graph.add_node(Node::new("A", "A"));
        graph.composites.push(CompositeState {
            id: "A".into(),
            inner,
            regions: Vec::new(),
        });
        assert_eq!(validate(&graph), Err(LayoutError::DuplicateId("A".into())));
    }

    #[test]
    fn composite_must_name_a_node() {
        let mut graph = Graph::new(DiagramKind::State);
        graph.add_node(Node::new("A", "A"));
        graph.composites.push(CompositeState {
            id: "B".into(),
            inner: Graph::new(DiagramKind::State),
            regions: Vec::new(),
        });
        assert_eq!(validate(&graph), Err(LayoutError::UnknownComposite("B".into())));
    }

    #[test]
    fn inner_edges_cannot_reach_outer_nodes() {
        let mut inner = Graph::new(DiagramKind::State);
        inner.add_node(Node::new("X", "X"));
        inner.edges.push(Edge::new("X", "A"));
        let mut graph = Graph::new(DiagramKind::State);
        graph.add_node(Node::new("A", "A"));
        graph.add_node(Node::new("C", "C"));
        graph.composites.push(CompositeState {
            id: "C".into(),
            inner,
            regions: Vec::new(),
        });
        assert!(matches!(
            validate(&graph),
            Err(LayoutError::UnknownEdgeEndpoint { missing, .. }) if missing == "A"
        ));
    }
}
