//! Subgraph nesting as an arena of scope records.
//!
//! Scope 0 is the graph itself; scope `i + 1` belongs to `graph.subgraphs[i]`.
//! Records only point from parent to child (plus a parent index for lifting).

use std::collections::HashMap;

use crate::ir::{Direction, Graph};

use super::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScopeItem {
    Node(usize),
    Scope(usize),
}

/// An edge lifted into the scope that contains both of its endpoints.
/// `from` and `to` index that scope's `items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LiftedEdge {
    pub edge: usize,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone)]
pub(super) struct ScopeRecord {
    pub subgraph: Option<usize>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub direction: Direction,
    pub items: Vec<ScopeItem>,
    pub edges: Vec<LiftedEdge>,
}

#[derive(Debug, Clone)]
pub(super) struct ScopeTree {
    pub scopes: Vec<ScopeRecord>,
}

impl ScopeTree {
    #[cfg(test)]
    pub fn root(&self) -> &ScopeRecord {
        &self.scopes[0]
    }

    fn depth(&self, mut scope: usize) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.scopes[scope].parent {
            depth += 1;
            scope = parent;
        }
        depth
    }
}

/// Build the scope arena for one graph. Fails when membership is not a tree.
pub(super) fn build_scopes(graph: &Graph) -> Result<ScopeTree, LayoutError> {
    let node_index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let sub_index: HashMap<&str, usize> = graph
        .subgraphs
        .iter()
        .enumerate()
        .map(|(idx, sub)| (sub.id.as_str(), idx))
        .collect();

    // Direct subgraph-in-subgraph listing.
    let sub_members: Vec<Vec<usize>> = graph
        .subgraphs
        .iter()
        .map(|sub| {
            sub.members
                .iter()
                .filter_map(|member| sub_index.get(member.as_str()).copied())
                .collect()
        })
        .collect();
    detect_nesting_cycle(graph, &sub_members)?;
    let contains = transitive_listing(&sub_members);

    let mut node_listers: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    let mut sub_listers: Vec<Vec<usize>> = vec![Vec::new(); graph.subgraphs.len()];
    for (sub_idx, sub) in graph.subgraphs.iter().enumerate() {
        for member in &sub.members {
            if let Some(&node) = node_index.get(member.as_str()) {
                if !node_listers[node].contains(&sub_idx) {
                    node_listers[node].push(sub_idx);
                }
            } else if let Some(&child) = sub_index.get(member.as_str()) {
                if !sub_listers[child].contains(&sub_idx) {
                    sub_listers[child].push(sub_idx);
                }
            }
        }
    }

    let mut scopes: Vec<ScopeRecord> = Vec::with_capacity(graph.subgraphs.len() + 1);
    scopes.push(ScopeRecord {
        subgraph: None,
        parent: None,
        children: Vec::new(),
        direction: graph.direction,
        items: Vec::new(),
        edges: Vec::new(),
    });
    for (idx, sub) in graph.subgraphs.iter().enumerate() {
        let parent = deepest_lister(graph, &sub.id, &sub_listers[idx], &contains)?;
        scopes.push(ScopeRecord {
            subgraph: Some(idx),
            parent: Some(parent.map_or(0, |p| p + 1)),
            children: Vec::new(),
            direction: graph.direction,
            items: Vec::new(),
            edges: Vec::new(),
        });
    }
    for scope in 1..scopes.len() {
        if let Some(parent) = scopes[scope].parent {
            scopes[parent].children.push(scope);
        }
    }

    // Directions are inherited top-down.
    let mut stack = vec![0usize];
    while let Some(scope) = stack.pop() {
        let inherited = scopes[scope].direction;
        let children = scopes[scope].children.clone();
        for child in children {
            let own = scopes[child]
                .subgraph
                .and_then(|idx| graph.subgraphs[idx].direction);
            scopes[child].direction = own.unwrap_or(inherited);
            stack.push(child);
        }
    }

    let mut node_scope = vec![0usize; graph.nodes.len()];
    for (node, listers) in node_listers.iter().enumerate() {
        let id = &graph.nodes[node].id;
        if let Some(sub) = deepest_lister(graph, id, listers, &contains)? {
            node_scope[node] = sub + 1;
        }
    }

    // Items sort by the first declared node they contain.
    let mut first_node = vec![usize::MAX; scopes.len()];
    for (node, &scope) in node_scope.iter().enumerate() {
        let mut current = Some(scope);
        while let Some(s) = current {
            if first_node[s] > node {
                first_node[s] = node;
            }
            current = scopes[s].parent;
        }
    }
    let mut keyed: Vec<Vec<(usize, ScopeItem)>> = vec![Vec::new(); scopes.len()];
    for (node, &scope) in node_scope.iter().enumerate() {
        keyed[scope].push((node, ScopeItem::Node(node)));
    }
    for scope in 1..scopes.len() {
        let key = if first_node[scope] == usize::MAX {
            graph.nodes.len() + scope
        } else {
            first_node[scope]
        };
        if let Some(parent) = scopes[scope].parent {
            keyed[parent].push((key, ScopeItem::Scope(scope)));
        }
    }
    for (scope, mut items) in keyed.into_iter().enumerate() {
        items.sort_by_key(|(key, _)| *key);
        scopes[scope].items = items.into_iter().map(|(_, item)| item).collect();
    }

    let mut tree = ScopeTree { scopes };
    lift_edges(graph, &mut tree, &node_index, &sub_index, &node_scope);
    Ok(tree)
}

fn detect_nesting_cycle(graph: &Graph, sub_members: &[Vec<usize>]) -> Result<(), LayoutError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Fresh,
        Active,
        Done,
    }
    let mut marks = vec![Mark::Fresh; sub_members.len()];
    for start in 0..sub_members.len() {
        if marks[start] != Mark::Fresh {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Active;
        while let Some(top) = stack.last_mut() {
            let sub = top.0;
            if let Some(&child) = sub_members[sub].get(top.1) {
                top.1 += 1;
                match marks[child] {
                    Mark::Active => {
                        return Err(LayoutError::NestingCycle(graph.subgraphs[child].id.clone()));
                    }
                    Mark::Fresh => {
                        marks[child] = Mark::Active;
                        stack.push((child, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[sub] = Mark::Done;
                stack.pop();
            }
        }
    }
    Ok(())
}

/// `contains[a][b]`: subgraph `a` lists `b`, directly or through other subgraphs.
fn transitive_listing(sub_members: &[Vec<usize>]) -> Vec<Vec<bool>> {
    let count = sub_members.len();
    let mut contains = vec![vec![false; count]; count];
    for (start, row) in contains.iter_mut().enumerate() {
        let mut stack = sub_members[start].clone();
        while let Some(sub) = stack.pop() {
            if !row[sub] {
                row[sub] = true;
                stack.extend(sub_members[sub].iter().copied());
            }
        }
    }
    contains
}

/// The lister nested inside all others, or a conflict when two listers are
/// unrelated.
fn deepest_lister(
    graph: &Graph,
    member: &str,
    listers: &[usize],
    contains: &[Vec<bool>],
) -> Result<Option<usize>, LayoutError> {
    let mut deepest: Option<usize> = None;
    for &lister in listers {
        deepest = match deepest {
            None => Some(lister),
            Some(current) if contains[current][lister] => Some(lister),
            Some(current) if contains[lister][current] => Some(current),
            Some(current) => {
                return Err(LayoutError::ConflictingMembership {
                    member: member.to_string(),
                    first: graph.subgraphs[current].id.clone(),
                    second: graph.subgraphs[lister].id.clone(),
                });
            }
        };
    }
    Ok(deepest)
}

fn lift_edges(
    graph: &Graph,
    tree: &mut ScopeTree,
    node_index: &HashMap<&str, usize>,
    sub_index: &HashMap<&str, usize>,
    node_scope: &[usize],
) {
    // Where an endpoint lives: the scope holding it and the item it is there.
    let locate = |id: &str| -> Option<(usize, ScopeItem)> {
        if let Some(&node) = node_index.get(id) {
            return Some((node_scope[node], ScopeItem::Node(node)));
        }
        let scope = sub_index.get(id).map(|idx| idx + 1)?;
        Some((tree.scopes[scope].parent.unwrap_or(0), ScopeItem::Scope(scope)))
    };

    let mut lifted: Vec<(usize, LiftedEdge)> = Vec::new();
    for (edge_idx, edge) in graph.edges.iter().enumerate() {
        let (Some((from_scope, from_item)), Some((to_scope, to_item))) =
            (locate(&edge.from), locate(&edge.to))
        else {
            continue;
        };
        let common = lowest_common_scope(tree, from_scope, to_scope);
        let from_local = item_in_scope(tree, common, from_scope, from_item);
        let to_local = item_in_scope(tree, common, to_scope, to_item);
        let items = &tree.scopes[common].items;
        let (Some(from), Some(to)) = (
            items.iter().position(|item| *item == from_local),
            items.iter().position(|item| *item == to_local),
        ) else {
            continue;
        };
        lifted.push((
            common,
            LiftedEdge {
                edge: edge_idx,
                from,
                to,
            },
        ));
    }
    for (scope, edge) in lifted {
        tree.scopes[scope].edges.push(edge);
    }
}

fn lowest_common_scope(tree: &ScopeTree, a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    let (mut depth_a, mut depth_b) = (tree.depth(a), tree.depth(b));
    while depth_a > depth_b {
        a = tree.scopes[a].parent.unwrap_or(0);
        depth_a -= 1;
    }
    while depth_b > depth_a {
        b = tree.scopes[b].parent.unwrap_or(0);
        depth_b -= 1;
    }
    while a != b {
        a = tree.scopes[a].parent.unwrap_or(0);
        b = tree.scopes[b].parent.unwrap_or(0);
    }
    a
}

/// The item of `common` that contains `item`, which sits in scope `scope`.
fn item_in_scope(tree: &ScopeTree, common: usize, scope: usize, item: ScopeItem) -> ScopeItem {
    if scope == common {
        return item;
    }
    let mut current = scope;
    while let Some(parent) = tree.scopes[current].parent {
        if parent == common {
            return ScopeItem::Scope(current);
        }
        current = parent;
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DiagramKind, Graph};

    fn graph_with(nodes: &[&str]) -> Graph {
        let mut graph = Graph::new(DiagramKind::Flowchart);
        for id in nodes {
            graph.ensure_node(id, None, None);
        }
        graph
    }

    #[test]
    fn flat_graph_has_one_scope() {
        let mut graph = graph_with(&["A", "B"]);
        graph.connect("A", "B");
        let tree = build_scopes(&graph).unwrap();
        assert_eq!(tree.scopes.len(), 1);
        assert_eq!(tree.root().items, vec![ScopeItem::Node(0), ScopeItem::Node(1)]);
        assert_eq!(tree.root().edges, vec![LiftedEdge { edge: 0, from: 0, to: 1 }]);
    }

    #[test]
    fn deepest_lister_owns_the_node() {
        let mut graph = graph_with(&["A", "B", "C"]);
        graph.add_subgraph("outer", "Outer", &["inner", "A", "B"]);
        graph.add_subgraph("inner", "Inner", &["B"]);
        let tree = build_scopes(&graph).unwrap();
        assert_eq!(tree.scopes[2].parent, Some(1));
        assert_eq!(tree.scopes[2].items, vec![ScopeItem::Node(1)]);
        assert_eq!(tree.scopes[1].items, vec![ScopeItem::Node(0), ScopeItem::Scope(2)]);
        assert_eq!(tree.root().items, vec![ScopeItem::Scope(1), ScopeItem::Node(2)]);
    }

    #[test]
    fn unrelated_listers_conflict() {
        let mut graph = graph_with(&["A"]);
        graph.add_subgraph("one", "One", &["A"]);
        graph.add_subgraph("two", "Two", &["A"]);
        assert!(matches!(
            build_scopes(&graph),
            Err(LayoutError::ConflictingMembership { member, .. }) if member == "A"
        ));
    }

    #[test]
    fn subgraph_cycle_is_rejected() {
        let mut graph = graph_with(&["A"]);
        graph.add_subgraph("one", "One", &["two", "A"]);
        graph.add_subgraph("two", "Two", &["one"]);
        assert!(matches!(build_scopes(&graph), Err(LayoutError::NestingCycle(_))));
    }

    #[test]
    fn edges_lift_to_the_common_scope() {
        let mut graph = graph_with(&["A", "B", "C"]);
        graph.add_subgraph("S", "S", &["A", "B"]);
        graph.connect("A", "B");
        graph.connect("B", "C");
        graph.connect("S", "C");
        let tree = build_scopes(&graph).unwrap();
        assert_eq!(tree.scopes[1].edges, vec![LiftedEdge { edge: 0, from: 0, to: 1 }]);
        // Root items: [S, C]; both B -> C and S -> C connect the box to C.
        assert_eq!(
            tree.root().edges,
            vec![
                LiftedEdge { edge: 1, from: 0, to: 1 },
                LiftedEdge { edge: 2, from: 0, to: 1 }
            ]
        );
    }

    #[test]
    fn subgraph_direction_overrides_parent() {
        let mut graph = graph_with(&["A"]);
        graph.add_subgraph("S", "S", &["A"]);
        graph.subgraphs[0].direction = Some(Direction::LeftRight);
        let tree = build_scopes(&graph).unwrap();
        assert_eq!(tree.root().direction, Direction::TopDown);
        assert_eq!(tree.scopes[1].direction, Direction::LeftRight);
    }
}
