use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;

use super::*;

struct MindmapTree {
    root: usize,
    children: Vec<Vec<usize>>,
    depth: Vec<usize>,
    /// Breadth-first order starting at the root.
    order: Vec<usize>,
}

/// Parent links follow edges in edge order; the first node without a
/// parent is the root and anything unreachable hangs off it directly.
fn build_tree(graph: &Graph) -> MindmapTree {
    let count = graph.nodes.len();
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut has_parent = vec![false; count];
    for edge in &graph.edges {
        if edge.from == edge.to {
            continue;
        }
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            out[from].push(to);
            has_parent[to] = true;
        }
    }
    let root = (0..count).find(|idx| !has_parent[*idx]).unwrap_or(0);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut depth = vec![0usize; count];
    let mut visited = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut queue = VecDeque::new();
    visited[root] = true;
    queue.push_back(root);
    loop {
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &next in &out[current] {
                if !visited[next] {
                    visited[next] = true;
                    children[current].push(next);
                    depth[next] = depth[current] + 1;
                    queue.push_back(next);
                }
            }
        }
        let Some(orphan) = (0..count).find(|idx| !visited[*idx]) else {
            break;
        };
        visited[orphan] = true;
        children[root].push(orphan);
        depth[orphan] = 1;
        queue.push_back(orphan);
    }

    MindmapTree {
        root,
        children,
        depth,
        order,
    }
}

/// Split `span` among children by leaf count, with every share at least
/// `min_angle` when the span allows it.
fn child_slots(leaves: &[f32], span: f32, min_angle: f32) -> Vec<f32> {
    let total: f32 = leaves.iter().sum();
    if total <= 0.0 {
        return vec![span / leaves.len().max(1) as f32; leaves.len()];
    }
    let floor = min_angle.min(span / leaves.len() as f32);
    let raw: Vec<f32> = leaves
        .iter()
        .map(|count| (count / total * span).max(floor))
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.iter().map(|share| share / sum * span).collect()
}

/// Root at the origin, depth rings around it. Angles run clockwise from
/// 12 o'clock and each subtree keeps to its own angular slot.
pub(super) fn compute_mindmap_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let mindmap = &config.mindmap;
    let tree = build_tree(graph);
    let count = graph.nodes.len();

    let sizes: Vec<(TextBlock, (f32, f32))> = graph
        .nodes
        .iter()
        .map(|node| {
            let label = measurer.block(&node.label);
            let size = (
                label.width + mindmap.padding * 2.0,
                label.height + mindmap.padding * 2.0,
            );
            (label, size)
        })
        .collect();
    let extent = sizes
        .iter()
        .map(|(_, (w, h))| w.max(*h))
        .fold(0.0f32, f32::max);
    let ring_step = extent + mindmap.ring_gap;

    let mut leaves = vec![1.0f32; count];
    for &node in tree.order.iter().rev() {
        if !tree.children[node].is_empty() {
            leaves[node] = tree.children[node].iter().map(|child| leaves[*child]).sum();
        }
    }

    // (slot start, slot span, angle) per node.
    let mut slots = vec![(0.0f32, TAU, 0.0f32); count];
    for &node in &tree.order {
        let (start, span, _) = slots[node];
        let kids = &tree.children[node];
        if kids.is_empty() {
            continue;
        }
        let weights: Vec<f32> = kids.iter().map(|child| leaves[*child]).collect();
        let shares = child_slots(&weights, span, mindmap.min_slot_angle);
        let mut cursor = start;
        for (child, share) in kids.iter().zip(shares) {
            slots[*child] = (cursor, share, cursor + share / 2.0);
            cursor += share;
        }
    }
    // Rotate so the root's first child points at 12 o'clock.
    let rotation = tree.children[tree.root]
        .first()
        .map_or(0.0, |child| slots[*child].2);

    let mut nodes = BTreeMap::new();
    for (idx, (node, (label, size))) in graph.nodes.iter().zip(sizes).enumerate() {
        let radius = tree.depth[idx] as f32 * ring_step;
        let angle = slots[idx].2 - rotation;
        let center = if idx == tree.root {
            (0.0, 0.0)
        } else {
            (radius * angle.sin(), -radius * angle.cos())
        };
        nodes.insert(node.id.clone(), node_box(node, label, center, size));
    }

    let edges = straight_edges(graph, &nodes, config, measurer);
    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Graph,
        width: 0.0,
        height: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DiagramKind;

    fn layout_for(graph: &Graph) -> Layout {
        let config = LayoutConfig::default();
        let sizer = CharWidthSizer;
        let measurer = LabelMeasurer::new(&sizer, config.font.clone(), 1.5, 200.0);
        compute_mindmap_layout(graph, &config, &measurer)
    }

    fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    #[test]
    fn children_share_one_ring_starting_at_twelve() {
        let mut graph = Graph::new(DiagramKind::Mindmap);
        graph.connect("root", "a");
        graph.connect("root", "b");
        graph.connect("root", "c");
        let layout = layout_for(&graph);
        let root = layout.node("root").unwrap().center();
        let a = layout.node("a").unwrap().center();
        let b = layout.node("b").unwrap().center();
        let c = layout.node("c").unwrap().center();
        let ring = distance(root, a);
        assert!((distance(root, b) - ring).abs() < 1e-2);
        assert!((distance(root, c) - ring).abs() < 1e-2);
        assert!((a.0 - root.0).abs() < 1e-2);
        assert!(a.1 < root.1);
        assert!(b.0 > root.0 && c.0 < root.0);
    }

    #[test]
    fn grandchildren_sit_on_the_next_ring() {
        let mut graph = Graph::new(DiagramKind::Mindmap);
        graph.connect("root", "a");
        graph.connect("a", "a1");
        graph.connect("root", "b");
        let layout = layout_for(&graph);
        let root = layout.node("root").unwrap().center();
        let a = layout.node("a").unwrap().center();
        let a1 = layout.node("a1").unwrap().center();
        assert!(distance(root, a1) > distance(root, a) + 1.0);
    }

    #[test]
    fn unreachable_nodes_hang_off_the_root() {
        let mut graph = Graph::new(DiagramKind::Mindmap);
        graph.connect("root", "a");
        graph.connect("x", "y");
        graph.connect("y", "x");
        let tree = build_tree(&graph);
        assert_eq!(tree.root, 0);
        assert_eq!(tree.order.len(), 4);
        assert!(tree.children[0].contains(&2));
    }

    #[test]
    fn slots_respect_the_minimum_angle() {
        let shares = child_slots(&[10.0, 0.1], TAU, 0.5);
        assert!(shares[1] >= 0.45);
        assert!((shares.iter().sum::<f32>() - TAU).abs() < 1e-4);
    }
}
