use std::collections::HashMap;

use super::*;

#[derive(Debug, Clone, Copy)]
struct TreemapRect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl TreemapRect {
    fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Shrink by `padding` on every side plus `header` at the top.
    fn inset(self, padding: f32, header: f32) -> Self {
        let pad = padding.max(0.0);
        let top = pad + header.max(0.0);
        Self {
            x: self.x + pad,
            y: self.y + top,
            w: (self.w - pad * 2.0).max(0.0),
            h: (self.h - pad - top).max(0.0),
        }
    }
}

struct Forest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    /// Children before parents.
    post_order: Vec<usize>,
}

/// Each node keeps its first parent in edge order. Nodes never reached from
/// a parentless node (members of a parent cycle) become extra roots.
fn build_forest(graph: &Graph) -> Forest {
    let count = graph.nodes.len();
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut parent: Vec<Option<usize>> = vec![None; count];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); count];
    for edge in &graph.edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) else {
            continue;
        };
        if from != to && parent[to].is_none() {
            parent[to] = Some(from);
            out[from].push(to);
        }
    }

    let mut roots: Vec<usize> = (0..count).filter(|idx| parent[*idx].is_none()).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut visited = vec![false; count];
    let mut pre_order = Vec::with_capacity(count);
    let mut next_root = 0;
    loop {
        while next_root < roots.len() {
            let root = roots[next_root];
            next_root += 1;
            visited[root] = true;
            let mut stack = vec![root];
            while let Some(current) = stack.pop() {
                pre_order.push(current);
                for &child in out[current].iter().rev() {
                    if !visited[child] {
                        visited[child] = true;
                        children[current].push(child);
                        stack.push(child);
                    }
                }
                children[current].reverse();
            }
        }
        match (0..count).find(|idx| !visited[*idx]) {
            Some(orphan) => roots.push(orphan),
            None => break,
        }
    }

    pre_order.reverse();
    Forest {
        roots,
        children,
        post_order: pre_order,
    }
}

/// Slice-and-dice partition of the canvas: siblings split the width at even
/// depths and the height at odd depths, in proportion to their weight.
pub(super) fn compute_treemap_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let treemap = &config.treemap;
    let forest = build_forest(graph);

    let mut weight = vec![1.0f32; graph.nodes.len()];
    for &node in &forest.post_order {
        let own = graph.nodes[node].value.filter(|v| v.is_finite() && *v > 0.0);
        weight[node] = match own {
            Some(value) => value,
            None if !forest.children[node].is_empty() => {
                forest.children[node].iter().map(|child| weight[*child]).sum()
            }
            None => 1.0,
        };
    }

    let mut rects: Vec<Option<TreemapRect>> = vec![None; graph.nodes.len()];
    let mut pending = vec![(
        forest.roots.clone(),
        TreemapRect::new(0.0, 0.0, treemap.width, treemap.height),
        0usize,
    )];
    while let Some((ids, rect, depth)) = pending.pop() {
        let total: f32 = ids.iter().map(|id| weight[*id]).sum();
        if ids.is_empty() || total <= 0.0 {
            continue;
        }
        let split_x = depth % 2 == 0;
        let gaps = treemap.gap * ids.len().saturating_sub(1) as f32;
        let available = (if split_x { rect.w } else { rect.h } - gaps).max(0.0);
        let mut offset = 0.0;
        for &id in &ids {
            let span = available * weight[id] / total;
            let cell = if split_x {
                TreemapRect::new(rect.x + offset, rect.y, span, rect.h)
            } else {
                TreemapRect::new(rect.x, rect.y + offset, rect.w, span)
            };
            offset += span + treemap.gap;
            rects[id] = Some(cell);
            if !forest.children[id].is_empty() {
                pending.push((
                    forest.children[id].clone(),
                    cell.inset(treemap.padding, treemap.header_height),
                    depth + 1,
                ));
            }
        }
    }

    let mut nodes = BTreeMap::new();
    for (node, rect) in graph.nodes.iter().zip(rects) {
        let Some(rect) = rect else {
            continue;
        };
        let label = measurer.block(&node.label);
        nodes.insert(
            node.id.clone(),
            node_box(
                node,
                label,
                (rect.x + rect.w / 2.0, rect.y + rect.h / 2.0),
                (rect.w, rect.h),
            ),
        );
    }

    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges: Vec::new(),
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Graph,
        width: 0.0,
        height: 0.0,
    }
}
