use std::collections::HashMap;

use super::acyclic::break_cycles;
use super::ranking::assign_ranks;
use super::routing::{RouteInput, edge_along, route_edge};
use super::*;

/// Flow carried by an edge; missing or negative values count as one unit
/// and zero respectively.
fn edge_flow(edge: &Edge) -> f32 {
    edge.value
        .filter(|value| value.is_finite())
        .unwrap_or(1.0)
        .max(0.0)
}

/// Columns come from ranking the flow graph; node heights are proportional
/// to the larger of in-flow and out-flow, with one scale shared by every
/// column so the tallest column fills `height`.
pub(super) fn compute_sankey_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let sankey = &config.sankey;
    let count = graph.nodes.len();
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let pairs: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .filter_map(|edge| Some((*index.get(edge.from.as_str())?, *index.get(edge.to.as_str())?)))
        .collect();
    let acyclic = break_cycles(count, &pairs);
    let ranking = assign_ranks(count, &acyclic.oriented(&pairs));

    // Component stacking leaves empty ranks; sankey columns are packed.
    let mut used: Vec<usize> = ranking.ranks.clone();
    used.sort_unstable();
    used.dedup();
    let column_of: Vec<usize> = ranking
        .ranks
        .iter()
        .map(|rank| used.binary_search(rank).unwrap_or(0))
        .collect();
    let column_count = used.len();

    let mut in_flow = vec![0.0f32; count];
    let mut out_flow = vec![0.0f32; count];
    for (edge, &(from, to)) in graph.edges.iter().zip(&pairs) {
        if from == to {
            continue;
        }
        let flow = edge_flow(edge);
        out_flow[from] += flow;
        in_flow[to] += flow;
    }
    let node_flow: Vec<f32> = (0..count)
        .map(|idx| {
            let flow = in_flow[idx].max(out_flow[idx]);
            if flow > 0.0 { flow } else { 1.0 }
        })
        .collect();

    let mut column_total = vec![0.0f32; column_count];
    let mut column_size = vec![0usize; column_count];
    for idx in 0..count {
        column_total[column_of[idx]] += node_flow[idx];
        column_size[column_of[idx]] += 1;
    }
    let scale = column_total
        .iter()
        .zip(&column_size)
        .filter(|(total, _)| **total > 0.0)
        .map(|(total, size)| {
            let room = sankey.height - sankey.node_gap * size.saturating_sub(1) as f32;
            room.max(1.0) / total
        })
        .fold(f32::INFINITY, f32::min);
    let scale = if scale.is_finite() { scale } else { 1.0 };

    let mut nodes = BTreeMap::new();
    let mut column_cursor = vec![0.0f32; column_count];
    for (idx, node) in graph.nodes.iter().enumerate() {
        let column = column_of[idx];
        let height = node_flow[idx] * scale;
        let top = column_cursor[column];
        column_cursor[column] = top + height + sankey.node_gap;
        let x = column as f32 * (sankey.node_width + sankey.column_gap);
        let label = measurer.block(&node.label);
        nodes.insert(
            node.id.clone(),
            node_box(
                node,
                label,
                (x + sankey.node_width / 2.0, top + height / 2.0),
                (sankey.node_width, height),
            ),
        );
    }

    let mut out_cursor: Vec<f32> = graph
        .nodes
        .iter()
        .map(|node| nodes.get(&node.id).map_or(0.0, |layout| layout.y))
        .collect();
    let mut in_cursor = out_cursor.clone();
    let mut edges = Vec::with_capacity(graph.edges.len());
    let mut links = Vec::with_capacity(graph.edges.len());
    for (edge, &(from, to)) in graph.edges.iter().zip(&pairs) {
        let (Some(source), Some(target)) = (nodes.get(&edge.from), nodes.get(&edge.to)) else {
            continue;
        };
        let label = edge_label(edge, measurer);
        if from == to {
            edges.push(route_edge(
                RouteInput {
                    edge,
                    from: source,
                    to: target,
                    interior: Vec::new(),
                    back_edge: false,
                    offset: 0.0,
                    label,
                },
                graph.direction,
                config,
            ));
            continue;
        }
        let thickness = edge_flow(edge) * scale;
        let start_y = out_cursor[from] + thickness / 2.0;
        let end_y = in_cursor[to] + thickness / 2.0;
        out_cursor[from] += thickness;
        in_cursor[to] += thickness;

        let start = (source.x + source.width, start_y);
        let end = (target.x, end_y);
        let mid_x = (start.0 + end.0) / 2.0;
        let points = vec![start, (mid_x, start.1), (mid_x, end.1), end];
        edges.push(edge_along(edge, points, RouteKind::Polyline, label, config));
        links.push(SankeyLink {
            from: edge.from.clone(),
            to: edge.to.clone(),
            thickness,
        });
    }

    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Sankey { links },
        width: 0.0,
        height: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DiagramKind;

    fn flow(graph: &mut Graph, from: &str, to: &str, value: f32) {
        graph.connect(from, to).value = Some(value);
    }

    fn layout_for(graph: &Graph) -> Layout {
        let config = LayoutConfig::default();
        let sizer = CharWidthSizer;
        let measurer = LabelMeasurer::new(&sizer, config.font.clone(), 1.5, 200.0);
        compute_sankey_layout(graph, &config, &measurer)
    }

    #[test]
    fn columns_follow_flow_and_heights_follow_volume() {
        let mut graph = Graph::new(DiagramKind::Sankey);
        flow(&mut graph, "coal", "power", 30.0);
        flow(&mut graph, "gas", "power", 10.0);
        flow(&mut graph, "power", "homes", 40.0);
        let layout = layout_for(&graph);

        let coal = layout.node("coal").unwrap();
        let gas = layout.node("gas").unwrap();
        let power = layout.node("power").unwrap();
        let homes = layout.node("homes").unwrap();
        assert!(power.x > coal.x);
        assert!(homes.x > power.x);
        assert_eq!(coal.x, gas.x);
        assert!((coal.height - 3.0 * gas.height).abs() < 1e-3);
        assert!((power.height - (coal.height + gas.height)).abs() < 1e-3);
        assert!(coal.height + gas.height + 12.0 <= 400.0 + 1e-3);
    }

    #[test]
    fn links_stack_on_each_side_in_edge_order() {
        let mut graph = Graph::new(DiagramKind::Sankey);
        flow(&mut graph, "a", "x", 10.0);
        flow(&mut graph, "a", "y", 30.0);
        let layout = layout_for(&graph);
        let a = layout.node("a").unwrap();
        let first = &layout.edges[0];
        let second = &layout.edges[1];
        assert_eq!(first.route, RouteKind::Polyline);
        assert_eq!(first.points.len(), 4);
        assert!(first.points[0].1 < second.points[0].1);
        assert!((first.points[0].0 - (a.x + a.width)).abs() < 1e-3);

        let DiagramData::Sankey { links } = &layout.diagram else {
            panic!("expected sankey data");
        };
        assert!((links[1].thickness - 3.0 * links[0].thickness).abs() < 1e-3);
        assert!((links[0].thickness + links[1].thickness - a.height).abs() < 1e-3);
    }
}
