use std::f32::consts::TAU;

use super::*;

/// One axis per node at equal angles clockwise from 12 o'clock. The node's
/// value lands on its axis relative to the configured maximum, and its
/// label box sits just past the rim.
pub(super) fn compute_radar_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let radar = &config.radar;
    let radius = radar.radius;
    let count = graph.nodes.len().max(1);
    let max_value = radar
        .max_value
        .or_else(|| {
            graph
                .nodes
                .iter()
                .filter_map(|node| node.value)
                .filter(|value| value.is_finite() && *value > 0.0)
                .reduce(f32::max)
        })
        .unwrap_or(1.0);

    let mut nodes = BTreeMap::new();
    let mut axes = Vec::with_capacity(graph.nodes.len());
    for (idx, node) in graph.nodes.iter().enumerate() {
        let angle = idx as f32 * TAU / count as f32;
        let dir = (angle.sin(), -angle.cos());
        let end = (dir.0 * radius, dir.1 * radius);
        let ratio = (node.value.unwrap_or(0.0) / max_value).clamp(0.0, 1.0);
        axes.push(RadarAxis {
            id: node.id.clone(),
            angle,
            end,
            value_point: (end.0 * ratio, end.1 * ratio),
        });

        let label = measurer.block(&node.label);
        let size = (label.width, label.height);
        let reach = radius + radar.label_gap;
        // Push the box outward by half its extent so it never overlaps the rim.
        let center = (
            dir.0 * reach + dir.0 * size.0 / 2.0,
            dir.1 * reach + dir.1 * size.1 / 2.0,
        );
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
        diagram: DiagramData::Radar {
            center: (0.0, 0.0),
            radius,
            axes,
        },
        width: 0.0,
        height: 0.0,
    }
}
