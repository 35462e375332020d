use std::cmp::Ordering;
use std::f32::consts::TAU;

use super::*;

struct PieDatum<'a> {
    index: usize,
    node: &'a Node,
    value: f32,
}

/// Slices clockwise from 12 o'clock, largest first. Angles are shares of
/// the full total, so slices dropped under `min_percent` leave their gap.
pub(super) fn compute_pie_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let pie = &config.pie;
    let values: Vec<f32> = graph
        .nodes
        .iter()
        .map(|node| node.value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0))
        .collect();
    let sum: f32 = values.iter().sum();
    // Nothing to weigh by: every slice gets the same share.
    let (values, total) = if sum > 0.0 {
        (values, sum)
    } else {
        (vec![1.0; graph.nodes.len()], graph.nodes.len().max(1) as f32)
    };

    let mut kept: Vec<PieDatum<'_>> = graph
        .nodes
        .iter()
        .zip(values)
        .enumerate()
        .filter(|(_, (_, value))| value / total * 100.0 >= pie.min_percent)
        .map(|(index, (node, value))| PieDatum { index, node, value })
        .collect();
    kept.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });

    let label_radius = pie.radius * pie.label_radius_ratio;
    let mut nodes = BTreeMap::new();
    let mut slices = Vec::with_capacity(kept.len());
    let mut angle = 0.0f32;
    for datum in &kept {
        let span = datum.value / total * TAU;
        let mid = angle + span / 2.0;
        let label = measurer.block(&datum.node.label);
        let size = (label.width, label.height);
        let center = (mid.sin() * label_radius, -mid.cos() * label_radius);
        nodes.insert(datum.node.id.clone(), node_box(datum.node, label, center, size));
        slices.push(PieSlice {
            id: datum.node.id.clone(),
            value: datum.value,
            percent: datum.value / total * 100.0,
            start_angle: angle,
            end_angle: angle + span,
        });
        angle += span;
    }

    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges: Vec::new(),
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Pie {
            center: (0.0, 0.0),
            radius: pie.radius,
            total,
            slices,
        },
        width: 0.0,
        height: 0.0,
    }
}
