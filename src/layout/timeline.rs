use std::collections::HashMap;

use super::*;

/// Periods are nodes with no incoming edge; every other node is an event
/// stacked under the period it descends from.
pub(super) fn compute_timeline_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let timeline = &config.timeline;
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut first_parent: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    for edge in &graph.edges {
        if edge.from == edge.to {
            continue;
        }
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            if first_parent[to].is_none() {
                first_parent[to] = Some(from);
            }
        }
    }
    let period_of = resolve_periods(&first_parent);

    let periods: Vec<usize> = (0..graph.nodes.len())
        .filter(|idx| period_of[*idx] == *idx)
        .collect();
    let column_of: HashMap<usize, usize> = periods
        .iter()
        .enumerate()
        .map(|(column, period)| (*period, column))
        .collect();

    let labels: Vec<TextBlock> = graph
        .nodes
        .iter()
        .map(|node| measurer.block(&node.label))
        .collect();
    let box_height = |label: &TextBlock| label.height + config.node_padding_y * 2.0;
    let period_height = periods
        .iter()
        .map(|idx| box_height(&labels[*idx]))
        .fold(0.0f32, f32::max);

    let band = if graph.subgraphs.is_empty() {
        0.0
    } else {
        timeline.section_height + timeline.event_gap
    };
    let step = timeline.period_width + timeline.period_gap;
    let axis_y = band + period_height + timeline.axis_gap / 2.0;
    let events_top = band + period_height + timeline.axis_gap;

    let mut nodes = BTreeMap::new();
    let mut stack_y = vec![events_top; periods.len()];
    for (idx, (node, label)) in graph.nodes.iter().zip(labels).enumerate() {
        let column = column_of.get(&period_of[idx]).copied().unwrap_or(0);
        let center_x = column as f32 * step + timeline.period_width / 2.0;
        let height = box_height(&label);
        let center_y = if period_of[idx] == idx {
            band + period_height / 2.0
        } else {
            let top = stack_y[column];
            stack_y[column] = top + height + timeline.event_gap;
            top + height / 2.0
        };
        nodes.insert(
            node.id.clone(),
            node_box(node, label, (center_x, center_y), (timeline.period_width, height)),
        );
    }

    let mut subgraphs = Vec::with_capacity(graph.subgraphs.len());
    for sub in &graph.subgraphs {
        let columns: Vec<usize> = sub
            .members
            .iter()
            .filter_map(|member| index.get(member.as_str()))
            .filter_map(|idx| column_of.get(idx).copied())
            .collect();
        let (Some(first), Some(last)) = (columns.iter().min(), columns.iter().max()) else {
            continue;
        };
        let x = *first as f32 * step;
        let width = (*last - *first + 1) as f32 * step - timeline.period_gap;
        let label = measurer.block(&sub.label);
        subgraphs.push(SubgraphLayout {
            id: sub.id.clone(),
            label_anchor: (x + width / 2.0, timeline.section_height / 2.0),
            label,
            members: sub.members.clone(),
            x,
            y: 0.0,
            width,
            height: timeline.section_height,
        });
    }

    let axis_end = (periods.len().max(1) as f32 * step - timeline.period_gap).max(timeline.period_width);
    let edges = straight_edges(graph, &nodes, config, measurer);
    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs,
        regions: Vec::new(),
        diagram: DiagramData::Timeline {
            axis: ((0.0, axis_y), (axis_end, axis_y)),
        },
        width: 0.0,
        height: 0.0,
    }
}

/// Follow first parents up to a node without one. Nodes caught in a parent
/// cycle become their own period.
fn resolve_periods(first_parent: &[Option<usize>]) -> Vec<usize> {
    (0..first_parent.len())
        .map(|start| {
            let mut current = start;
            let mut steps = 0;
            while let Some(parent) = first_parent[current] {
                current = parent;
                steps += 1;
                if steps > first_parent.len() {
                    return start;
                }
            }
            current
        })
        .collect()
}
