use std::collections::HashMap;

use super::*;

/// Tasks run left to right in declaration order under their section bands;
/// each score becomes a marker above its task, higher for better scores.
pub(super) fn compute_journey_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let journey = &config.journey;
    let has_sections = !graph.subgraphs.is_empty();
    let band = if has_sections {
        journey.section_height + journey.task_gap
    } else {
        0.0
    };
    let score_top = band;
    let score_bottom = score_top + journey.max_score * journey.score_step;
    let task_top = score_bottom + journey.task_gap;

    let labels: Vec<TextBlock> = graph
        .nodes
        .iter()
        .map(|node| measurer.block(&node.label))
        .collect();
    let task_height = labels
        .iter()
        .map(|label| label.height + config.node_padding_y * 2.0)
        .fold(journey.task_height, f32::max);

    let mut nodes = BTreeMap::new();
    let mut scores = Vec::with_capacity(graph.nodes.len());
    let mut column: HashMap<&str, usize> = HashMap::new();
    for (idx, (node, label)) in graph.nodes.iter().zip(labels).enumerate() {
        let center_x = idx as f32 * (journey.task_width + journey.task_gap) + journey.task_width / 2.0;
        column.insert(node.id.as_str(), idx);
        nodes.insert(
            node.id.clone(),
            node_box(
                node,
                label,
                (center_x, task_top + task_height / 2.0),
                (journey.task_width, task_height),
            ),
        );
        let score = node.value.unwrap_or(0.0).clamp(0.0, journey.max_score);
        scores.push(ScoreMarker {
            task: node.id.clone(),
            score,
            x: center_x,
            y: score_bottom - score * journey.score_step,
        });
    }

    let mut subgraphs = Vec::with_capacity(graph.subgraphs.len());
    for sub in &graph.subgraphs {
        let columns: Vec<usize> = sub
            .members
            .iter()
            .filter_map(|member| column.get(member.as_str()).copied())
            .collect();
        let (Some(first), Some(last)) = (columns.iter().min(), columns.iter().max()) else {
            continue;
        };
        let x = *first as f32 * (journey.task_width + journey.task_gap);
        let width = (*last - *first + 1) as f32 * (journey.task_width + journey.task_gap)
            - journey.task_gap;
        let label = measurer.block(&sub.label);
        subgraphs.push(SubgraphLayout {
            id: sub.id.clone(),
            label_anchor: (x + width / 2.0, journey.section_height / 2.0),
            label,
            members: sub.members.clone(),
            x,
            y: 0.0,
            width,
            height: journey.section_height,
        });
    }

    let edges = straight_edges(graph, &nodes, config, measurer);
    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs,
        regions: Vec::new(),
        diagram: DiagramData::Journey { scores },
        width: 0.0,
        height: 0.0,
    }
}
