use std::collections::HashMap;

use super::routing::edge_along;
use super::*;

/// Participants left to right in declaration order, messages top to bottom
/// in edge order. No ranking or ordering is involved.
pub(super) fn compute_sequence_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let seq = &config.sequence;
    let mut nodes = BTreeMap::new();

    let labels: Vec<TextBlock> = graph
        .nodes
        .iter()
        .map(|node| measurer.block(&node.label))
        .collect();
    let actor_height = labels
        .iter()
        .map(|label| label.height + config.node_padding_y * 2.0)
        .fold(seq.actor_height, f32::max);

    let mut centers: HashMap<&str, f32> = HashMap::new();
    let mut cursor_x = 0.0f32;
    for (node, label) in graph.nodes.iter().zip(labels) {
        let width = (label.width + config.node_padding_x * 2.0).max(seq.actor_min_width);
        let center_x = cursor_x + width / 2.0;
        centers.insert(node.id.as_str(), center_x);
        nodes.insert(
            node.id.clone(),
            node_box(node, label, (center_x, actor_height / 2.0), (width, actor_height)),
        );
        cursor_x += width + seq.actor_gap;
    }

    let self_drop = seq.message_spacing * 0.5;
    let mut cursor_y = actor_height + seq.message_spacing;
    let mut edges = Vec::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        let (Some(&from_x), Some(&to_x)) = (
            centers.get(edge.from.as_str()),
            centers.get(edge.to.as_str()),
        ) else {
            continue;
        };
        let label = edge_label(edge, measurer);
        let label_height = label.as_ref().map_or(0.0, |label| label.height);
        let y = cursor_y + label_height;

        let (points, route) = if edge.from == edge.to {
            let loop_x = from_x + seq.self_message_width;
            (
                vec![(from_x, y), (loop_x, y), (loop_x, y + self_drop), (from_x, y + self_drop)],
                RouteKind::SelfLoop,
            )
        } else {
            (vec![(from_x, y), (to_x, y)], RouteKind::Straight)
        };
        let mut layout = edge_along(edge, points, route, label, config);
        // Message text sits above the arrow rather than beside it.
        if let Some(label) = layout.label.as_ref() {
            let mid_x = if edge.from == edge.to {
                from_x + seq.self_message_width / 2.0
            } else {
                (from_x + to_x) / 2.0
            };
            layout.label_anchor = Some((mid_x, y - config.edge_label_gap - label.height / 2.0));
        }
        edges.push(layout);

        cursor_y = y + seq.message_spacing;
        if edge.from == edge.to {
            cursor_y += self_drop;
        }
    }

    let lifeline_end = cursor_y - seq.message_spacing + seq.bottom_margin.max(seq.message_spacing / 2.0);
    let lifelines = graph
        .nodes
        .iter()
        .filter_map(|node| {
            centers.get(node.id.as_str()).map(|x| Lifeline {
                id: node.id.clone(),
                x: *x,
                y1: actor_height,
                y2: lifeline_end.max(actor_height),
            })
        })
        .collect();

    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Sequence { lifelines },
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
        compute_sequence_layout(graph, &config, &measurer)
    }

    #[test]
    fn participants_follow_declaration_order() {
        let mut graph = Graph::new(DiagramKind::Sequence);
        graph.connect("Alice", "Bob").label = Some("hi".into());
        graph.connect("Bob", "Alice");
        let layout = layout_for(&graph);
        let alice = layout.node("Alice").unwrap();
        let bob = layout.node("Bob").unwrap();
        assert!(bob.x >= alice.x + alice.width + 50.0 - 1e-3);
        assert_eq!(alice.y, bob.y);
    }

    #[test]
    fn messages_descend_in_order() {
        let mut graph = Graph::new(DiagramKind::Sequence);
        graph.connect("A", "B");
        graph.connect("B", "A");
        graph.connect("A", "A");
        let layout = layout_for(&graph);
        let ys: Vec<f32> = layout.edges.iter().map(|edge| edge.points[0].1).collect();
        assert!(ys.windows(2).all(|pair| pair[1] > pair[0]), "{ys:?}");
        assert_eq!(layout.edges[2].route, RouteKind::SelfLoop);
        let DiagramData::Sequence { lifelines } = &layout.diagram else {
            panic!("expected sequence data");
        };
        assert_eq!(lifelines.len(), 2);
        assert!(lifelines.iter().all(|line| line.y2 > ys[2]));
    }
}
