use super::*;
use crate::ir::NodeShape;

/// Points live in the unit square with y pointing up; the grid spans
/// `width` by `height` with its origin at the top-left. Points without
/// coordinates sit in the middle.
pub(super) fn compute_quadrant_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let quadrant = &config.quadrant;
    let mut nodes = BTreeMap::new();
    for node in &graph.nodes {
        let (px, py) = node.point.unwrap_or((0.5, 0.5));
        let px = if px.is_finite() { px.clamp(0.0, 1.0) } else { 0.5 };
        let py = if py.is_finite() { py.clamp(0.0, 1.0) } else { 0.5 };
        let center = (px * quadrant.width, (1.0 - py) * quadrant.height);
        let label = measurer.block(&node.label);
        let mut point = node_box(node, label, center, (quadrant.point_size, quadrant.point_size));
        point.shape = NodeShape::Circle;
        nodes.insert(node.id.clone(), point);
    }

    let edges = straight_edges(graph, &nodes, config, measurer);
    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::Quadrant {
            x: 0.0,
            y: 0.0,
            width: quadrant.width,
            height: quadrant.height,
        },
        width: 0.0,
        height: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DiagramKind;

    #[test]
    fn unit_coordinates_map_with_y_up() {
        let mut graph = Graph::new(DiagramKind::Quadrant);
        let mut high = Node::new("high", "High");
        high.point = Some((0.25, 0.75));
        graph.add_node(high);
        graph.add_node(Node::new("unset", "Unset"));
        let mut outside = Node::new("outside", "Outside");
        outside.point = Some((1.5, -0.2));
        graph.add_node(outside);

        let config = LayoutConfig::default();
        let sizer = CharWidthSizer;
        let measurer = LabelMeasurer::new(&sizer, config.font.clone(), 1.5, 200.0);
        let layout = compute_quadrant_layout(&graph, &config, &measurer);

        assert_eq!(layout.node("high").unwrap().center(), (125.0, 125.0));
        assert_eq!(layout.node("unset").unwrap().center(), (250.0, 250.0));
        assert_eq!(layout.node("outside").unwrap().center(), (500.0, 500.0));
    }
}
