use std::path::Path;

use mermaid_rs_layout::layout::{DiagramData, RouteKind};
use mermaid_rs_layout::ir::{CompositeState, PortSide};
use mermaid_rs_layout::{
    CharWidthSizer, DiagramKind, Direction, FontSpec, Graph, Layout, LayoutConfig, Node, TextSize,
    compute_layout,
};

const EPS: f32 = 1e-3;

/// Every label is `8px` per character and one font size tall.
fn fixed_sizer(text: &str, font: &FontSpec) -> TextSize {
    TextSize {
        width: text.chars().count() as f32 * 8.0,
        height: font.size,
    }
}

fn lay_out(graph: &Graph) -> Layout {
    compute_layout(graph, &LayoutConfig::default(), &fixed_sizer).expect("layout failed")
}

fn center(layout: &Layout, id: &str) -> (f32, f32) {
    layout
        .node(id)
        .unwrap_or_else(|| panic!("missing node {id}"))
        .center()
}

fn chain(ids: &[&str]) -> Graph {
    let mut graph = Graph::new(DiagramKind::Flowchart);
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]);
    }
    graph
}

fn layout_fixture(path: &Path) -> Layout {
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    let graph: Graph = serde_json::from_str(&input).expect("fixture parse failed");
    compute_layout(&graph, &LayoutConfig::default(), &CharWidthSizer).expect("layout failed")
}

fn assert_inside_canvas(layout: &Layout, fixture: &str) {
    assert!(layout.width > 0.0 && layout.height > 0.0, "{fixture}: empty canvas");
    for node in layout.nodes.values() {
        assert!(node.x >= -EPS && node.y >= -EPS, "{fixture}: {} starts off canvas", node.id);
        assert!(
            node.x + node.width <= layout.width + EPS && node.y + node.height <= layout.height + EPS,
            "{fixture}: {} ends off canvas",
            node.id
        );
    }
    for edge in &layout.edges {
        for (x, y) in &edge.points {
            assert!(x.is_finite() && y.is_finite(), "{fixture}: non-finite edge point");
        }
    }
}

#[test]
fn layout_all_fixtures() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");

    // Keep this list explicit so new diagram kinds must be added intentionally.
    let candidates = [
        "architecture/ports.json",
        "class/basic.json",
        "flowchart/basic.json",
        "flowchart/cycles.json",
        "flowchart/subgraph.json",
        "gantt/basic.json",
        "gitgraph/basic.json",
        "journey/basic.json",
        "mindmap/basic.json",
        "pie/basic.json",
        "quadrant/basic.json",
        "radar/basic.json",
        "sankey/basic.json",
        "sequence/basic.json",
        "state/composite.json",
        "timeline/basic.json",
        "treemap/basic.json",
    ];

    for rel in candidates {
        let path = root.join(rel);
        assert!(path.exists(), "fixture missing: {rel}");
        let layout = layout_fixture(&path);
        assert_inside_canvas(&layout, rel);
        assert_eq!(layout, layout_fixture(&path), "{rel}: layout is not deterministic");
    }
}

#[test]
fn linear_chain_takes_one_rank_per_node() {
    let layout = lay_out(&chain(&["A", "B", "C"]));
    let (a, b, c) = (center(&layout, "A"), center(&layout, "B"), center(&layout, "C"));
    assert!(a.1 < b.1 && b.1 < c.1, "{a:?} {b:?} {c:?}");
    for (upper, lower) in [("A", "B"), ("B", "C")] {
        let upper = layout.node(upper).unwrap();
        let lower = layout.node(lower).unwrap();
        assert!(upper.y + upper.height <= lower.y);
    }
    assert!(layout.edges.iter().all(|edge| edge.route == RouteKind::Straight));
}

#[test]
fn converging_sources_share_a_rank_and_flank_the_target() {
    let mut graph = Graph::new(DiagramKind::Flowchart);
    graph.connect("A", "B");
    graph.connect("C", "B");
    let layout = lay_out(&graph);
    let config = LayoutConfig::default();

    let a = layout.node("A").unwrap();
    let b = layout.node("B").unwrap();
    let c = layout.node("C").unwrap();
    assert!((a.center().1 - c.center().1).abs() < EPS);
    assert!(b.center().1 > a.center().1);
    let gap = (c.center().0 - a.center().0).abs();
    assert!(gap + EPS >= config.node_spacing + (a.width + c.width) / 2.0);
    let (left, right) = if a.center().0 < c.center().0 { (a, c) } else { (c, a) };
    assert!(b.center().0 >= left.center().0 - EPS && b.center().0 <= right.center().0 + EPS);
}

#[test]
fn two_cycle_lays_out_with_a_curved_back_edge() {
    let mut graph = Graph::new(DiagramKind::Flowchart);
    graph.connect("A", "B");
    graph.connect("B", "A");
    let layout = lay_out(&graph);

    let a = center(&layout, "A");
    let b = center(&layout, "B");
    assert!(a.1 < b.1);
    let forward = &layout.edges[0];
    let back = &layout.edges[1];
    assert_eq!((forward.from.as_str(), forward.to.as_str()), ("A", "B"));
    assert_eq!(back.route, RouteKind::BackEdge);
    assert!(back.points.len() > 2);
    assert!(forward.points.first().unwrap().1 < forward.points.last().unwrap().1);
}

#[test]
fn concurrent_regions_stack_inside_their_composite() {
    let mut region_a = Graph::new(DiagramKind::State);
    region_a.connect("numOff", "numOn");
    let mut region_b = Graph::new(DiagramKind::State);
    region_b.connect("capsOff", "capsOn");

    let mut graph = Graph::new(DiagramKind::State);
    graph.connect("idle", "Active");
    graph.composites.push(CompositeState {
        id: "Active".into(),
        inner: Graph::new(DiagramKind::State),
        regions: vec![region_a, region_b],
    });
    let layout = lay_out(&graph);
    let config = LayoutConfig::default();

    let active = layout.node("Active").unwrap();
    let regions: Vec<_> = layout.regions.iter().filter(|r| r.composite == "Active").collect();
    assert_eq!(regions.len(), 2);
    let (first, second) = (regions[0], regions[1]);
    assert!(
        (second.y - (first.y + first.height) - config.state.region_separator_pad).abs() < EPS,
        "{first:?} {second:?}"
    );
    for region in &regions {
        assert!(region.x >= active.x - EPS && region.y >= active.y - EPS);
        assert!(region.x + region.width <= active.x + active.width + EPS);
        assert!(region.y + region.height <= active.y + active.height + EPS);
    }
    for id in ["numOff", "numOn"] {
        let node = layout.node(id).unwrap();
        assert!(node.y >= first.y - EPS && node.y + node.height <= first.y + first.height + EPS);
    }
    for id in ["capsOff", "capsOn"] {
        let node = layout.node(id).unwrap();
        assert!(node.y >= second.y - EPS && node.y + node.height <= second.y + second.height + EPS);
    }
}

fn dense_dag() -> Graph {
    let mut graph = Graph::new(DiagramKind::Flowchart);
    let edges = [
        ("a", "d"),
        ("a", "e"),
        ("b", "d"),
        ("c", "f"),
        ("b", "f"),
        ("d", "g"),
        ("e", "h"),
        ("f", "g"),
        ("c", "h"),
        ("a", "g"),
        ("g", "i"),
        ("h", "i"),
    ];
    for (from, to) in edges {
        graph.connect(from, to);
    }
    graph
}

#[test]
fn nodes_on_one_rank_keep_their_spacing() {
    let config = LayoutConfig::default();
    let layout = lay_out(&dense_dag());
    let nodes: Vec<_> = layout.nodes.values().collect();
    for (i, first) in nodes.iter().enumerate() {
        for second in &nodes[i + 1..] {
            let (fc, sc) = (first.center(), second.center());
            if (fc.1 - sc.1).abs() > EPS {
                continue;
            }
            let needed = config.node_spacing + (first.width + second.width) / 2.0;
            assert!(
                (fc.0 - sc.0).abs() + EPS >= needed,
                "{} and {} are too close",
                first.id,
                second.id
            );
        }
    }
}

#[test]
fn every_edge_of_a_dag_points_down() {
    let graph = dense_dag();
    let layout = lay_out(&graph);
    for edge in &graph.edges {
        let from = center(&layout, &edge.from);
        let to = center(&layout, &edge.to);
        assert!(to.1 > from.1, "{} -> {}", edge.from, edge.to);
    }
}

#[test]
fn repeated_calls_are_identical() {
    let mut graph = dense_dag();
    graph.connect("i", "a");
    graph.connect("e", "e");
    graph.add_subgraph("left", "Left side", &["a", "d"]);
    let first = lay_out(&graph);
    for _ in 0..5 {
        assert_eq!(lay_out(&graph), first);
    }
}

#[test]
fn left_right_mirrors_top_down() {
    let square = |_: &str, _: &FontSpec| TextSize {
        width: 24.0,
        height: 24.0,
    };
    let config = LayoutConfig {
        node_padding_x: 10.0,
        node_padding_y: 10.0,
        ..LayoutConfig::default()
    };
    let down = dense_dag();
    let across = dense_dag().with_direction(Direction::LeftRight);
    let down = compute_layout(&down, &config, &square).unwrap();
    let across = compute_layout(&across, &config, &square).unwrap();

    let origin = |layout: &Layout| {
        layout.nodes.values().fold((f32::MAX, f32::MAX), |acc, node| {
            (acc.0.min(node.x), acc.1.min(node.y))
        })
    };
    let (dx, dy) = origin(&down);
    let (ax, ay) = origin(&across);
    for (id, node) in &down.nodes {
        let other = across.node(id).unwrap();
        assert!((node.x - dx - (other.y - ay)).abs() < 0.01, "{id}: x vs y");
        assert!((node.y - dy - (other.x - ax)).abs() < 0.01, "{id}: y vs x");
    }
}

#[test]
fn empty_graph_yields_zero_canvas() {
    for kind in [DiagramKind::Flowchart, DiagramKind::Pie, DiagramKind::Sequence] {
        let layout = lay_out(&Graph::new(kind));
        assert_eq!((layout.width, layout.height), (0.0, 0.0));
        assert!(layout.nodes.is_empty() && layout.edges.is_empty());
    }
}

#[test]
fn dangling_references_are_rejected() {
    let mut graph = Graph::new(DiagramKind::Flowchart);
    graph.add_node(Node::new("A", "A"));
    graph.edges.push(mermaid_rs_layout::Edge::new("A", "ghost"));
    let err = compute_layout(&graph, &LayoutConfig::default(), &fixed_sizer).unwrap_err();
    assert!(err.is_reference_error());
    assert!(err.to_string().contains("ghost"));

    let mut graph = Graph::new(DiagramKind::Flowchart);
    graph.add_node(Node::new("A", "A"));
    graph.add_subgraph("box", "Box", &["A", "nobody"]);
    let err = compute_layout(&graph, &LayoutConfig::default(), &fixed_sizer).unwrap_err();
    assert!(err.is_reference_error());
}

#[test]
fn non_positive_spacing_still_lays_out() {
    let config = LayoutConfig {
        node_spacing: 0.0,
        rank_spacing: -20.0,
        node_padding_x: -1.0,
        ..LayoutConfig::default()
    };
    let layout = compute_layout(&dense_dag(), &config, &fixed_sizer).unwrap();
    assert_eq!(layout.nodes.len(), 9);
    let a = layout.node("a").unwrap();
    let d = layout.node("d").unwrap();
    assert!(d.y >= a.y + a.height - EPS);
}

#[test]
fn a_single_ordering_pass_is_enough_to_finish() {
    let mut config = LayoutConfig::default();
    config.flowchart.order_passes = 1;
    let layout = compute_layout(&dense_dag(), &config, &fixed_sizer).unwrap();
    assert_eq!(layout.nodes.len(), 9);
}

#[test]
fn self_loops_stay_beside_their_node() {
    let mut graph = chain(&["A", "B"]);
    graph.connect("B", "B");
    let layout = lay_out(&graph);
    let edge = layout.edges.iter().find(|e| e.from == "B" && e.to == "B").unwrap();
    assert_eq!(edge.route, RouteKind::SelfLoop);
    let b = layout.node("B").unwrap();
    assert!(edge.points.iter().any(|(x, _)| *x > b.x + b.width));
}

#[test]
fn subgraph_boxes_contain_their_members() {
    let mut graph = chain(&["A", "B", "C", "D"]);
    graph.add_subgraph("middle", "Middle", &["B", "C"]);
    let layout = lay_out(&graph);
    let sub = layout.subgraph("middle").unwrap();
    for id in ["B", "C"] {
        let node = layout.node(id).unwrap();
        assert!(node.x >= sub.x - EPS && node.y >= sub.y - EPS);
        assert!(node.x + node.width <= sub.x + sub.width + EPS);
        assert!(node.y + node.height <= sub.y + sub.height + EPS);
    }
    let middle = (sub.x + sub.width / 2.0, sub.y + sub.height / 2.0);
    for id in ["A", "D"] {
        assert!(!layout.node(id).unwrap().contains(middle));
    }
}

#[test]
fn axis_and_radial_kinds_fill_their_diagram_data() {
    let mut pie = Graph::new(DiagramKind::Pie);
    pie.add_node(Node::new("x", "X").with_value(3.0));
    pie.add_node(Node::new("y", "Y").with_value(1.0));
    let layout = lay_out(&pie);
    let DiagramData::Pie { slices, center, radius, .. } = &layout.diagram else {
        panic!("expected pie data");
    };
    assert_eq!(slices.len(), 2);
    assert!(center.0 - radius >= -EPS && center.1 - radius >= -EPS);

    let mut seq = Graph::new(DiagramKind::Sequence);
    seq.connect("A", "B");
    let layout = lay_out(&seq);
    assert!(matches!(&layout.diagram, DiagramData::Sequence { lifelines } if lifelines.len() == 2));
}

#[test]
fn reversed_directions_run_against_the_axis() {
    let up = lay_out(&chain(&["A", "B", "C"]).with_direction(Direction::BottomTop));
    let (a, b, c) = (center(&up, "A"), center(&up, "B"), center(&up, "C"));
    assert!(a.1 > b.1 && b.1 > c.1, "{a:?} {b:?} {c:?}");
    assert_inside_canvas(&up, "bottom-top chain");

    let left = lay_out(&chain(&["A", "B"]).with_direction(Direction::RightLeft));
    let edge = left.edge("A", "B").unwrap();
    assert!(edge.points.last().unwrap().0 < edge.points.first().unwrap().0);
    assert!(center(&left, "B").0 < center(&left, "A").0);
    assert_inside_canvas(&left, "right-left chain");
}

#[test]
fn horizontal_composites_place_regions_side_by_side() {
    let mut region_a = Graph::new(DiagramKind::State);
    region_a.connect("numOff", "numOn");
    let mut region_b = Graph::new(DiagramKind::State);
    region_b.connect("capsOff", "capsOn");

    let mut graph = Graph::new(DiagramKind::State);
    graph.connect("idle", "Active");
    graph.composites.push(CompositeState {
        id: "Active".into(),
        inner: Graph::new(DiagramKind::State).with_direction(Direction::LeftRight),
        regions: vec![region_a, region_b],
    });
    let layout = lay_out(&graph);
    let config = LayoutConfig::default();

    let active = layout.node("Active").unwrap();
    let regions: Vec<_> = layout.regions.iter().filter(|r| r.composite == "Active").collect();
    assert_eq!(regions.len(), 2);
    let (first, second) = (regions[0], regions[1]);
    assert!((first.y - second.y).abs() < EPS, "{first:?} {second:?}");
    assert!(
        (second.x - (first.x + first.width) - config.state.region_separator_pad).abs() < EPS,
        "{first:?} {second:?}"
    );
    for region in &regions {
        assert!(region.x >= active.x - EPS && region.y >= active.y - EPS);
        assert!(region.x + region.width <= active.x + active.width + EPS);
        assert!(region.y + region.height <= active.y + active.height + EPS);
    }
    for id in ["capsOff", "capsOn"] {
        let node = layout.node(id).unwrap();
        assert!(node.x >= second.x - EPS && node.x + node.width <= second.x + second.width + EPS);
    }
}

#[test]
fn port_sides_order_sibling_services() {
    let ported = |bias: f32| {
        let mut graph = Graph::new(DiagramKind::Architecture);
        graph.connect("gateway", "billing").from_port = Some(PortSide::Right);
        graph.connect("gateway", "auth").from_port = Some(PortSide::Left);
        let mut config = LayoutConfig::default();
        config.flowchart.port_side_bias = bias;
        compute_layout(&graph, &config, &fixed_sizer).unwrap()
    };

    let biased = ported(1.0);
    assert!(center(&biased, "auth").0 < center(&biased, "billing").0);

    let declared = ported(0.0);
    assert!(center(&declared, "billing").0 < center(&declared, "auth").0);
}
