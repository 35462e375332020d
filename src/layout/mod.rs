mod acyclic;
mod error;
mod gantt;
mod gitgraph;
mod journey;
mod layered;
mod mindmap;
mod normalize;
mod ordering;
mod pie;
mod position;
mod quadrant;
mod radar;
mod ranking;
mod routing;
mod sankey;
mod scopes;
mod sequence;
mod text;
mod timeline;
mod treemap;
mod types;

pub use error::LayoutError;
pub use text::{CharWidthSizer, FontSpec, LabelSizer, TextSize};
pub(crate) use text::{LabelMeasurer, char_width_factor, fallback_text_width};
pub use types::*;

use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::ir::{DiagramKind, Edge, Graph, Node};

use routing::{RouteInput, route_edge};

/// Lay out `graph` with `config`, measuring labels through `sizer`.
///
/// The call is pure: nothing is cached across calls and identical inputs
/// give identical output. Reference problems in the graph are the only
/// failure; an empty graph yields a zero-size layout.
pub fn compute_layout(
    graph: &Graph,
    config: &LayoutConfig,
    sizer: &dyn LabelSizer,
) -> Result<Layout, LayoutError> {
    let config = config.sanitized();
    error::validate(graph)?;
    if graph.is_empty() {
        return Ok(Layout::empty(graph.kind, graph.direction));
    }

    let measurer = LabelMeasurer::new(
        sizer,
        config.font.clone(),
        config.label_line_height,
        config.max_label_width,
    );
    tracing::debug!(
        kind = ?graph.kind,
        family = ?graph.kind.family(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        subgraphs = graph.subgraphs.len(),
        composites = graph.composites.len(),
        "computing layout"
    );

    let mut layout = match graph.kind {
        DiagramKind::Flowchart
        | DiagramKind::Class
        | DiagramKind::State
        | DiagramKind::Er
        | DiagramKind::Architecture
        | DiagramKind::C4
        | DiagramKind::Block
        | DiagramKind::Requirement => layered::compute_layered_layout(graph, &config, &measurer)?,
        DiagramKind::Sequence => sequence::compute_sequence_layout(graph, &config, &measurer),
        DiagramKind::Journey => journey::compute_journey_layout(graph, &config, &measurer),
        DiagramKind::Timeline => timeline::compute_timeline_layout(graph, &config, &measurer),
        DiagramKind::Gantt => gantt::compute_gantt_layout(graph, &config, &measurer),
        DiagramKind::GitGraph => gitgraph::compute_gitgraph_layout(graph, &config, &measurer),
        DiagramKind::Mindmap => mindmap::compute_mindmap_layout(graph, &config, &measurer),
        DiagramKind::Radar => radar::compute_radar_layout(graph, &config, &measurer),
        DiagramKind::Pie => pie::compute_pie_layout(graph, &config, &measurer),
        DiagramKind::Quadrant => quadrant::compute_quadrant_layout(graph, &config, &measurer),
        DiagramKind::Sankey => sankey::compute_sankey_layout(graph, &config, &measurer),
        DiagramKind::Treemap => treemap::compute_treemap_layout(graph, &config, &measurer),
    };

    finalize_layout(&mut layout, config.canvas_padding);
    Ok(layout)
}

/// Move the content so its top-left corner sits at `padding` and size the
/// canvas to the content plus padding on every side.
fn finalize_layout(layout: &mut Layout, padding: f32) {
    let bounds = layout.content_bounds();
    if bounds.is_empty() {
        layout.width = 0.0;
        layout.height = 0.0;
        return;
    }
    layout.translate(padding - bounds.min_x, padding - bounds.min_y);
    layout.width = bounds.max_x - bounds.min_x + padding * 2.0;
    layout.height = bounds.max_y - bounds.min_y + padding * 2.0;
}

fn node_box(node: &Node, label: TextBlock, center: (f32, f32), size: (f32, f32)) -> NodeLayout {
    NodeLayout {
        id: node.id.clone(),
        x: center.0 - size.0 / 2.0,
        y: center.1 - size.1 / 2.0,
        width: size.0,
        height: size.1,
        label,
        shape: node.shape,
        icon: node.icon.clone(),
    }
}

fn edge_label(edge: &Edge, measurer: &LabelMeasurer<'_>) -> Option<TextBlock> {
    edge.label
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(|text| measurer.block(text))
}

/// Straight connectors between boxes that are already placed, clipped to
/// each box outline. Edges whose endpoints have no box are skipped.
fn straight_edges(
    graph: &Graph,
    nodes: &BTreeMap<String, NodeLayout>,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Vec<EdgeLayout> {
    graph
        .edges
        .iter()
        .filter_map(|edge| {
            let from = nodes.get(&edge.from)?;
            let to = nodes.get(&edge.to)?;
            Some(route_edge(
                RouteInput {
                    edge,
                    from,
                    to,
                    interior: Vec::new(),
                    back_edge: false,
                    offset: 0.0,
                    label: edge_label(edge, measurer),
                },
                graph.direction,
                config,
            ))
        })
        .collect()
}
