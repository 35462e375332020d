use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::ir::{CompositeState, DiagramKind, Direction, Edge, Graph, Node, NodeShape};

use super::acyclic::{AcyclicEdges, break_cycles};
use super::normalize::{LayeredGraph, expand_chains};
use super::ordering::{EdgePorts, OrderOptions, order_layers};
use super::position::{AxisSize, PositionOptions, apply_direction, assign_coordinates};
use super::ranking::assign_ranks;
use super::routing::{RouteInput, route_edge};
use super::scopes::{ScopeItem, ScopeRecord, ScopeTree, build_scopes};
use super::text::LabelMeasurer;
use super::{
    EdgeLayout, Layout, LayoutError, NodeLayout, RegionLayout, SubgraphLayout, TextBlock, edge_label,
};

/// Cross-axis spread between fanned-out parallel edges, relative to node spacing.
const PARALLEL_GAP_RATIO: f32 = 0.4;
/// Edges of nested graphs keep their merge order after the enclosing graph's edges.
const NESTED_EDGE: usize = usize::MAX;

/// Laid-out content of one scope or nested graph.
///
/// `edge_keys` runs parallel to `layout.edges` and holds the source edge index
/// so the final edge list follows declaration order.
struct Fragment {
    layout: Layout,
    edge_keys: Vec<usize>,
}

impl Fragment {
    fn new(kind: DiagramKind, direction: Direction) -> Self {
        Self {
            layout: Layout::empty(kind, direction),
            edge_keys: Vec::new(),
        }
    }

    fn size(&self) -> (f32, f32) {
        (self.layout.width, self.layout.height)
    }

    fn push_edge(&mut self, key: usize, edge: EdgeLayout) {
        self.edge_keys.push(key);
        self.layout.edges.push(edge);
    }

    /// Move `other` by `(dx, dy)` and take ownership of its geometry.
    fn absorb(&mut self, mut other: Fragment, dx: f32, dy: f32) {
        other.layout.translate(dx, dy);
        self.layout.nodes.append(&mut other.layout.nodes);
        self.layout.edges.append(&mut other.layout.edges);
        self.edge_keys.append(&mut other.edge_keys);
        self.layout.subgraphs.append(&mut other.layout.subgraphs);
        self.layout.regions.append(&mut other.layout.regions);
    }

    /// Translate so the content starts at the origin and record its extent.
    fn normalize(&mut self) {
        let bounds = self.layout.content_bounds();
        if bounds.is_empty() {
            self.layout.width = 0.0;
            self.layout.height = 0.0;
            return;
        }
        self.layout.translate(-bounds.min_x, -bounds.min_y);
        self.layout.width = bounds.max_x - bounds.min_x;
        self.layout.height = bounds.max_y - bounds.min_y;
    }

    /// Order edges by source index, then mark them as belonging to a nested graph.
    fn seal(&mut self) {
        self.sort_edges();
        self.edge_keys.iter_mut().for_each(|key| *key = NESTED_EDGE);
    }

    fn sort_edges(&mut self) {
        let mut keyed: Vec<(usize, EdgeLayout)> = self
            .edge_keys
            .drain(..)
            .zip(self.layout.edges.drain(..))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        for (key, edge) in keyed {
            self.edge_keys.push(key);
            self.layout.edges.push(edge);
        }
    }

    /// Box of a node or subgraph already placed in this fragment.
    fn endpoint(&self, id: &str) -> Option<NodeLayout> {
        if let Some(node) = self.layout.nodes.get(id) {
            return Some(node.clone());
        }
        self.layout
            .subgraphs
            .iter()
            .find(|sub| sub.id == id)
            .map(|sub| NodeLayout {
                id: sub.id.clone(),
                x: sub.x,
                y: sub.y,
                width: sub.width,
                height: sub.height,
                label: sub.label.clone(),
                shape: NodeShape::Rectangle,
                icon: None,
            })
    }
}

pub(super) fn compute_layered_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Result<Layout, LayoutError> {
    let mut fragment = layout_graph(graph, config, measurer)?;
    fragment.sort_edges();
    let mut layout = fragment.layout;
    layout.kind = graph.kind;
    layout.direction = graph.direction;
    Ok(layout)
}

fn layout_graph(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Result<Fragment, LayoutError> {
    let tree = build_scopes(graph)?;
    let composites: HashMap<&str, &CompositeState> = graph
        .composites
        .iter()
        .map(|composite| (composite.id.as_str(), composite))
        .collect();
    let ctx = GraphContext {
        graph,
        config,
        measurer,
        tree: &tree,
        composites,
    };
    let mut fragment = ctx.layout_scope(0)?;
    fragment.normalize();
    Ok(fragment)
}

struct GraphContext<'a, 'm> {
    graph: &'a Graph,
    config: &'a LayoutConfig,
    measurer: &'a LabelMeasurer<'m>,
    tree: &'a ScopeTree,
    composites: HashMap<&'a str, &'a CompositeState>,
}

impl GraphContext<'_, '_> {
    /// Lay out one scope: nested items first, then rank, order and place
    /// them as fixed-size boxes, then route the scope's own edges.
    fn layout_scope(&self, scope: usize) -> Result<Fragment, LayoutError> {
        let record = &self.tree.scopes[scope];
        let direction = record.direction;

        let mut items = Vec::with_capacity(record.items.len());
        for item in &record.items {
            let fragment = match *item {
                ScopeItem::Node(node) => self.node_fragment(&self.graph.nodes[node], direction)?,
                ScopeItem::Scope(child) => self.subgraph_fragment(child)?,
            };
            items.push(fragment);
        }
        let sizes: Vec<(f32, f32)> = items.iter().map(Fragment::size).collect();

        let pairs: Vec<(usize, usize)> = record.edges.iter().map(|e| (e.from, e.to)).collect();
        let acyclic = break_cycles(items.len(), &pairs);
        let oriented = acyclic.oriented(&pairs);
        let ranking = assign_ranks(items.len(), &oriented);
        let layered = expand_chains(&ranking.ranks, ranking.rank_count, &oriented);
        let ports = self.edge_ports(record, &acyclic);
        let ordering = order_layers(
            &layered,
            &ports,
            OrderOptions {
                passes: self.config.flowchart.order_passes,
                transpose_sweeps: self.config.flowchart.transpose_sweeps,
                port_side_bias: self.config.flowchart.port_side_bias,
            },
        );
        tracing::debug!(
            scope,
            items = items.len(),
            reversed = acyclic.reversed_count(),
            ranks = ranking.rank_count,
            components = ranking.components,
            dummies = layered.dummy_count(),
            crossings_before = ordering.initial_crossings,
            crossings_after = ordering.crossings,
            passes = ordering.passes_run,
            cap_reached = ordering.cap_reached,
            "layered scope"
        );

        let mut axis_sizes = vec![AxisSize::default(); layered.vertex_count()];
        for (idx, (width, height)) in sizes.iter().enumerate() {
            axis_sizes[idx] = AxisSize::for_direction(*width, *height, direction);
        }
        let centers: Vec<(f32, f32)> = assign_coordinates(
            &layered,
            &ordering.layers,
            &axis_sizes,
            PositionOptions {
                node_spacing: self.config.node_spacing,
                rank_spacing: self.config.rank_spacing,
                smoothing_passes: self.config.flowchart.smoothing_passes,
            },
        )
        .into_iter()
        .map(|center| apply_direction(center, direction))
        .collect();

        let mut fragment = Fragment::new(self.graph.kind, direction);
        for (idx, item) in items.into_iter().enumerate() {
            let (cx, cy) = centers[idx];
            let (width, height) = sizes[idx];
            fragment.absorb(item, cx - width / 2.0, cy - height / 2.0);
        }

        self.route_scope_edges(record, &acyclic, &layered, &centers, &mut fragment)?;
        Ok(fragment)
    }

    /// Port sides only count when the lifted item is the endpoint itself.
    fn edge_ports(&self, record: &ScopeRecord, acyclic: &AcyclicEdges) -> Vec<EdgePorts> {
        record
            .edges
            .iter()
            .enumerate()
            .map(|(idx, lifted)| {
                let edge = &self.graph.edges[lifted.edge];
                let from_port = edge
                    .from_port
                    .filter(|_| self.item_is(record.items[lifted.from], &edge.from));
                let to_port = edge
                    .to_port
                    .filter(|_| self.item_is(record.items[lifted.to], &edge.to));
                if acyclic.reversed[idx] {
                    EdgePorts {
                        upper: to_port,
                        lower: from_port,
                    }
                } else {
                    EdgePorts {
                        upper: from_port,
                        lower: to_port,
                    }
                }
            })
            .collect()
    }

    fn item_is(&self, item: ScopeItem, id: &str) -> bool {
        match item {
            ScopeItem::Node(node) => self.graph.nodes[node].id == id,
            ScopeItem::Scope(scope) => self.tree.scopes[scope]
                .subgraph
                .is_some_and(|sub| self.graph.subgraphs[sub].id == id),
        }
    }

    fn route_scope_edges(
        &self,
        record: &ScopeRecord,
        acyclic: &AcyclicEdges,
        layered: &LayeredGraph,
        centers: &[(f32, f32)],
        fragment: &mut Fragment,
    ) -> Result<(), LayoutError> {
        let mut chain_of: Vec<Option<&[usize]>> = vec![None; record.edges.len()];
        for chain in &layered.chains {
            chain_of[chain.edge] = Some(chain.vertices.as_slice());
        }
        let offsets = parallel_offsets(
            record,
            &self.graph.edges,
            acyclic,
            self.config.node_spacing * PARALLEL_GAP_RATIO,
        );

        for (idx, lifted) in record.edges.iter().enumerate() {
            let edge = &self.graph.edges[lifted.edge];
            let missing = |id: &str| LayoutError::UnknownEdgeEndpoint {
                from: edge.from.clone(),
                to: edge.to.clone(),
                missing: id.to_string(),
            };
            let from = fragment.endpoint(&edge.from).ok_or_else(|| missing(&edge.from))?;
            let to = fragment.endpoint(&edge.to).ok_or_else(|| missing(&edge.to))?;

            let mut interior: Vec<(f32, f32)> = chain_of[idx]
                .map(|vertices| {
                    vertices[1..vertices.len() - 1]
                        .iter()
                        .map(|vertex| centers[*vertex])
                        .collect()
                })
                .unwrap_or_default();
            if acyclic.reversed[idx] {
                interior.reverse();
            }

            let label = edge_label(edge, self.measurer);
            let routed = route_edge(
                RouteInput {
                    edge,
                    from: &from,
                    to: &to,
                    interior,
                    back_edge: acyclic.reversed[idx],
                    offset: offsets[idx],
                    label,
                },
                record.direction,
                self.config,
            );
            fragment.push_edge(lifted.edge, routed);
        }
        Ok(())
    }

    fn node_fragment(&self, node: &Node, direction: Direction) -> Result<Fragment, LayoutError> {
        if let Some(composite) = self.composites.get(node.id.as_str()) {
            return self.composite_fragment(node, composite);
        }
        let label = if node.shape.is_marker() {
            TextBlock::empty()
        } else {
            self.measurer.block(&node.label)
        };
        let (width, height) = shape_size(node.shape, &label, direction, self.config);
        let mut fragment = Fragment::new(self.graph.kind, direction);
        fragment.layout.nodes.insert(
            node.id.clone(),
            NodeLayout {
                id: node.id.clone(),
                x: 0.0,
                y: 0.0,
                width,
                height,
                label,
                shape: node.shape,
                icon: node.icon.clone(),
            },
        );
        fragment.layout.width = width;
        fragment.layout.height = height;
        Ok(fragment)
    }

    /// A subgraph box: padded content under a label band.
    fn subgraph_fragment(&self, scope: usize) -> Result<Fragment, LayoutError> {
        let record = &self.tree.scopes[scope];
        let mut inner = self.layout_scope(scope)?;
        inner.normalize();
        let Some(sub) = record.subgraph.map(|idx| &self.graph.subgraphs[idx]) else {
            return Ok(inner);
        };

        let padding = self.config.subgraph.padding;
        let label = self.measurer.block(&sub.label);
        let (label_height, band) = if label.is_blank() {
            (0.0, 0.0)
        } else {
            (label.height, label.height + self.config.subgraph.label_gap)
        };
        let (inner_width, inner_height) = inner.size();
        let width = inner_width.max(label.width) + padding * 2.0;
        let height = inner_height + band + padding * 2.0;

        let mut fragment = Fragment::new(self.graph.kind, record.direction);
        fragment.layout.subgraphs.push(SubgraphLayout {
            id: sub.id.clone(),
            label_anchor: (width / 2.0, padding + label_height / 2.0),
            label,
            members: sub.members.clone(),
            x: 0.0,
            y: 0.0,
            width,
            height,
        });
        fragment.absorb(inner, (width - inner_width) / 2.0, padding + band);
        fragment.layout.width = width;
        fragment.layout.height = height;
        Ok(fragment)
    }

    /// A composite state: a header with the state label above its regions,
    /// which are stacked along the composite's own direction.
    fn composite_fragment(&self, node: &Node, composite: &CompositeState) -> Result<Fragment, LayoutError> {
        let state = &self.config.state;
        let mut graphs: Vec<&Graph> = Vec::with_capacity(composite.regions.len() + 1);
        if !composite.inner.is_empty() || composite.regions.is_empty() {
            graphs.push(&composite.inner);
        }
        graphs.extend(composite.regions.iter());

        let mut regions = Vec::with_capacity(graphs.len());
        for region_graph in graphs {
            let mut region = layout_graph(region_graph, self.config, self.measurer)?;
            region.seal();
            regions.push(region);
        }

        let stack_vertical = !composite.inner.direction.is_horizontal();
        let pad = state.region_padding;
        let gap = state.region_separator_pad;
        let boxes: Vec<(f32, f32)> = regions
            .iter()
            .map(|region| {
                let (width, height) = region.size();
                (width + pad * 2.0, height + pad * 2.0)
            })
            .collect();
        let gaps = gap * boxes.len().saturating_sub(1) as f32;
        let (stack_width, stack_height) = if stack_vertical {
            (
                boxes.iter().map(|b| b.0).fold(0.0f32, f32::max),
                boxes.iter().map(|b| b.1).sum::<f32>() + gaps,
            )
        } else {
            (
                boxes.iter().map(|b| b.0).sum::<f32>() + gaps,
                boxes.iter().map(|b| b.1).fold(0.0f32, f32::max),
            )
        };

        let label = self.measurer.block(&node.label);
        let header = label.height + state.header_gap * 2.0;
        let width = (stack_width + pad * 2.0).max(label.width + self.config.node_padding_x * 2.0);
        let height = header + stack_height + pad;
        let stack_x = (width - stack_width) / 2.0;

        let mut fragment = Fragment::new(self.graph.kind, composite.inner.direction);
        fragment.layout.nodes.insert(
            node.id.clone(),
            NodeLayout {
                id: node.id.clone(),
                x: 0.0,
                y: 0.0,
                width,
                height,
                label,
                shape: node.shape,
                icon: node.icon.clone(),
            },
        );

        let mut cursor = 0.0f32;
        for (index, (region, (box_width, box_height))) in regions.into_iter().zip(boxes).enumerate() {
            let (region_width, region_height) = if stack_vertical {
                (stack_width, box_height)
            } else {
                (box_width, stack_height)
            };
            let (x, y) = if stack_vertical {
                (stack_x, header + cursor)
            } else {
                (stack_x + cursor, header)
            };
            fragment.layout.regions.push(RegionLayout {
                composite: node.id.clone(),
                index,
                x,
                y,
                width: region_width,
                height: region_height,
            });
            let (content_width, content_height) = region.size();
            fragment.absorb(
                region,
                x + (region_width - content_width) / 2.0,
                y + (region_height - content_height) / 2.0,
            );
            cursor += if stack_vertical { region_height } else { region_width } + gap;
        }

        fragment.layout.width = width;
        fragment.layout.height = height;
        Ok(fragment)
    }
}

/// Cross offsets for edges joining the same pair of endpoints, and for lone
/// reversed edges so they detour instead of overlapping a forward edge.
/// Edges lifted onto the same pair of items but ending on different members
/// are not parallel.
fn parallel_offsets(record: &ScopeRecord, edges: &[Edge], acyclic: &AcyclicEdges, gap: f32) -> Vec<f32> {
    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (idx, lifted) in record.edges.iter().enumerate() {
        let edge = &edges[lifted.edge];
        if lifted.from == lifted.to || edge.from == edge.to {
            continue;
        }
        let (from, to) = (edge.from.as_str(), edge.to.as_str());
        groups.entry((from.min(to), from.max(to))).or_default().push(idx);
    }

    let mut offsets = vec![0.0f32; record.edges.len()];
    for members in groups.values() {
        let count = members.len();
        for (k, &idx) in members.iter().enumerate() {
            let mut offset = (k as f32 - (count as f32 - 1.0) / 2.0) * gap;
            if offset == 0.0 && acyclic.reversed[idx] {
                offset = gap;
            }
            // Offsets are measured against the group's canonical orientation.
            let edge = &edges[record.edges[idx].edge];
            if edge.from > edge.to {
                offset = -offset;
            }
            offsets[idx] = offset;
        }
    }
    offsets
}

fn shape_padding_factors(shape: NodeShape) -> (f32, f32) {
    match shape {
        NodeShape::Stadium => (0.43, 0.5),
        NodeShape::Subroutine => (0.54, 0.5),
        NodeShape::Parallelogram => (0.894, 0.5),
        NodeShape::ParallelogramAlt => (0.904, 0.5),
        NodeShape::Text => (0.0, 0.0),
        _ => (1.0, 1.0),
    }
}

/// Box size for a node shape around its label. Markers ignore the label.
pub(super) fn shape_size(
    shape: NodeShape,
    label: &TextBlock,
    direction: Direction,
    config: &LayoutConfig,
) -> (f32, f32) {
    let state = &config.state;
    match shape {
        NodeShape::StateStart | NodeShape::StateEnd => {
            return (state.marker_size, state.marker_size);
        }
        NodeShape::Choice => return (state.choice_size, state.choice_size),
        NodeShape::ForkJoin => {
            return if direction.is_horizontal() {
                (state.fork_thickness, state.fork_length)
            } else {
                (state.fork_length, state.fork_thickness)
            };
        }
        _ => {}
    }

    let (pad_x_factor, pad_y_factor) = shape_padding_factors(shape);
    let base_width = label.width + config.node_padding_x * pad_x_factor * 2.0;
    let base_height = label.height + config.node_padding_y * pad_y_factor * 2.0;
    let mut width = base_width;
    let mut height = base_height;

    match shape {
        NodeShape::Diamond => {
            // Squares sized off the larger side rather than stretched.
            let size = base_width.max(base_height) * 0.95;
            width = size;
            height = size;
        }
        NodeShape::Circle | NodeShape::DoubleCircle => {
            let size = if label.is_blank() {
                (config.node_padding_y * 1.4).max(14.0)
            } else {
                width.max(height)
            };
            width = size;
            height = size;
        }
        NodeShape::RoundRect => {
            width *= 1.1;
            height *= 1.05;
        }
        NodeShape::Cylinder => {
            width *= 1.1;
            height *= 1.1;
        }
        NodeShape::Hexagon => {
            width *= 1.2;
            height *= 1.1;
        }
        NodeShape::Trapezoid | NodeShape::TrapezoidAlt | NodeShape::Asymmetric => {
            width *= 1.2;
        }
        _ => {}
    }
    (width, height)
}
