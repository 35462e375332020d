use std::collections::HashMap;

use super::position::apply_direction;
use super::routing::{RouteInput, boundary_point, edge_along, route_edge};
use super::*;
use crate::ir::NodeShape;

/// Commits advance one `commit_step` per declaration along the main axis;
/// each branch owns a lane across it. Lanes are branches in declaration
/// order, and a commit no branch lists sits on the first lane.
pub(super) fn compute_gitgraph_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let git = &config.gitgraph;
    let direction = graph.direction;
    let diameter = git.commit_radius * 2.0;

    let mut lane_of: HashMap<&str, usize> = HashMap::new();
    for (lane, sub) in graph.subgraphs.iter().enumerate() {
        for member in &sub.members {
            lane_of.entry(member.as_str()).or_insert(lane);
        }
    }

    let labels: Vec<TextBlock> = graph
        .nodes
        .iter()
        .map(|node| measurer.block(&node.label))
        .collect();
    // Commit labels sit beside the dot on the cross axis; keep them clear of
    // the next lane.
    let label_extent = labels
        .iter()
        .map(|label| {
            if direction.is_horizontal() {
                label.height
            } else {
                label.width
            }
        })
        .fold(0.0f32, f32::max);
    let lane_step = git.branch_spacing.max(diameter + git.label_gap + label_extent);

    let mut canonical: HashMap<&str, (f32, f32)> = HashMap::new();
    let mut lane_ends: Vec<Option<((f32, f32), (f32, f32))>> =
        vec![None; graph.subgraphs.len().max(1)];
    let mut nodes = BTreeMap::new();
    for (idx, (node, label)) in graph.nodes.iter().zip(labels).enumerate() {
        let lane = lane_of.get(node.id.as_str()).copied().unwrap_or(0);
        let center = (lane as f32 * lane_step, idx as f32 * git.commit_step);
        canonical.insert(node.id.as_str(), center);
        let placed = apply_direction(center, direction);
        lane_ends[lane] = Some(match lane_ends[lane] {
            Some((start, _)) => (start, placed),
            None => (placed, placed),
        });
        let mut commit = node_box(node, label, placed, (diameter, diameter));
        commit.shape = NodeShape::Circle;
        nodes.insert(node.id.clone(), commit);
    }

    let mut edges = Vec::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        let (Some(from), Some(to)) = (nodes.get(&edge.from), nodes.get(&edge.to)) else {
            continue;
        };
        let label = edge_label(edge, measurer);
        if edge.from == edge.to {
            edges.push(route_edge(
                RouteInput {
                    edge,
                    from,
                    to,
                    interior: Vec::new(),
                    back_edge: false,
                    offset: 0.0,
                    label,
                },
                direction,
                config,
            ));
            continue;
        }
        let (Some(&(ca, ma)), Some(&(cb, mb))) =
            (canonical.get(edge.from.as_str()), canonical.get(edge.to.as_str()))
        else {
            continue;
        };
        let path = branch_path((ca, ma), (cb, mb));
        let mut points: Vec<(f32, f32)> = path
            .iter()
            .map(|point| apply_direction(*point, direction))
            .collect();
        let last = points.len() - 1;
        points[0] = boundary_point(from, points[1]);
        points[last] = boundary_point(to, points[last - 1]);
        let route = if points.len() > 2 {
            RouteKind::Polyline
        } else {
            RouteKind::Straight
        };
        edges.push(edge_along(edge, points, route, label, config));
    }

    let lanes = lane_ends
        .iter()
        .enumerate()
        .filter_map(|(lane, ends)| {
            let (start, end) = (*ends)?;
            let branch = graph
                .subgraphs
                .get(lane)
                .map_or_else(|| git.main_branch_name.clone(), |sub| sub.id.clone());
            Some(GitLane { branch, start, end })
        })
        .collect();

    Layout {
        kind: graph.kind,
        direction,
        nodes,
        edges,
        subgraphs: Vec::new(),
        regions: Vec::new(),
        diagram: DiagramData::GitGraph { lanes },
        width: 0.0,
        height: 0.0,
    }
}

/// Canonical `(cross, main)` path between two commits. Branching out turns
/// at the parent's position, merging back turns at the child's.
fn branch_path(from: (f32, f32), to: (f32, f32)) -> Vec<(f32, f32)> {
    let ((ca, ma), (cb, mb)) = (from, to);
    if (ca - cb).abs() < f32::EPSILON {
        vec![from, to]
    } else if cb > ca {
        vec![from, (cb, ma), to]
    } else {
        vec![from, (ca, mb), to]
    }
}
