use crate::config::LayoutConfig;
use crate::ir::{Direction, Edge, NodeShape};

use super::{ArrowAnchor, EdgeLayout, NodeLayout, RouteKind, TextBlock};

const ROUTING_PAD_MIN_SPACING: f32 = 20.0;
const ROUTING_PAD_RATIO: f32 = 0.6;
const EPS: f32 = 1e-4;

/// Everything the router needs to draw one edge in final coordinates.
pub(super) struct RouteInput<'a> {
    pub edge: &'a Edge,
    pub from: &'a NodeLayout,
    pub to: &'a NodeLayout,
    /// Dummy-chain centers, already in source-to-target order.
    pub interior: Vec<(f32, f32)>,
    pub back_edge: bool,
    /// Cross offset used to separate parallel and reversed short edges.
    pub offset: f32,
    pub label: Option<TextBlock>,
}

pub(super) fn route_edge(input: RouteInput<'_>, direction: Direction, config: &LayoutConfig) -> EdgeLayout {
    let (points, route) = if input.edge.from == input.edge.to {
        (route_self_loop(input.from, direction, config), RouteKind::SelfLoop)
    } else {
        route_between(&input)
    };
    edge_along(input.edge, points, route, input.label, config)
}

/// Finish an edge whose path is already fixed: arrowheads and label anchor.
pub(super) fn edge_along(
    edge: &Edge,
    points: Vec<(f32, f32)>,
    route: RouteKind,
    label: Option<TextBlock>,
    config: &LayoutConfig,
) -> EdgeLayout {
    let label_anchor = label
        .as_ref()
        .and_then(|label| edge_label_anchor(&points, label, config.edge_label_gap));

    let show_end = edge.directed && edge.arrow_end;
    let show_start = edge.arrow_start;
    let arrow_end_anchor = if show_end && points.len() >= 2 {
        Some(arrow_anchor(points[points.len() - 1], points[points.len() - 2], config.arrow_size))
    } else {
        None
    };
    let arrow_start_anchor = if show_start && points.len() >= 2 {
        Some(arrow_anchor(points[0], points[1], config.arrow_size))
    } else {
        None
    };

    EdgeLayout {
        from: edge.from.clone(),
        to: edge.to.clone(),
        label,
        label_anchor,
        points,
        directed: edge.directed,
        arrow_start: show_start,
        arrow_end: show_end,
        arrow_start_anchor,
        arrow_end_anchor,
        style: edge.style,
        route,
    }
}

fn route_between(input: &RouteInput<'_>) -> (Vec<(f32, f32)>, RouteKind) {
    let start_center = input.from.center();
    let end_center = input.to.center();

    let mut raw = Vec::with_capacity(input.interior.len() + 4);
    raw.push(start_center);
    if input.interior.is_empty() && input.offset.abs() > EPS {
        raw.extend(offset_waypoints(start_center, end_center, input.offset));
    } else {
        raw.extend(input.interior.iter().copied());
    }
    raw.push(end_center);

    let route = if input.back_edge {
        RouteKind::BackEdge
    } else if raw.len() > 2 {
        RouteKind::Polyline
    } else {
        RouteKind::Straight
    };

    if raw.len() == 2 {
        let start = boundary_point(input.from, end_center);
        let end = boundary_point(input.to, start_center);
        return (vec![start, end], route);
    }

    let smoothed = smooth_path(&raw);
    (clip_to_nodes(&smoothed, input.from, input.to), route)
}

/// Two points a third of the way in from each end, pushed sideways.
fn offset_waypoints(start: (f32, f32), end: (f32, f32), offset: f32) -> [(f32, f32); 2] {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt().max(EPS);
    let normal = (-dy / len * offset, dx / len * offset);
    [
        (start.0 + dx / 3.0 + normal.0, start.1 + dy / 3.0 + normal.1),
        (
            start.0 + dx * 2.0 / 3.0 + normal.0,
            start.1 + dy * 2.0 / 3.0 + normal.1,
        ),
    ]
}

/// Compress, clamp interior points so neither axis overshoots the next
/// anchor, then cut corners once.
pub(super) fn smooth_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut path = compress_path(points);
    keep_monotonic(&mut path);
    chaikin(&path)
}

/// Interior points may not run past the segment end along the axis in
/// which the whole path travels furthest.
fn keep_monotonic(points: &mut [(f32, f32)]) {
    if points.len() < 3 {
        return;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let horizontal = (last.0 - first.0).abs() > (last.1 - first.1).abs();
    let main = |p: (f32, f32)| if horizontal { p.0 } else { p.1 };
    let sign = if main(last) >= main(first) { 1.0 } else { -1.0 };
    let end = main(last) * sign;
    let mut prev = main(first) * sign;
    let len = points.len();
    for point in points.iter_mut().take(len - 1).skip(1) {
        let value = (main(*point) * sign).clamp(prev, end.max(prev));
        if horizontal {
            point.0 = value * sign;
        } else {
            point.1 = value * sign;
        }
        prev = value;
    }
}

/// One pass of Chaikin corner cutting that keeps both endpoints fixed.
fn chaikin(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let last_segment = points.len() - 2;
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(points[0]);
    for (idx, pair) in points.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if idx > 0 {
            out.push((a.0 * 0.75 + b.0 * 0.25, a.1 * 0.75 + b.1 * 0.25));
        }
        if idx < last_segment {
            out.push((a.0 * 0.25 + b.0 * 0.75, a.1 * 0.25 + b.1 * 0.75));
        }
    }
    out.push(points[points.len() - 1]);
    out
}

/// Replace the center endpoints by boundary points, dropping interior
/// points that fall inside either endpoint's box.
fn clip_to_nodes(points: &[(f32, f32)], from: &NodeLayout, to: &NodeLayout) -> Vec<(f32, f32)> {
    let start_center = points[0];
    let end_center = points[points.len() - 1];
    let mut inner: Vec<(f32, f32)> = points[1..points.len() - 1].to_vec();
    while inner.first().is_some_and(|p| from.contains(*p)) {
        inner.remove(0);
    }
    while inner.last().is_some_and(|p| to.contains(*p)) {
        inner.pop();
    }
    let start = boundary_point(from, inner.first().copied().unwrap_or(end_center));
    let end = boundary_point(to, inner.last().copied().unwrap_or(start_center));
    let mut out = Vec::with_capacity(inner.len() + 2);
    out.push(start);
    out.extend(inner);
    out.push(end);
    compress_path(&out)
}

pub(super) fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if (curr.0 - prev.0).abs() <= EPS && (curr.1 - prev.1).abs() <= EPS {
            continue;
        }
        let next = points[idx + 1];
        let dx1 = curr.0 - prev.0;
        let dy1 = curr.1 - prev.1;
        let dx2 = next.0 - curr.0;
        let dy2 = next.1 - curr.1;
        if (dx1.abs() <= EPS && dx2.abs() <= EPS) || (dy1.abs() <= EPS && dy2.abs() <= EPS) {
            continue;
        }
        out.push(curr);
    }
    let last = points[points.len() - 1];
    let tail = out[out.len() - 1];
    if (last.0 - tail.0).abs() > EPS || (last.1 - tail.1).abs() > EPS || out.len() == 1 {
        out.push(last);
    }
    out
}

pub(super) fn shape_polygon_points(node: &NodeLayout) -> Option<Vec<(f32, f32)>> {
    let x = node.x;
    let y = node.y;
    let w = node.width;
    let h = node.height;
    match node.shape {
        NodeShape::Rectangle
        | NodeShape::Subroutine
        | NodeShape::Cylinder
        | NodeShape::Text
        | NodeShape::ForkJoin => Some(vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]),
        NodeShape::Diamond | NodeShape::Choice => {
            let cx = x + w / 2.0;
            let cy = y + h / 2.0;
            Some(vec![(cx, y), (x + w, cy), (cx, y + h), (x, cy)])
        }
        NodeShape::Hexagon => {
            let x1 = x + w * 0.25;
            let x2 = x + w * 0.75;
            let y_mid = y + h / 2.0;
            Some(vec![
                (x1, y),
                (x2, y),
                (x + w, y_mid),
                (x2, y + h),
                (x1, y + h),
                (x, y_mid),
            ])
        }
        NodeShape::Parallelogram => {
            let offset = w * 0.18;
            Some(vec![
                (x + offset, y),
                (x + w, y),
                (x + w - offset, y + h),
                (x, y + h),
            ])
        }
        NodeShape::ParallelogramAlt => {
            let offset = w * 0.18;
            Some(vec![
                (x, y),
                (x + w - offset, y),
                (x + w, y + h),
                (x + offset, y + h),
            ])
        }
        NodeShape::Trapezoid => {
            let offset = w * 0.18;
            Some(vec![
                (x + offset, y),
                (x + w - offset, y),
                (x + w, y + h),
                (x, y + h),
            ])
        }
        NodeShape::TrapezoidAlt => {
            let offset = w * 0.18;
            Some(vec![
                (x, y),
                (x + w, y),
                (x + w - offset, y + h),
                (x + offset, y + h),
            ])
        }
        NodeShape::Asymmetric => {
            let slant = w * 0.22;
            Some(vec![
                (x, y),
                (x + w - slant, y),
                (x + w, y + h / 2.0),
                (x + w - slant, y + h),
                (x, y + h),
            ])
        }
        NodeShape::RoundRect
        | NodeShape::Stadium
        | NodeShape::Circle
        | NodeShape::DoubleCircle
        | NodeShape::StateStart
        | NodeShape::StateEnd => None,
    }
}

pub(super) fn ray_polygon_intersection(
    origin: (f32, f32),
    dir: (f32, f32),
    poly: &[(f32, f32)],
) -> Option<(f32, f32)> {
    if poly.len() < 2 {
        return None;
    }
    let (ox, oy) = origin;
    let (rx, ry) = dir;
    let mut best_t: Option<f32> = None;
    for i in 0..poly.len() {
        let (x1, y1) = poly[i];
        let (x2, y2) = poly[(i + 1) % poly.len()];
        let sx = x2 - x1;
        let sy = y2 - y1;
        let qx = x1 - ox;
        let qy = y1 - oy;
        let denom = rx * sy - ry * sx;
        if denom.abs() < 1e-6 {
            continue;
        }
        let t = (qx * sy - qy * sx) / denom;
        let u = (qx * ry - qy * rx) / denom;
        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            match best_t {
                Some(best) if t >= best => {}
                _ => best_t = Some(t),
            }
        }
    }
    best_t.map(|t| (ox + rx * t, oy + ry * t))
}

pub(super) fn ray_ellipse_intersection(
    origin: (f32, f32),
    dir: (f32, f32),
    center: (f32, f32),
    rx: f32,
    ry: f32,
) -> Option<(f32, f32)> {
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    let (dx, dy) = dir;
    let ox = origin.0 - center.0;
    let oy = origin.1 - center.1;
    let a = (dx * dx) / (rx * rx) + (dy * dy) / (ry * ry);
    let b = 2.0 * ((ox * dx) / (rx * rx) + (oy * dy) / (ry * ry));
    let c = (ox * ox) / (rx * rx) + (oy * oy) / (ry * ry) - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || a.abs() < 1e-9 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    let t = if t1 >= 0.0 {
        t1
    } else if t2 >= 0.0 {
        t2
    } else {
        return None;
    };
    Some((origin.0 + dx * t, origin.1 + dy * t))
}

fn rect_points(node: &NodeLayout) -> [(f32, f32); 4] {
    [
        (node.x, node.y),
        (node.x + node.width, node.y),
        (node.x + node.width, node.y + node.height),
        (node.x, node.y + node.height),
    ]
}

/// Stadium: a rectangle whose short sides are half circles.
fn ray_stadium_intersection(node: &NodeLayout, origin: (f32, f32), dir: (f32, f32)) -> Option<(f32, f32)> {
    let hit = ray_polygon_intersection(origin, dir, &rect_points(node))?;
    let r = node.width.min(node.height) / 2.0;
    let (cx, cy) = node.center();
    let cap = if node.width >= node.height {
        let left = node.x + r;
        let right = node.x + node.width - r;
        if hit.0 < left {
            Some((left, cy))
        } else if hit.0 > right {
            Some((right, cy))
        } else {
            None
        }
    } else {
        let top = node.y + r;
        let bottom = node.y + node.height - r;
        if hit.1 < top {
            Some((cx, top))
        } else if hit.1 > bottom {
            Some((cx, bottom))
        } else {
            None
        }
    };
    match cap {
        Some(center) => ray_ellipse_intersection(origin, dir, center, r, r).or(Some(hit)),
        None => Some(hit),
    }
}

/// Rounded rectangle: corner hits are moved onto the corner arc.
fn ray_round_rect_intersection(node: &NodeLayout, origin: (f32, f32), dir: (f32, f32)) -> Option<(f32, f32)> {
    let hit = ray_polygon_intersection(origin, dir, &rect_points(node))?;
    let r = (node.width.min(node.height) * 0.15).min(8.0);
    if r <= EPS {
        return Some(hit);
    }
    let cx = if hit.0 < node.x + r {
        node.x + r
    } else if hit.0 > node.x + node.width - r {
        node.x + node.width - r
    } else {
        return Some(hit);
    };
    let cy = if hit.1 < node.y + r {
        node.y + r
    } else if hit.1 > node.y + node.height - r {
        node.y + node.height - r
    } else {
        return Some(hit);
    };
    ray_ellipse_intersection(origin, dir, (cx, cy), r, r).or(Some(hit))
}

/// Where the ray from the node center toward `toward` leaves the node outline.
pub(super) fn boundary_point(node: &NodeLayout, toward: (f32, f32)) -> (f32, f32) {
    let center = node.center();
    let dir = (toward.0 - center.0, toward.1 - center.1);
    if dir.0.abs() <= EPS && dir.1.abs() <= EPS {
        return center;
    }
    let hit = match node.shape {
        NodeShape::Circle | NodeShape::DoubleCircle | NodeShape::StateStart | NodeShape::StateEnd => {
            ray_ellipse_intersection(center, dir, center, node.width / 2.0, node.height / 2.0)
        }
        NodeShape::Stadium => ray_stadium_intersection(node, center, dir),
        NodeShape::RoundRect => ray_round_rect_intersection(node, center, dir),
        _ => shape_polygon_points(node).and_then(|poly| ray_polygon_intersection(center, dir, &poly)),
    };
    hit.or_else(|| ray_polygon_intersection(center, dir, &rect_points(node)))
        .unwrap_or(center)
}

/// Loop leaving the downstream side of `node` and returning on a side
/// face. Reversed directions mirror the loop across the node's center.
pub(super) fn route_self_loop(node: &NodeLayout, direction: Direction, config: &LayoutConfig) -> Vec<(f32, f32)> {
    let mut points = forward_self_loop(node, direction, config);
    if direction.is_reversed() {
        let (cx, cy) = node.center();
        for point in &mut points {
            if direction.is_horizontal() {
                point.0 = 2.0 * cx - point.0;
            } else {
                point.1 = 2.0 * cy - point.1;
            }
        }
    }
    points
}

fn forward_self_loop(node: &NodeLayout, direction: Direction, config: &LayoutConfig) -> Vec<(f32, f32)> {
    let pad = config.node_spacing.max(ROUTING_PAD_MIN_SPACING) * ROUTING_PAD_RATIO;
    if direction.is_horizontal() {
        let start = (node.x + node.width, node.y + node.height / 2.0);
        let p1 = (node.x + node.width + pad, node.y + node.height / 2.0);
        let p2 = (node.x + node.width + pad, node.y - pad);
        let p3 = (node.x + node.width / 2.0, node.y - pad);
        let end = (node.x + node.width / 2.0, node.y);
        vec![start, p1, p2, p3, end]
    } else {
        let start = (node.x + node.width / 2.0, node.y + node.height);
        let p1 = (node.x + node.width / 2.0, node.y + node.height + pad);
        let p2 = (node.x + node.width + pad, node.y + node.height + pad);
        let p3 = (node.x + node.width + pad, node.y + node.height / 2.0);
        let end = (node.x + node.width, node.y + node.height / 2.0);
        vec![start, p1, p2, p3, end]
    }
}

pub(super) fn path_length(points: &[(f32, f32)]) -> f32 {
    let mut length = 0.0;
    for segment in points.windows(2) {
        let dx = segment[1].0 - segment[0].0;
        let dy = segment[1].1 - segment[0].1;
        length += (dx * dx + dy * dy).sqrt();
    }
    length
}

/// Arc-length midpoint, pushed off the path along its normal far enough
/// that the label box clears the line.
pub(super) fn edge_label_anchor(points: &[(f32, f32)], label: &TextBlock, gap: f32) -> Option<(f32, f32)> {
    let first = *points.first()?;
    if points.len() < 2 {
        return Some(first);
    }
    let total = path_length(points);
    if total <= EPS {
        return Some(first);
    }
    let mut remaining = total / 2.0;
    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= EPS {
            continue;
        }
        if remaining > len {
            remaining -= len;
            continue;
        }
        let t = remaining / len;
        let mid = (a.0 + dx * t, a.1 + dy * t);
        let (tx, ty) = (dx / len, dy / len);
        let mut normal = (-ty, tx);
        if normal.0 < -EPS || (normal.0.abs() <= EPS && normal.1 < 0.0) {
            normal = (-normal.0, -normal.1);
        }
        let extent = normal.0.abs() * label.width / 2.0 + normal.1.abs() * label.height / 2.0;
        let push = extent + gap;
        return Some((mid.0 + normal.0 * push, mid.1 + normal.1 * push));
    }
    points.last().copied()
}

fn arrow_anchor(tip: (f32, f32), prev: (f32, f32), size: f32) -> ArrowAnchor {
    let dx = tip.0 - prev.0;
    let dy = tip.1 - prev.1;
    let len = (dx * dx + dy * dy).sqrt();
    let base = if len <= EPS {
        tip
    } else {
        (tip.0 - dx / len * size, tip.1 - dy / len * size)
    };
    ArrowAnchor { tip, base }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f32, y: f32, w: f32, h: f32, shape: NodeShape) -> NodeLayout {
        NodeLayout {
            id: id.to_string(),
            x,
            y,
            width: w,
            height: h,
            label: TextBlock::empty(),
            shape,
            icon: None,
        }
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-2 && (a.1 - b.1).abs() < 1e-2
    }

    #[test]
    fn rectangle_boundary_hits_the_side() {
        let n = node("a", 0.0, 0.0, 100.0, 40.0, NodeShape::Rectangle);
        assert!(close(boundary_point(&n, (50.0, 200.0)), (50.0, 40.0)));
        assert!(close(boundary_point(&n, (300.0, 20.0)), (100.0, 20.0)));
    }

    #[test]
    fn diamond_boundary_is_inside_the_box_corner() {
        let n = node("a", 0.0, 0.0, 100.0, 100.0, NodeShape::Diamond);
        let p = boundary_point(&n, (200.0, 200.0));
        assert!(close(p, (75.0, 75.0)), "{p:?}");
    }

    #[test]
    fn circle_boundary_is_at_radius() {
        let n = node("a", 0.0, 0.0, 60.0, 60.0, NodeShape::Circle);
        let p = boundary_point(&n, (130.0, 100.0));
        let r = ((p.0 - 30.0).powi(2) + (p.1 - 30.0).powi(2)).sqrt();
        assert!((r - 30.0).abs() < 1e-2, "radius {r}");
    }

    #[test]
    fn stadium_caps_are_round() {
        let n = node("a", 0.0, 0.0, 120.0, 40.0, NodeShape::Stadium);
        let p = boundary_point(&n, (200.0, 120.0));
        let r = ((p.0 - 100.0).powi(2) + (p.1 - 20.0).powi(2)).sqrt();
        assert!((r - 20.0).abs() < 1e-2, "cap radius {r}, point {p:?}");
        assert!(close(boundary_point(&n, (60.0, 300.0)), (60.0, 40.0)));
    }

    #[test]
    fn self_loop_has_five_points_outside_the_node() {
        let n = node("a", 0.0, 0.0, 80.0, 40.0, NodeShape::Rectangle);
        let config = LayoutConfig::default();
        let points = route_self_loop(&n, Direction::TopDown, &config);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (40.0, 40.0));
        assert_eq!(points[4], (80.0, 20.0));
    }

    #[test]
    fn self_loop_leaves_the_downstream_side() {
        let n = node("a", 0.0, 0.0, 80.0, 40.0, NodeShape::Rectangle);
        let config = LayoutConfig::default();

        let up = route_self_loop(&n, Direction::BottomTop, &config);
        assert_eq!(up[0], (40.0, 0.0));
        assert_eq!(up[4], (80.0, 20.0));
        assert!(up.iter().all(|p| p.1 <= 20.0));

        let left = route_self_loop(&n, Direction::RightLeft, &config);
        assert_eq!(left[0], (0.0, 20.0));
        assert_eq!(left[4], (40.0, 0.0));
        assert!(left.iter().all(|p| p.0 <= 40.0));
    }

    #[test]
    fn chaikin_keeps_endpoints() {
        let smoothed = chaikin(&[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0)]);
        assert_eq!(smoothed.first(), Some(&(0.0, 0.0)));
        assert_eq!(smoothed.last(), Some(&(100.0, 100.0)));
        assert_eq!(smoothed.len(), 4);
    }

    #[test]
    fn interior_points_do_not_double_back() {
        let path = smooth_path(&[(0.0, 0.0), (10.0, 120.0), (20.0, 80.0), (0.0, 200.0)]);
        for pair in path.windows(2) {
            assert!(pair[1].1 >= pair[0].1 - 1e-3, "{path:?}");
        }
    }

    #[test]
    fn label_anchor_is_offset_from_vertical_path() {
        let label = TextBlock {
            lines: vec!["yes".into()],
            width: 30.0,
            height: 20.0,
        };
        let anchor = edge_label_anchor(&[(0.0, 0.0), (0.0, 100.0)], &label, 4.0).unwrap();
        assert!(close(anchor, (19.0, 50.0)), "{anchor:?}");
    }

    #[test]
    fn back_edge_with_offset_is_curved() {
        let a = node("A", 0.0, 0.0, 60.0, 40.0, NodeShape::Rectangle);
        let b = node("B", 0.0, 100.0, 60.0, 40.0, NodeShape::Rectangle);
        let edge = Edge::new("B", "A");
        let config = LayoutConfig::default();
        let layout = route_edge(
            RouteInput {
                edge: &edge,
                from: &b,
                to: &a,
                interior: Vec::new(),
                back_edge: true,
                offset: 20.0,
                label: None,
            },
            Direction::TopDown,
            &config,
        );
        assert_eq!(layout.route, RouteKind::BackEdge);
        assert!(layout.points.len() > 2);
        assert!(layout.points.iter().any(|p| (p.0 - 30.0).abs() > 1.0));
        let end = layout.arrow_end_anchor.unwrap();
        assert!(close(end.tip, *layout.points.last().unwrap()));
    }
}
