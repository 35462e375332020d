use crate::ir::Direction;

use super::normalize::LayeredGraph;

/// Blend between the neighbor average and the current position; keeps the
/// smoothing passes from oscillating.
const NEIGHBOR_PULL: f32 = 0.85;

#[derive(Debug, Clone, Copy)]
pub(super) struct PositionOptions {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub smoothing_passes: usize,
}

/// Extent of an item along the cross axis and the main (rank) axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct AxisSize {
    pub cross: f32,
    pub main: f32,
}

impl AxisSize {
    /// Canonical top-down extents of a `width` x `height` box.
    pub fn for_direction(width: f32, height: f32, direction: Direction) -> Self {
        if direction.is_horizontal() {
            Self {
                cross: height,
                main: width,
            }
        } else {
            Self {
                cross: width,
                main: height,
            }
        }
    }
}

/// Centers in canonical top-down space: `(cross, main)`.
pub(super) fn assign_coordinates(
    graph: &LayeredGraph,
    layers: &[Vec<usize>],
    sizes: &[AxisSize],
    options: PositionOptions,
) -> Vec<(f32, f32)> {
    let count = graph.vertex_count();
    let mut main = vec![0.0f32; count];
    let mut rank_main = 0.0f32;
    let mut prev_half = 0.0f32;
    for (rank, layer) in layers.iter().enumerate() {
        let half = layer
            .iter()
            .map(|v| sizes[*v].main / 2.0)
            .fold(0.0f32, f32::max);
        if rank > 0 {
            rank_main += prev_half + options.rank_spacing + half;
        }
        for &vertex in layer {
            main[vertex] = rank_main;
        }
        prev_half = half;
    }

    let mut cross = vec![0.0f32; count];
    for layer in layers {
        let mut cursor = 0.0f32;
        for (idx, &vertex) in layer.iter().enumerate() {
            let half = sizes[vertex].cross / 2.0;
            if idx > 0 {
                cursor += options.node_spacing;
            }
            cross[vertex] = cursor + half;
            cursor += half * 2.0;
        }
        let shift = cursor / 2.0;
        for &vertex in layer {
            cross[vertex] -= shift;
        }
    }

    let mut up: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut down: Vec<Vec<usize>> = vec![Vec::new(); count];
    for segment in &graph.segments {
        up[segment.lower].push(segment.upper);
        down[segment.upper].push(segment.lower);
    }

    for pass in 0..options.smoothing_passes {
        let downward = pass % 2 == 0;
        let neighbors = if downward { &up } else { &down };
        let ranks: Vec<usize> = if downward {
            (0..layers.len()).collect()
        } else {
            (0..layers.len()).rev().collect()
        };
        for rank in ranks {
            place_rank(&layers[rank], neighbors, sizes, &mut cross, options.node_spacing);
        }
    }

    (0..count).map(|v| (cross[v], main[v])).collect()
}

/// Pull each vertex toward the mean of its neighbors, then restore the
/// minimum separation with a left-to-right sweep and re-center the rank on
/// the mean of the desired positions. Order within the rank never changes.
fn place_rank(
    layer: &[usize],
    neighbors: &[Vec<usize>],
    sizes: &[AxisSize],
    cross: &mut [f32],
    node_spacing: f32,
) {
    if layer.is_empty() {
        return;
    }
    let desired: Vec<f32> = layer
        .iter()
        .map(|&vertex| {
            let list = &neighbors[vertex];
            if list.is_empty() {
                return cross[vertex];
            }
            let mean = list.iter().map(|n| cross[*n]).sum::<f32>() / list.len() as f32;
            mean * NEIGHBOR_PULL + cross[vertex] * (1.0 - NEIGHBOR_PULL)
        })
        .collect();
    let desired_mean = desired.iter().sum::<f32>() / desired.len() as f32;

    let mut assigned = Vec::with_capacity(layer.len());
    let mut prev: Option<(f32, f32)> = None;
    for (idx, &vertex) in layer.iter().enumerate() {
        let half = sizes[vertex].cross / 2.0;
        let center = match prev {
            Some((prev_center, prev_half)) => {
                desired[idx].max(prev_center + prev_half + half + node_spacing)
            }
            None => desired[idx],
        };
        assigned.push(center);
        prev = Some((center, half));
    }
    let actual_mean = assigned.iter().sum::<f32>() / assigned.len() as f32;
    let delta = desired_mean - actual_mean;
    for (idx, &vertex) in layer.iter().enumerate() {
        cross[vertex] = assigned[idx] + delta;
    }
}

/// Map canonical `(cross, main)` centers to `(x, y)` for `direction`.
/// Reversed directions negate the main axis; callers translate afterwards.
pub(super) fn apply_direction(center: (f32, f32), direction: Direction) -> (f32, f32) {
    let (cross, main) = center;
    let main = if direction.is_reversed() { -main } else { main };
    if direction.is_horizontal() {
        (main, cross)
    } else {
        (cross, main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::normalize::expand_chains;

    fn options() -> PositionOptions {
        PositionOptions {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            smoothing_passes: 8,
        }
    }

    #[test]
    fn ranks_stack_by_half_heights_and_spacing() {
        let graph = expand_chains(&[0, 1], 2, &[(0, 1, 0)]);
        let layers = vec![vec![0], vec![1]];
        let sizes = [
            AxisSize {
                cross: 80.0,
                main: 40.0,
            },
            AxisSize {
                cross: 80.0,
                main: 60.0,
            },
        ];
        let centers = assign_coordinates(&graph, &layers, &sizes, options());
        assert_eq!(centers[0].1, 0.0);
        assert_eq!(centers[1].1, 20.0 + 50.0 + 30.0);
        assert!((centers[0].0 - centers[1].0).abs() < 1e-3);
    }

    #[test]
    fn siblings_keep_minimum_separation() {
        let graph = expand_chains(&[0, 0, 0, 1], 2, &[(0, 3, 0), (1, 3, 1), (2, 3, 2)]);
        let layers = vec![vec![0, 1, 2], vec![3]];
        let sizes = [AxisSize {
            cross: 40.0,
            main: 20.0,
        }; 4];
        let centers = assign_coordinates(&graph, &layers, &sizes, options());
        for pair in layers[0].windows(2) {
            let gap = centers[pair[1]].0 - centers[pair[0]].0;
            assert!(gap >= 50.0 + 40.0 - 1e-3, "gap {gap}");
        }
        assert!((centers[3].0 - centers[1].0).abs() < 1e-3);
    }

    #[test]
    fn horizontal_directions_swap_axes() {
        assert_eq!(apply_direction((3.0, 7.0), Direction::TopDown), (3.0, 7.0));
        assert_eq!(apply_direction((3.0, 7.0), Direction::LeftRight), (7.0, 3.0));
        assert_eq!(apply_direction((3.0, 7.0), Direction::BottomTop), (3.0, -7.0));
        assert_eq!(apply_direction((3.0, 7.0), Direction::RightLeft), (-7.0, 3.0));
    }

    #[test]
    fn axis_size_follows_direction() {
        let size = AxisSize::for_direction(100.0, 40.0, Direction::LeftRight);
        assert_eq!(size.cross, 40.0);
        assert_eq!(size.main, 100.0);
    }
}
