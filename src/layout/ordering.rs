use crate::ir::PortSide;

use super::normalize::LayeredGraph;

/// Port sides at the real ends of one ranking edge, seen from the upper
/// and lower end after cycle breaking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct EdgePorts {
    pub upper: Option<PortSide>,
    pub lower: Option<PortSide>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct OrderOptions {
    pub passes: usize,
    pub transpose_sweeps: usize,
    pub port_side_bias: f32,
}

#[derive(Debug, Clone)]
pub(super) struct Ordering {
    pub layers: Vec<Vec<usize>>,
    pub initial_crossings: usize,
    pub crossings: usize,
    pub passes_run: usize,
    pub cap_reached: bool,
}

#[derive(Debug, Clone, Copy)]
struct Neighbor {
    vertex: usize,
    bias: f32,
}

fn neighbor_side_weight(side: Option<PortSide>) -> f32 {
    match side {
        Some(PortSide::Left) => -1.0,
        Some(PortSide::Right) => 1.0,
        _ => 0.0,
    }
}

fn own_side_weight(side: Option<PortSide>) -> f32 {
    -neighbor_side_weight(side)
}

struct OrderState {
    layers: Vec<Vec<usize>>,
    pos: Vec<usize>,
    up: Vec<Vec<Neighbor>>,
    down: Vec<Vec<Neighbor>>,
    layer_segments: Vec<Vec<(usize, usize)>>,
    bias_weight: f32,
}

impl OrderState {
    fn new(graph: &LayeredGraph, ports: &[EdgePorts], bias_weight: f32) -> Self {
        let count = graph.vertex_count();
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); graph.rank_count];
        // Vertex index order is declaration order, dummies after real items.
        for vertex in 0..count {
            layers[graph.rank_of[vertex]].push(vertex);
        }
        let mut pos = vec![0usize; count];
        for layer in &layers {
            for (idx, &vertex) in layer.iter().enumerate() {
                pos[vertex] = idx;
            }
        }

        let mut up: Vec<Vec<Neighbor>> = vec![Vec::new(); count];
        let mut down: Vec<Vec<Neighbor>> = vec![Vec::new(); count];
        let mut layer_segments = vec![Vec::new(); graph.rank_count.saturating_sub(1)];
        for segment in &graph.segments {
            let edge_ports = ports.get(segment.edge).copied().unwrap_or_default();
            let upper_port = if graph.is_dummy(segment.upper) {
                None
            } else {
                edge_ports.upper
            };
            let lower_port = if graph.is_dummy(segment.lower) {
                None
            } else {
                edge_ports.lower
            };
            up[segment.lower].push(Neighbor {
                vertex: segment.upper,
                bias: neighbor_side_weight(upper_port) + own_side_weight(lower_port),
            });
            down[segment.upper].push(Neighbor {
                vertex: segment.lower,
                bias: neighbor_side_weight(lower_port) + own_side_weight(upper_port),
            });
            let rank = graph.rank_of[segment.upper];
            if let Some(list) = layer_segments.get_mut(rank) {
                list.push((segment.upper, segment.lower));
            }
        }

        Self {
            layers,
            pos,
            up,
            down,
            layer_segments,
            bias_weight,
        }
    }

    fn refresh_positions(&mut self, rank: usize) {
        for (idx, &vertex) in self.layers[rank].iter().enumerate() {
            self.pos[vertex] = idx;
        }
    }

    /// Median of neighbor positions; vertices without neighbors keep their slot.
    fn median(&self, vertex: usize, neighbors: &[Neighbor]) -> f32 {
        if neighbors.is_empty() {
            return self.pos[vertex] as f32;
        }
        let mut values: Vec<usize> = neighbors.iter().map(|n| self.pos[n.vertex]).collect();
        values.sort_unstable();
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            values[mid] as f32
        } else {
            (values[mid - 1] + values[mid]) as f32 / 2.0
        }
    }

    fn bias_key(&self, neighbors: &[Neighbor]) -> f32 {
        if neighbors.is_empty() || self.bias_weight == 0.0 {
            return 0.0;
        }
        let sum: f32 = neighbors.iter().map(|n| n.bias).sum();
        self.bias_weight * sum / neighbors.len() as f32
    }

    fn reorder(&mut self, rank: usize, downward: bool) {
        if self.layers[rank].len() < 2 {
            return;
        }
        let mut keyed: Vec<(usize, f32, f32)> = self.layers[rank]
            .iter()
            .map(|&vertex| {
                let neighbors = if downward {
                    &self.up[vertex]
                } else {
                    &self.down[vertex]
                };
                (vertex, self.median(vertex, neighbors), self.bias_key(neighbors))
            })
            .collect();
        keyed.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));
        self.layers[rank] = keyed.into_iter().map(|(vertex, _, _)| vertex).collect();
        self.refresh_positions(rank);
    }

    /// Crossings between the edges of `left` and `right` against the
    /// reference rank when `left` sits before `right`.
    fn pair_crossings(&self, left: usize, right: usize, downward: bool) -> usize {
        let (a, b) = if downward {
            (&self.up[left], &self.up[right])
        } else {
            (&self.down[left], &self.down[right])
        };
        let mut count = 0;
        for na in a {
            for nb in b {
                if self.pos[na.vertex] > self.pos[nb.vertex] {
                    count += 1;
                }
            }
        }
        count
    }

    fn transpose(&mut self, rank: usize, downward: bool, max_sweeps: usize) {
        let len = self.layers[rank].len();
        if len < 2 {
            return;
        }
        for _ in 0..max_sweeps {
            let mut improved = false;
            for idx in 0..len - 1 {
                let left = self.layers[rank][idx];
                let right = self.layers[rank][idx + 1];
                let before = self.pair_crossings(left, right, downward);
                let after = self.pair_crossings(right, left, downward);
                if after < before {
                    self.layers[rank].swap(idx, idx + 1);
                    self.pos[left] = idx + 1;
                    self.pos[right] = idx;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
    }

    fn has_port_bias(&self) -> bool {
        self.bias_weight != 0.0
            && self
                .up
                .iter()
                .chain(&self.down)
                .flatten()
                .any(|neighbor| neighbor.bias != 0.0)
    }

    fn crossings(&self) -> usize {
        let mut total = 0;
        for (rank, segments) in self.layer_segments.iter().enumerate() {
            let width = self.layers.get(rank + 1).map(|l| l.len()).unwrap_or(0);
            total += count_layer_crossings(segments, &self.pos, width);
        }
        total
    }
}

/// Inversion count of lower positions after sorting by upper position,
/// using a Fenwick tree over the lower rank.
fn count_layer_crossings(segments: &[(usize, usize)], pos: &[usize], lower_width: usize) -> usize {
    if segments.len() < 2 || lower_width == 0 {
        return 0;
    }
    let mut pairs: Vec<(usize, usize)> = segments
        .iter()
        .map(|&(upper, lower)| (pos[upper], pos[lower]))
        .collect();
    pairs.sort_unstable();

    let mut tree = vec![0usize; lower_width + 1];
    let mut inserted = 0usize;
    let mut crossings = 0usize;
    for (_, lower) in pairs {
        let mut at_or_below = 0;
        let mut idx = lower + 1;
        while idx > 0 {
            at_or_below += tree[idx];
            idx -= idx & idx.wrapping_neg();
        }
        crossings += inserted - at_or_below;
        let mut idx = lower + 1;
        while idx <= lower_width {
            tree[idx] += 1;
            idx += idx & idx.wrapping_neg();
        }
        inserted += 1;
    }
    crossings
}

/// Median/transpose crossing minimization. The best ordering seen across
/// all passes is returned, seeded with the declaration order.
pub(super) fn order_layers(
    graph: &LayeredGraph,
    ports: &[EdgePorts],
    options: OrderOptions,
) -> Ordering {
    let mut state = OrderState::new(graph, ports, options.port_side_bias);
    let initial_crossings = state.crossings();
    let mut best = state.layers.clone();
    let mut best_crossings = initial_crossings;
    let mut passes_run = 0;

    // Port sides still order tied children when the input has no crossings.
    if graph.rank_count > 1 && state.has_port_bias() {
        for rank in 1..graph.rank_count {
            state.reorder(rank, true);
        }
        let crossings = state.crossings();
        if crossings <= best_crossings {
            best_crossings = crossings;
            best = state.layers.clone();
        }
    }

    if graph.rank_count > 1 && best_crossings > 0 {
        for pass in 0..options.passes {
            passes_run = pass + 1;
            let downward = pass % 2 == 0;
            if downward {
                for rank in 1..graph.rank_count {
                    state.reorder(rank, true);
                    state.transpose(rank, true, options.transpose_sweeps);
                }
            } else {
                for rank in (0..graph.rank_count - 1).rev() {
                    state.reorder(rank, false);
                    state.transpose(rank, false, options.transpose_sweeps);
                }
            }
            let crossings = state.crossings();
            if crossings < best_crossings {
                best_crossings = crossings;
                best = state.layers.clone();
            }
            if best_crossings == 0 {
                break;
            }
        }
    }

    let cap_reached = best_crossings > 0 && passes_run == options.passes && options.passes > 0;
    if cap_reached {
        tracing::debug!(
            passes = options.passes,
            crossings = best_crossings,
            "ordering pass cap reached; keeping best snapshot"
        );
    }

    Ordering {
        layers: best,
        initial_crossings,
        crossings: best_crossings,
        passes_run,
        cap_reached,
    }
}

/// Total crossings of a given ordering, recounted from scratch.
#[cfg(test)]
pub(super) fn count_crossings(graph: &LayeredGraph, layers: &[Vec<usize>]) -> usize {
    let mut pos = vec![0usize; graph.vertex_count()];
    for layer in layers {
        for (idx, &vertex) in layer.iter().enumerate() {
            pos[vertex] = idx;
        }
    }
    let mut by_rank: Vec<Vec<(usize, usize)>> = vec![Vec::new(); graph.rank_count.saturating_sub(1)];
    for segment in &graph.segments {
        if let Some(list) = by_rank.get_mut(graph.rank_of[segment.upper]) {
            list.push((segment.upper, segment.lower));
        }
    }
    by_rank
        .iter()
        .enumerate()
        .map(|(rank, segments)| {
            let width = layers.get(rank + 1).map(|l| l.len()).unwrap_or(0);
            count_layer_crossings(segments, &pos, width)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::normalize::expand_chains;

    fn options() -> OrderOptions {
        OrderOptions {
            passes: 24,
            transpose_sweeps: 4,
            port_side_bias: 1.0,
        }
    }

    fn layered(ranks: &[usize], rank_count: usize, edges: &[(usize, usize)]) -> LayeredGraph {
        let edges: Vec<(usize, usize, usize)> = edges
            .iter()
            .enumerate()
            .map(|(idx, &(a, b))| (a, b, idx))
            .collect();
        expand_chains(ranks, rank_count, &edges)
    }

    #[test]
    fn fenwick_counts_simple_cross() {
        // Upper 0,1 ; lower 2,3 ; edges 0->3, 1->2 cross once.
        let pos = vec![0, 1, 0, 1];
        assert_eq!(count_layer_crossings(&[(0, 3), (1, 2)], &pos, 2), 1);
        assert_eq!(count_layer_crossings(&[(0, 2), (1, 3)], &pos, 2), 0);
        assert_eq!(count_layer_crossings(&[(0, 2), (0, 3), (1, 2)], &pos, 2), 1);
    }

    #[test]
    fn crossed_pair_is_untangled() {
        // a, b on top; c, d below; a->d, b->c
        let graph = layered(&[0, 0, 1, 1], 2, &[(0, 3), (1, 2)]);
        let result = order_layers(&graph, &[], options());
        assert_eq!(result.initial_crossings, 1);
        assert_eq!(result.crossings, 0);
        assert_eq!(count_crossings(&graph, &result.layers), 0);
        assert!(!result.cap_reached);
    }

    #[test]
    fn already_planar_input_keeps_declaration_order() {
        let graph = layered(&[0, 0, 1, 1], 2, &[(0, 2), (1, 3)]);
        let result = order_layers(&graph, &[], options());
        assert_eq!(result.layers, vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(result.passes_run, 0);
    }

    #[test]
    fn never_worse_than_declaration_order() {
        // K3,3 cannot be drawn without crossings.
        let mut edges = Vec::new();
        for a in 0..3 {
            for b in 3..6 {
                edges.push((a, b));
            }
        }
        edges.push((6, 3));
        let graph = layered(&[0, 0, 0, 1, 1, 1, 0], 2, &edges);
        let result = order_layers(&graph, &[], options());
        assert!(result.crossings <= result.initial_crossings);
        assert!(result.crossings > 0);
        assert!(result.cap_reached);
        assert_eq!(result.passes_run, 24);
    }

    #[test]
    fn iteration_cap_bounds_passes() {
        let mut edges = Vec::new();
        for a in 0..3 {
            for b in 3..6 {
                edges.push((a, b));
            }
        }
        let graph = layered(&[0, 0, 0, 1, 1, 1], 2, &edges);
        let result = order_layers(
            &graph,
            &[],
            OrderOptions {
                passes: 3,
                ..options()
            },
        );
        assert!(result.passes_run <= 3);
    }

    #[test]
    fn port_sides_break_median_ties() {
        // Parent 0 with two children declared as 1 (right port) then 2 (left port).
        let graph = layered(&[0, 1, 1], 2, &[(0, 1), (0, 2)]);
        let ports = [
            EdgePorts {
                upper: Some(PortSide::Right),
                lower: None,
            },
            EdgePorts {
                upper: Some(PortSide::Left),
                lower: None,
            },
        ];
        let mut state = OrderState::new(&graph, &ports, 1.0);
        state.reorder(1, true);
        assert_eq!(state.layers[1], vec![2, 1]);

        let mut unbiased = OrderState::new(&graph, &ports, 0.0);
        unbiased.reorder(1, true);
        assert_eq!(unbiased.layers[1], vec![1, 2]);
    }

    #[test]
    fn port_sides_order_children_without_crossings() {
        let graph = layered(&[0, 1, 1], 2, &[(0, 1), (0, 2)]);
        let ports = [
            EdgePorts {
                upper: Some(PortSide::Right),
                lower: None,
            },
            EdgePorts {
                upper: Some(PortSide::Left),
                lower: None,
            },
        ];
        let result = order_layers(&graph, &ports, options());
        assert_eq!(result.layers[1], vec![2, 1]);
        assert_eq!(result.crossings, 0);

        let flat = order_layers(
            &graph,
            &ports,
            OrderOptions {
                port_side_bias: 0.0,
                ..options()
            },
        );
        assert_eq!(flat.layers[1], vec![1, 2]);
    }

    #[test]
    fn long_edges_order_through_dummies() {
        // 0 -> 1 -> 2 and 3 -> 2 spanning two ranks, declared so the dummy crosses.
        let graph = layered(&[0, 1, 2, 0], 3, &[(0, 1), (1, 2), (3, 2)]);
        let result = order_layers(&graph, &[], options());
        assert_eq!(count_crossings(&graph, &result.layers), result.crossings);
        assert!(result.crossings <= result.initial_crossings);
    }
}
