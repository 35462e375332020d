//! Feedback-edge removal ahead of ranking.

/// Per-edge outcome of cycle breaking. Edge endpoints are never mutated;
/// ranking reads `reversed` to flip traversal direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct AcyclicEdges {
    pub reversed: Vec<bool>,
    pub self_loop: Vec<bool>,
}

impl AcyclicEdges {
    /// Edges as seen by ranking: self loops dropped, back edges flipped.
    /// Each entry is `(upper, lower, edge_index)`.
    pub fn oriented(&self, edges: &[(usize, usize)]) -> Vec<(usize, usize, usize)> {
        edges
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.self_loop[*idx])
            .map(|(idx, &(from, to))| {
                if self.reversed[idx] {
                    (to, from, idx)
                } else {
                    (from, to, idx)
                }
            })
            .collect()
    }

    pub fn reversed_count(&self) -> usize {
        self.reversed.iter().filter(|r| **r).count()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    OnStack,
    Done,
}

/// Depth-first traversal from every unvisited vertex in index order; edges
/// leading back to a vertex on the current stack are marked reversed.
pub(super) fn break_cycles(vertex_count: usize, edges: &[(usize, usize)]) -> AcyclicEdges {
    let mut reversed = vec![false; edges.len()];
    let self_loop: Vec<bool> = edges.iter().map(|(from, to)| from == to).collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for (idx, &(from, _)) in edges.iter().enumerate() {
        if !self_loop[idx] {
            outgoing[from].push(idx);
        }
    }

    let mut state = vec![Visit::Fresh; vertex_count];
    // (vertex, next outgoing slot)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for root in 0..vertex_count {
        if state[root] != Visit::Fresh {
            continue;
        }
        state[root] = Visit::OnStack;
        stack.push((root, 0));
        while let Some(frame) = stack.last_mut() {
            let (vertex, slot) = *frame;
            if slot >= outgoing[vertex].len() {
                state[vertex] = Visit::Done;
                stack.pop();
                continue;
            }
            frame.1 += 1;
            let edge_idx = outgoing[vertex][slot];
            let target = edges[edge_idx].1;
            match state[target] {
                Visit::OnStack => reversed[edge_idx] = true,
                Visit::Fresh => {
                    state[target] = Visit::OnStack;
                    stack.push((target, 0));
                }
                Visit::Done => {}
            }
        }
    }

    AcyclicEdges {
        reversed,
        self_loop,
    }
}
