use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Result of layering one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Ranking {
    pub ranks: Vec<usize>,
    pub rank_count: usize,
    pub components: usize,
    pub isolated: usize,
}

/// Longest-path layering followed by tightening, per connected component.
///
/// Vertices with no ranking edge share rank 0 on their own; components
/// follow in order of their lowest vertex index, each separated from the
/// previous one by an empty rank.
pub(super) fn assign_ranks(vertex_count: usize, edges: &[(usize, usize, usize)]) -> Ranking {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for &(from, to, _) in edges {
        if from == to {
            continue;
        }
        outgoing[from].push(to);
        incoming[to].push(from);
    }

    let component_of = connected_components(vertex_count, &outgoing, &incoming);
    let mut members: Vec<Vec<usize>> = Vec::new();
    let mut isolated = Vec::new();
    let mut slot_of_component: Vec<Option<usize>> = vec![None; vertex_count];
    for vertex in 0..vertex_count {
        if outgoing[vertex].is_empty() && incoming[vertex].is_empty() {
            isolated.push(vertex);
            continue;
        }
        let component = component_of[vertex];
        let slot = match slot_of_component[component] {
            Some(slot) => slot,
            None => {
                members.push(Vec::new());
                slot_of_component[component] = Some(members.len() - 1);
                members.len() - 1
            }
        };
        members[slot].push(vertex);
    }

    let mut ranks = vec![0usize; vertex_count];
    let mut offset = 0usize;
    let mut rank_count = 0usize;
    if !isolated.is_empty() {
        rank_count = 1;
        offset = 2;
    }
    for component in &members {
        let local = rank_component(component, &outgoing, &incoming, &mut ranks);
        for &vertex in component {
            ranks[vertex] += offset;
        }
        rank_count = offset + local;
        offset = rank_count + 1;
    }

    Ranking {
        ranks,
        rank_count,
        components: members.len(),
        isolated: isolated.len(),
    }
}

fn connected_components(
    vertex_count: usize,
    outgoing: &[Vec<usize>],
    incoming: &[Vec<usize>],
) -> Vec<usize> {
    let mut component = vec![usize::MAX; vertex_count];
    let mut next = 0;
    let mut stack = Vec::new();
    for start in 0..vertex_count {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = next;
        stack.push(start);
        while let Some(vertex) = stack.pop() {
            for &other in outgoing[vertex].iter().chain(incoming[vertex].iter()) {
                if component[other] == usize::MAX {
                    component[other] = next;
                    stack.push(other);
                }
            }
        }
        next += 1;
    }
    component
}

/// Ranks one component starting at 0; returns the number of ranks used.
fn rank_component(
    component: &[usize],
    outgoing: &[Vec<usize>],
    incoming: &[Vec<usize>],
    ranks: &mut [usize],
) -> usize {
    let mut indegree: Vec<usize> = component.iter().map(|v| incoming[*v].len()).collect();
    let local_index = |vertex: usize| component.binary_search(&vertex).ok();

    // Kahn's algorithm with a min-heap keeps the topological order stable.
    let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (idx, &vertex) in component.iter().enumerate() {
        ranks[vertex] = 0;
        if indegree[idx] == 0 {
            heap.push(Reverse(vertex));
        }
    }
    let mut topo = Vec::with_capacity(component.len());
    while let Some(Reverse(vertex)) = heap.pop() {
        topo.push(vertex);
        for &next in &outgoing[vertex] {
            ranks[next] = ranks[next].max(ranks[vertex] + 1);
            if let Some(idx) = local_index(next) {
                indegree[idx] -= 1;
                if indegree[idx] == 0 {
                    heap.push(Reverse(next));
                }
            }
        }
    }

    tighten(&topo, outgoing, incoming, ranks);

    let min = component.iter().map(|v| ranks[*v]).min().unwrap_or(0);
    let mut max = 0;
    for &vertex in component {
        ranks[vertex] -= min;
        max = max.max(ranks[vertex]);
    }
    max + 1
}

/// Longest-path layering leaves every vertex at its lowest legal rank. A
/// vertex with more outgoing than incoming edges shortens its edges by
/// moving down to just above its nearest successor.
fn tighten(topo: &[usize], outgoing: &[Vec<usize>], incoming: &[Vec<usize>], ranks: &mut [usize]) {
    const MAX_ROUNDS: usize = 8;
    for _ in 0..MAX_ROUNDS {
        let mut changed = false;
        for &vertex in topo.iter().rev() {
            if outgoing[vertex].len() <= incoming[vertex].len() {
                continue;
            }
            let Some(hi) = outgoing[vertex].iter().map(|next| ranks[*next]).min() else {
                continue;
            };
            let target = hi.saturating_sub(1);
            if target > ranks[vertex] {
                ranks[vertex] = target;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(list: &[(usize, usize)]) -> Vec<(usize, usize, usize)> {
        list.iter()
            .enumerate()
            .map(|(idx, &(from, to))| (from, to, idx))
            .collect()
    }

    #[test]
    fn chain_gets_one_rank_per_vertex() {
        let ranking = assign_ranks(3, &edges(&[(0, 1), (1, 2)]));
        assert_eq!(ranking.ranks, vec![0, 1, 2]);
        assert_eq!(ranking.rank_count, 3);
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let ranking = assign_ranks(3, &edges(&[(0, 1), (1, 2), (0, 2)]));
        assert_eq!(ranking.ranks, vec![0, 1, 2]);
    }

    #[test]
    fn sources_are_pulled_toward_their_successor() {
        // 0 -> 1 -> 2 -> 3 and 4 -> 3: vertex 4 should sit right above 3.
        let ranking = assign_ranks(5, &edges(&[(0, 1), (1, 2), (2, 3), (4, 3)]));
        assert_eq!(ranking.ranks[3], 3);
        assert_eq!(ranking.ranks[4], 2);
    }

    #[test]
    fn isolated_vertices_take_their_own_row() {
        let ranking = assign_ranks(4, &edges(&[(1, 2)]));
        assert_eq!(ranking.isolated, 2);
        assert_eq!(ranking.ranks[0], 0);
        assert_eq!(ranking.ranks[3], 0);
        assert_eq!(ranking.ranks[1], 2);
        assert_eq!(ranking.ranks[2], 3);
        assert_eq!(ranking.rank_count, 4);
    }

    #[test]
    fn components_are_stacked_with_a_gap() {
        let ranking = assign_ranks(4, &edges(&[(0, 1), (2, 3)]));
        assert_eq!(ranking.components, 2);
        assert_eq!(ranking.ranks, vec![0, 1, 3, 4]);
        assert_eq!(ranking.rank_count, 5);
    }

    #[test]
    fn every_edge_points_to_a_higher_rank() {
        let list = [(0, 1), (0, 2), (1, 3), (2, 3), (3, 4), (0, 4), (5, 4)];
        let ranking = assign_ranks(6, &edges(&list));
        for (from, to) in list {
            assert!(ranking.ranks[to] > ranking.ranks[from], "{from}->{to}");
        }
    }
}
