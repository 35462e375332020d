/// A proper layered graph: every segment joins adjacent ranks.
///
/// Vertices `0..real_count` are the scope's items; the rest are dummies,
/// each owned by exactly one chain.
#[derive(Debug, Clone)]
pub(super) struct LayeredGraph {
    pub real_count: usize,
    pub rank_of: Vec<usize>,
    pub rank_count: usize,
    pub segments: Vec<Segment>,
    /// Per ranking edge: `(edge_index, vertices from upper to lower end)`.
    pub chains: Vec<Chain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Segment {
    pub upper: usize,
    pub lower: usize,
    pub edge: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Chain {
    pub edge: usize,
    pub vertices: Vec<usize>,
}

impl LayeredGraph {
    pub fn vertex_count(&self) -> usize {
        self.rank_of.len()
    }

    pub fn is_dummy(&self, vertex: usize) -> bool {
        vertex >= self.real_count
    }

    pub fn dummy_count(&self) -> usize {
        self.rank_of.len() - self.real_count
    }
}

/// Insert one dummy per intermediate rank for every edge spanning more than
/// one rank. `edges` are `(upper, lower, edge_index)` with `rank(lower) > rank(upper)`.
pub(super) fn expand_chains(
    ranks: &[usize],
    rank_count: usize,
    edges: &[(usize, usize, usize)],
) -> LayeredGraph {
    let real_count = ranks.len();
    let mut rank_of = ranks.to_vec();
    let mut segments = Vec::with_capacity(edges.len());
    let mut chains = Vec::with_capacity(edges.len());

    for &(upper, lower, edge) in edges {
        let top = rank_of[upper];
        let bottom = rank_of[lower];
        let mut vertices = vec![upper];
        let mut prev = upper;
        for rank in top + 1..bottom {
            let dummy = rank_of.len();
            rank_of.push(rank);
            segments.push(Segment {
                upper: prev,
                lower: dummy,
                edge,
            });
            vertices.push(dummy);
            prev = dummy;
        }
        segments.push(Segment {
            upper: prev,
            lower,
            edge,
        });
        vertices.push(lower);
        chains.push(Chain { edge, vertices });
    }

    LayeredGraph {
        real_count,
        rank_of,
        rank_count,
        segments,
        chains,
    }
}
