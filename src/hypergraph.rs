//! 3-uniform hypergraph peeled by the BDZ builder.
//!
//! Each edge touches three vertices and is threaded into three singly-linked
//! incidence lists, one per endpoint. Peeling removes edges whose endpoint
//! reached degree 1; `edge_count` is the number of edges ever added and is
//! deliberately not decremented by [`HyperGraph::remove_edge`], because the
//! assigning step replays all of them from the peel queue afterwards.

pub(crate) const NULL_EDGE: u32 = u32::MAX;

#[derive(Clone, Copy)]
pub(crate) struct HyperEdge {
    pub(crate) vertices: [u32; 3],
    next_edges: [u32; 3],
}

pub(crate) struct HyperGraph {
    pub(crate) edges: Vec<HyperEdge>,
    pub(crate) first_edge: Vec<u32>,
    pub(crate) vertex_degree: Vec<u32>,
    pub(crate) edge_count: u32,
}

impl HyperGraph {
    pub(crate) fn new(max_edges: u32, vertex_count: u32) -> Self {
        Self {
            edges: Vec::with_capacity(max_edges as usize),
            first_edge: vec![NULL_EDGE; vertex_count as usize],
            vertex_degree: vec![0; vertex_count as usize],
            edge_count: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.edges.clear();
        self.first_edge.fill(NULL_EDGE);
        self.vertex_degree.fill(0);
        self.edge_count = 0;
    }

    pub(crate) fn add_edge(&mut self, v0: u32, v1: u32, v2: u32) {
        let id = self.edge_count;
        self.edges.push(HyperEdge {
            vertices: [v0, v1, v2],
            next_edges: [
                self.first_edge[v0 as usize],
                self.first_edge[v1 as usize],
                self.first_edge[v2 as usize],
            ],
        });

        self.first_edge[v0 as usize] = id;
        self.first_edge[v1 as usize] = id;
        self.first_edge[v2 as usize] = id;
        self.vertex_degree[v0 as usize] += 1;
        self.vertex_degree[v1 as usize] += 1;
        self.vertex_degree[v2 as usize] += 1;

        self.edge_count += 1;
    }

    /// Unlinks `edge` from all three incidence lists and drops the degrees of
    /// its endpoints. The edge record itself stays readable.
    pub(crate) fn remove_edge(&mut self, edge: u32) {
        for i in 0..3 {
            let vert = self.edges[edge as usize].vertices[i];
            let mut edge1 = self.first_edge[vert as usize];
            let mut edge2 = NULL_EDGE;
            let mut j = 0;

            while edge1 != edge && edge1 != NULL_EDGE {
                edge2 = edge1;
                let vs = self.edges[edge1 as usize].vertices;
                j = if vs[0] == vert {
                    0
                } else if vs[1] == vert {
                    1
                } else {
                    2
                };
                edge1 = self.edges[edge1 as usize].next_edges[j];
            }

            debug_assert_ne!(edge1, NULL_EDGE);

            let successor = self.edges[edge1 as usize].next_edges[i];
            if edge2 != NULL_EDGE {
                self.edges[edge2 as usize].next_edges[j] = successor;
            } else {
                self.first_edge[vert as usize] = successor;
            }

            self.vertex_degree[vert as usize] -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_track_insertions() {
        let mut g = HyperGraph::new(2, 6);
        g.add_edge(0, 2, 4);
        g.add_edge(0, 3, 5);
        assert_eq!(g.edge_count, 2);
        assert_eq!(g.vertex_degree[0], 2);
        assert_eq!(g.vertex_degree[2], 1);
        assert_eq!(g.first_edge[0], 1);
    }

    #[test]
    fn remove_keeps_edge_count_and_record() {
        let mut g = HyperGraph::new(2, 6);
        g.add_edge(0, 2, 4);
        g.add_edge(0, 3, 5);
        g.remove_edge(1);

        assert_eq!(g.edge_count, 2);
        assert_eq!(g.vertex_degree[0], 1);
        assert_eq!(g.vertex_degree[3], 0);
        assert_eq!(g.first_edge[0], 0);
        assert_eq!(g.first_edge[3], NULL_EDGE);
        assert_eq!(g.edges[1].vertices, [0, 3, 5]);
    }

    #[test]
    fn remove_middle_of_chain_relinks() {
        let mut g = HyperGraph::new(3, 3);
        g.add_edge(0, 1, 2);
        g.add_edge(0, 1, 2);
        g.add_edge(0, 1, 2);
        g.remove_edge(1);
        assert_eq!(g.first_edge[0], 2);
        assert_eq!(g.edges[2].next_edges[0], 0);
        assert_eq!(g.vertex_degree[0], 2);
    }
}
