//! 2-uniform multigraph used by the BMZ and CHM builders.
//!
//! Edges are stored twice (edge `e` and its twin `e + edge_count`), each half
//! threaded into the adjacency list of one endpoint. `abs_edge(e, 0)` folds a
//! twin back to its canonical id. Vertex and edge counts are fixed at
//! construction; each retry round calls [`Graph::clear_edges`] and re-inserts.

use tracing::trace;

use crate::bits;

const EMPTY: u32 = u32::MAX;

pub(crate) struct Graph {
    vertex_count: u32,
    edge_count: u32,
    edges: Vec<u32>,
    first: Vec<u32>,
    next: Vec<u32>,
    critical_nodes: Vec<u8>,
    critical_node_count: u32,
    live_edges: u32,
}

impl Graph {
    pub(crate) fn new(vertex_count: u32, edge_count: u32) -> Self {
        trace!(vertex_count, edge_count, "creating graph");

        let mut graph = Self {
            vertex_count,
            edge_count,
            edges: vec![EMPTY; 2 * edge_count as usize],
            first: vec![EMPTY; vertex_count as usize],
            next: vec![EMPTY; 2 * edge_count as usize],
            critical_nodes: Vec::new(),
            critical_node_count: 0,
            live_edges: 0,
        };
        graph.clear_edges();
        graph
    }

    pub(crate) fn clear_edges(&mut self) {
        self.first.fill(EMPTY);
        self.edges.fill(EMPTY);
        self.next.fill(EMPTY);
        self.live_edges = 0;
    }

    pub(crate) fn add_edge(&mut self, v1: u32, v2: u32) {
        let e = self.live_edges;
        debug_assert!(v1 < self.vertex_count);
        debug_assert!(v2 < self.vertex_count);
        debug_assert!(e < self.edge_count);

        self.next[e as usize] = self.first[v1 as usize];
        self.first[v1 as usize] = e;
        self.edges[e as usize] = v2;

        let twin = e + self.edge_count;
        self.next[twin as usize] = self.first[v2 as usize];
        self.first[v2 as usize] = twin;
        self.edges[twin as usize] = v1;

        self.live_edges += 1;
    }

    #[inline]
    fn abs_edge(&self, e: u32, i: u32) -> u32 {
        e % self.edge_count + i * self.edge_count
    }

    fn check_edge(&self, e: u32, v1: u32, v2: u32) -> bool {
        let a = self.edges[self.abs_edge(e, 0) as usize];
        let b = self.edges[self.abs_edge(e, 1) as usize];
        (a == v1 && b == v2) || (a == v2 && b == v1)
    }

    /// Canonical id of the edge joining `v1` and `v2`. The edge must exist.
    pub(crate) fn edge_id(&self, v1: u32, v2: u32) -> u32 {
        let mut e = self.first[v1 as usize];
        debug_assert_ne!(e, EMPTY);

        while !self.check_edge(e, v1, v2) {
            e = self.next[e as usize];
            debug_assert_ne!(e, EMPTY);
        }

        self.abs_edge(e, 0)
    }

    pub(crate) fn contains_edge(&self, v1: u32, v2: u32) -> bool {
        let mut e = self.first[v1 as usize];

        while e != EMPTY {
            if self.check_edge(e, v1, v2) {
                return true;
            }
            e = self.next[e as usize];
        }

        false
    }

    pub(crate) fn vertex_of_edge(&self, e: u32, side: u32) -> u32 {
        self.edges[(e + side * self.edge_count) as usize]
    }

    pub(crate) fn neighbors(&self, vertex: u32) -> Neighbors<'_> {
        Neighbors {
            graph: self,
            vertex,
            edge: self.first[vertex as usize],
        }
    }

    /// True when peeling degree-1 vertices leaves at least one edge.
    pub(crate) fn is_cyclic(&self) -> bool {
        let mut deleted = vec![0u8; self.edge_count as usize / 8 + 1];

        for v in 0..self.vertex_count {
            self.delete_cyclic_edges(v, &mut deleted);
        }

        (0..self.edge_count).any(|e| !bits::get_bit(&deleted, e))
    }

    /// Peels the graph and marks every vertex touched by a surviving edge.
    pub(crate) fn obtain_critical_nodes(&mut self) {
        let mut deleted = vec![0u8; self.edge_count as usize / 8 + 1];
        self.critical_nodes = vec![0u8; self.vertex_count as usize / 8 + 1];
        self.critical_node_count = 0;

        trace!(
            vertex_count = self.vertex_count,
            edge_count = self.edge_count,
            "collecting 2-core vertices"
        );

        for v in 0..self.vertex_count {
            self.delete_cyclic_edges(v, &mut deleted);
        }

        for e in 0..self.edge_count {
            if bits::get_bit(&deleted, e) {
                continue;
            }
            for side in 0..2 {
                let v = self.edges[(e + side * self.edge_count) as usize];
                if !bits::get_bit(&self.critical_nodes, v) {
                    self.critical_node_count += 1;
                    bits::set_bit(&mut self.critical_nodes, v);
                }
            }
        }
    }

    pub(crate) fn is_critical(&self, v: u32) -> bool {
        bits::get_bit(&self.critical_nodes, v)
    }

    pub(crate) fn critical_node_count(&self) -> u32 {
        self.critical_node_count
    }

    /// Follows a chain of degree-1 vertices starting at `v1`, deleting each
    /// pendant edge, until the chain ends or hits a vertex of higher degree.
    fn delete_cyclic_edges(&self, mut v1: u32, deleted: &mut [u8]) {
        let Some(mut e) = self.find_degree1_edge(v1, deleted) else {
            return;
        };

        loop {
            bits::set_bit(deleted, self.abs_edge(e, 0));

            let mut v2 = self.edges[self.abs_edge(e, 0) as usize];
            if v2 == v1 {
                v2 = self.edges[self.abs_edge(e, 1) as usize];
            }

            match self.find_degree1_edge(v2, deleted) {
                Some(next) => {
                    e = next;
                    v1 = v2;
                }
                None => break,
            }
        }
    }

    /// The single live edge at `v`, or None when `v` has degree 0 or >= 2.
    fn find_degree1_edge(&self, v: u32, deleted: &[u8]) -> Option<u32> {
        let mut edge = self.first[v as usize];
        if edge == EMPTY {
            return None;
        }

        let mut found = None;
        if !bits::get_bit(deleted, self.abs_edge(edge, 0)) {
            found = Some(edge);
        }

        loop {
            edge = self.next[edge as usize];
            if edge == EMPTY {
                return found;
            }
            if bits::get_bit(deleted, self.abs_edge(edge, 0)) {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(edge);
        }
    }
}

/// Walks the adjacency list of one vertex, yielding the opposite endpoint of
/// each incident edge. Self-loops yield the vertex itself.
pub(crate) struct Neighbors<'a> {
    graph: &'a Graph,
    vertex: u32,
    edge: u32,
}

impl Iterator for Neighbors<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.edge == EMPTY {
            return None;
        }

        let e = self.edge as usize;
        let other = if self.graph.edges[e] == self.vertex {
            self.graph.edges[e + self.graph.edge_count as usize]
        } else {
            self.graph.edges[e]
        };

        self.edge = self.graph.next[e];
        Some(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> Graph {
        // 0-1, 1-2, 2-3
        let mut g = Graph::new(4, 3);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g
    }

    #[test]
    fn edge_ids_are_insertion_order() {
        let g = path_graph();
        assert_eq!(g.edge_id(0, 1), 0);
        assert_eq!(g.edge_id(2, 1), 1);
        assert_eq!(g.edge_id(3, 2), 2);
    }

    #[test]
    fn contains_edge_is_symmetric() {
        let g = path_graph();
        assert!(g.contains_edge(1, 0));
        assert!(g.contains_edge(0, 1));
        assert!(!g.contains_edge(0, 2));
    }

    #[test]
    fn neighbors_walk_both_twins() {
        let g = path_graph();
        let mut around_1: Vec<u32> = g.neighbors(1).collect();
        around_1.sort_unstable();
        assert_eq!(around_1, [0, 2]);
        assert_eq!(g.neighbors(3).collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn path_is_acyclic_triangle_is_not() {
        assert!(!path_graph().is_cyclic());

        let mut tri = Graph::new(3, 3);
        tri.add_edge(0, 1);
        tri.add_edge(1, 2);
        tri.add_edge(2, 0);
        assert!(tri.is_cyclic());
    }

    #[test]
    fn critical_nodes_are_the_2core() {
        // triangle with a tail: 0-1-2-0 plus 2-3
        let mut g = Graph::new(4, 4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 0);
        g.add_edge(2, 3);
        g.obtain_critical_nodes();

        assert_eq!(g.critical_node_count(), 3);
        assert!(g.is_critical(0));
        assert!(g.is_critical(1));
        assert!(g.is_critical(2));
        assert!(!g.is_critical(3));
    }

    #[test]
    fn clear_edges_resets_for_reuse() {
        let mut g = path_graph();
        g.clear_edges();
        assert!(!g.contains_edge(0, 1));
        g.add_edge(3, 0);
        assert_eq!(g.edge_id(0, 3), 0);
    }
}
