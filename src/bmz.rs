//! BMZ algorithm (Botelho, Menoti, Ziviani).
//!
//! Keys become edges of a random 2-graph that is allowed to be cyclic. The
//! 2-core (critical vertices) is labelled first by a breadth-first search
//! that assigns g values so that every critical edge gets a distinct number
//! below the key count; the acyclic remainder is then labelled by a
//! depth-first walk handing out the edge numbers the critical pass left
//! unused. A key's value is `g[h1] + g[h2]`.

use std::collections::VecDeque;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::HashState;
use crate::bits;
use crate::error::{SettingsError, require_range};
use crate::graph::Graph;
use crate::hashing::KeyHasher;
use crate::packing::{PackedReader, PackedWriter, u32_all_size};
use crate::seed::SeedSource;

/// Settings for the BMZ minimal perfect hash function.
#[derive(Debug, Clone)]
pub struct BmzMinimalSettings {
    vertices_per_key: f64,
    iterations: u32,
    mapping_iterations: u32,
}

impl Default for BmzMinimalSettings {
    fn default() -> Self {
        Self {
            vertices_per_key: 1.15,
            iterations: 100,
            mapping_iterations: 20,
        }
    }
}

impl BmzMinimalSettings {
    /// Graph vertices per key. Larger means a bigger function but easier
    /// construction. Valid range is `[0.93, 1.15]`. Values above 1.14 switch
    /// the searching step from the heuristic to the exhaustive strategy.
    pub fn set_vertices_per_key(&mut self, value: f64) -> Result<(), SettingsError> {
        require_range("vertices per key", value, 0.93, 1.15)?;
        self.vertices_per_key = value;
        Ok(())
    }

    pub fn set_iterations(&mut self, value: u32) {
        self.iterations = value;
    }

    /// Retry budget for the whole mapping+searching cycle.
    pub fn set_mapping_iterations(&mut self, value: u32) {
        self.mapping_iterations = value;
    }

    pub fn vertices_per_key(&self) -> f64 {
        self.vertices_per_key
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn mapping_iterations(&self) -> u32 {
        self.mapping_iterations
    }
}

/// Builds [`BmzMinimalState`] functions.
pub struct BmzBuilder<S = Xxh3Builder> {
    hasher: KeyHasher<S>,
    seeds: SeedSource,
}

impl BmzBuilder<Xxh3Builder> {
    pub fn new() -> Self {
        Self {
            hasher: KeyHasher::new(),
            seeds: SeedSource::new(),
        }
    }

    /// Deterministic builder. Same keys, same order, same output bytes.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            hasher: KeyHasher::new(),
            seeds: SeedSource::with_seed(seed),
        }
    }
}

impl Default for BmzBuilder<Xxh3Builder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher + Clone> BmzBuilder<S> {
    pub fn with_build_hasher(build: S, seeds: SeedSource) -> Self {
        Self {
            hasher: KeyHasher::with_build_hasher(build),
            seeds,
        }
    }

    /// Builds a minimal perfect hash function over `keys`. Returns `None`
    /// when the iteration budgets are exhausted, which also happens when
    /// `keys` contains duplicates.
    pub fn try_create_minimal<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &BmzMinimalSettings,
    ) -> Option<BmzMinimalState<K, S>> {
        debug!(
            keys = keys.len(),
            vertices_per_key = settings.vertices_per_key,
            "creating minimal bmz function"
        );

        let num_edges = keys.len() as u32;
        let mut num_vertices = (settings.vertices_per_key * num_edges as f64).ceil() as u32;

        // workaround for very small key sets
        if num_vertices < 5 {
            num_vertices = 5;
        }

        let mut seed0 = 0;
        let mut seed1 = 0;
        let mut mapping_iterations = settings.mapping_iterations;
        let mut g = vec![0u32; num_vertices as usize];
        let mut graph = Graph::new(num_vertices, num_edges);

        loop {
            let mut iterations = settings.iterations;
            while iterations > 0 {
                seed0 = self.seeds.next_seed();
                seed1 = self.seeds.next_seed();
                trace!(iterations, seed0, seed1, "mapping iteration");

                if self.generate_edges(&mut graph, num_vertices, seed0, seed1, keys) {
                    break;
                }
                iterations -= 1;
            }

            if iterations == 0 {
                debug!("iteration budget exhausted");
                return None;
            }

            trace!("ordering step");
            graph.obtain_critical_nodes();

            trace!("searching step");
            let mut visited = vec![0u8; num_vertices as usize / 8 + 1];
            let mut used_edges = vec![0u8; num_edges as usize / 8 + 1];
            g.fill(0);

            let exhaustive = settings.vertices_per_key > 1.14;
            let mut search = SearchState {
                biggest_g: 0,
                biggest_edge: 1,
            };

            let mut restart_mapping = false;
            for v in 0..num_vertices {
                if !graph.is_critical(v) || bits::get_bit(&visited, v) {
                    continue;
                }

                restart_mapping = if exhaustive {
                    traverse_critical(
                        &graph,
                        &mut g,
                        num_edges,
                        v,
                        &mut search,
                        &mut used_edges,
                        &mut visited,
                    )
                } else {
                    traverse_critical_heuristic(
                        &graph,
                        &mut g,
                        num_edges,
                        v,
                        &mut search,
                        &mut used_edges,
                        &mut visited,
                    )
                };

                if restart_mapping {
                    break;
                }
            }

            if !restart_mapping {
                trace!("labelling non-critical vertices");
                traverse_non_critical(
                    &graph,
                    &mut g,
                    num_edges,
                    num_vertices,
                    &mut used_edges,
                    &mut visited,
                );
                break;
            }

            mapping_iterations = mapping_iterations.saturating_sub(1);
            trace!(mapping_iterations, "restarting mapping step");

            if mapping_iterations == 0 {
                debug!("mapping budget exhausted");
                return None;
            }
        }

        debug!(seed0, seed1, "minimal bmz function created");
        Some(BmzMinimalState {
            vertices: num_vertices,
            seed0,
            seed1,
            g,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    /// True when every key produced a fresh non-loop edge.
    fn generate_edges<K: Hash>(
        &self,
        graph: &mut Graph,
        num_vertices: u32,
        seed0: u32,
        seed1: u32,
        keys: &[K],
    ) -> bool {
        graph.clear_edges();

        for key in keys {
            let h1 = self.hasher.hash1(key, seed0) % num_vertices;
            let mut h2 = self.hasher.hash1(key, seed1) % num_vertices;

            if h1 == h2 {
                h2 += 1;
                if h2 >= num_vertices {
                    h2 = 0;
                }
            }
            if h1 == h2 {
                trace!(h1, "self loop");
                return false;
            }
            if graph.contains_edge(h1, h2) {
                trace!(h1, h2, "duplicate edge");
                return false;
            }

            graph.add_edge(h1, h2);
        }

        true
    }
}

struct SearchState {
    biggest_g: u32,
    biggest_edge: u32,
}

/// Labels one critical component breadth-first, trying every candidate g
/// value from `biggest_g + 1` upward. Returns true when an edge number would
/// reach `num_edges`, which forces a mapping restart.
fn traverse_critical(
    graph: &Graph,
    g: &mut [u32],
    num_edges: u32,
    start: u32,
    search: &mut SearchState,
    used_edges: &mut [u8],
    visited: &mut [u8],
) -> bool {
    let mut queue = VecDeque::with_capacity(graph.critical_node_count() as usize + 1);

    g[start as usize] = (search.biggest_edge as f64 / 2.0).ceil() as u32 - 1;
    bits::set_bit(visited, start);
    queue.push_back(start);

    while let Some(v) = queue.pop_front() {
        for u in graph.neighbors(v) {
            if !graph.is_critical(u) || bits::get_bit(visited, u) {
                continue;
            }

            let mut next_g;
            loop {
                next_g = search.biggest_g + 1;
                let mut collision = false;

                for lav in graph.neighbors(u) {
                    if !graph.is_critical(lav) || !bits::get_bit(visited, lav) {
                        continue;
                    }
                    if next_g + g[lav as usize] >= num_edges {
                        return true;
                    }
                    if bits::get_bit(used_edges, next_g + g[lav as usize]) {
                        collision = true;
                        break;
                    }
                }

                if next_g > search.biggest_g {
                    search.biggest_g = next_g;
                }
                if !collision {
                    break;
                }
            }

            mark_used_edges(graph, g, u, next_g, search, used_edges, visited);
            g[u as usize] = next_g;
            bits::set_bit(visited, u);
            queue.push_back(u);
        }
    }

    false
}

/// Like [`traverse_critical`], but recycles g values that collided before
/// falling back to `biggest_g + 1`, which keeps the labelling dense at high
/// load.
fn traverse_critical_heuristic(
    graph: &Graph,
    g: &mut [u32],
    num_edges: u32,
    start: u32,
    search: &mut SearchState,
    used_edges: &mut [u8],
    visited: &mut [u8],
) -> bool {
    let mut unused_g: Vec<u32> = Vec::new();
    let mut queue =
        VecDeque::with_capacity((0.5 * graph.critical_node_count() as f64) as usize + 1);

    g[start as usize] = (search.biggest_edge as f64 / 2.0).ceil() as u32 - 1;
    bits::set_bit(visited, start);
    queue.push_back(start);

    while let Some(v) = queue.pop_front() {
        for u in graph.neighbors(v) {
            if !graph.is_critical(u) || bits::get_bit(visited, u) {
                continue;
            }

            let mut next_g;
            let mut next_g_index = 0usize;
            loop {
                if next_g_index < unused_g.len() {
                    next_g = unused_g[next_g_index];
                    next_g_index += 1;
                } else {
                    next_g = search.biggest_g + 1;
                    next_g_index = usize::MAX;
                }

                let mut collision = false;
                for lav in graph.neighbors(u) {
                    if !graph.is_critical(lav) || !bits::get_bit(visited, lav) {
                        continue;
                    }
                    if next_g + g[lav as usize] >= num_edges {
                        return true;
                    }
                    if bits::get_bit(used_edges, next_g + g[lav as usize]) {
                        collision = true;
                        break;
                    }
                }

                if collision && next_g > search.biggest_g {
                    unused_g.push(next_g);
                }
                if next_g > search.biggest_g {
                    search.biggest_g = next_g;
                }
                if !collision {
                    break;
                }
            }

            // remove the recycled value we ended up using
            next_g_index = next_g_index.wrapping_sub(1);
            if next_g_index < unused_g.len() {
                unused_g.swap_remove(next_g_index);
            }

            mark_used_edges(graph, g, u, next_g, search, used_edges, visited);
            g[u as usize] = next_g;
            bits::set_bit(visited, u);
            queue.push_back(u);
        }
    }

    false
}

fn mark_used_edges(
    graph: &Graph,
    g: &[u32],
    u: u32,
    next_g: u32,
    search: &mut SearchState,
    used_edges: &mut [u8],
    visited: &[u8],
) {
    for lav in graph.neighbors(u) {
        if !graph.is_critical(lav) || !bits::get_bit(visited, lav) {
            continue;
        }

        let edge = next_g + g[lav as usize];
        bits::set_bit(used_edges, edge);

        if edge > search.biggest_edge {
            search.biggest_edge = edge;
        }
    }
}

fn next_unused_edge(used_edges: &[u8], mut index: u32) -> u32 {
    while bits::get_bit(used_edges, index) {
        index += 1;
    }
    index
}

/// Depth-first labelling of a non-critical component rooted at `start`,
/// handing out the edge numbers the critical pass skipped.
fn traverse(
    graph: &Graph,
    g: &mut [u32],
    used_edges: &[u8],
    start: u32,
    unused_edge_index: &mut u32,
    visited: &mut [u8],
) {
    let mut stack = vec![(start, graph.neighbors(start))];

    while let Some((v, neighbors)) = stack.last_mut() {
        let v = *v;
        match neighbors.next() {
            None => {
                stack.pop();
            }
            Some(n) if bits::get_bit(visited, n) => {}
            Some(n) => {
                *unused_edge_index = next_unused_edge(used_edges, *unused_edge_index);
                g[n as usize] = unused_edge_index.wrapping_sub(g[v as usize]);
                bits::set_bit(visited, n);
                *unused_edge_index += 1;
                stack.push((n, graph.neighbors(n)));
            }
        }
    }
}

fn traverse_non_critical(
    graph: &Graph,
    g: &mut [u32],
    num_edges: u32,
    num_vertices: u32,
    used_edges: &mut [u8],
    visited: &mut [u8],
) {
    let mut unused_edge_index = 0;

    for e in 0..num_edges {
        let v1 = graph.vertex_of_edge(e, 0);
        let v2 = graph.vertex_of_edge(e, 1);

        let vis1 = bits::get_bit(visited, v1);
        let vis2 = bits::get_bit(visited, v2);
        if vis1 == vis2 {
            continue;
        }

        let root = if vis1 { v1 } else { v2 };
        traverse(graph, g, used_edges, root, &mut unused_edge_index, visited);
    }

    for v in 0..num_vertices {
        if !bits::get_bit(visited, v) {
            g[v as usize] = 0;
            bits::set_bit(visited, v);
            traverse(graph, g, used_edges, v, &mut unused_edge_index, visited);
        }
    }
}

/// Minimal BMZ function.
pub struct BmzMinimalState<K, S = Xxh3Builder> {
    vertices: u32,
    seed0: u32,
    seed1: u32,
    g: Vec<u32>,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K: Hash, S: BuildHasher> HashState<K> for BmzMinimalState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let h1 = self.hasher.hash1(key, self.seed0) % self.vertices;
        let mut h2 = self.hasher.hash1(key, self.seed1) % self.vertices;

        if h1 == h2 {
            h2 += 1;
            if h2 >= self.vertices {
                h2 = 0;
            }
        }

        self.g[h1 as usize].wrapping_add(self.g[h2 as usize])
    }

    fn packed_size(&self) -> usize {
        4 + 4 + 4 + u32_all_size(self.g.len())
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        w.write_u32(self.vertices);
        w.write_u32(self.seed0);
        w.write_u32(self.seed1);
        w.write_u32_all(&self.g);
    }
}

impl<K> BmzMinimalState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> BmzMinimalState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let vertices = r.read_u32();
        let seed0 = r.read_u32();
        let seed1 = r.read_u32();
        let g = r.read_u32_vec();
        Self {
            vertices,
            seed0,
            seed1,
            g,
            hasher: KeyHasher::with_build_hasher(build),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection<K: Hash>(state: &BmzMinimalState<K>, keys: &[K]) {
        let mut seen = vec![false; keys.len()];
        for key in keys {
            let idx = state.search(key) as usize;
            assert!(idx < keys.len(), "value {idx} out of range");
            assert!(!seen[idx], "collision at {idx}");
            seen[idx] = true;
        }
    }

    #[test]
    fn exhaustive_strategy_is_a_bijection() {
        let keys: Vec<String> = (0..400).map(|i| format!("bmz-{i}")).collect();
        let mut builder = BmzBuilder::with_seed(5);
        let state = builder
            .try_create_minimal(&keys, &BmzMinimalSettings::default())
            .unwrap();
        assert_bijection(&state, &keys);
    }

    #[test]
    fn heuristic_strategy_is_a_bijection() {
        let keys: Vec<String> = (0..400).map(|i| format!("word{i}word")).collect();
        let mut settings = BmzMinimalSettings::default();
        settings.set_vertices_per_key(1.0).unwrap();

        let mut builder = BmzBuilder::with_seed(17);
        let state = builder.try_create_minimal(&keys, &settings).unwrap();
        assert_bijection(&state, &keys);
    }

    #[test]
    fn duplicate_keys_exhaust_the_budget() {
        let keys = ["same", "same", "other"];
        let mut settings = BmzMinimalSettings::default();
        settings.set_iterations(5);

        let mut builder = BmzBuilder::with_seed(1);
        assert!(builder.try_create_minimal(&keys, &settings).is_none());
    }

    #[test]
    fn settings_reject_out_of_range() {
        let mut settings = BmzMinimalSettings::default();
        assert!(settings.set_vertices_per_key(0.5).is_err());
        assert!(settings.set_vertices_per_key(1.2).is_err());
        assert!(settings.set_vertices_per_key(0.93).is_ok());
    }
}
