//! CHM algorithm (Czech, Havas, Majewski).
//!
//! Keys become edges of a random acyclic 2-graph. A depth-first walk of each
//! component assigns g values so that `g[h1] + g[h2]` equals the edge's
//! insertion index, making the function both minimal and order preserving:
//! the i-th key maps to i.

use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::HashState;
use crate::bits;
use crate::error::{SettingsError, require_above};
use crate::graph::Graph;
use crate::hashing::KeyHasher;
use crate::packing::{PackedReader, PackedWriter, u32_all_size};
use crate::seed::SeedSource;

/// Settings for the CHM minimal perfect hash function.
#[derive(Debug, Clone)]
pub struct ChmMinimalSettings {
    load_factor: f64,
    iterations: u32,
}

impl Default for ChmMinimalSettings {
    fn default() -> Self {
        Self {
            load_factor: 2.09,
            iterations: 100,
        }
    }
}

impl ChmMinimalSettings {
    /// Graph vertices per key. Must be larger than 2; acyclicity becomes
    /// rare below 2.09.
    pub fn set_load_factor(&mut self, value: f64) -> Result<(), SettingsError> {
        require_above("load factor", value, 2.0)?;
        self.load_factor = value;
        Ok(())
    }

    pub fn set_iterations(&mut self, value: u32) {
        self.iterations = value;
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// Builds [`ChmMinimalState`] functions.
pub struct ChmBuilder<S = Xxh3Builder> {
    hasher: KeyHasher<S>,
    seeds: SeedSource,
}

impl ChmBuilder<Xxh3Builder> {
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

impl Default for ChmBuilder<Xxh3Builder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher + Clone> ChmBuilder<S> {
    pub fn with_build_hasher(build: S, seeds: SeedSource) -> Self {
        Self {
            hasher: KeyHasher::with_build_hasher(build),
            seeds,
        }
    }

    /// Builds an order-preserving minimal perfect hash function: the key at
    /// index i of `keys` maps to i. Returns `None` when every iteration
    /// produced a self-loop or a cyclic graph, which always happens when
    /// `keys` contains duplicates.
    pub fn try_create_minimal<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &ChmMinimalSettings,
    ) -> Option<ChmMinimalState<K, S>> {
        debug!(
            keys = keys.len(),
            load_factor = settings.load_factor,
            "creating minimal chm function"
        );

        let num_edges = keys.len() as u32;
        let num_vertices = (settings.load_factor * num_edges as f64).ceil() as u32;

        let mut graph = Graph::new(num_vertices, num_edges);

        let mut seed0 = 0;
        let mut seed1 = 0;
        let mut iterations = settings.iterations;

        while iterations > 0 {
            seed0 = self.seeds.next_seed();
            seed1 = self.seeds.next_seed();
            trace!(iterations, seed0, seed1, "mapping iteration");

            if self.generate_edges(&mut graph, seed0, seed1, num_vertices, keys) {
                break;
            }
            iterations -= 1;
        }

        if iterations == 0 {
            debug!("iteration budget exhausted");
            return None;
        }

        trace!("assignment step");
        let mut visited = vec![0u8; num_vertices as usize / 8 + 1];
        let mut g = vec![0u32; num_vertices as usize];

        for v in 0..num_vertices {
            if !bits::get_bit(&visited, v) {
                g[v as usize] = 0;
                traverse(&graph, &mut g, &mut visited, v);
            }
        }

        debug!(seed0, seed1, "minimal chm function created");
        Some(ChmMinimalState {
            vertices: num_vertices,
            edges: num_edges,
            g,
            seed0,
            seed1,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    /// True when every key produced a non-loop edge and the graph is
    /// acyclic.
    fn generate_edges<K: Hash>(
        &self,
        graph: &mut Graph,
        seed0: u32,
        seed1: u32,
        num_vertices: u32,
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

            graph.add_edge(h1, h2);
        }

        if graph.is_cyclic() {
            trace!("cyclic graph");
            return false;
        }

        true
    }
}

/// Depth-first labelling of the component rooted at `start`: each newly
/// reached vertex gets the value that makes the connecting edge's g sum
/// equal its edge id.
fn traverse(graph: &Graph, g: &mut [u32], visited: &mut [u8], start: u32) {
    bits::set_bit(visited, start);
    let mut stack = vec![(start, graph.neighbors(start))];

    while let Some((v, neighbors)) = stack.last_mut() {
        let v = *v;
        match neighbors.next() {
            None => {
                stack.pop();
            }
            Some(n) if bits::get_bit(visited, n) => {}
            Some(n) => {
                g[n as usize] = graph.edge_id(v, n).wrapping_sub(g[v as usize]);
                bits::set_bit(visited, n);
                stack.push((n, graph.neighbors(n)));
            }
        }
    }
}

/// Minimal, order-preserving CHM function.
pub struct ChmMinimalState<K, S = Xxh3Builder> {
    vertices: u32,
    edges: u32,
    g: Vec<u32>,
    seed0: u32,
    seed1: u32,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K: Hash, S: BuildHasher> HashState<K> for ChmMinimalState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let h1 = self.hasher.hash1(key, self.seed0) % self.vertices;
        let mut h2 = self.hasher.hash1(key, self.seed1) % self.vertices;

        if h1 == h2 {
            h2 += 1;
            if h2 >= self.vertices {
                h2 = 0;
            }
        }

        self.g[h1 as usize].wrapping_add(self.g[h2 as usize]) % self.edges
    }

    fn packed_size(&self) -> usize {
        4 + 4 + 4 + 4 + u32_all_size(self.g.len())
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        w.write_u32(self.vertices);
        w.write_u32(self.edges);
        w.write_u32(self.seed0);
        w.write_u32(self.seed1);
        w.write_u32_all(&self.g);
    }
}

impl<K> ChmMinimalState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> ChmMinimalState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let vertices = r.read_u32();
        let edges = r.read_u32();
        let seed0 = r.read_u32();
        let seed1 = r.read_u32();
        let g = r.read_u32_vec();
        Self {
            vertices,
            edges,
            g,
            seed0,
            seed1,
            hasher: KeyHasher::with_build_hasher(build),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_key_order() {
        let keys: Vec<String> = (0..300).map(|i| format!("ordered-{i}")).collect();
        let mut builder = ChmBuilder::with_seed(23);
        let state = builder
            .try_create_minimal(&keys, &ChmMinimalSettings::default())
            .unwrap();

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(state.search(key), i as u32, "{key}");
        }
    }

    #[test]
    fn duplicate_keys_exhaust_the_budget() {
        let keys = ["twin", "twin"];
        let mut settings = ChmMinimalSettings::default();
        settings.set_iterations(5);

        let mut builder = ChmBuilder::with_seed(2);
        assert!(builder.try_create_minimal(&keys, &settings).is_none());
    }

    #[test]
    fn settings_reject_load_factor_at_or_below_two() {
        let mut settings = ChmMinimalSettings::default();
        assert!(settings.set_load_factor(2.0).is_err());
        assert!(settings.set_load_factor(1.5).is_err());
        assert!(settings.set_load_factor(2.5).is_ok());
    }
}
