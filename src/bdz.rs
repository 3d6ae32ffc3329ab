//! BDZ algorithm (Botelho, Belazzougui, Pagh, Ziviani).
//!
//! Keys become edges of a random 3-uniform hypergraph over three vertex
//! partitions. When peeling the graph empties it, a 2-bit value per vertex is
//! assigned so that for every edge the sum of its three values mod 3 picks
//! the vertex that identifies the key. The perfect variant re-packs the value
//! table in base 3, five values per byte; the minimal variant keeps the 2-bit
//! table and adds a rank table over assigned vertices.

use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::HashState;
use crate::bits;
use crate::error::{SettingsError, require_range};
use crate::hashing::KeyHasher;
use crate::hypergraph::HyperGraph;
use crate::packing::{PackedReader, PackedWriter, u8_all_size, u32_all_size};
use crate::seed::SeedSource;

const UNASSIGNED: u8 = 3;
const POW3: [u32; 5] = [1, 3, 9, 27, 81];

/// Number of 2-bit fields in a byte that hold an assigned value (not 3).
const ASSIGNED_PER_BYTE: [u8; 256] = build_assigned_per_byte();
/// `BASE3_DIGIT[p][b]` is digit `p` of byte `b` read as a base-3 number.
const BASE3_DIGIT: [[u8; 256]; 5] = build_base3_digits();

const fn build_assigned_per_byte() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        let mut count = 0;
        let mut field = 0;
        while field < 4 {
            if (b >> (field * 2)) & 3 != 3 {
                count += 1;
            }
            field += 1;
        }
        table[b] = count;
        b += 1;
    }
    table
}

const fn build_base3_digits() -> [[u8; 256]; 5] {
    let mut table = [[0u8; 256]; 5];
    let mut p = 0;
    while p < 5 {
        let mut b = 0;
        while b < 256 {
            table[p][b] = ((b as u32 / POW3[p]) % 3) as u8;
            b += 1;
        }
        p += 1;
    }
    table
}

/// Settings for the perfect (non-minimal) variant.
#[derive(Debug, Clone)]
pub struct BdzSettings {
    load_factor: f64,
    iterations: u32,
}

impl Default for BdzSettings {
    fn default() -> Self {
        Self {
            load_factor: 1.23,
            iterations: 100,
        }
    }
}

impl BdzSettings {
    /// Vertices per key. Lower is more compact. Valid range is
    /// `[1.23, 2.0]`.
    pub fn set_load_factor(&mut self, value: f64) -> Result<(), SettingsError> {
        require_range("load factor", value, 1.23, 2.0)?;
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

/// Settings for the minimal variant.
#[derive(Debug, Clone)]
pub struct BdzMinimalSettings {
    load_factor: f64,
    iterations: u32,
    rank_bits: u8,
}

impl Default for BdzMinimalSettings {
    fn default() -> Self {
        Self {
            load_factor: 1.23,
            iterations: 100,
            rank_bits: 7,
        }
    }
}

impl BdzMinimalSettings {
    pub fn set_load_factor(&mut self, value: f64) -> Result<(), SettingsError> {
        require_range("load factor", value, 1.23, 2.0)?;
        self.load_factor = value;
        Ok(())
    }

    pub fn set_iterations(&mut self, value: u32) {
        self.iterations = value;
    }

    /// Log2 of the rank sampling interval. Larger is more compact but
    /// slower to evaluate. Valid range is `[3, 10]`.
    pub fn set_rank_bits(&mut self, value: u8) -> Result<(), SettingsError> {
        require_range("rank bits", value as f64, 3.0, 10.0)?;
        self.rank_bits = value;
        Ok(())
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn rank_bits(&self) -> u8 {
        self.rank_bits
    }
}

/// Builds [`BdzState`] and [`BdzMinimalState`] functions.
pub struct BdzBuilder<S = Xxh3Builder> {
    hasher: KeyHasher<S>,
    seeds: SeedSource,
}

impl BdzBuilder<Xxh3Builder> {
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

impl Default for BdzBuilder<Xxh3Builder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher + Clone> BdzBuilder<S> {
    pub fn with_build_hasher(build: S, seeds: SeedSource) -> Self {
        Self {
            hasher: KeyHasher::with_build_hasher(build),
            seeds,
        }
    }

    /// Builds a perfect hash function over `keys`, mapping each key to a
    /// distinct value below three times the partition count. Returns `None`
    /// when every iteration produced a cyclic hypergraph.
    pub fn try_create<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &BdzSettings,
    ) -> Option<BdzState<K, S>> {
        debug!(
            keys = keys.len(),
            load_factor = settings.load_factor,
            "creating bdz function"
        );

        let (partitions, vertices, seed, g) =
            self.build_tables(keys, false, settings.load_factor, settings.iterations)?;

        let lookup = optimize(&g, vertices);
        debug!(seed, partitions, "bdz function created");

        Some(BdzState {
            partitions,
            lookup,
            seed,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    /// Builds a minimal perfect hash function over `keys`, mapping each key
    /// to a distinct value below `keys.len()`.
    pub fn try_create_minimal<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &BdzMinimalSettings,
    ) -> Option<BdzMinimalState<K, S>> {
        debug!(
            keys = keys.len(),
            load_factor = settings.load_factor,
            rank_bits = settings.rank_bits,
            "creating minimal bdz function"
        );

        let (partitions, vertices, seed, lookup) =
            self.build_tables(keys, true, settings.load_factor, settings.iterations)?;

        let index_in_rank = 1u32 << settings.rank_bits;
        let rank_len = vertices.div_ceil(index_in_rank);
        let rank_table = ranking_step(&lookup, index_in_rank, rank_len);
        debug!(seed, partitions, "minimal bdz function created");

        Some(BdzMinimalState {
            partitions,
            lookup,
            seed,
            rank_bits: settings.rank_bits,
            rank_table,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    fn build_tables<K: Hash>(
        &mut self,
        keys: &[K],
        minimal: bool,
        load_factor: f64,
        mut iterations: u32,
    ) -> Option<(u32, u32, u32, Vec<u8>)> {
        let num_edges = keys.len() as u32;
        let mut partitions = (load_factor * num_edges as f64 / 3.0).ceil() as u32;

        if partitions % 2 == 0 {
            partitions += 1;
        }
        // workaround for very small key sets
        if partitions == 1 {
            partitions = 3;
        }

        let vertices = 3 * partitions;

        let mut graph = HyperGraph::new(num_edges, vertices);
        let mut queue = vec![0u32; num_edges as usize];

        trace!(num_edges, vertices, "hypergraph sized");

        let mut seed = 0;
        while iterations > 0 {
            seed = self.seeds.next_seed();
            trace!(iterations, seed, "mapping iteration");

            if self.mapping_step(keys, seed, partitions, num_edges, &mut graph, &mut queue) {
                break;
            }
            iterations -= 1;
        }

        if iterations == 0 {
            debug!("iteration budget exhausted");
            return None;
        }

        let g = assigning_step(vertices, &graph, &queue, minimal);
        Some((partitions, vertices, seed, g))
    }

    fn mapping_step<K: Hash>(
        &self,
        keys: &[K],
        seed: u32,
        partitions: u32,
        num_edges: u32,
        graph: &mut HyperGraph,
        queue: &mut [u32],
    ) -> bool {
        graph.clear();

        for key in keys {
            let [h0, h1, h2] = self.hasher.hash3(key, seed);
            graph.add_edge(
                h0 % partitions,
                h1 % partitions + partitions,
                h2 % partitions + (partitions << 1),
            );
        }

        generate_queue(num_edges, queue, graph)
    }
}

/// Peels degree-1 edges into `queue`. True when every edge was peeled, i.e.
/// the hypergraph is acyclic.
fn generate_queue(num_edges: u32, queue: &mut [u32], graph: &mut HyperGraph) -> bool {
    let mut queue_head = 0usize;
    let mut queue_tail = 0usize;
    let mut marked = vec![0u8; ((num_edges >> 3) + 1) as usize];

    for i in 0..num_edges {
        let [v0, v1, v2] = graph.edges[i as usize].vertices;

        if graph.vertex_degree[v0 as usize] != 1
            && graph.vertex_degree[v1 as usize] != 1
            && graph.vertex_degree[v2 as usize] != 1
        {
            continue;
        }
        if bits::get_bit(&marked, i) {
            continue;
        }

        queue[queue_head] = i;
        queue_head += 1;
        bits::set_bit(&mut marked, i);
    }

    while queue_tail != queue_head {
        let curr = queue[queue_tail];
        queue_tail += 1;
        graph.remove_edge(curr);

        for v in graph.edges[curr as usize].vertices {
            if graph.vertex_degree[v as usize] != 1 {
                continue;
            }
            let e = graph.first_edge[v as usize];
            if !bits::get_bit(&marked, e) {
                queue[queue_head] = e;
                queue_head += 1;
                bits::set_bit(&mut marked, e);
            }
        }
    }

    queue_head as u32 == num_edges
}

/// Walks the peel queue backwards, fixing one unmarked vertex per edge so the
/// three values sum to the index of that vertex mod 3.
fn assigning_step(vertices: u32, graph: &HyperGraph, queue: &[u32], minimal: bool) -> Vec<u8> {
    let num_edges = graph.edge_count;
    let mut marked = vec![0u8; ((vertices >> 3) + 1) as usize];
    let fill = if minimal { 0xff } else { 0x00 };
    let mut g = vec![fill; vertices.div_ceil(4) as usize];

    let store: fn(&mut [u8], u32, u32) = if minimal {
        bits::store_2bit_and
    } else {
        bits::store_2bit_or
    };

    for i in (0..num_edges).rev() {
        let curr = queue[i as usize];
        let [v0, v1, v2] = graph.edges[curr as usize].vertices;

        if !bits::get_bit(&marked, v0) {
            for v in [v1, v2] {
                if !bits::get_bit(&marked, v) {
                    if !minimal {
                        bits::store_2bit_and(&mut g, v, UNASSIGNED as u32);
                    }
                    bits::set_bit(&mut marked, v);
                }
            }
            let val = (6 - (bits::get_2bit(&g, v1) as u32 + bits::get_2bit(&g, v2) as u32)) % 3;
            store(&mut g, v0, val);
            bits::set_bit(&mut marked, v0);
        } else if !bits::get_bit(&marked, v1) {
            if !bits::get_bit(&marked, v2) {
                if !minimal {
                    bits::store_2bit_and(&mut g, v2, UNASSIGNED as u32);
                }
                bits::set_bit(&mut marked, v2);
            }
            let val = (7 - (bits::get_2bit(&g, v0) as u32 + bits::get_2bit(&g, v2) as u32)) % 3;
            store(&mut g, v1, val);
            bits::set_bit(&mut marked, v1);
        } else {
            let val = (8 - (bits::get_2bit(&g, v0) as u32 + bits::get_2bit(&g, v1) as u32)) % 3;
            store(&mut g, v2, val);
            bits::set_bit(&mut marked, v2);
        }
    }

    g
}

/// Re-packs the 2-bit table in base 3, five values per byte.
fn optimize(g: &[u8], vertices: u32) -> Vec<u8> {
    let mut lookup = vec![0u8; vertices.div_ceil(5) as usize];

    for i in 0..vertices {
        let value = bits::get_2bit(g, i);
        lookup[(i / 5) as usize] += value * POW3[(i % 5) as usize] as u8;
    }

    lookup
}

/// Prefix counts of assigned vertices, one entry per `index_in_rank`
/// vertices.
fn ranking_step(g: &[u8], index_in_rank: u32, rank_len: u32) -> Vec<u32> {
    let size = (index_in_rank >> 2) as usize;
    let mut bytes_total = g.len();
    let mut offset = 0usize;
    let mut count = 0u32;
    let mut rank_table = vec![0u32; rank_len as usize];

    for i in 1..rank_len as usize {
        let num_bytes = size.min(bytes_total);
        for j in 0..num_bytes {
            count += ASSIGNED_PER_BYTE[g[offset + j] as usize] as u32;
        }
        rank_table[i] = count;
        offset += num_bytes;
        bytes_total = bytes_total.saturating_sub(size);
    }

    rank_table
}

fn rank(rank_bits: u8, rank_table: &[u32], g: &[u8], vertex: u32) -> u32 {
    let index = vertex >> rank_bits;
    let mut base = rank_table[index as usize];

    let mut byte_idx = (index << rank_bits) >> 2;
    let end_byte = vertex >> 2;
    while byte_idx < end_byte {
        base += ASSIGNED_PER_BYTE[g[byte_idx as usize] as usize] as u32;
        byte_idx += 1;
    }

    let mut v = byte_idx << 2;
    while v < vertex {
        if bits::get_2bit(g, v) != UNASSIGNED {
            base += 1;
        }
        v += 1;
    }

    base
}

/// Perfect (non-minimal) BDZ function.
pub struct BdzState<K, S = Xxh3Builder> {
    partitions: u32,
    lookup: Vec<u8>,
    seed: u32,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K: Hash, S: BuildHasher> HashState<K> for BdzState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let [h0, h1, h2] = self.hasher.hash3(key, self.seed);
        let h = [
            h0 % self.partitions,
            h1 % self.partitions + self.partitions,
            h2 % self.partitions + (self.partitions << 1),
        ];

        let d0 = BASE3_DIGIT[(h[0] % 5) as usize][self.lookup[(h[0] / 5) as usize] as usize];
        let d1 = BASE3_DIGIT[(h[1] % 5) as usize][self.lookup[(h[1] / 5) as usize] as usize];
        let d2 = BASE3_DIGIT[(h[2] % 5) as usize][self.lookup[(h[2] / 5) as usize] as usize];

        h[((d0 + d1 + d2) % 3) as usize]
    }

    fn packed_size(&self) -> usize {
        4 + 4 + u8_all_size(self.lookup.len())
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        w.write_u32(self.seed);
        w.write_u32(self.partitions);
        w.write_u8_all(&self.lookup);
    }
}

impl<K> BdzState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> BdzState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let seed = r.read_u32();
        let partitions = r.read_u32();
        let lookup = r.read_u8_vec();
        Self {
            partitions,
            lookup,
            seed,
            hasher: KeyHasher::with_build_hasher(build),
            _marker: PhantomData,
        }
    }
}

/// Minimal BDZ function.
pub struct BdzMinimalState<K, S = Xxh3Builder> {
    partitions: u32,
    lookup: Vec<u8>,
    seed: u32,
    rank_bits: u8,
    rank_table: Vec<u32>,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K: Hash, S: BuildHasher> HashState<K> for BdzMinimalState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let [h0, h1, h2] = self.hasher.hash3(key, self.seed);
        let h = [
            h0 % self.partitions,
            h1 % self.partitions + self.partitions,
            h2 % self.partitions + (self.partitions << 1),
        ];

        let sum = bits::get_2bit(&self.lookup, h[0]) as u32
            + bits::get_2bit(&self.lookup, h[1]) as u32
            + bits::get_2bit(&self.lookup, h[2]) as u32;
        let vertex = h[(sum % 3) as usize];

        rank(self.rank_bits, &self.rank_table, &self.lookup, vertex)
    }

    fn packed_size(&self) -> usize {
        4 + 4 + u32_all_size(self.rank_table.len()) + 1 + u8_all_size(self.lookup.len())
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        w.write_u32(self.seed);
        w.write_u32(self.partitions);
        w.write_u32_all(&self.rank_table);
        w.write_u8(self.rank_bits);
        w.write_u8_all(&self.lookup);
    }
}

impl<K> BdzMinimalState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> BdzMinimalState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let seed = r.read_u32();
        let partitions = r.read_u32();
        let rank_table = r.read_u32_vec();
        let rank_bits = r.read_u8();
        let lookup = r.read_u8_vec();
        Self {
            partitions,
            lookup,
            seed,
            rank_bits,
            rank_table,
            hasher: KeyHasher::with_build_hasher(build),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_tables_agree_with_definitions() {
        assert_eq!(ASSIGNED_PER_BYTE[0b1111_1111], 0);
        assert_eq!(ASSIGNED_PER_BYTE[0b1111_1100], 1);
        assert_eq!(ASSIGNED_PER_BYTE[0], 4);

        // 242 = 2*81 + 2*27 + 2*9 + 2*3 + 2
        assert_eq!(BASE3_DIGIT[0][242], 2);
        assert_eq!(BASE3_DIGIT[4][242], 2);
        assert_eq!(BASE3_DIGIT[2][9], 1);
        assert_eq!(BASE3_DIGIT[0][1], 1);
    }

    #[test]
    fn minimal_is_a_bijection() {
        let keys: Vec<String> = (0..500).map(|i| format!("key-{i}")).collect();
        let mut builder = BdzBuilder::with_seed(11);
        let state = builder
            .try_create_minimal(&keys, &BdzMinimalSettings::default())
            .unwrap();

        let mut seen = vec![false; keys.len()];
        for key in &keys {
            let idx = state.search(key) as usize;
            assert!(idx < keys.len());
            assert!(!seen[idx], "{key} collided");
            seen[idx] = true;
        }
    }

    #[test]
    fn perfect_variant_has_no_collisions() {
        let keys: Vec<String> = (0..300).map(|i| format!("entry {i}")).collect();
        let mut builder = BdzBuilder::with_seed(3);
        let state = builder.try_create(&keys, &BdzSettings::default()).unwrap();

        let mut seen = std::collections::HashSet::new();
        for key in &keys {
            assert!(seen.insert(state.search(key)), "{key} collided");
        }
    }

    #[test]
    fn settings_reject_out_of_range() {
        let mut settings = BdzMinimalSettings::default();
        assert!(settings.set_load_factor(1.0).is_err());
        assert!(settings.set_rank_bits(11).is_err());
        assert!(settings.set_load_factor(2.0).is_ok());
        assert!(settings.set_rank_bits(3).is_ok());
    }
}
