//! FCH algorithm (Fox, Chen, Heath).
//!
//! A one-probe minimal perfect hash for relatively small key sets. Keys are
//! skewed into buckets so that roughly 60% land in 30% of the buckets, then
//! buckets are placed largest first by searching for a per-bucket offset
//! into a random permutation of the remaining free slots. Lookups cost two
//! hashes and one table read, at under 4 bits per key.

use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::HashState;
use crate::buckets::Buckets;
use crate::error::{SettingsError, require_above};
use crate::hashing::KeyHasher;
use crate::packing::{PackedReader, PackedWriter, u32_all_size};
use crate::seed::SeedSource;

/// Settings for the FCH minimal perfect hash function.
#[derive(Debug, Clone)]
pub struct FchMinimalSettings {
    bits_per_key: f64,
    iterations: u32,
}

impl Default for FchMinimalSettings {
    fn default() -> Self {
        Self {
            bits_per_key: 2.6,
            iterations: 100,
        }
    }
}

impl FchMinimalSettings {
    /// Size of the offset table in bits per key. Must be larger than 2.
    pub fn set_bits_per_key(&mut self, value: f64) -> Result<(), SettingsError> {
        require_above("bits per key", value, 2.0)?;
        self.bits_per_key = value;
        Ok(())
    }

    pub fn set_iterations(&mut self, value: u32) {
        self.iterations = value;
    }

    pub fn bits_per_key(&self) -> f64 {
        self.bits_per_key
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// Builds [`FchMinimalState`] functions.
pub struct FchBuilder<S = Xxh3Builder> {
    hasher: KeyHasher<S>,
    seeds: SeedSource,
}

impl FchBuilder<Xxh3Builder> {
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

impl Default for FchBuilder<Xxh3Builder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher + Clone> FchBuilder<S> {
    pub fn with_build_hasher(build: S, seeds: SeedSource) -> Self {
        Self {
            hasher: KeyHasher::with_build_hasher(build),
            seeds,
        }
    }

    /// Builds a minimal perfect hash function over `keys`, mapping them onto
    /// `0..keys.len()` with no collisions.
    pub fn try_create_minimal<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &FchMinimalSettings,
    ) -> Option<FchMinimalState<K, S>> {
        let num_keys = keys.len() as u32;

        debug!(
            num_keys,
            bits_per_key = settings.bits_per_key,
            "creating minimal fch function"
        );

        let b = calculate_b(settings.bits_per_key, num_keys);
        let p1 = (0.55 * num_keys as f64).ceil();
        let p2 = (0.3 * b as f64).ceil();
        let mut g = vec![0u32; b as usize];

        let mut seed0 = 0;
        let mut seed1 = 0;
        let mut iterations = settings.iterations;

        while iterations > 0 {
            seed0 = self.seeds.next_seed();
            trace!(iterations, seed0, b, p1, p2, "mapping step");
            let buckets = self.mapping(keys, seed0, b, p1, p2, num_keys);

            trace!("ordering step");
            let sorted = buckets.indexes_sorted_by_size();

            trace!("searching step");
            if let Some(s) = self.searching(keys, &buckets, &sorted, &mut g, num_keys) {
                seed1 = s;
                break;
            }
            iterations -= 1;
        }

        if iterations == 0 {
            debug!("iteration budget exhausted");
            return None;
        }

        debug!(seed0, seed1, "minimal fch function created");
        Some(FchMinimalState {
            keys: num_keys,
            b,
            p1,
            p2,
            seed0,
            seed1,
            g,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    fn mapping<K: Hash>(
        &self,
        keys: &[K],
        seed: u32,
        b: u32,
        p1: f64,
        p2: f64,
        m: u32,
    ) -> Buckets {
        let mut buckets = Buckets::new(b);
        for (i, key) in keys.iter().enumerate() {
            let h1 = self.hasher.hash1(key, seed) % m;
            buckets.insert(mix_bucket(b, p1, p2, h1), i as u32);
        }
        buckets
    }

    /// Places buckets largest first. `random_table` is a permutation of the
    /// slots and `map_table` its inverse; placed slots are swapped to the
    /// front so the free ones stay addressable by `filled + z`. Returns the
    /// second hash seed on success.
    fn searching<K: Hash>(
        &mut self,
        keys: &[K],
        buckets: &Buckets,
        sorted: &[u32],
        g: &mut [u32],
        m: u32,
    ) -> Option<u32> {
        let mut random_table: Vec<u32> = (0..m).collect();
        for i in 0..m as usize {
            let j = self.seeds.next_seed() % m;
            random_table.swap(i, j as usize);
        }

        let mut map_table = vec![0u32; m as usize];
        for (i, &slot) in random_table.iter().enumerate() {
            map_table[slot as usize] = i as u32;
        }

        let mut iteration_to_generate_h2 = 0u32;
        let mut searching_iterations = 0u32;
        let mut seed = 0;
        let mut restart;

        loop {
            seed = self.seeds.next_seed();
            restart = self.check_collisions(keys, buckets, sorted, m, seed);
            let mut filled = 0u32;

            if restart {
                iteration_to_generate_h2 += 1;
            } else {
                searching_iterations += 1;
                iteration_to_generate_h2 = 0;
            }

            let mut i = 0;
            while i < buckets.bucket_count() && !restart {
                let bucket = sorted[i as usize];
                let bucket_size = buckets.size(bucket);
                if bucket_size == 0 {
                    // sorted descending, the rest are empty too
                    restart = false;
                    break;
                }
                restart = true;

                let mut z = 0;
                while z < m - filled && restart {
                    let key = &keys[buckets.key_index(bucket, 0) as usize];
                    let h2 = self.hasher.hash1(key, seed) % m;
                    g[bucket as usize] = (m + random_table[(filled + z) as usize] - h2) % m;
                    trace!(bucket, offset = g[bucket as usize], "probing bucket");

                    let mut j = 0;
                    let mut counter = 0;
                    restart = false;

                    loop {
                        let key = &keys[buckets.key_index(bucket, j) as usize];
                        let h2 = self.hasher.hash1(key, seed) % m;
                        let index = (h2 + g[bucket as usize]) % m;

                        if map_table[index as usize] >= filled {
                            let y = map_table[index as usize];
                            random_table.swap(y as usize, filled as usize);
                            map_table[random_table[y as usize] as usize] = y;
                            map_table[random_table[filled as usize] as usize] = filled;
                            filled += 1;
                            counter += 1;
                        } else {
                            // slot already taken, roll the bucket back
                            restart = true;
                            filled -= counter;
                            break;
                        }

                        j = (j + 1) % bucket_size;
                        if j == 0 {
                            break;
                        }
                    }

                    z += 1;
                }

                i += 1;
            }

            if !(restart && searching_iterations < 10 && iteration_to_generate_h2 < 1000) {
                break;
            }
        }

        if restart { None } else { Some(seed) }
    }

    /// True when the second hash collides within any single bucket, which no
    /// offset can fix.
    fn check_collisions<K: Hash>(
        &self,
        keys: &[K],
        buckets: &Buckets,
        sorted: &[u32],
        m: u32,
        seed: u32,
    ) -> bool {
        let mut hashtable = vec![0u8; m as usize];

        for &bucket in sorted.iter().take(buckets.bucket_count() as usize) {
            let num_keys = buckets.size(bucket);
            hashtable.fill(0);

            for j in 0..num_keys {
                let key = &keys[buckets.key_index(bucket, j) as usize];
                let index = self.hasher.hash1(key, seed) % m;

                if hashtable[index as usize] != 0 {
                    return true;
                }
                hashtable[index as usize] = 1;
            }
        }

        false
    }
}

fn calculate_b(c: f64, m: u32) -> u32 {
    ((c * m as f64) / ((m as f64).ln() / std::f64::consts::LN_2 + 1.0)).ceil() as u32
}

/// Skews bucket assignment: indices below p1 (55% of keys) fold into the
/// first p2 (30% of the) buckets.
fn mix_bucket(b: u32, p1: f64, p2: f64, h1: u32) -> u32 {
    let int_p2 = p2 as u32;
    if (h1 as f64) < p1 {
        h1 % int_p2
    } else {
        let h1 = h1 % b;
        if (h1 as f64) < p2 { h1 + int_p2 } else { h1 }
    }
}

/// Minimal, one-probe FCH function.
pub struct FchMinimalState<K, S = Xxh3Builder> {
    keys: u32,
    b: u32,
    p1: f64,
    p2: f64,
    seed0: u32,
    seed1: u32,
    g: Vec<u32>,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K: Hash, S: BuildHasher> HashState<K> for FchMinimalState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let h1 = self.hasher.hash1(key, self.seed0) % self.keys;
        let h2 = self.hasher.hash1(key, self.seed1) % self.keys;

        let bucket = mix_bucket(self.b, self.p1, self.p2, h1);
        (h2 + self.g[bucket as usize]) % self.keys
    }

    fn packed_size(&self) -> usize {
        4 + 4 + 8 + 8 + 4 + 4 + u32_all_size(self.g.len())
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        w.write_u32(self.keys);
        w.write_u32(self.b);
        w.write_f64(self.p1);
        w.write_f64(self.p2);
        w.write_u32(self.seed0);
        w.write_u32(self.seed1);
        w.write_u32_all(&self.g);
    }
}

impl<K> FchMinimalState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> FchMinimalState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let keys = r.read_u32();
        let b = r.read_u32();
        let p1 = r.read_f64();
        let p2 = r.read_f64();
        let seed0 = r.read_u32();
        let seed1 = r.read_u32();
        let g = r.read_u32_vec();
        Self {
            keys,
            b,
            p1,
            p2,
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

    #[test]
    fn table_size_grows_sublinearly() {
        // b = ceil(c*m / (log2(m) + 1))
        assert_eq!(calculate_b(2.6, 1), 3);
        assert_eq!(calculate_b(2.6, 100), 35);
        assert!(calculate_b(2.6, 10_000) < 2_000);
    }

    #[test]
    fn bucket_mix_skews_low_indexes() {
        let m = 100u32;
        let b = calculate_b(2.6, m);
        let p1 = (0.55 * m as f64).ceil();
        let p2 = (0.3 * b as f64).ceil();

        for h1 in 0..m {
            let bucket = mix_bucket(b, p1, p2, h1);
            assert!(bucket < b, "h1 {h1} mapped to {bucket}");
            if (h1 as f64) < p1 {
                assert!((bucket as f64) < p2);
            }
        }
    }

    #[test]
    fn minimal_is_a_bijection() {
        let keys: Vec<String> = (0..60).map(|i| format!("fch:{i}")).collect();
        let mut builder = FchBuilder::with_seed(13);
        let state = builder
            .try_create_minimal(&keys, &FchMinimalSettings::default())
            .unwrap();

        let mut seen = vec![false; keys.len()];
        for key in &keys {
            let idx = state.search(key) as usize;
            assert!(idx < keys.len(), "{key}");
            assert!(!seen[idx], "{key} collided");
            seen[idx] = true;
        }
    }

    #[test]
    fn single_key_maps_to_zero() {
        let keys = ["only"];
        let mut builder = FchBuilder::with_seed(1);
        let state = builder
            .try_create_minimal(&keys, &FchMinimalSettings::default())
            .unwrap();
        assert_eq!(state.search(&"only"), 0);
    }

    #[test]
    fn settings_reject_bits_per_key_at_or_below_two() {
        let mut settings = FchMinimalSettings::default();
        assert!(settings.set_bits_per_key(2.0).is_err());
        assert!(settings.set_bits_per_key(1.0).is_err());
        assert!(settings.set_bits_per_key(3.8).is_ok());
    }
}
