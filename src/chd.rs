//! CHD algorithm (Belazzougui, Botelho, Dietzfelbinger): compress, hash,
//! displace.
//!
//! Keys are grouped into buckets by a first hash; buckets are placed largest
//! first, searching for a displacement pair `(probe0, probe1)` under which
//! every key of the bucket lands in a free bin. The displacement per bucket
//! is stored entropy-coded. The minimal variant additionally keeps a
//! compressed rank over the free bins and subtracts it from the bin index.

use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use tracing::{debug, trace};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::HashState;
use crate::bits;
use crate::error::{SettingsError, require_range};
use crate::hashing::KeyHasher;
use crate::packing::{PackedReader, PackedWriter, u8_all_size};
use crate::seed::SeedSource;
use crate::succinct::{CompressedRank, CompressedSequence};

/// Settings for the CHD perfect hash function.
#[derive(Debug, Clone)]
pub struct ChdSettings {
    load_factor: f64,
    keys_per_bin: u8,
    keys_per_bucket: u8,
    use_heuristics: bool,
    iterations: u32,
}

/// The minimal variant takes the same settings. Minimality requires
/// `keys_per_bin == 1`.
pub type ChdMinimalSettings = ChdSettings;

impl Default for ChdSettings {
    fn default() -> Self {
        Self {
            load_factor: 0.5,
            keys_per_bin: 1,
            keys_per_bucket: 4,
            use_heuristics: true,
            iterations: 100,
        }
    }
}

impl ChdSettings {
    /// Fraction of bins that end up occupied. Valid range is
    /// `[0.5, 0.99]`.
    pub fn set_load_factor(&mut self, value: f64) -> Result<(), SettingsError> {
        require_range("load factor", value, 0.5, 0.99)?;
        self.load_factor = value;
        Ok(())
    }

    /// Bin capacity, for t-perfect functions with up to t collisions per
    /// bin. Valid range is `[1, 128]`.
    pub fn set_keys_per_bin(&mut self, value: u8) -> Result<(), SettingsError> {
        require_range("keys per bin", value as f64, 1.0, 128.0)?;
        self.keys_per_bin = value;
        Ok(())
    }

    /// Average bucket size. Larger means slower construction but a smaller
    /// function. Valid range is `[1, 32]`.
    pub fn set_keys_per_bucket(&mut self, value: u8) -> Result<(), SettingsError> {
        require_range("keys per bucket", value as f64, 1.0, 32.0)?;
        self.keys_per_bucket = value;
        Ok(())
    }

    /// Heuristic placement retries all still-unplaced buckets of one size
    /// class per probe pair instead of finishing each bucket in turn.
    pub fn set_use_heuristics(&mut self, value: bool) {
        self.use_heuristics = value;
    }

    pub fn set_iterations(&mut self, value: u32) {
        self.iterations = value;
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn keys_per_bin(&self) -> u8 {
        self.keys_per_bin
    }

    pub fn keys_per_bucket(&self) -> u8 {
        self.keys_per_bucket
    }

    pub fn use_heuristics(&self) -> bool {
        self.use_heuristics
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

// `size` doubles as the original bucket id once `ordering` has rebuilt the
// bucket array; the sorted lists carry the sizes from then on.
#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    items_list: u32,
    size: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Item {
    f: u32,
    h: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct MapItem {
    bucket: u32,
    f: u32,
    h: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct SortedList {
    bucket_list: u32,
    size: u32,
}

/// Builds [`ChdState`] and [`ChdMinimalState`] functions.
pub struct ChdBuilder<S = Xxh3Builder> {
    hasher: KeyHasher<S>,
    seeds: SeedSource,
}

impl ChdBuilder<Xxh3Builder> {
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

impl Default for ChdBuilder<Xxh3Builder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher + Clone> ChdBuilder<S> {
    pub fn with_build_hasher(build: S, seeds: SeedSource) -> Self {
        Self {
            hasher: KeyHasher::with_build_hasher(build),
            seeds,
        }
    }

    /// Builds a perfect hash function over `keys`, mapping each key into a
    /// prime number of bins with at most `keys_per_bin` keys per bin.
    pub fn try_create<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &ChdSettings,
    ) -> Option<ChdState<K, S>> {
        let num_keys = keys.len() as u32;
        let num_buckets = num_keys / settings.keys_per_bucket as u32 + 1;

        let mut num_bins =
            (num_keys as f64 / (settings.keys_per_bin as f64 * settings.load_factor)) as u32 + 1;

        // round up to the prime immediately above
        if num_bins % 2 == 0 {
            num_bins += 1;
        }
        while !is_prime(num_bins as u64) {
            num_bins += 2;
        }

        debug!(
            num_keys,
            num_buckets,
            num_bins,
            load_factor = settings.load_factor,
            keys_per_bin = settings.keys_per_bin,
            "creating chd function"
        );

        let mut buckets = vec![Bucket::default(); num_buckets as usize];
        let mut items = vec![Item::default(); num_keys as usize];

        let mut max_probes = ((num_keys as f64).ln() / std::f64::consts::LN_2 / 20.0) as u32;
        if max_probes == 0 {
            max_probes = 1 << 20;
        } else {
            max_probes *= 1 << 20;
        }

        let occup_size = if settings.keys_per_bin == 1 {
            (num_bins as usize).div_ceil(32) * 4
        } else {
            num_bins as usize
        };
        let mut occup = vec![0u8; occup_size];
        let mut disp_table = vec![0u32; num_buckets as usize];

        let mut iterations = settings.iterations;
        let mut seed = 0;
        let mut max_bucket_size = 0;

        while iterations > 0 {
            trace!(iterations, "mapping step");
            seed = self.mapping(
                keys,
                num_bins,
                num_buckets,
                &mut buckets,
                &mut items,
                &mut max_bucket_size,
            )?;

            trace!("ordering step");
            let mut sorted = ordering(
                &mut buckets,
                &mut items,
                num_buckets,
                num_keys,
                max_bucket_size,
            );

            trace!(max_bucket_size, max_probes, "searching step");
            let placed = if settings.use_heuristics {
                place_buckets_heuristic(
                    settings.keys_per_bin,
                    &mut occup,
                    num_bins,
                    &mut buckets,
                    &items,
                    max_bucket_size,
                    &mut sorted,
                    max_probes,
                    &mut disp_table,
                )
            } else {
                place_buckets(
                    settings.keys_per_bin,
                    &mut occup,
                    num_bins,
                    &buckets,
                    &items,
                    max_bucket_size,
                    &sorted,
                    max_probes,
                    &mut disp_table,
                )
            };

            if placed {
                break;
            }
            occup.fill(0);
            iterations -= 1;
        }

        if iterations == 0 {
            debug!("iteration budget exhausted");
            return None;
        }

        trace!("compressing displacements");
        let disp = CompressedSequence::new(&disp_table);

        debug!(seed, "chd function created");
        Some(ChdState {
            seed,
            buckets: num_buckets,
            bins: num_bins,
            keys: num_keys,
            occup,
            disp,
            hasher: self.hasher.clone(),
            _marker: PhantomData,
        })
    }

    /// Builds a minimal perfect hash function over `keys`. Requires
    /// `keys_per_bin == 1` in `settings`.
    pub fn try_create_minimal<K: Hash>(
        &mut self,
        keys: &[K],
        settings: &ChdMinimalSettings,
    ) -> Option<ChdMinimalState<K, S>> {
        let state = self.try_create(keys, settings)?;

        let free_count = state.bins - state.keys;
        let mut free_bins = Vec::with_capacity(free_count as usize);
        for i in 0..state.bins {
            if !bits::get_bit(&state.occup, i) {
                free_bins.push(i);
            }
        }

        let rank = CompressedRank::new(&free_bins);
        Some(ChdMinimalState { state, rank })
    }

    /// Assigns every key to a bucket, retrying with fresh seeds until no
    /// bucket holds two keys with identical (f, h) pairs. Failure here is
    /// final; the caller does not retry it.
    fn mapping<K: Hash>(
        &mut self,
        keys: &[K],
        num_bins: u32,
        num_buckets: u32,
        buckets: &mut [Bucket],
        items: &mut [Item],
        max_bucket_size: &mut u32,
    ) -> Option<u32> {
        let num_keys = keys.len() as u32;
        let mut map_items = vec![MapItem::default(); keys.len()];
        let mut mapping_iterations = 1000;

        while mapping_iterations > 0 {
            let seed = self.seeds.next_seed();

            for bucket in buckets.iter_mut() {
                bucket.size = 0;
            }

            for (i, key) in keys.iter().enumerate() {
                let [h0, h1, h2] = self.hasher.hash3(key, seed);
                let g = h0 % num_buckets;

                map_items[i] = MapItem {
                    bucket: g,
                    f: h1 % num_bins,
                    h: h2 % (num_bins - 1) + 1,
                };

                buckets[g as usize].size += 1;
                if buckets[g as usize].size > *max_bucket_size {
                    *max_bucket_size = buckets[g as usize].size;
                }
            }

            buckets[0].items_list = 0;
            for i in 1..num_buckets as usize {
                buckets[i].items_list = buckets[i - 1].items_list + buckets[i - 1].size;
                buckets[i - 1].size = 0;
            }
            buckets[num_buckets as usize - 1].size = 0;

            let mut inserted = 0;
            while inserted < num_keys {
                if !bucket_insert(buckets, &map_items, items, inserted) {
                    break;
                }
                inserted += 1;
            }

            if inserted == num_keys {
                return Some(seed);
            }
            mapping_iterations -= 1;
        }

        debug!("mapping budget exhausted, keys are too similar or duplicated");
        None
    }
}

fn bucket_insert(buckets: &mut [Bucket], map_items: &[MapItem], items: &mut [Item], idx: u32) -> bool {
    let mi = map_items[idx as usize];
    let bucket = &mut buckets[mi.bucket as usize];

    let mut ptr = bucket.items_list as usize;
    for _ in 0..bucket.size {
        if items[ptr].f == mi.f && items[ptr].h == mi.h {
            return false;
        }
        ptr += 1;
    }

    items[ptr] = Item { f: mi.f, h: mi.h };
    bucket.size += 1;
    true
}

/// Counting sort of buckets by size. Rebuilds the bucket and item arrays in
/// sorted order and returns one (offset, count) list per size class.
fn ordering(
    buckets: &mut Vec<Bucket>,
    items: &mut Vec<Item>,
    num_buckets: u32,
    num_items: u32,
    max_bucket_size: u32,
) -> Vec<SortedList> {
    let mut sorted = vec![SortedList::default(); (max_bucket_size + 1) as usize];

    for bucket in buckets.iter() {
        if bucket.size != 0 {
            sorted[bucket.size as usize].size += 1;
        }
    }

    sorted[1].bucket_list = 0;
    for i in 2..=max_bucket_size as usize {
        sorted[i].bucket_list = sorted[i - 1].bucket_list + sorted[i - 1].size;
        sorted[i - 1].size = 0;
    }
    sorted[max_bucket_size as usize].size = 0;

    let mut out_buckets = vec![Bucket::default(); num_buckets as usize];
    for (i, bucket) in buckets.iter().enumerate() {
        if bucket.size == 0 {
            continue;
        }
        let list = &mut sorted[bucket.size as usize];
        let position = (list.bucket_list + list.size) as usize;
        out_buckets[position] = Bucket {
            items_list: bucket.items_list,
            size: i as u32, // bucket id from here on
        };
        list.size += 1;
    }
    *buckets = out_buckets;

    let mut out_items = vec![Item::default(); num_items as usize];
    let mut position = 0u32;
    for bucket_size in 1..=max_bucket_size {
        let list = sorted[bucket_size as usize];
        for i in list.bucket_list..list.bucket_list + list.size {
            let bucket = &mut buckets[i as usize];
            let mut src = bucket.items_list;
            bucket.items_list = position;
            for _ in 0..bucket_size {
                out_items[position as usize] = items[src as usize];
                position += 1;
                src += 1;
            }
        }
    }
    *items = out_items;

    sorted
}

#[inline]
fn probe_position(item: Item, probe0: u32, probe1: u32, n: u32) -> u32 {
    ((item.f as u64 + item.h as u64 * probe0 as u64 + probe1 as u64) % n as u64) as u32
}

/// Tries to place one bucket under a fixed probe pair. Rolls the occupancy
/// table back when any key of the bucket collides.
fn place_bucket_probe(
    keys_per_bin: u8,
    occup: &mut [u8],
    n: u32,
    buckets: &[Bucket],
    items: &[Item],
    probe0: u32,
    probe1: u32,
    bucket_num: u32,
    size: u32,
) -> bool {
    let start = buckets[bucket_num as usize].items_list as usize;
    let mut placed = 0u32;

    if keys_per_bin > 1 {
        while placed < size {
            let position = probe_position(items[start + placed as usize], probe0, probe1, n);
            if occup[position as usize] >= keys_per_bin {
                break;
            }
            occup[position as usize] += 1;
            placed += 1;
        }
    } else {
        while placed < size {
            let position = probe_position(items[start + placed as usize], probe0, probe1, n);
            if bits::get_bit(occup, position) {
                break;
            }
            bits::set_bit(occup, position);
            placed += 1;
        }
    }

    if placed != size {
        for i in 0..placed {
            let position = probe_position(items[start + i as usize], probe0, probe1, n);
            if keys_per_bin > 1 {
                occup[position as usize] -= 1;
            } else {
                bits::unset_bit(occup, position);
            }
        }
        return false;
    }

    true
}

fn place_bucket(
    keys_per_bin: u8,
    occup: &mut [u8],
    num_bins: u32,
    buckets: &[Bucket],
    items: &[Item],
    max_probes: u32,
    disp_table: &mut [u32],
    bucket_num: u32,
    size: u32,
) -> bool {
    let mut probe0 = 0u32;
    let mut probe1 = 0u32;
    let mut probe_num = 0u32;

    loop {
        if place_bucket_probe(
            keys_per_bin,
            occup,
            num_bins,
            buckets,
            items,
            probe0,
            probe1,
            bucket_num,
            size,
        ) {
            disp_table[buckets[bucket_num as usize].size as usize] = probe0 + probe1 * num_bins;
            return true;
        }

        probe0 += 1;
        if probe0 >= num_bins {
            probe0 -= num_bins;
            probe1 += 1;
        }
        probe_num += 1;
        if probe_num >= max_probes || probe1 >= num_bins {
            return false;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn place_buckets(
    keys_per_bin: u8,
    occup: &mut [u8],
    num_bins: u32,
    buckets: &[Bucket],
    items: &[Item],
    max_bucket_size: u32,
    sorted: &[SortedList],
    max_probes: u32,
    disp_table: &mut [u32],
) -> bool {
    for i in (1..=max_bucket_size).rev() {
        let list = sorted[i as usize];
        for curr in list.bucket_list..list.bucket_list + list.size {
            if !place_bucket(
                keys_per_bin,
                occup,
                num_bins,
                buckets,
                items,
                max_probes,
                disp_table,
                curr,
                i,
            ) {
                return false;
            }
        }
    }
    true
}

/// Heuristic placement: for each size class, try one probe pair against all
/// still-unplaced buckets, compacting the failures to the front of the list
/// and moving to the next pair.
#[allow(clippy::too_many_arguments)]
fn place_buckets_heuristic(
    keys_per_bin: u8,
    occup: &mut [u8],
    num_bins: u32,
    buckets: &mut [Bucket],
    items: &[Item],
    max_bucket_size: u32,
    sorted: &mut [SortedList],
    max_probes: u32,
    disp_table: &mut [u32],
) -> bool {
    for i in (1..=max_bucket_size).rev() {
        let mut probe_num = 0u32;
        let mut probe0 = 0u32;
        let mut probe1 = 0u32;
        let full_size = sorted[i as usize].size;

        while sorted[i as usize].size != 0 {
            let base = sorted[i as usize].bucket_list;
            let mut non_placed = 0u32;

            for j in 0..sorted[i as usize].size {
                let curr = base + j;
                if place_bucket_probe(
                    keys_per_bin,
                    occup,
                    num_bins,
                    buckets,
                    items,
                    probe0,
                    probe1,
                    curr,
                    i,
                ) {
                    disp_table[buckets[curr as usize].size as usize] =
                        probe0 + probe1 * num_bins;
                } else {
                    buckets[(base + non_placed) as usize] = buckets[curr as usize];
                    non_placed += 1;
                }
            }

            sorted[i as usize].size = non_placed;
            probe0 += 1;
            if probe0 >= num_bins {
                probe0 -= num_bins;
                probe1 += 1;
            }
            probe_num += 1;
            if probe_num >= max_probes || probe1 >= num_bins {
                sorted[i as usize].size = full_size;
                return false;
            }
        }

        sorted[i as usize].size = full_size;
    }

    true
}

/// Deterministic Miller-Rabin with witnesses 2, 7 and 61, preceded by small
/// factor checks. Intentionally reports 2, 3, 5 and 7 themselves as
/// composite; bin counts are always far above that.
fn is_prime(n: u64) -> bool {
    if n % 2 == 0 || n % 3 == 0 || n % 5 == 0 || n % 7 == 0 {
        return false;
    }

    let mut s = 0u64;
    let mut d = n - 1;
    loop {
        s += 1;
        d /= 2;
        if d % 2 != 0 {
            break;
        }
    }

    check_witness(int_pow(2, d, n), n, s)
        && check_witness(int_pow(7, d, n), n, s)
        && check_witness(int_pow(61, d, n), n, s)
}

fn int_pow(a: u64, mut d: u64, n: u64) -> u64 {
    let mut a_pow = a;
    let mut res = 1u64;
    while d > 0 {
        if d & 1 == 1 {
            res = res * a_pow % n;
        }
        a_pow = a_pow * a_pow % n;
        d /= 2;
    }
    res
}

fn check_witness(a_exp_d: u64, n: u64, s: u64) -> bool {
    let mut a_exp = a_exp_d;
    if a_exp == 1 || a_exp == n - 1 {
        return true;
    }
    for _ in 1..s {
        a_exp = a_exp * a_exp % n;
        if a_exp == n - 1 {
            return true;
        }
    }
    false
}

/// Perfect (non-minimal) CHD function.
pub struct ChdState<K, S = Xxh3Builder> {
    seed: u32,
    buckets: u32,
    bins: u32,
    keys: u32,
    occup: Vec<u8>,
    disp: CompressedSequence,
    hasher: KeyHasher<S>,
    _marker: PhantomData<fn(&K)>,
}

impl<K, S> ChdState<K, S> {
    /// Number of bins keys are mapped into; the range of [`HashState::search`].
    pub fn bins(&self) -> u32 {
        self.bins
    }
}

impl<K: Hash, S: BuildHasher> HashState<K> for ChdState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let [h0, h1, h2] = self.hasher.hash3(key, self.seed);
        let g = h0 % self.buckets;
        let f = h1 % self.bins;
        let h = h2 % (self.bins - 1) + 1;

        let disp = self.disp.query(g);
        let probe0 = disp % self.bins;
        let probe1 = disp / self.bins;

        probe_position(Item { f, h }, probe0, probe1, self.bins)
    }

    fn packed_size(&self) -> usize {
        4 + 4 + 4 + 4 + u8_all_size(self.occup.len()) + self.disp.packed_size()
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        self.pack_into(&mut w);
    }
}

impl<K: Hash, S: BuildHasher> ChdState<K, S> {
    fn pack_into(&self, w: &mut PackedWriter<'_>) {
        w.write_u32(self.seed);
        w.write_u32(self.buckets);
        w.write_u32(self.bins);
        w.write_u32(self.keys);
        w.write_u8_all(&self.occup);
        self.disp.pack(w);
    }
}

impl<K> ChdState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> ChdState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        Self::unpack_from(&mut r, build)
    }

    fn unpack_from(r: &mut PackedReader<'_>, build: S) -> Self {
        let seed = r.read_u32();
        let buckets = r.read_u32();
        let bins = r.read_u32();
        let keys = r.read_u32();
        let occup = r.read_u8_vec();
        let disp = CompressedSequence::unpack(r);
        Self {
            seed,
            buckets,
            bins,
            keys,
            occup,
            disp,
            hasher: KeyHasher::with_build_hasher(build),
            _marker: PhantomData,
        }
    }
}

/// Minimal CHD function.
pub struct ChdMinimalState<K, S = Xxh3Builder> {
    state: ChdState<K, S>,
    rank: CompressedRank,
}

impl<K: Hash, S: BuildHasher> HashState<K> for ChdMinimalState<K, S> {
    fn search(&self, key: &K) -> u32 {
        let idx = self.state.search(key);
        idx - self.rank.query(idx)
    }

    fn packed_size(&self) -> usize {
        self.state.packed_size() + self.rank.packed_size()
    }

    fn pack(&self, buffer: &mut [u8]) {
        let mut w = PackedWriter::new(buffer);
        self.state.pack_into(&mut w);
        self.rank.pack(&mut w);
    }
}

impl<K> ChdMinimalState<K, Xxh3Builder> {
    pub fn unpack(packed: &[u8]) -> Self {
        Self::unpack_with(packed, Xxh3Builder::new())
    }
}

impl<K, S: BuildHasher> ChdMinimalState<K, S> {
    /// `build` must equal the build hasher used when the state was created.
    pub fn unpack_with(packed: &[u8], build: S) -> Self {
        let mut r = PackedReader::new(packed);
        let state = ChdState::unpack_from(&mut r, build);
        let rank = CompressedRank::unpack(&mut r);
        Self { state, rank }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_is_prime_and_odd() {
        // the witness set rejects small primes on purpose
        assert!(!is_prime(3));
        assert!(!is_prime(7));
        assert!(is_prime(11));
        assert!(is_prime(13));
        assert!(!is_prime(15));
        assert!(is_prime(104_729));
        assert!(!is_prime(104_731));
    }

    #[test]
    fn perfect_variant_respects_bin_capacity() {
        let keys: Vec<String> = (0..300).map(|i| format!("chd/{i}")).collect();
        let mut builder = ChdBuilder::with_seed(9);
        let state = builder.try_create(&keys, &ChdSettings::default()).unwrap();

        let mut seen = std::collections::HashSet::new();
        for key in &keys {
            let bin = state.search(key);
            assert!(bin < state.bins());
            assert!(seen.insert(bin), "{key} collided");
        }
    }

    #[test]
    fn two_keys_per_bin_bounds_collisions() {
        let keys: Vec<String> = (0..200).map(|i| format!("pair-{i}")).collect();
        let mut settings = ChdSettings::default();
        settings.set_keys_per_bin(2).unwrap();

        let mut builder = ChdBuilder::with_seed(31);
        let state = builder.try_create(&keys, &settings).unwrap();

        let mut counts = std::collections::HashMap::new();
        for key in &keys {
            *counts.entry(state.search(key)).or_insert(0u32) += 1;
        }
        assert!(counts.values().all(|&c| c <= 2));
    }

    #[test]
    fn minimal_is_a_bijection() {
        let keys = ["elephant", "goat", "horse", "cow"];
        let mut builder = ChdBuilder::with_seed(4);
        let state = builder
            .try_create_minimal(&keys, &ChdMinimalSettings::default())
            .unwrap();

        let mut values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
        values.sort_unstable();
        assert_eq!(values, [0, 1, 2, 3]);
    }

    #[test]
    fn non_heuristic_placement_also_works() {
        let keys: Vec<String> = (0..150).map(|i| format!("direct{i}")).collect();
        let mut settings = ChdSettings::default();
        settings.set_use_heuristics(false);

        let mut builder = ChdBuilder::with_seed(77);
        let state = builder.try_create_minimal(&keys, &settings).unwrap();

        let mut seen = vec![false; keys.len()];
        for key in &keys {
            let idx = state.search(key) as usize;
            assert!(idx < keys.len());
            assert!(!seen[idx]);
            seen[idx] = true;
        }
    }

    #[test]
    fn settings_reject_out_of_range() {
        let mut settings = ChdSettings::default();
        assert!(settings.set_load_factor(0.4).is_err());
        assert!(settings.set_load_factor(1.0).is_err());
        assert!(settings.set_keys_per_bin(0).is_err());
        assert!(settings.set_keys_per_bucket(33).is_err());
        assert!(settings.set_load_factor(0.99).is_ok());
    }
}
