//! Seeded key hashing shared by every construction algorithm.
//!
//! Each algorithm needs 1, 2 or 3 independent 32-bit values per (key, seed)
//! pair. The base value folds the key's equality hash together with the seed
//! through two rotate-multiply rounds and an avalanche finish; the 2nd and
//! 3rd values chain a murmur-style finalizer so they are decorrelated from
//! the base. Equal key + equal seed always produces equal values, and
//! distinct seeds behave as independent draws, which is what the retry loops
//! rely on.

use std::hash::{BuildHasher, Hash};
use xxhash_rust::xxh3::Xxh3Builder;

const PRIME2: u32 = 2_246_822_519;
const PRIME3: u32 = 3_266_489_917;
const PRIME4: u32 = 668_265_263;
const PRIME5: u32 = 374_761_393;

/// Derives seeded hash values from a caller-supplied equality hash.
///
/// The default equality hash is xxh3 with a fixed seed, so functions built in
/// one process evaluate identically after `unpack` in another. Supplying a
/// custom [`BuildHasher`] changes what "equal keys" means; the same build
/// hasher must then be passed to `unpack`.
#[derive(Debug, Clone, Default)]
pub struct KeyHasher<S = Xxh3Builder> {
    build: S,
}

impl KeyHasher<Xxh3Builder> {
    pub fn new() -> Self {
        Self {
            build: Xxh3Builder::new(),
        }
    }
}

impl<S: BuildHasher> KeyHasher<S> {
    pub fn with_build_hasher(build: S) -> Self {
        Self { build }
    }

    #[inline]
    fn equality_hash<K: Hash + ?Sized>(&self, key: &K) -> u32 {
        self.build.hash_one(key) as u32
    }

    #[inline]
    pub(crate) fn hash1<K: Hash + ?Sized>(&self, key: &K, seed: u32) -> u32 {
        combine(self.equality_hash(key), seed)
    }

    #[inline]
    pub(crate) fn hash3<K: Hash + ?Sized>(&self, key: &K, seed: u32) -> [u32; 3] {
        let h0 = combine(self.equality_hash(key), seed);
        let h1 = murmur32(h0);
        let h2 = murmur32(h1);
        [h0, h1, h2]
    }
}

/// Two rotate-multiply rounds over (hc, seed) plus an avalanche finish.
#[inline]
fn combine(hc: u32, seed: u32) -> u32 {
    let mut hash = 42u32.wrapping_add(PRIME5);

    let v = hash.wrapping_add(hc.wrapping_mul(PRIME3));
    hash = v.rotate_left(17).wrapping_mul(PRIME4);

    let v = hash.wrapping_add(seed.wrapping_mul(PRIME3));
    hash = v.rotate_left(17).wrapping_mul(PRIME4);

    hash ^= hash >> 15;
    hash = hash.wrapping_mul(PRIME2);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(PRIME3);
    hash ^ (hash >> 16)
}

/// Murmur3 finalizer, used to spawn the 2nd and 3rd value from the base.
#[inline]
fn murmur32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}
