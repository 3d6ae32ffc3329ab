//! mphkit — perfect and minimal perfect hash functions over static key sets.
//!
//! Five construction algorithms, each with its own speed/size trade-off:
//!
//! - **BDZ**: 3-hypergraph peeling. Perfect and minimal variants, about 2.6
//!   bits per key for the minimal one.
//! - **BMZ**: cyclic random graphs. Minimal, fast lookups, roughly one u32
//!   per vertex.
//! - **CHM**: acyclic random graphs. Minimal and order preserving: the i-th
//!   key maps to i.
//! - **CHD**: compress, hash, displace. Perfect (optionally t-perfect) and
//!   minimal variants, the most compact of the five.
//! - **FCH**: one-probe tables for small key sets, under 4 bits per key.
//!
//! A builder consumes a slice of unique keys and yields a state. States
//! evaluate with [`HashState::search`] and serialize to a compact
//! byte-exact layout with [`HashState::pack`]; `unpack` restores a state
//! that evaluates identically, in another process or from a file.
//!
//! ```
//! use mphkit::{ChdBuilder, ChdMinimalSettings, HashState};
//!
//! let keys = ["elephant", "goat", "horse", "cow"];
//! let mut builder = ChdBuilder::with_seed(4);
//! let state = builder
//!     .try_create_minimal(&keys, &ChdMinimalSettings::default())
//!     .unwrap();
//!
//! let mut values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
//! values.sort_unstable();
//! assert_eq!(values, [0, 1, 2, 3]);
//! ```
//!
//! Construction is randomized. Builders made with `new()` draw seeds from
//! entropy; `with_seed` makes the whole build, including the packed bytes,
//! reproducible. All builders return `None` when their iteration budget runs
//! out, which is the expected outcome for duplicate keys.

mod bdz;
mod bits;
mod bmz;
mod buckets;
mod chd;
mod chm;
mod error;
mod fch;
mod graph;
mod hashing;
mod hypergraph;
mod packing;
mod seed;
mod succinct;

pub use bdz::{BdzBuilder, BdzMinimalSettings, BdzMinimalState, BdzSettings, BdzState};
pub use bmz::{BmzBuilder, BmzMinimalSettings, BmzMinimalState};
pub use chd::{ChdBuilder, ChdMinimalSettings, ChdMinimalState, ChdSettings, ChdState};
pub use chm::{ChmBuilder, ChmMinimalSettings, ChmMinimalState};
pub use error::SettingsError;
pub use fch::{FchBuilder, FchMinimalSettings, FchMinimalState};
pub use hashing::KeyHasher;
pub use seed::SeedSource;

/// A constructed hash function.
///
/// Minimal states map their n keys onto `0..n` bijectively; perfect states
/// map them into a larger range without collisions. Keys outside the build
/// set still produce a value, just with no uniqueness guarantee, so callers
/// that probe unknown keys must verify the result themselves.
pub trait HashState<K> {
    /// Hash value of `key`.
    fn search(&self, key: &K) -> u32;

    /// Exact number of bytes [`pack`](Self::pack) writes.
    fn packed_size(&self) -> usize;

    /// Serializes the state into `buffer`, which must hold at least
    /// [`packed_size`](Self::packed_size) bytes. Little-endian, stable
    /// across platforms.
    fn pack(&self, buffer: &mut [u8]);
}
