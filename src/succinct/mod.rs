//! Succinct helpers backing the compress-hash-displace states: constant-time
//! select over a unary-coded bit vector, an entropy-coded integer sequence
//! for displacement values, and a compressed rank over the free-slot list.

mod rank;
mod select;
mod sequence;

pub(crate) use rank::CompressedRank;
pub(crate) use select::Select;
pub(crate) use sequence::CompressedSequence;
