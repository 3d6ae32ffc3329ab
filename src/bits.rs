//! Packed bit and bit-field primitives.
//!
//! Three families live here: 1-bit and 2-bit arrays over bytes (used by the
//! graph peeling and BDZ value tables), and fixed-width bit fields over u32
//! words (used by the succinct structures, both index-addressed and
//! bit-position-addressed).

/// Mask that clears field `i % 4` of a 2-bit-packed byte.
const VALUE_MASK: [u8; 4] = [0xfc, 0xf3, 0xcf, 0x3f];

#[inline]
pub(crate) fn get_bit(bits: &[u8], i: u32) -> bool {
    bits[(i >> 3) as usize] >> (i & 7) & 1 != 0
}

#[inline]
pub(crate) fn set_bit(bits: &mut [u8], i: u32) {
    bits[(i >> 3) as usize] |= 1 << (i & 7);
}

#[inline]
pub(crate) fn unset_bit(bits: &mut [u8], i: u32) {
    bits[(i >> 3) as usize] ^= 1 << (i & 7);
}

/// Reads field `i` of a 2-bit-packed array.
#[inline]
pub(crate) fn get_2bit(table: &[u8], i: u32) -> u8 {
    (table[(i >> 2) as usize] >> ((i & 3) << 1)) & 3
}

/// Stores a 2-bit field by AND; correct when the field currently holds 0b11.
#[inline]
pub(crate) fn store_2bit_and(table: &mut [u8], i: u32, v: u32) {
    table[(i >> 2) as usize] &= ((v << ((i & 3) << 1)) as u8) | VALUE_MASK[(i & 3) as usize];
}

/// Stores a 2-bit field by OR; correct when the field currently holds 0b00.
#[inline]
pub(crate) fn store_2bit_or(table: &mut [u8], i: u32, v: u32) {
    table[(i >> 2) as usize] |= (v << ((i & 3) << 1)) as u8;
}

/// Number of u32 words needed for `n` fields of `width` bits.
#[inline]
pub(crate) fn bits_table_size(n: u32, width: u32) -> usize {
    ((n as u64 * width as u64 + 31) >> 5) as usize
}

#[inline]
pub(crate) fn field_mask(width: u32) -> u32 {
    ((1u64 << width) - 1) as u32
}

#[inline]
pub(crate) fn get_bit32(words: &[u32], i: u32) -> bool {
    words[(i >> 5) as usize] >> (i & 31) & 1 != 0
}

/// Writes `value` (`width` bits) starting at absolute bit position `pos`.
pub(crate) fn set_bits_at_pos(words: &mut [u32], pos: u32, value: u32, width: u32) {
    let word_idx = (pos >> 5) as usize;
    let shift1 = pos & 31;
    let shift2 = 32 - shift1;
    let mask = field_mask(width);

    words[word_idx] &= !(mask << shift1);
    words[word_idx] |= value << shift1;

    if shift2 < width {
        words[word_idx + 1] &= !(mask >> shift2);
        words[word_idx + 1] |= value >> shift2;
    }
}

/// Reads `width` bits starting at absolute bit position `pos`.
pub(crate) fn get_bits_at_pos(words: &[u32], pos: u32, width: u32) -> u32 {
    let word_idx = (pos >> 5) as usize;
    let shift1 = pos & 31;
    let shift2 = 32 - shift1;
    let mask = field_mask(width);
    let mut value = (words[word_idx] >> shift1) & mask;

    if shift2 < width {
        value |= (words[word_idx + 1] << shift2) & mask;
    }

    value
}

/// Writes field `index` of a `width`-bit field array.
pub(crate) fn set_bits_value(words: &mut [u32], index: u32, value: u32, width: u32, mask: u32) {
    let bit_idx = index * width;
    let word_idx = (bit_idx >> 5) as usize;
    let shift1 = bit_idx & 31;
    let shift2 = 32 - shift1;

    words[word_idx] &= !(mask << shift1);
    words[word_idx] |= value << shift1;

    if shift2 < width {
        words[word_idx + 1] &= !(mask >> shift2);
        words[word_idx + 1] |= value >> shift2;
    }
}

/// Reads field `index` of a `width`-bit field array.
pub(crate) fn get_bits_value(words: &[u32], index: u32, width: u32, mask: u32) -> u32 {
    let bit_idx = index * width;
    let word_idx = (bit_idx >> 5) as usize;
    let shift1 = bit_idx & 31;
    let shift2 = 32 - shift1;
    let mut value = (words[word_idx] >> shift1) & mask;

    if shift2 < width {
        value |= (words[word_idx + 1] << shift2) & mask;
    }

    value
}

/// floor(log2(x)) for x > 1; 0 for x <= 1.
#[inline]
pub(crate) fn log2_floor(mut x: u32) -> u32 {
    let mut res = 0;
    while x > 1 {
        x >>= 1;
        res += 1;
    }
    res
}
