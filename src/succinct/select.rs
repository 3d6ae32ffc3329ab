//! Constant-time select over a unary-coded non-decreasing sequence.
//!
//! `n` values in `[0, m]` are encoded as a bit vector where the j-th set bit
//! sits at position `value[j] + j`; a sample table records the position of
//! every 128th set bit, and queries finish the scan bytewise with popcount
//! and select-in-byte tables.

use crate::packing::{PackedReader, PackedWriter, u32_all_size};

const NBITS_STEP: u32 = 7;
const STEP: u32 = 128;
const MASK_STEP: u32 = 127;

const BYTE_POPCOUNT: [u8; 256] = build_popcount();
/// `BYTE_SELECT[b][k]` is the bit position of the (k+1)-th set bit of `b`,
/// or 255 when `b` has fewer than k+1 set bits.
const BYTE_SELECT: [[u8; 8]; 256] = build_select();

const fn build_popcount() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        table[b] = (b as u8).count_ones() as u8;
        b += 1;
    }
    table
}

const fn build_select() -> [[u8; 8]; 256] {
    let mut table = [[255u8; 8]; 256];
    let mut b = 0;
    while b < 256 {
        let mut rank = 0;
        let mut bit = 0;
        while bit < 8 {
            if b & (1 << bit) != 0 {
                table[b][rank] = bit as u8;
                rank += 1;
            }
            bit += 1;
        }
        b += 1;
    }
    table
}

pub(crate) struct Select {
    n: u32,
    m: u32,
    select_table: Vec<u32>,
    pub(crate) bits_vec: Vec<u32>,
}

impl Select {
    /// Encodes `keys_vec`, a non-decreasing sequence of `n` values in
    /// `[0, m]`.
    pub(crate) fn new(keys_vec: &[u32], n: u32, m: u32) -> Self {
        let nbits = n + m;
        let mut bits_vec = vec![0u32; ((nbits + 31) >> 5) as usize];
        let select_table = vec![0u32; ((n >> NBITS_STEP) + 1) as usize];

        // interleave: a 1 per value, a 0 per unit of increase
        let mut idx = 0u32;
        let mut i = 0u32;
        let mut j = 0u32;
        if n > 0 {
            'outer: loop {
                while keys_vec[j as usize] == i {
                    bits_vec[(idx >> 5) as usize] |= 1 << (idx & 31);
                    idx += 1;
                    j += 1;
                    if j == n {
                        break 'outer;
                    }
                }
                if i == m {
                    break;
                }
                while keys_vec[j as usize] > i {
                    idx += 1;
                    i += 1;
                }
            }
        }

        let mut sel = Self {
            n,
            m,
            select_table,
            bits_vec,
        };
        sel.generate_table();
        sel
    }

    #[inline]
    fn byte(&self, byte_idx: u32) -> usize {
        ((self.bits_vec[(byte_idx >> 2) as usize] >> ((byte_idx & 3) << 3)) & 0xff) as usize
    }

    fn generate_table(&mut self) {
        let mut part_sum = 0u32;
        let mut vec_idx = 0u32;
        let mut one_idx = 0u32;
        let mut table_idx = 0usize;

        while one_idx < self.n {
            let mut old_part_sum;
            loop {
                old_part_sum = part_sum;
                part_sum += BYTE_POPCOUNT[self.byte(vec_idx)] as u32;
                vec_idx += 1;
                if part_sum > one_idx {
                    break;
                }
            }
            self.select_table[table_idx] = BYTE_SELECT[self.byte(vec_idx - 1)]
                [(one_idx - old_part_sum) as usize] as u32
                + ((vec_idx - 1) << 3);
            one_idx += STEP;
            table_idx += 1;
        }
    }

    /// Bit position of the (`one_idx` + 1)-th set bit. The encoded value is
    /// `query(j) - j`.
    pub(crate) fn query(&self, mut one_idx: u32) -> u32 {
        let vec_bit_idx = self.select_table[(one_idx >> NBITS_STEP) as usize];
        let mut vec_byte_idx = vec_bit_idx >> 3;

        one_idx &= MASK_STEP;
        one_idx += BYTE_POPCOUNT[self.byte(vec_byte_idx) & ((1 << (vec_bit_idx & 7)) - 1)] as u32;

        let mut part_sum = 0u32;
        let mut old_part_sum;
        loop {
            old_part_sum = part_sum;
            part_sum += BYTE_POPCOUNT[self.byte(vec_byte_idx)] as u32;
            vec_byte_idx += 1;
            if part_sum > one_idx {
                break;
            }
        }

        BYTE_SELECT[self.byte(vec_byte_idx - 1)][(one_idx - old_part_sum) as usize] as u32
            + ((vec_byte_idx - 1) << 3)
    }

    /// Bit position of the first set bit after position `vec_bit_idx`.
    pub(crate) fn next_query(&self, vec_bit_idx: u32) -> u32 {
        let mut vec_byte_idx = vec_bit_idx >> 3;
        let one_idx =
            BYTE_POPCOUNT[self.byte(vec_byte_idx) & ((1 << (vec_bit_idx & 7)) - 1)] as u32 + 1;

        let mut part_sum = 0u32;
        let mut old_part_sum;
        loop {
            old_part_sum = part_sum;
            part_sum += BYTE_POPCOUNT[self.byte(vec_byte_idx)] as u32;
            vec_byte_idx += 1;
            if part_sum > one_idx {
                break;
            }
        }

        BYTE_SELECT[self.byte(vec_byte_idx - 1)][(one_idx - old_part_sum) as usize] as u32
            + ((vec_byte_idx - 1) << 3)
    }

    pub(crate) fn packed_size(&self) -> usize {
        4 + 4 + u32_all_size(self.select_table.len()) + u32_all_size(self.bits_vec.len())
    }

    pub(crate) fn pack(&self, writer: &mut PackedWriter<'_>) {
        writer.write_u32(self.n);
        writer.write_u32(self.m);
        writer.write_u32_all(&self.select_table);
        writer.write_u32_all(&self.bits_vec);
    }

    pub(crate) fn unpack(reader: &mut PackedReader<'_>) -> Self {
        let n = reader.read_u32();
        let m = reader.read_u32();
        let select_table = reader.read_u32_vec();
        let bits_vec = reader.read_u32_vec();
        Self {
            n,
            m,
            select_table,
            bits_vec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(vals: &[u32], m: u32) {
        let sel = Select::new(vals, vals.len() as u32, m);
        for (j, &v) in vals.iter().enumerate() {
            assert_eq!(sel.query(j as u32), v + j as u32, "value {j} of {vals:?}");
        }
    }

    #[test]
    fn query_recovers_encoded_values() {
        check(&[0, 0, 1, 4, 4, 7], 7);
        check(&[3, 3, 3], 3);
        check(&[0], 0);
    }

    #[test]
    fn query_spans_sample_steps() {
        let vals: Vec<u32> = (0..1000).map(|i| i / 3).collect();
        check(&vals, vals[vals.len() - 1]);
    }

    #[test]
    fn next_query_finds_following_set_bit() {
        let vals = [0u32, 2, 2, 5];
        let sel = Select::new(&vals, vals.len() as u32, 5);
        for j in 0..vals.len() as u32 - 1 {
            assert_eq!(sel.next_query(sel.query(j)), sel.query(j + 1));
        }
    }

    #[test]
    fn pack_roundtrip_preserves_queries() {
        let vals: Vec<u32> = (0..300).map(|i| i * 2 / 5).collect();
        let sel = Select::new(&vals, vals.len() as u32, vals[vals.len() - 1]);

        let mut buf = vec![0u8; sel.packed_size()];
        sel.pack(&mut PackedWriter::new(&mut buf));
        let back = Select::unpack(&mut PackedReader::new(&buf));

        for j in 0..vals.len() as u32 {
            assert_eq!(back.query(j), sel.query(j));
        }
    }
}
