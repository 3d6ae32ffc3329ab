//! Entropy-coded sequence of u32 values with random access.
//!
//! Each value is stored as `value - (2^len - 1)` in `len = floor(log2(v+1))`
//! bits; zero takes no bits at all. The cumulative bit offsets are split into
//! a low-bits remainder array and a [`Select`] over the high bits, which is
//! what makes `query` constant time.

use crate::bits;
use crate::packing::{PackedReader, PackedWriter, u32_all_size};
use crate::succinct::Select;

pub(crate) struct CompressedSequence {
    remainder_bits: u32,
    total_bits: u32,
    length_rems: Vec<u32>,
    store_table: Vec<u32>,
    sel: Select,
}

impl CompressedSequence {
    pub(crate) fn new(vals: &[u32]) -> Self {
        let n = vals.len() as u32;
        let mut lengths = vec![0u32; vals.len()];

        let mut total_bits = 0u32;
        for (i, &v) in vals.iter().enumerate() {
            if v != 0 {
                lengths[i] = bits::log2_floor(v + 1);
                total_bits += lengths[i];
            }
        }

        let mut store_table = vec![0u32; ((total_bits + 31) >> 5) as usize];
        total_bits = 0;
        for (i, &v) in vals.iter().enumerate() {
            if v == 0 {
                continue;
            }
            let stored = v - ((1u32 << lengths[i]) - 1);
            bits::set_bits_at_pos(&mut store_table, total_bits, stored, lengths[i]);
            total_bits += lengths[i];
        }

        let mut remainder_bits = bits::log2_floor(total_bits / n);
        if remainder_bits == 0 {
            remainder_bits = 1;
        }

        let mut length_rems = vec![0u32; bits::bits_table_size(n, remainder_bits)];
        let rems_mask = bits::field_mask(remainder_bits);

        total_bits = 0;
        for i in 0..n as usize {
            total_bits += lengths[i];
            bits::set_bits_value(
                &mut length_rems,
                i as u32,
                total_bits & rems_mask,
                remainder_bits,
                rems_mask,
            );
            lengths[i] = total_bits >> remainder_bits;
        }

        let sel = Select::new(&lengths, n, total_bits >> remainder_bits);

        Self {
            remainder_bits,
            total_bits,
            length_rems,
            store_table,
            sel,
        }
    }

    pub(crate) fn query(&self, idx: u32) -> u32 {
        let rems_mask = bits::field_mask(self.remainder_bits);

        let (enc_idx, sel_res) = if idx == 0 {
            (0, self.sel.query(idx))
        } else {
            let sel_res = self.sel.query(idx - 1);
            let mut enc_idx = (sel_res - (idx - 1)) << self.remainder_bits;
            enc_idx += bits::get_bits_value(
                &self.length_rems,
                idx - 1,
                self.remainder_bits,
                rems_mask,
            );
            (enc_idx, self.sel.next_query(sel_res))
        };

        let mut enc_length = (sel_res - idx) << self.remainder_bits;
        enc_length += bits::get_bits_value(&self.length_rems, idx, self.remainder_bits, rems_mask);
        enc_length -= enc_idx;

        if enc_length == 0 {
            return 0;
        }

        let stored = bits::get_bits_at_pos(&self.store_table, enc_idx, enc_length);
        stored + ((1u32 << enc_length) - 1)
    }

    pub(crate) fn packed_size(&self) -> usize {
        4 + 4
            + u32_all_size(self.length_rems.len())
            + u32_all_size(self.store_table.len())
            + self.sel.packed_size()
    }

    pub(crate) fn pack(&self, writer: &mut PackedWriter<'_>) {
        writer.write_u32(self.remainder_bits);
        writer.write_u32(self.total_bits);
        writer.write_u32_all(&self.length_rems);
        writer.write_u32_all(&self.store_table);
        self.sel.pack(writer);
    }

    pub(crate) fn unpack(reader: &mut PackedReader<'_>) -> Self {
        let remainder_bits = reader.read_u32();
        let total_bits = reader.read_u32();
        let length_rems = reader.read_u32_vec();
        let store_table = reader.read_u32_vec();
        let sel = Select::unpack(reader);
        Self {
            remainder_bits,
            total_bits,
            length_rems,
            store_table,
            sel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(vals: &[u32]) {
        let cs = CompressedSequence::new(vals);
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(cs.query(i as u32), v, "index {i} of {vals:?}");
        }
    }

    #[test]
    fn query_recovers_values() {
        check(&[0, 1, 2, 3, 1000, 0, 7]);
        check(&[0, 0, 0, 0]);
        check(&[u32::MAX - 1, 0, 12345]);
    }

    #[test]
    fn query_handles_long_sequences() {
        let vals: Vec<u32> = (0..2000u32).map(|i| i.wrapping_mul(2654435761) % 513).collect();
        check(&vals);
    }

    #[test]
    fn pack_roundtrip_preserves_queries() {
        let vals: Vec<u32> = (0..200u32).map(|i| (i * 37) % 91).collect();
        let cs = CompressedSequence::new(&vals);

        let mut buf = vec![0u8; cs.packed_size()];
        cs.pack(&mut PackedWriter::new(&mut buf));
        let back = CompressedSequence::unpack(&mut PackedReader::new(&buf));

        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(back.query(i as u32), v);
        }
    }
}
