//! Compressed rank over a sorted list of u32 values.
//!
//! `query(x)` returns how many stored values are strictly below `x`. Values
//! are split into low-bit remainders and a [`Select`] over their quotients.
//! The minimal compress-hash-displace state uses this to subtract the free
//! slots below a probe position.

use crate::bits;
use crate::packing::{PackedReader, PackedWriter, u32_all_size};
use crate::succinct::Select;

pub(crate) struct CompressedRank {
    max_value: u32,
    remainder_bits: u32,
    count: u32,
    value_rems: Vec<u32>,
    sel: Select,
}

impl CompressedRank {
    /// Builds the rank over `vals`, which must be sorted ascending and
    /// non-empty.
    pub(crate) fn new(vals: &[u32]) -> Self {
        let count = vals.len() as u32;
        let max_value = vals[vals.len() - 1];

        let mut remainder_bits = bits::log2_floor(max_value / count);
        if remainder_bits == 0 {
            remainder_bits = 1;
        }

        let quot_count = max_value >> remainder_bits;
        let mut select_vec = vec![0u32; quot_count as usize];
        let mut value_rems = vec![0u32; bits::bits_table_size(count, remainder_bits)];
        let rems_mask = bits::field_mask(remainder_bits);

        for (i, &v) in vals.iter().enumerate() {
            bits::set_bits_value(
                &mut value_rems,
                i as u32,
                v & rems_mask,
                remainder_bits,
                rems_mask,
            );
        }

        // select_vec[q - 1] = index of the first value with quotient >= q
        let mut j = 0u32;
        for q in 1..=quot_count {
            while q > vals[j as usize] >> remainder_bits {
                j += 1;
            }
            select_vec[(q - 1) as usize] = j;
        }

        let sel = Select::new(&select_vec, quot_count, count);

        Self {
            max_value,
            remainder_bits,
            count,
            value_rems,
            sel,
        }
    }

    /// Number of stored values strictly below `idx`.
    pub(crate) fn query(&self, idx: u32) -> u32 {
        if idx > self.max_value {
            return self.count;
        }

        let quot = idx >> self.remainder_bits;
        let rems_mask = bits::field_mask(self.remainder_bits);
        let rem = idx & rems_mask;

        let (mut sel_res, mut rank) = if quot == 0 {
            (0, 0)
        } else {
            let s = self.sel.query(quot - 1) + 1;
            (s, s - quot)
        };

        loop {
            if bits::get_bit32(&self.sel.bits_vec, sel_res) {
                break;
            }
            if bits::get_bits_value(&self.value_rems, rank, self.remainder_bits, rems_mask) >= rem {
                break;
            }
            sel_res += 1;
            rank += 1;
        }

        rank
    }

    pub(crate) fn packed_size(&self) -> usize {
        4 + 4 + 4 + u32_all_size(self.value_rems.len()) + self.sel.packed_size()
    }

    pub(crate) fn pack(&self, writer: &mut PackedWriter<'_>) {
        writer.write_u32(self.max_value);
        writer.write_u32(self.remainder_bits);
        writer.write_u32(self.count);
        writer.write_u32_all(&self.value_rems);
        self.sel.pack(writer);
    }

    pub(crate) fn unpack(reader: &mut PackedReader<'_>) -> Self {
        let max_value = reader.read_u32();
        let remainder_bits = reader.read_u32();
        let count = reader.read_u32();
        let value_rems = reader.read_u32_vec();
        let sel = Select::unpack(reader);
        Self {
            max_value,
            remainder_bits,
            count,
            value_rems,
            sel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(vals: &[u32], idx: u32) -> u32 {
        vals.iter().filter(|&&v| v < idx).count() as u32
    }

    #[test]
    fn matches_naive_rank() {
        let vals = [2u32, 3, 5, 9];
        let cr = CompressedRank::new(&vals);
        for idx in 0..=12 {
            assert_eq!(cr.query(idx), naive(&vals, idx), "idx {idx}");
        }
    }

    #[test]
    fn matches_naive_on_sparse_values() {
        let vals: Vec<u32> = (0..400u32).map(|i| i * 97 + (i % 5)).collect();
        let cr = CompressedRank::new(&vals);
        for idx in (0..40_000u32).step_by(331) {
            assert_eq!(cr.query(idx), naive(&vals, idx));
        }
        assert_eq!(cr.query(u32::MAX), vals.len() as u32);
    }

    #[test]
    fn pack_roundtrip_preserves_queries() {
        let vals = [0u32, 7, 7, 30, 31, 900];
        let cr = CompressedRank::new(&vals);

        let mut buf = vec![0u8; cr.packed_size()];
        cr.pack(&mut PackedWriter::new(&mut buf));
        let back = CompressedRank::unpack(&mut PackedReader::new(&buf));

        for idx in 0..1000 {
            assert_eq!(back.query(idx), cr.query(idx));
        }
    }
}
