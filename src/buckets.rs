//! Bucket container for the one-probe builder's mapping and ordering steps.
//!
//! Buckets hold key indices into the caller's slice, not keys, so the
//! container stays key-type agnostic. Ordering is a counting sort on bucket
//! size, largest bucket first, returning the bucket indices in that order.

pub(crate) struct Buckets {
    values: Vec<Vec<u32>>,
    max_size: u32,
}

impl Buckets {
    pub(crate) fn new(bucket_count: u32) -> Self {
        Self {
            values: vec![Vec::new(); bucket_count as usize],
            max_size: 0,
        }
    }

    pub(crate) fn insert(&mut self, bucket: u32, key_index: u32) {
        let b = &mut self.values[bucket as usize];
        b.push(key_index);
        self.max_size = self.max_size.max(b.len() as u32);
    }

    pub(crate) fn size(&self, bucket: u32) -> u32 {
        self.values[bucket as usize].len() as u32
    }

    pub(crate) fn key_index(&self, bucket: u32, slot: u32) -> u32 {
        self.values[bucket as usize][slot as usize]
    }

    pub(crate) fn bucket_count(&self) -> u32 {
        self.values.len() as u32
    }

    /// Bucket indices ordered by descending size, via counting sort. Buckets
    /// of equal size keep their relative order.
    pub(crate) fn indexes_sorted_by_size(&self) -> Vec<u32> {
        let max = self.max_size as usize;
        let mut per_size = vec![0u32; max + 1];
        let mut sorted = vec![0u32; self.values.len()];

        for bucket in &self.values {
            per_size[bucket.len()] += 1;
        }

        // turn counts into offsets, largest size first
        let mut value = per_size[max];
        let mut sum = 0;
        per_size[max] = 0;
        for i in (0..max).rev() {
            sum += value;
            value = per_size[i];
            per_size[i] = sum;
        }

        for (i, bucket) in self.values.iter().enumerate() {
            sorted[per_size[bucket.len()] as usize] = i as u32;
            per_size[bucket.len()] += 1;
        }

        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_sizes_and_contents() {
        let mut b = Buckets::new(3);
        b.insert(1, 10);
        b.insert(1, 11);
        b.insert(2, 12);
        assert_eq!(b.bucket_count(), 3);
        assert_eq!(b.size(0), 0);
        assert_eq!(b.size(1), 2);
        assert_eq!(b.key_index(1, 1), 11);
        assert_eq!(b.key_index(2, 0), 12);
    }

    #[test]
    fn ordering_is_descending_by_size() {
        let mut b = Buckets::new(4);
        b.insert(0, 0);
        b.insert(2, 1);
        b.insert(2, 2);
        b.insert(2, 3);
        b.insert(3, 4);
        b.insert(3, 5);

        let order = b.indexes_sorted_by_size();
        assert_eq!(order, [2, 3, 0, 1]);
    }

    #[test]
    fn ordering_handles_all_empty() {
        let b = Buckets::new(3);
        assert_eq!(b.indexes_sorted_by_size(), [0, 1, 2]);
    }
}
