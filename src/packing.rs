//! Fixed-layout binary codec.
//!
//! Every hash state serializes to a little-endian byte layout with no header,
//! no version field and no checksum. `packed_size` reports the exact number
//! of bytes `pack` writes, and `unpack` consumes exactly that many, so states
//! can be embedded back to back in a larger buffer.

/// Sequential little-endian writer over a caller-provided buffer.
pub(crate) struct PackedWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PackedWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.buf[self.pos..self.pos + 4].copy_from_slice(&v.to_le_bytes());
        self.pos += 4;
    }

    pub(crate) fn write_f64(&mut self, v: f64) {
        self.buf[self.pos..self.pos + 8].copy_from_slice(&v.to_le_bytes());
        self.pos += 8;
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Length-prefixed byte slice: u32 count, then the bytes.
    pub(crate) fn write_u8_all(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    /// Length-prefixed u32 slice: u32 count, then each word LE.
    pub(crate) fn write_u32_all(&mut self, words: &[u32]) {
        self.write_u32(words.len() as u32);
        for &w in words {
            self.write_u32(w);
        }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

/// Sequential little-endian reader mirroring [`PackedWriter`].
pub(crate) struct PackedReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PackedReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn read_u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    pub(crate) fn read_u32(&mut self) -> u32 {
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        v
    }

    pub(crate) fn read_f64(&mut self) -> f64 {
        let v = f64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        v
    }

    pub(crate) fn read_u8_vec(&mut self) -> Vec<u8> {
        let len = self.read_u32() as usize;
        let v = self.buf[self.pos..self.pos + len].to_vec();
        self.pos += len;
        v
    }

    pub(crate) fn read_u32_vec(&mut self) -> Vec<u32> {
        let len = self.read_u32() as usize;
        (0..len).map(|_| self.read_u32()).collect()
    }
}

/// Bytes needed for a length-prefixed byte slice.
#[inline]
pub(crate) fn u8_all_size(len: usize) -> usize {
    4 + len
}

/// Bytes needed for a length-prefixed u32 slice.
#[inline]
pub(crate) fn u32_all_size(len: usize) -> usize {
    4 + 4 * len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_roundtrip() {
        let mut buf = vec![0u8; 13];
        let mut w = PackedWriter::new(&mut buf);
        w.write_u32(0xdead_beef);
        w.write_u8(7);
        w.write_f64(0.55);
        assert_eq!(w.position(), 13);

        let mut r = PackedReader::new(&buf);
        assert_eq!(r.read_u32(), 0xdead_beef);
        assert_eq!(r.read_u8(), 7);
        assert_eq!(r.read_f64(), 0.55);
    }

    #[test]
    fn prefixed_slices_roundtrip() {
        let words = [1u32, u32::MAX, 42];
        let bytes = [9u8, 8, 7, 6];
        let mut buf = vec![0u8; u32_all_size(words.len()) + u8_all_size(bytes.len())];
        let mut w = PackedWriter::new(&mut buf);
        w.write_u32_all(&words);
        w.write_u8_all(&bytes);
        assert_eq!(w.position(), buf.len());

        let mut r = PackedReader::new(&buf);
        assert_eq!(r.read_u32_vec(), words);
        assert_eq!(r.read_u8_vec(), bytes);
    }

    #[test]
    fn layout_is_little_endian() {
        let mut buf = vec![0u8; 4];
        PackedWriter::new(&mut buf).write_u32(0x0102_0304);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
    }
}
