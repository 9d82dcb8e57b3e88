//! Growable byte buffer with independent read/write cursors.
//!
//! Bytes accumulate between `read_index` and `write_index`; once consumed bytes are no
//! longer referenced, they are compacted forward rather than freed, so a long-lived
//! connection buffer only grows when it genuinely needs more room for unread data.

const DEFAULT_CAPACITY: usize = 16 * 1024;

/// A contiguous byte region with independent read and write cursors.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Vec<u8>,
    read_index: usize,
    write_index: usize,
}

impl Buffer {
    /// Creates a buffer pre-allocated to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            read_index: 0,
            write_index: 0,
        }
    }

    /// Bytes available to read.
    pub fn readable(&self) -> usize {
        self.write_index - self.read_index
    }

    /// Bytes available to write before the buffer must grow.
    pub fn writable(&self) -> usize {
        self.data.len() - self.write_index
    }

    /// Total allocated capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The unread slice.
    pub fn as_read_slice(&self) -> &[u8] {
        &self.data[self.read_index..self.write_index]
    }

    /// The writable region, for handing to a socket read call.
    pub fn as_write_slice_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.write_index..]
    }

    /// Marks `amount` bytes as consumed, compacting the buffer if the read cursor has
    /// crossed the half-capacity mark.
    pub fn advance_read(&mut self, amount: usize) {
        assert!(amount <= self.readable(), "advance_read past write_index");
        self.read_index += amount;

        if self.read_index == self.write_index {
            self.read_index = 0;
            self.write_index = 0;
            return;
        }

        if self.read_index >= self.data.len() / 2 {
            self.compact();
        }
    }

    /// Marks `amount` bytes, already written into the slice returned by
    /// `as_write_slice_mut`, as part of the readable region.
    pub fn advance_write(&mut self, amount: usize) {
        assert!(amount <= self.writable(), "advance_write past capacity");
        self.write_index += amount;
    }

    /// Appends `bytes`, growing the buffer first if there isn't enough room.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        let start = self.write_index;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.write_index += bytes.len();
    }

    /// Ensures at least `additional` bytes of writable space are available.
    pub fn reserve(&mut self, additional: usize) {
        if additional <= self.writable() {
            return;
        }
        let new_capacity = 2 * (self.readable() + additional);
        self.grow_to(new_capacity);
    }

    fn grow_to(&mut self, capacity: usize) {
        let mut next = Vec::with_capacity(capacity.max(self.data.len()));
        next.resize(capacity.max(self.data.len()), 0);
        let readable = self.readable();
        next[..readable].copy_from_slice(self.as_read_slice());
        self.data = next;
        self.write_index = readable;
        self.read_index = 0;
    }

    /// Shifts unread bytes to the front of the buffer without reallocating.
    fn compact(&mut self) {
        let readable = self.readable();
        self.data.copy_within(self.read_index..self.write_index, 0);
        self.read_index = 0;
        self.write_index = readable;
    }

    /// Discards all buffered data, keeping the current allocation.
    pub fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_buffer_is_empty() {
        let buf = Buffer::new(64);
        assert_eq!(buf.readable(), 0);
        assert_eq!(buf.writable(), 64);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut buf = Buffer::new(16);
        buf.write_bytes(b"hello");
        assert_eq!(buf.readable(), 5);
        assert_eq!(buf.as_read_slice(), b"hello");
        buf.advance_read(5);
        assert_eq!(buf.readable(), 0);
    }

    #[test]
    fn grows_when_writable_space_insufficient() {
        let mut buf = Buffer::new(4);
        buf.write_bytes(b"hello world");
        assert_eq!(buf.as_read_slice(), b"hello world");
        assert!(buf.capacity() >= 11);
    }

    #[test]
    fn compacts_past_half_capacity() {
        let mut buf = Buffer::new(16);
        buf.write_bytes(&[1u8; 10]);
        buf.advance_read(9);
        // read_index (9) >= capacity/2 (8) triggers a compaction.
        assert_eq!(buf.readable(), 1);
        assert_eq!(buf.writable(), 15);
    }

    #[test]
    fn invariant_bounds_hold_after_random_ops() {
        let mut buf = Buffer::new(8);
        for _ in 0..50 {
            buf.write_bytes(b"ab");
            buf.advance_read(1);
            assert!(buf.readable() + buf.writable() <= buf.capacity());
        }
    }
}
