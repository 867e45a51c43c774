//! Fixed-capacity circular (ring) buffer for recent per-frame decisions.
//!
//! When the buffer is full, new items **overwrite** the oldest so that the
//! most recent `capacity` items are always available.  Used both for the
//! majority-vote window over class indices and for the letter buffer.
//!
//! # Example
//!
//! ```rust
//! use sign_to_text::stabilizer::RingBuffer;
//!
//! let mut votes = RingBuffer::new(4);
//! for v in [3_usize, 1, 1, 2, 2] {
//!     votes.push(v);
//! }
//! // 3 was overwritten; 1 and 2 tie and 1 was inserted first.
//! assert_eq!(votes.majority(), Some(1));
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// ## Overflow behaviour
///
/// When [`push`](Self::push) would exceed `capacity`, the oldest item is
/// silently overwritten.  The buffer never allocates beyond its initial
/// capacity.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid items currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append one item, overwriting the oldest when full.
    pub fn push(&mut self, item: T) {
        self.buf[self.write_pos] = item;
        self.write_pos = (self.write_pos + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Items in chronological order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        // Until the first wrap, valid data starts at 0.  Afterwards the
        // oldest item sits at `write_pos`.
        let read_pos = if self.len < self.capacity {
            0
        } else {
            self.write_pos
        };
        (0..self.len).map(move |i| self.buf[(read_pos + i) % self.capacity])
    }

    /// Most recently pushed item.
    pub fn last(&self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        Some(self.buf[(self.write_pos + self.capacity - 1) % self.capacity])
    }

    /// Discard all items and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }
}

impl<T: Copy + Default + PartialEq> RingBuffer<T> {
    /// Most frequent item.  Ties go to the value whose first occurrence in
    /// the window is earliest.
    pub fn majority(&self) -> Option<T> {
        let mut counts: Vec<(T, usize)> = Vec::new();
        for item in self.iter() {
            match counts.iter_mut().find(|(v, _)| *v == item) {
                Some((_, n)) => *n += 1,
                None => counts.push((item, 1)),
            }
        }

        let mut best: Option<(T, usize)> = None;
        for (v, n) in counts {
            match best {
                Some((_, bn)) if n <= bn => {}
                _ => best = Some((v, n)),
            }
        }
        best.map(|(v, _)| v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity() {
        let mut buf = RingBuffer::new(8);
        buf.push(1_usize);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(buf.last(), Some(3));
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = RingBuffer::new(4);
        for v in 1..=6_usize {
            buf.push(v);
        }
        assert!(buf.is_full());
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        assert_eq!(buf.last(), Some(6));
    }

    #[test]
    fn clear_resets_state() {
        let mut buf = RingBuffer::new(3);
        buf.push('A');
        buf.push('B');
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.last(), None);
        assert_eq!(buf.majority(), None);

        buf.push('C');
        assert_eq!(buf.iter().collect::<String>(), "C");
    }

    #[test]
    fn majority_picks_most_frequent() {
        let mut buf = RingBuffer::new(5);
        for v in [2_usize, 7, 7, 2, 7] {
            buf.push(v);
        }
        assert_eq!(buf.majority(), Some(7));
    }

    #[test]
    fn majority_tie_goes_to_earliest() {
        let mut buf = RingBuffer::new(4);
        for v in [5_usize, 9, 9, 5] {
            buf.push(v);
        }
        assert_eq!(buf.majority(), Some(5));

        // After a wrap the oldest surviving item leads.
        buf.push(9);
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![9, 9, 5, 9]);
        assert_eq!(buf.majority(), Some(9));
    }

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _buf: RingBuffer<usize> = RingBuffer::new(0);
    }
}
