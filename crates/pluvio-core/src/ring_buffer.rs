//! Fixed-capacity circular buffer with an overwrite-oldest policy.
//!
//! Both retained collections (tip event log, delivery queue) are built on this
//! container. It never allocates: storage is a const-generic array, and index
//! arithmetic is modulo the capacity. When full, a push logically discards the
//! oldest element rather than rejecting the newest, so the buffer always holds
//! the `N` most recent values in insertion order.

/// Circular FIFO over `[T; N]` backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingBuffer<T, const N: usize> {
    buf: [T; N],
    head: usize,
    tail: usize,
    count: usize,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "ring buffer capacity must be non-zero") };
        Self {
            buf: [T::default(); N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.count
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn is_full(&self) -> bool {
        self.count == N
    }

    /// Appends `item`, discarding the oldest element first when full.
    ///
    /// Returns `true` when an element was overwritten, so callers can account
    /// for the loss.
    pub fn push(&mut self, item: T) -> bool {
        let overwrote = self.is_full();
        if overwrote {
            self.tail = (self.tail + 1) % N;
            self.count -= 1;
        }
        self.buf[self.head] = item;
        self.head = (self.head + 1) % N;
        self.count += 1;
        overwrote
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.buf[self.tail];
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        Some(item)
    }

    /// Returns the oldest element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(&self.buf[self.tail])
        }
    }

    /// Applies `process` to the oldest element and removes it only on success.
    ///
    /// A failed attempt leaves the element in place for the next cycle, which
    /// is what gives the delivery queue its at-least-once retry behavior.
    /// Returns `None` when the buffer is empty, otherwise whether the element
    /// was consumed.
    pub fn retry_oldest<F>(&mut self, process: F) -> Option<bool>
    where
        F: FnOnce(&T) -> bool,
    {
        if self.is_empty() {
            return None;
        }
        if process(&self.buf[self.tail]) {
            self.tail = (self.tail + 1) % N;
            self.count -= 1;
            Some(true)
        } else {
            Some(false)
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
        self.buf = [T::default(); N];
    }

    /// Iterates oldest to newest without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).map(move |i| &self.buf[(self.tail + i) % N])
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo_order() {
        let mut ring: RingBuffer<u32, 4> = RingBuffer::new();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);

        for v in [10, 20, 30] {
            assert!(!ring.push(v));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.peek(), Some(&10));
        assert_eq!(ring.pop(), Some(10));
        assert_eq!(ring.pop(), Some(20));
        assert_eq!(ring.pop(), Some(30));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn push_overwrites_oldest_when_full() {
        let mut ring: RingBuffer<u32, 3> = RingBuffer::new();
        assert!(!ring.push(1));
        assert!(!ring.push(2));
        assert!(!ring.push(3));
        assert!(ring.is_full());

        // 1 is the logical oldest and must be the one dropped
        assert!(ring.push(4));
        let held: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(held, [2, 3, 4]);
    }

    #[test]
    fn retains_last_n_in_insertion_order() {
        let mut ring: RingBuffer<u32, 8> = RingBuffer::new();
        for v in 0..100 {
            ring.push(v);
        }
        let held: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(held, (92..100).collect::<Vec<u32>>());
    }

    #[test]
    fn retry_oldest_removes_only_on_success() {
        let mut ring: RingBuffer<u32, 4> = RingBuffer::new();
        ring.push(7);
        ring.push(8);

        assert_eq!(ring.retry_oldest(|&v| v == 999), Some(false));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.peek(), Some(&7));

        assert_eq!(ring.retry_oldest(|&v| v == 7), Some(true));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.peek(), Some(&8));
    }

    #[test]
    fn retry_oldest_on_empty() {
        let mut ring: RingBuffer<u32, 2> = RingBuffer::new();
        assert_eq!(ring.retry_oldest(|_| true), None);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut ring: RingBuffer<u32, 2> = RingBuffer::new();
        ring.push(1);
        ring.push(2);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.peek(), None);
    }
}
