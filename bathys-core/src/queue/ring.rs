//! Lock-free single-producer/single-consumer byte ring
//!
//! One slot is always left empty, so a queue of capacity `N` holds at most
//! `N - 1` bytes. `head` is written only by the producer and `tail` only by
//! the consumer; each side publishes its index with `Release` and observes
//! the other's with `Acquire`.

use bathys_protocol::ByteWindow;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_CELL: AtomicU8 = AtomicU8::new(0);

/// Push rejected because the ring is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// Fixed-capacity byte ring shared by one producer and one consumer
///
/// Lives in static storage; [`ByteQueue::split`] hands out the two halves.
pub struct ByteQueue<const N: usize> {
    cells: [AtomicU8; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    /// Bytes rejected because the ring was full
    dropped: AtomicU32,
    /// Bytes accepted by the receive path, including dropped ones
    received: AtomicU32,
    /// Timestamp of the most recent byte (ms)
    last_byte_ms: AtomicU32,
    /// Set once the first byte has been stamped
    stamped: AtomicBool,
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteQueue<N> {
    /// Create an empty queue
    ///
    /// Capacity must be at least 2 (one slot stays free).
    pub const fn new() -> Self {
        assert!(N >= 2, "ByteQueue capacity must be at least 2");
        Self {
            cells: [EMPTY_CELL; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicU32::new(0),
            received: AtomicU32::new(0),
            last_byte_ms: AtomicU32::new(0),
            stamped: AtomicBool::new(false),
        }
    }

    /// Number of slots, including the one that is always kept free
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        occupied::<N>(
            self.head.load(Ordering::Acquire),
            self.tail.load(Ordering::Acquire),
        )
    }

    /// Returns true when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overflow counter
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset indices and counters
    ///
    /// Needs exclusive access, so neither half can be alive.
    pub fn clear(&mut self) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.received.store(0, Ordering::Relaxed);
        self.last_byte_ms.store(0, Ordering::Relaxed);
        self.stamped.store(false, Ordering::Relaxed);
    }

    /// Split into the producer and consumer halves
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let queue: &Self = self;
        (Producer { queue }, Consumer { queue })
    }
}

fn occupied<const N: usize>(head: usize, tail: usize) -> usize {
    (head + N - tail) % N
}

/// Writing half, owned by the receive path
pub struct Producer<'a, const N: usize> {
    queue: &'a ByteQueue<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Append one byte
    ///
    /// On a full ring the byte is discarded and the overflow counter
    /// saturates upwards; `head` does not move.
    pub fn push(&mut self, byte: u8) -> Result<(), QueueFull> {
        let q = self.queue;
        let head = q.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;

        if next == q.tail.load(Ordering::Acquire) {
            // Only this side writes the counter
            let dropped = q.dropped.load(Ordering::Relaxed);
            q.dropped.store(dropped.saturating_add(1), Ordering::Relaxed);
            return Err(QueueFull);
        }

        q.cells[head].store(byte, Ordering::Relaxed);
        q.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Record receive time and count the byte
    ///
    /// Called for every received byte, whether or not it fits.
    pub fn stamp(&mut self, now_ms: u32) {
        let q = self.queue;
        q.last_byte_ms.store(now_ms, Ordering::Relaxed);
        q.stamped.store(true, Ordering::Release);
        let received = q.received.load(Ordering::Relaxed);
        q.received.store(received.saturating_add(1), Ordering::Relaxed);
    }

    /// Number of buffered bytes as seen from the producer
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Reading half, owned by the dispatcher
pub struct Consumer<'a, const N: usize> {
    queue: &'a ByteQueue<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Observed `(tail, len)` pair
    fn snapshot(&self) -> (usize, usize) {
        let head = self.queue.head.load(Ordering::Acquire);
        let tail = self.queue.tail.load(Ordering::Relaxed);
        (tail, occupied::<N>(head, tail))
    }

    fn cell(&self, tail: usize, offset: usize) -> u8 {
        self.queue.cells[(tail + offset) % N].load(Ordering::Relaxed)
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.snapshot().1
    }

    /// Returns true when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte at `index` positions from the front
    pub fn peek(&self, index: usize) -> Option<u8> {
        let (tail, len) = self.snapshot();
        (index < len).then(|| self.cell(tail, index))
    }

    /// Discard up to `n` bytes from the front
    pub fn drop_front(&mut self, n: usize) {
        let (tail, len) = self.snapshot();
        let n = n.min(len);
        if n > 0 {
            self.queue.tail.store((tail + n) % N, Ordering::Release);
        }
    }

    /// Move up to `out.len()` bytes out of the queue; returns the count
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let copied = self.peek_into(out);
        self.drop_front(copied);
        copied
    }

    /// Copy up to `out.len()` bytes from the front without consuming them
    pub fn peek_into(&self, out: &mut [u8]) -> usize {
        let (tail, len) = self.snapshot();
        let n = out.len().min(len);
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.cell(tail, i);
        }
        n
    }

    /// Offset of the first occurrence of `pattern`
    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        let (tail, len) = self.snapshot();
        if pattern.is_empty() || pattern.len() > len {
            return None;
        }
        (0..=len - pattern.len()).find(|&start| {
            pattern
                .iter()
                .enumerate()
                .all(|(i, &b)| self.cell(tail, start + i) == b)
        })
    }

    /// Discard everything buffered up to the observed `head`
    pub fn clear(&mut self) {
        let head = self.queue.head.load(Ordering::Acquire);
        self.queue.tail.store(head, Ordering::Release);
    }

    /// Overflow counter
    pub fn dropped(&self) -> u32 {
        self.queue.dropped()
    }

    /// Bytes seen by the receive path
    pub fn received(&self) -> u32 {
        self.queue.received.load(Ordering::Relaxed)
    }

    /// Timestamp of the most recent byte, if any arrived
    pub fn last_byte_at(&self) -> Option<u32> {
        if self.queue.stamped.load(Ordering::Acquire) {
            Some(self.queue.last_byte_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}

impl<'a, const N: usize> ByteWindow for Consumer<'a, N> {
    fn len(&self) -> usize {
        Consumer::len(self)
    }

    fn peek(&self, index: usize) -> Option<u8> {
        Consumer::peek(self, index)
    }

    fn drop_front(&mut self, n: usize) {
        Consumer::drop_front(self, n)
    }

    fn find(&self, pattern: &[u8]) -> Option<usize> {
        Consumer::find(self, pattern)
    }

    fn peek_into(&self, out: &mut [u8]) -> usize {
        Consumer::peek_into(self, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read() {
        let mut queue: ByteQueue<8> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();

        for b in 1..=3 {
            tx.push(b).unwrap();
        }
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.peek(0), Some(1));
        assert_eq!(rx.peek(2), Some(3));
        assert_eq!(rx.peek(3), None);

        let mut out = [0u8; 8];
        assert_eq!(rx.read(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_full_keeps_one_slot_free() {
        let mut queue: ByteQueue<4> = ByteQueue::new();
        let (mut tx, rx) = queue.split();

        assert!(tx.push(1).is_ok());
        assert!(tx.push(2).is_ok());
        assert!(tx.push(3).is_ok());
        assert_eq!(tx.push(4), Err(QueueFull));
        assert_eq!(tx.push(5), Err(QueueFull));

        assert_eq!(rx.len(), 3);
        assert_eq!(rx.dropped(), 2);
        // Overflowed bytes never reach the consumer
        assert_eq!(rx.peek(2), Some(3));
    }

    #[test]
    fn test_wraparound() {
        let mut queue: ByteQueue<4> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();

        for round in 0..10u8 {
            tx.push(round).unwrap();
            tx.push(round.wrapping_add(100)).unwrap();
            assert_eq!(rx.peek(0), Some(round));
            assert_eq!(rx.peek(1), Some(round.wrapping_add(100)));
            rx.drop_front(2);
        }
        assert!(rx.is_empty());
        assert_eq!(rx.dropped(), 0);
    }

    #[test]
    fn test_drop_front_clamps() {
        let mut queue: ByteQueue<8> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();
        tx.push(7).unwrap();
        rx.drop_front(5);
        assert!(rx.is_empty());
        rx.drop_front(1);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_find_across_wrap() {
        let mut queue: ByteQueue<6> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();

        for b in [0u8, 0, 0, 0] {
            tx.push(b).unwrap();
        }
        rx.drop_front(4);
        for b in [0x11, 0x40, 0x46, 0x22] {
            tx.push(b).unwrap();
        }

        assert_eq!(rx.find(&[0x40, 0x46]), Some(1));
        assert_eq!(rx.find(&[0x46, 0x40]), None);
        assert_eq!(rx.find(&[]), None);
    }

    #[test]
    fn test_consumer_clear() {
        let mut queue: ByteQueue<16> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();
        for b in 0..10 {
            tx.push(b).unwrap();
        }
        rx.clear();
        assert!(rx.is_empty());

        tx.push(42).unwrap();
        assert_eq!(rx.peek(0), Some(42));
    }

    #[test]
    fn test_exclusive_clear_resets_counters() {
        let mut queue: ByteQueue<4> = ByteQueue::new();
        {
            let (mut tx, _rx) = queue.split();
            for b in 0..6 {
                tx.stamp(100);
                let _ = tx.push(b);
            }
        }
        assert_eq!(queue.dropped(), 3);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
        let (_tx, rx) = queue.split();
        assert_eq!(rx.last_byte_at(), None);
        assert_eq!(rx.received(), 0);
    }

    #[test]
    fn test_stamp_records_time() {
        let mut queue: ByteQueue<8> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        assert_eq!(rx.last_byte_at(), None);

        tx.stamp(1234);
        tx.stamp(1250);
        assert_eq!(rx.last_byte_at(), Some(1250));
        assert_eq!(rx.received(), 2);
    }

    #[test]
    fn test_consumer_as_byte_window() {
        use bathys_protocol::{Frame, FrameParser};

        let mut queue: ByteQueue<64> = ByteQueue::new();
        let (mut tx, mut rx) = queue.split();

        let bytes = Frame::pump(3.5, 0.0).encode_to_vec().unwrap();
        for &b in [0x13u8, 0x37].iter().chain(bytes.iter()) {
            tx.push(b).unwrap();
        }

        let mut parser = FrameParser::new();
        let frame = parser.try_parse_one(&mut rx).expect("frame after noise");
        assert_eq!(frame, Frame::pump(3.5, 0.0));
        assert!(rx.is_empty());
    }
}
