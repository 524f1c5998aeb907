/// Fixed-capacity ring of elements addressed by absolute, monotonically increasing positions.
///
/// The capacity is always a power of two so positions map to slots with a single mask.
/// Writes never block and never fail: once more than `capacity` elements have been
/// written, the oldest ones are overwritten.
///
/// # Reader contract
///
/// A reader must only [`peek`](Self::peek) positions in
/// `[write_head - capacity, write_head)`. Older positions silently alias newer data.
/// This is only checked in debug builds.
#[derive(Debug, Clone)]
pub struct CircularFrameBuffer<T> {
    buffer: Box<[T]>,
    mask: u64,
    write_head: u64,
}

impl<T: Copy + Default> CircularFrameBuffer<T> {
    /// Allocates a ring able to hold at least `requested` elements.
    ///
    /// The capacity is derived in O(1) from the highest set bit of `requested`, yielding
    /// the next power of two strictly above it (a requested capacity of zero yields one slot).
    pub fn new(requested: usize) -> Self {
        let capacity = 1usize << (usize::BITS - requested.leading_zeros());
        Self {
            buffer: vec![T::default(); capacity].into_boxed_slice(),
            mask: capacity as u64 - 1,
            write_head: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of elements ever written.
    #[inline]
    pub fn write_head(&self) -> u64 {
        self.write_head
    }

    /// Returns the element stored for the absolute position `pos`.
    #[inline]
    pub fn peek(&self, pos: u64) -> &T {
        debug_assert!(
            pos < self.write_head && self.write_head - pos <= self.capacity() as u64,
            "peek at {pos} outside of readable window (write head {}, capacity {})",
            self.write_head,
            self.capacity()
        );
        &self.buffer[(pos & self.mask) as usize]
    }

    /// Appends `elements`, splitting the copy where it wraps around the end of the ring.
    pub fn write(&mut self, mut elements: &[T]) {
        while !elements.is_empty() {
            let start = (self.write_head & self.mask) as usize;
            let fitting = elements.len().min(self.capacity() - start);
            let (head, rest) = elements.split_at(fitting);

            self.buffer[start..start + fitting].copy_from_slice(head);
            self.write_head += fitting as u64;
            elements = rest;
        }
    }
}
