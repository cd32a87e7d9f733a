use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed-capacity single-producer/single-consumer byte ring.
///
/// Replaces a locked sample queue on the realtime path: the producer only
/// moves the write cursor, the consumer only moves the read cursor, and each
/// side computes its safe span from the other cursor's last published value.
///
/// Cursors count bytes monotonically (wrapping on `usize` overflow), so
/// `used = write - read` distinguishes full from empty without a separate
/// counter. The storage offset of a cursor is `cursor % capacity`.
///
/// Regions never wrap: a transfer straddling the end of storage takes two
/// acquire/release cycles. A zero-length region means full (writer) or
/// empty (reader).
struct Shared {
    storage: Box<[UnsafeCell<u8>]>,
    write: AtomicUsize,
    read: AtomicUsize,
}

// SAFETY: the writer only touches bytes in `[write, read + capacity)` and the
// reader only bytes in `[read, write)`. Those spans are disjoint and each
// cursor is published with Release after its bytes are done, and observed
// with Acquire before the other side touches them.
unsafe impl Sync for Shared {}
unsafe impl Send for Shared {}

impl Shared {
    fn capacity(&self) -> usize {
        self.storage.len()
    }

    fn used(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    fn span_ptr(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset < self.storage.len());
        // SAFETY: `offset` is in bounds; the pointer keeps the provenance of
        // the whole storage slice, and UnsafeCell<u8> has the layout of u8.
        unsafe { UnsafeCell::raw_get(self.storage.as_ptr().add(offset)) }
    }
}

/// Constructor namespace for the ring's two halves.
pub struct RingBuffer;

impl RingBuffer {
    /// Allocates a ring of `capacity` bytes and splits it into its halves.
    ///
    /// A zero capacity is bumped to one byte so cursor arithmetic stays defined.
    pub fn with_capacity(capacity: usize) -> (RingWriter, RingReader) {
        let capacity = capacity.max(1);
        let storage: Box<[UnsafeCell<u8>]> = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        let shared = Arc::new(Shared {
            storage,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        });
        (
            RingWriter {
                shared: Arc::clone(&shared),
                acquired: 0,
            },
            RingReader { shared, acquired: 0 },
        )
    }
}

/// Producer half. Lives on the render side.
pub struct RingWriter {
    shared: Arc<Shared>,
    acquired: usize,
}

impl RingWriter {
    /// Returns a contiguous writable span of at most `max_len` bytes.
    ///
    /// The span is bounded by free space and by the distance to the end of
    /// storage. It stays valid until the next `release_write_region`.
    pub fn acquire_write_region(&mut self, max_len: usize) -> &mut [u8] {
        let shared = &*self.shared;
        let capacity = shared.capacity();
        let write = shared.write.load(Ordering::Relaxed);
        let read = shared.read.load(Ordering::Acquire);
        let free = capacity - write.wrapping_sub(read);
        let offset = write % capacity;
        let len = max_len.min(free).min(capacity - offset);
        self.acquired = len;
        if len == 0 {
            return Default::default();
        }
        // SAFETY: `[offset, offset + len)` lies inside storage and inside the
        // free span, which the reader does not touch until `write` advances.
        unsafe { std::slice::from_raw_parts_mut(shared.span_ptr(offset), len) }
    }

    /// Commits `len` bytes of the last acquired region and publishes them.
    ///
    /// `len` may be smaller than the region; it is clamped to the region.
    pub fn release_write_region(&mut self, len: usize) {
        let len = len.min(self.acquired);
        self.acquired = 0;
        if len > 0 {
            let write = self.shared.write.load(Ordering::Relaxed);
            self.shared.write.store(write.wrapping_add(len), Ordering::Release);
        }
    }

    /// Copies as much of `data` as fits, looping across the wrap point.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let mut copied = 0;
        while copied < data.len() {
            let region = self.acquire_write_region(data.len() - copied);
            let len = region.len();
            if len == 0 {
                self.release_write_region(0);
                break;
            }
            region.copy_from_slice(&data[copied..copied + len]);
            self.release_write_region(len);
            copied += len;
        }
        copied
    }

    pub fn free(&self) -> usize {
        self.shared.capacity() - self.shared.used()
    }

    pub fn used(&self) -> usize {
        self.shared.used()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Consumer half. Lives on the drain side.
pub struct RingReader {
    shared: Arc<Shared>,
    acquired: usize,
}

impl RingReader {
    /// Returns a contiguous readable span of at most `max_len` bytes.
    pub fn acquire_read_region(&mut self, max_len: usize) -> &[u8] {
        let shared = &*self.shared;
        let capacity = shared.capacity();
        let read = shared.read.load(Ordering::Relaxed);
        let write = shared.write.load(Ordering::Acquire);
        let used = write.wrapping_sub(read);
        let offset = read % capacity;
        let len = max_len.min(used).min(capacity - offset);
        self.acquired = len;
        if len == 0 {
            return Default::default();
        }
        // SAFETY: `[offset, offset + len)` holds bytes the writer published
        // and will not overwrite until `read` advances past them.
        unsafe { std::slice::from_raw_parts(shared.span_ptr(offset), len) }
    }

    /// Consumes `len` bytes of the last acquired region, clamped to the region.
    pub fn release_read_region(&mut self, len: usize) {
        let len = len.min(self.acquired);
        self.acquired = 0;
        if len > 0 {
            let read = self.shared.read.load(Ordering::Relaxed);
            self.shared.read.store(read.wrapping_add(len), Ordering::Release);
        }
    }

    /// Copies up to `out.len()` bytes out of the ring, looping across the wrap point.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < out.len() {
            let region = self.acquire_read_region(out.len() - copied);
            let len = region.len();
            if len == 0 {
                self.release_read_region(0);
                break;
            }
            out[copied..copied + len].copy_from_slice(region);
            self.release_read_region(len);
            copied += len;
        }
        copied
    }

    /// Zeroes both cursors. Stored bytes are left in place and become
    /// unreadable until new data is released.
    ///
    /// Taking both halves by `&mut` guarantees neither holds a region.
    ///
    /// # Panics
    /// Panics if `writer` belongs to a different ring.
    pub fn reset(&mut self, writer: &mut RingWriter) {
        assert!(
            Arc::ptr_eq(&self.shared, &writer.shared),
            "ring halves belong to different buffers"
        );
        self.acquired = 0;
        writer.acquired = 0;
        self.shared.write.store(0, Ordering::Release);
        self.shared.read.store(0, Ordering::Release);
    }

    pub fn free(&self) -> usize {
        self.shared.capacity() - self.shared.used()
    }

    pub fn used(&self) -> usize {
        self.shared.used()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}
