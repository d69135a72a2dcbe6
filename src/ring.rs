//! Bounded single-producer/single-consumer ring.
//!
//! Transports order events between a submitting task and a consuming task
//! without locks. Capacity is a power of two; the write and read indices
//! run free and are masked on access, so empty/full detection is the
//! unsigned difference of the two. Lock-freedom holds for exactly one
//! producer and one consumer; the split halves enforce that statically.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[repr(align(64))]
struct Counter(AtomicUsize);

struct Shared<T> {
    cells: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    write: Counter,
    read: Counter,
}

// A cell is written only by the producer before publication and read only
// by the consumer after it; the two never touch the same cell while it is
// in flight.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn occupied(&self, write: usize, read: usize) -> usize {
        write.wrapping_sub(read)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let mut read = *self.read.0.get_mut();
        let write = *self.write.0.get_mut();
        while read != write {
            unsafe { (*self.cells[read & self.mask].get()).assume_init_drop() };
            read = read.wrapping_add(1);
        }
    }
}

/// Creates a ring of `capacity` slots. `capacity` must be a power of two.
pub fn ring<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(
        capacity.is_power_of_two(),
        "ring capacity must be a power of two"
    );
    let cells = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();
    let shared = Arc::new(Shared {
        cells,
        mask: capacity - 1,
        write: Counter(AtomicUsize::new(0)),
        read: Counter(AtomicUsize::new(0)),
    });
    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Writing half of the ring.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Publishes a value, or hands it back when the ring is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let write = self.shared.write.0.load(Ordering::Relaxed);
        let read = self.shared.read.0.load(Ordering::Acquire);
        if self.shared.occupied(write, read) == self.shared.cells.len() {
            return Err(value);
        }
        unsafe { (*self.shared.cells[write & self.shared.mask].get()).write(value) };
        self.shared.write.0.store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        let write = self.shared.write.0.load(Ordering::Relaxed);
        let read = self.shared.read.0.load(Ordering::Acquire);
        self.shared.occupied(write, read) == self.shared.cells.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.cells.len()
    }
}

/// Reading half of the ring.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// Takes the oldest published value, or `None` when the ring is empty.
    pub fn pop(&mut self) -> Option<T> {
        let read = self.shared.read.0.load(Ordering::Relaxed);
        let write = self.shared.write.0.load(Ordering::Acquire);
        if self.shared.occupied(write, read) == 0 {
            return None;
        }
        let value = unsafe { (*self.shared.cells[read & self.shared.mask].get()).assume_init_read() };
        self.shared.read.0.store(read.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Published values not yet consumed.
    pub fn len(&self) -> usize {
        let read = self.shared.read.0.load(Ordering::Relaxed);
        let write = self.shared.write.0.load(Ordering::Acquire);
        self.shared.occupied(write, read)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.cells.len()
    }
}
