//! Slot arenas backing order records.
//!
//! Orders live in slab storage and are addressed by stable 32-bit slot
//! indices ("compressed pointers"). Released slots are recycled through a
//! lock-free LIFO free list threaded through the record's `next` link, so
//! the common allocation path is a couple of CAS operations. Index handles
//! make ABA harmless: a recycled slot is always the same record type at the
//! same stable position.
//!
//! Two arenas are provided: [`GrowingSlab`] appends 4096-slot slabs on
//! demand and never runs out short of host memory, [`FixedSlab`] holds a
//! fixed capacity and reports exhaustion.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::order::Order;

/// Arena slot handle.
pub type SlotIndex = u32;

/// Sentinel for "no slot".
pub const NIL: SlotIndex = u32::MAX;

/// Slots per slab in the growing arena.
pub const SLAB_SLOTS: usize = 4096;

/// Storage capability required by the book: slot allocation with stable
/// indices and direct record access.
pub trait SlotArena {
    /// Claims a slot, or `None` when the arena is exhausted.
    fn allocate(&mut self) -> Option<SlotIndex>;

    /// Returns a slot to the free list.
    ///
    /// The slot must have been allocated by this arena and must no longer
    /// be reachable from any bucket or directory.
    fn release(&self, index: SlotIndex);

    /// Borrows a live record.
    fn get(&self, index: SlotIndex) -> &Order;

    /// Mutably borrows a live record.
    fn get_mut(&mut self, index: SlotIndex) -> &mut Order;

    /// Number of slots currently allocated.
    fn live(&self) -> usize;
}

/// Pops the free-list head.
///
/// Acquire on the head load and on CAS-failure reload, release on success,
/// matching the publication done by [`push_free`]. A stale `next` read is
/// discarded when the CAS fails.
#[inline]
fn pop_free(head: &AtomicU32, slot: impl Fn(SlotIndex) -> *mut Order) -> Option<SlotIndex> {
    let mut current = head.load(Ordering::Acquire);
    while current != NIL {
        let next = unsafe { (*slot(current)).next };
        match head.compare_exchange_weak(current, next, Ordering::Release, Ordering::Acquire) {
            Ok(_) => return Some(current),
            Err(observed) => current = observed,
        }
    }
    None
}

/// Pushes a slot onto the free list, threading the list through the
/// record's `next` link.
#[inline]
fn push_free(head: &AtomicU32, slot: impl Fn(SlotIndex) -> *mut Order, index: SlotIndex) {
    let mut current = head.load(Ordering::Relaxed);
    loop {
        unsafe { (*slot(index)).next = current };
        match head.compare_exchange_weak(current, index, Ordering::Release, Ordering::Relaxed) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

/// One fixed-size block of record slots.
struct Slab {
    cells: Box<[UnsafeCell<Order>]>,
}

impl Slab {
    fn new() -> Self {
        let cells = (0..SLAB_SLOTS)
            .map(|_| UnsafeCell::new(Order::vacant()))
            .collect();
        Self { cells }
    }
}

/// Growing slot arena: a vector of slabs, a lock-free free list, and an
/// atomic next-unused counter.
///
/// The free list is safe to touch concurrently; growth of the slab vector
/// requires `&mut self`, which in the book always happens under the book
/// lock.
pub struct GrowingSlab {
    slabs: Vec<Slab>,
    free_head: AtomicU32,
    next_unused: AtomicU32,
    live: AtomicU32,
}

// Slot access follows the arena discipline: a slot is written either while
// it is live (through `&mut self`) or while it is free (free-list links),
// never both.
unsafe impl Send for GrowingSlab {}
unsafe impl Sync for GrowingSlab {}

impl GrowingSlab {
    pub fn new() -> Self {
        Self {
            slabs: vec![Slab::new()],
            free_head: AtomicU32::new(NIL),
            next_unused: AtomicU32::new(0),
            live: AtomicU32::new(0),
        }
    }

    /// Total slots across all slabs.
    pub fn capacity(&self) -> usize {
        self.slabs.len() * SLAB_SLOTS
    }

    #[inline]
    fn slot(&self, index: SlotIndex) -> *mut Order {
        let index = index as usize;
        debug_assert!(index < self.capacity(), "slot index out of bounds");
        self.slabs[index / SLAB_SLOTS].cells[index % SLAB_SLOTS].get()
    }

    fn grow(&mut self) {
        assert!(
            self.capacity() + SLAB_SLOTS < NIL as usize,
            "slot arena exceeds index space"
        );
        self.slabs.push(Slab::new());
    }
}

impl Default for GrowingSlab {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotArena for GrowingSlab {
    fn allocate(&mut self) -> Option<SlotIndex> {
        let recycled = pop_free(&self.free_head, |i| self.slot(i));
        let index = match recycled {
            Some(index) => index,
            None => {
                let index = self.next_unused.fetch_add(1, Ordering::Relaxed);
                while index as usize >= self.capacity() {
                    self.grow();
                }
                index
            }
        };
        self.live.fetch_add(1, Ordering::Relaxed);
        Some(index)
    }

    fn release(&self, index: SlotIndex) {
        push_free(&self.free_head, |i| self.slot(i), index);
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self, index: SlotIndex) -> &Order {
        unsafe { &*self.slot(index) }
    }

    #[inline]
    fn get_mut(&mut self, index: SlotIndex) -> &mut Order {
        unsafe { &mut *self.slot(index) }
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed) as usize
    }
}

/// Fixed-capacity slot arena. No growth: when the free list is empty,
/// allocation fails and the caller sees storage exhaustion.
pub struct FixedSlab {
    cells: Box<[UnsafeCell<Order>]>,
    free_head: AtomicU32,
    allocated: AtomicU32,
}

unsafe impl Send for FixedSlab {}
unsafe impl Sync for FixedSlab {}

impl FixedSlab {
    /// Creates an arena of `capacity` slots with the free list threaded
    /// through every slot.
    pub fn with_capacity(capacity: u32) -> Self {
        assert!(capacity < NIL, "capacity must be below the NIL sentinel");
        let cells: Box<[UnsafeCell<Order>]> = (0..capacity)
            .map(|_| UnsafeCell::new(Order::vacant()))
            .collect();
        for i in 0..capacity {
            let next = if i + 1 < capacity { i + 1 } else { NIL };
            unsafe { (*cells[i as usize].get()).next = next };
        }
        Self {
            cells,
            free_head: AtomicU32::new(if capacity > 0 { 0 } else { NIL }),
            allocated: AtomicU32::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Slots currently handed out.
    pub fn allocated_count(&self) -> usize {
        self.allocated.load(Ordering::Relaxed) as usize
    }

    #[inline]
    fn slot(&self, index: SlotIndex) -> *mut Order {
        debug_assert!((index as usize) < self.cells.len(), "slot index out of bounds");
        self.cells[index as usize].get()
    }
}

impl SlotArena for FixedSlab {
    fn allocate(&mut self) -> Option<SlotIndex> {
        let index = pop_free(&self.free_head, |i| self.slot(i))?;
        self.allocated.fetch_add(1, Ordering::Relaxed);
        Some(index)
    }

    fn release(&self, index: SlotIndex) {
        push_free(&self.free_head, |i| self.slot(i), index);
        self.allocated.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self, index: SlotIndex) -> &Order {
        unsafe { &*self.slot(index) }
    }

    #[inline]
    fn get_mut(&mut self, index: SlotIndex) -> &mut Order {
        unsafe { &mut *self.slot(index) }
    }

    fn live(&self) -> usize {
        self.allocated_count()
    }
}
