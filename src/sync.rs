//! Book lock: a test-and-set spinlock with exponential backoff.

use std::cell::UnsafeCell;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Pause batches double up to this exponent before yielding to the OS
/// scheduler.
const SPIN_LIMIT: u32 = 16;

/// The lock flag sits on its own cache line so contended acquires do not
/// bounce the protected data's lines.
#[repr(align(64))]
struct Flag {
    locked: AtomicBool,
}

/// Mutual exclusion over `T` via a single atomic flag.
///
/// Acquire is test-and-set; on failure the waiter pauses for a doubling
/// number of spins, then falls back to `thread::yield_now`. Release clears
/// the flag. No fairness between waiters.
pub struct SpinLock<T> {
    flag: Flag,
    data: UnsafeCell<T>,
}

// The guard hands out &mut T only while the flag is held.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            flag: Flag {
                locked: AtomicBool::new(false),
            },
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning with backoff until it is free.
    pub fn lock(&self) -> SpinGuard<'_, T> {
        let mut exponent = 0u32;
        while self.flag.locked.swap(true, Ordering::Acquire) {
            if exponent < SPIN_LIMIT {
                for _ in 0..(1u32 << exponent) {
                    hint::spin_loop();
                }
                exponent += 1;
            } else {
                thread::yield_now();
            }
        }
        SpinGuard { lock: self }
    }

    /// Acquires the lock only if it is immediately free.
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.flag.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(SpinGuard { lock: self })
        }
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// RAII guard; releases the lock on drop.
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.flag.locked.store(false, Ordering::Release);
    }
}
