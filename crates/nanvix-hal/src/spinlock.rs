// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Spinlocks.
//!
//! Two flavors:
//! - [`RawSpinlock`]: bare lock/trylock/unlock, for callers that guard
//!   state the lock cannot own (e.g. memory shared with assembly).
//! - [`SpinLock`]: owns the protected value and hands out an RAII guard.
//!
//! Neither touches the interrupt-enable flag. A lock taken from both
//! thread and interrupt context on the same core must be wrapped in an
//! `interrupts_disable`/`interrupts_enable` pair by the caller.

use core::cell::UnsafeCell;
use core::fmt;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// A test-and-test-and-set spinlock without associated data.
pub struct RawSpinlock {
    locked: AtomicBool,
}

impl RawSpinlock {
    /// Creates an unlocked spinlock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Spins until the lock is acquired.
    #[inline]
    pub fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    /// Attempts to acquire the lock once. Returns `true` on success.
    #[inline]
    #[must_use]
    pub fn trylock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// Releasing a lock the caller does not hold breaks mutual exclusion for
    /// whoever does hold it, but is not memory-unsafe by itself.
    #[inline]
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Returns `true` if some core currently holds the lock.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl Default for RawSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawSpinlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSpinlock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// A spinlock protecting a value of type `T`.
pub struct SpinLock<T> {
    raw: RawSpinlock,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `raw`; the guard is the only
// way to reach it and exists at most once at a time.
unsafe impl<T: Send> Sync for SpinLock<T> {}
// SAFETY: moving the lock moves the value; no aliasing survives the move.
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates an unlocked spinlock holding `value`.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawSpinlock::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Spins until the lock is acquired.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.lock();
        SpinLockGuard { lock: self }
    }

    /// Acquires the lock if it is free.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.raw.trylock() {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Returns a mutable reference without locking; `&mut self` proves
    /// exclusivity.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock, returning the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.raw.is_locked())
            .finish_non_exhaustive()
    }
}

/// RAII guard for [`SpinLock`]. Unlocks on drop.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the lock is held, and `&mut self`
        // rules out a second borrow through this guard.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}
