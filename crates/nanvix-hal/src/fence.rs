// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Boot fence.
//!
//! A one-way latch the master releases once cluster-wide structures are
//! initialized. Slaves spin on it before touching any of them; the release
//! is the only happens-before edge between master setup and slave
//! execution.

use crate::backend::CoreBackend;
use crate::hal::Hal;
use crate::spinlock::SpinLock;

/// One-shot rendezvous latch.
#[derive(Debug, Default)]
pub struct Fence {
    released: SpinLock<bool>,
}

impl Fence {
    /// Creates a closed fence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            released: SpinLock::new(false),
        }
    }

    /// Opens the fence. Returns `false` if it was already open.
    pub fn release(&self) -> bool {
        let mut released = self.released.lock();
        !core::mem::replace(&mut *released, true)
    }

    /// Whether the fence has been opened.
    #[must_use]
    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }

    /// Spins until the fence is open, calling `idle` between checks.
    pub fn wait(&self, mut idle: impl FnMut()) {
        while !self.is_released() {
            idle();
        }
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Opens the boot fence and wakes waiting cores. Releasing twice is a
    /// no-op.
    pub fn fence_release(&self) {
        if self.fence.release() {
            tracing::info!(core = %self.core_get_id(), "boot fence released");
            self.backend().wake_all();
        }
    }

    /// Blocks the calling core until the boot fence is open.
    pub fn fence_wait(&self) {
        self.fence.wait(|| self.backend().wait_for_event());
    }
}
