// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Inter-core events.
//!
//! Every core owns one pending word with a bit per sender. Notifying sets
//! the sender's bit in the target's word and kicks the target's IPI
//! hardware; waiting clears exactly one bit, lowest sender first. Repeated
//! notifications from one sender before a wait coalesce into one event, so
//! the protocol only carries "something changed, look again".

use nanvix_hal_abi::{CoreId, HalError, HalResult, MAX_CORES};

use crate::backend::CoreBackend;
use crate::hal::Hal;
use crate::spinlock::SpinLock;

/// Pending-sender sets of every core.
pub struct EventTable {
    pending: [SpinLock<u64>; MAX_CORES],
}

impl EventTable {
    /// Creates a table with nothing pending.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: [const { SpinLock::new(0) }; MAX_CORES],
        }
    }

    /// Marks `sender` pending on `target`. Returns `false` if it already
    /// was.
    pub fn post(&self, target: CoreId, sender: CoreId) -> bool {
        let mut pending = self.pending[target.as_usize()].lock();
        let fresh = *pending & sender.bit() == 0;
        *pending |= sender.bit();
        fresh
    }

    /// Consumes the lowest pending sender of `core`.
    pub fn take(&self, core: CoreId) -> Option<CoreId> {
        let mut pending = self.pending[core.as_usize()].lock();
        if *pending == 0 {
            return None;
        }
        let lowest = pending.trailing_zeros();
        *pending &= !(1u64 << lowest);
        CoreId::from_index(lowest as usize)
    }

    /// Discards everything pending on `core`. Returns the discarded set.
    pub fn clear(&self, core: CoreId) -> u64 {
        core::mem::take(&mut *self.pending[core.as_usize()].lock())
    }

    /// Senders pending on `core`.
    #[must_use]
    pub fn pending(&self, core: CoreId) -> u64 {
        *self.pending[core.as_usize()].lock()
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Signals `target` on behalf of the calling core.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `target` is outside the cluster or is the
    /// calling core.
    pub fn event_notify(&self, target: CoreId) -> HalResult<()> {
        self.check_core(target)?;
        let me = self.core_get_id();
        if target == me {
            return Err(HalError::InvalidArgument);
        }
        let fresh = self.events.post(target, me);
        tracing::trace!(from = %me, to = %target, coalesced = !fresh, "event");
        self.backend().ipi_send(target);
        Ok(())
    }

    /// Consumes one pending event of the calling core without blocking.
    /// Returns the sender.
    pub fn event_try_wait(&self) -> Option<CoreId> {
        let sender = self.events.take(self.core_get_id())?;
        self.backend().ipi_ack();
        Some(sender)
    }

    /// Blocks until the calling core has a pending event, consumes the
    /// one from the lowest sender and returns that sender.
    ///
    /// There is no timeout: some other core must eventually notify.
    pub fn event_wait(&self) -> CoreId {
        loop {
            if let Some(sender) = self.event_try_wait() {
                return sender;
            }
            self.service_interrupts();
            self.backend().wait_for_event();
        }
    }

    /// Discards every pending event of the calling core.
    pub fn event_drop(&self) {
        let dropped = self.events.clear(self.core_get_id());
        if dropped != 0 {
            tracing::trace!(senders = format_args!("{dropped:#x}"), "events dropped");
        }
        self.backend().ipi_ack();
    }

    /// Senders currently pending on the calling core.
    #[must_use]
    pub fn event_pending(&self) -> u64 {
        self.events.pending(self.core_get_id())
    }

    /// Same as [`event_notify`](Self::event_notify).
    ///
    /// # Errors
    ///
    /// See [`event_notify`](Self::event_notify).
    pub fn cluster_ipi_send(&self, target: CoreId) -> HalResult<()> {
        self.event_notify(target)
    }

    /// Clears the calling core's IPI line without consuming events.
    pub fn cluster_ipi_ack(&self) {
        self.backend().ipi_ack();
    }

    /// Same as [`event_wait`](Self::event_wait).
    pub fn cluster_ipi_wait(&self) -> CoreId {
        self.event_wait()
    }
}
