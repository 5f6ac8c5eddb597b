// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interrupt dispatch.
//!
//! Each source is either masked or unmasked cluster-wide; each core has its
//! own global enable flag and priority level. A pending source is
//! delivered to a core only if that core has interrupts enabled, the source
//! is unmasked, and the core's current level does not block it.
//!
//! Handlers are plain function pointers keyed by source number. A source
//! without a handler is counted as spurious and dropped.

use core::sync::atomic::{AtomicU64, Ordering};

use nanvix_hal_abi::{HalError, HalResult, InterruptNum};

use crate::arch::{Arch, MAX_INTERRUPTS, irq_bit};
use crate::backend::CoreBackend;
use crate::hal::Hal;
use crate::spinlock::SpinLock;

/// Interrupt handler. Runs with interrupts disabled on the calling core.
pub type InterruptHandler = fn(InterruptNum);

/// Handler slots and mask state for every source.
pub struct InterruptTable {
    len: usize,
    handlers: SpinLock<[Option<InterruptHandler>; MAX_INTERRUPTS]>,
    masked: AtomicU64,
    spurious: AtomicU64,
}

impl InterruptTable {
    /// Creates a table for `len` sources, all masked except `unmasked`.
    #[must_use]
    pub const fn new(len: usize, unmasked: u64) -> Self {
        let all = if len >= 64 { u64::MAX } else { (1u64 << len) - 1 };
        Self {
            len,
            handlers: SpinLock::new([const { None }; MAX_INTERRUPTS]),
            masked: AtomicU64::new(all & !unmasked),
            spurious: AtomicU64::new(0),
        }
    }

    /// Number of sources.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table has no sources.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, num: InterruptNum) -> HalResult<()> {
        if num.as_usize() < self.len {
            Ok(())
        } else {
            Err(HalError::InvalidArgument)
        }
    }

    /// Installs `handler` for `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `Busy` if a handler is
    /// already installed.
    pub fn register(&self, num: InterruptNum, handler: InterruptHandler) -> HalResult<()> {
        self.check(num)?;
        let mut handlers = self.handlers.lock();
        let slot = &mut handlers[num.as_usize()];
        if slot.is_some() {
            return Err(HalError::Busy);
        }
        *slot = Some(handler);
        Ok(())
    }

    /// Removes the handler for `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `NotFound` if no handler
    /// is installed.
    pub fn unregister(&self, num: InterruptNum) -> HalResult<()> {
        self.check(num)?;
        self.handlers.lock()[num.as_usize()]
            .take()
            .map(|_| ())
            .ok_or(HalError::NotFound)
    }

    /// Handler installed for `num`, if any.
    #[must_use]
    pub fn handler(&self, num: InterruptNum) -> Option<InterruptHandler> {
        self.handlers.lock().get(num.as_usize()).copied().flatten()
    }

    /// Marks `num` masked. Returns whether it was unmasked before.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn mask(&self, num: InterruptNum) -> HalResult<bool> {
        self.check(num)?;
        let bit = irq_bit(num);
        Ok(self.masked.fetch_or(bit, Ordering::AcqRel) & bit == 0)
    }

    /// Marks `num` unmasked. Returns whether it was masked before.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn unmask(&self, num: InterruptNum) -> HalResult<bool> {
        self.check(num)?;
        let bit = irq_bit(num);
        Ok(self.masked.fetch_and(!bit, Ordering::AcqRel) & bit != 0)
    }

    /// Whether `num` is masked. Out-of-range sources read as masked.
    #[must_use]
    pub fn is_masked(&self, num: InterruptNum) -> bool {
        num.as_usize() >= self.len || self.masked() & irq_bit(num) != 0
    }

    /// Set of masked sources.
    #[must_use]
    pub fn masked(&self) -> u64 {
        self.masked.load(Ordering::Acquire)
    }

    fn note_spurious(&self) -> u64 {
        self.spurious.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Interrupts dispatched without a handler so far.
    #[must_use]
    pub fn spurious(&self) -> u64 {
        self.spurious.load(Ordering::Relaxed)
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Enables interrupt delivery on the calling core.
    pub fn interrupts_enable(&self) {
        self.cpu().irq_enabled.store(true, Ordering::Release);
        self.backend().irq_enable();
    }

    /// Disables interrupt delivery on the calling core. Idempotent.
    pub fn interrupts_disable(&self) {
        self.backend().irq_disable();
        self.cpu().irq_enabled.store(false, Ordering::Release);
    }

    /// Whether the calling core has interrupts enabled.
    #[must_use]
    pub fn interrupts_are_enabled(&self) -> bool {
        self.cpu().irq_enabled.load(Ordering::Acquire)
    }

    /// Current interrupt level of the calling core.
    #[must_use]
    pub fn interrupts_get_level(&self) -> usize {
        self.cpu().level.load(Ordering::Acquire)
    }

    /// Switches the calling core to `level` and returns the previous one.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the architecture has no such level.
    pub fn interrupts_set_level(&self, level: usize) -> HalResult<usize> {
        let blocked = <B::Arch as Arch>::INTERRUPT_LEVELS
            .get(level)
            .copied()
            .ok_or(HalError::InvalidArgument)?;
        self.backend().irq_set_level(blocked);
        Ok(self.cpu().level.swap(level, Ordering::AcqRel))
    }

    /// Masks `num` at the controller. Masking twice is harmless.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn interrupt_mask(&self, num: InterruptNum) -> HalResult<()> {
        if self.interrupts.mask(num)? {
            tracing::trace!(%num, "masked");
        }
        self.backend().irq_mask(num);
        Ok(())
    }

    /// Unmasks `num` at the controller.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn interrupt_unmask(&self, num: InterruptNum) -> HalResult<()> {
        if self.interrupts.unmask(num)? {
            tracing::trace!(%num, "unmasked");
        }
        self.backend().irq_unmask(num);
        Ok(())
    }

    /// Whether `num` is masked.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn interrupt_is_masked(&self, num: InterruptNum) -> HalResult<bool> {
        self.interrupts.check(num)?;
        Ok(self.interrupts.is_masked(num))
    }

    /// Acknowledges `num` so a level-triggered source can fire again.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn interrupt_ack(&self, num: InterruptNum) -> HalResult<()> {
        self.interrupts.check(num)?;
        self.backend().irq_ack(num);
        Ok(())
    }

    /// Installs `handler` for `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `Busy` if the slot is
    /// taken.
    pub fn interrupt_register(
        &self,
        num: InterruptNum,
        handler: InterruptHandler,
    ) -> HalResult<()> {
        self.interrupts.register(num, handler)?;
        tracing::debug!(%num, "interrupt handler registered");
        Ok(())
    }

    /// Removes the handler for `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `NotFound` if the slot
    /// is empty.
    pub fn interrupt_unregister(&self, num: InterruptNum) -> HalResult<()> {
        self.interrupts.unregister(num)?;
        tracing::debug!(%num, "interrupt handler unregistered");
        Ok(())
    }

    /// Interrupts dispatched without a handler so far.
    #[must_use]
    pub fn spurious_interrupts(&self) -> u64 {
        self.interrupts.spurious()
    }

    /// Sources the calling core would accept right now.
    fn deliverable(&self) -> u64 {
        if !self.interrupts_are_enabled() {
            return 0;
        }
        let blocked = <B::Arch as Arch>::INTERRUPT_LEVELS
            .get(self.interrupts_get_level())
            .copied()
            .unwrap_or(u64::MAX);
        !self.interrupts.masked() & !blocked
    }

    /// Lowest-numbered pending source deliverable to the calling core,
    /// consumed by this call.
    pub fn interrupt_next(&self) -> Option<InterruptNum> {
        match self.deliverable() {
            0 => None,
            deliverable => self.backend().irq_next(deliverable),
        }
    }

    /// Runs the handler for `num` as trap entry would.
    ///
    /// The source is acknowledged first. A source without a handler is
    /// logged and dropped, except the IPI line, which only wakes the core.
    /// An out-of-range number means the trap-entry path is broken and
    /// halts the core.
    pub fn dispatch_interrupt(&self, num: InterruptNum) {
        if num.as_usize() >= self.interrupts.len() {
            self.fatal(&format_args!("dispatch of unknown interrupt source {num}"), None);
        }
        self.backend().irq_ack(num);
        match self.interrupts.handler(num) {
            Some(handler) => handler(num),
            // Wakeup only; the pending set is consumed by event_wait.
            None if Some(num) == <B::Arch as Arch>::INTERRUPT_IPI => {
                tracing::trace!(%num, "ipi");
            }
            None => {
                let count = self.interrupts.note_spurious();
                tracing::warn!(
                    %num,
                    name = <B::Arch as Arch>::INTERRUPT_NAMES[num.as_usize()],
                    count,
                    "spurious interrupt"
                );
            }
        }
    }

    /// Dispatches every pending deliverable source. Returns how many ran.
    ///
    /// Handlers run with interrupts disabled, as on trap entry, and the
    /// previous enable state is restored afterwards.
    pub fn service_interrupts(&self) -> usize {
        let mut serviced = 0;
        while let Some(num) = self.interrupt_next() {
            self.interrupts_disable();
            self.dispatch_interrupt(num);
            self.interrupts_enable();
            serviced += 1;
        }
        serviced
    }
}
