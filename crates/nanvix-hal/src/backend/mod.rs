// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-architecture machine access.
//!
//! [`CoreBackend`] is the narrow interface between the architecture-neutral
//! HAL and a concrete machine: interrupt controller lines, IPI hardware,
//! the timer, the console and power management. Everything that needs
//! inline assembly or MMIO lives behind it.
//!
//! - [`hosted`]: simulated cluster on native threads (`std` only)
//! - [`aarch64`]: bare-metal `AArch64` with GICv2, PL011 and PSCI

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod aarch64;
#[cfg(any(test, feature = "std"))]
pub mod hosted;

#[cfg(test)]
mod hosted_test;

use nanvix_hal_abi::{CoreId, HalResult, InterruptNum};

use crate::arch::Arch;
use crate::config::ClusterConfig;

/// Register record type of backend `B`.
pub type ContextOf<B> = <<B as CoreBackend>::Arch as Arch>::Context;

/// Machine access for one cluster.
///
/// Methods act on the calling core unless they take a target. None of
/// them block except [`wait_for_event`](Self::wait_for_event), which may
/// return spuriously.
pub trait CoreBackend: Send + Sync + 'static {
    /// Architecture of the machine.
    type Arch: Arch;

    /// Cluster shape.
    fn config(&self) -> &ClusterConfig;

    /// Identity of the calling core.
    fn core_id(&self) -> CoreId;

    /// Early per-core setup every core runs before the boot fence.
    fn core_setup(&self) -> HalResult<()>;

    /// Master-only memory setup: BSS, memory region registration.
    fn memory_setup(&self) -> HalResult<()>;

    /// Master-only interrupt controller initialization.
    fn irq_controller_setup(&self) -> HalResult<()>;

    /// Enables interrupt delivery on the calling core.
    fn irq_enable(&self);

    /// Disables interrupt delivery on the calling core.
    fn irq_disable(&self);

    /// Masks a source at the controller.
    fn irq_mask(&self, num: InterruptNum);

    /// Unmasks a source at the controller.
    fn irq_unmask(&self, num: InterruptNum);

    /// Acknowledges a source so it can fire again.
    fn irq_ack(&self, num: InterruptNum);

    /// Applies a priority level, given as the set of sources it blocks.
    fn irq_set_level(&self, blocked: u64) {
        let _ = blocked;
    }

    /// Lowest-numbered source pending on the calling core among
    /// `deliverable`, consumed by this call.
    ///
    /// Hardware backends take interrupts through their vectors and return
    /// `None`; simulated ones deliver here.
    fn irq_next(&self, deliverable: u64) -> Option<InterruptNum>;

    /// Raises an IPI on `target`, or wakes it where IPIs are event lines.
    fn ipi_send(&self, target: CoreId);

    /// Clears the calling core's IPI line.
    fn ipi_ack(&self);

    /// Idles the calling core until an event, interrupt or a short timeout.
    fn wait_for_event(&self);

    /// Wakes every core idling in [`wait_for_event`](Self::wait_for_event).
    fn wake_all(&self) {}

    /// Free-running counter at `Arch::TIMER.base_hz`.
    fn clock_read(&self) -> u64;

    /// Loads the timer with a reload value (periodic) or an absolute
    /// compare value (one-shot).
    fn timer_program(&self, value: u64);

    /// Saves the live register state into `save` and resumes `restore`.
    ///
    /// Returns when another switch resumes `save`.
    ///
    /// # Safety
    ///
    /// `restore` must describe a resumable state on the calling core: its
    /// program counter must point at code and its stack pointers at live,
    /// exclusively owned stacks.
    unsafe fn switch_context(
        &self,
        save: &mut <Self::Arch as Arch>::Context,
        restore: &<Self::Arch as Arch>::Context,
    );

    /// Prepares the console.
    fn stdout_init(&self);

    /// Writes raw bytes to the console.
    fn stdout_write(&self, bytes: &[u8]);

    /// Stops the calling core for good.
    fn halt(&self) -> !;

    /// Powers the calling core off.
    fn poweroff(&self) -> !;
}
