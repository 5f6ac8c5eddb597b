// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! HAL state.
//!
//! [`Hal`] owns every table the HAL keeps: interrupt and exception
//! handlers, per-core interrupt state, event pending sets, core
//! descriptors, the boot fence and the clock calibration. It is built once
//! by [`Hal::new`] and shared by reference between all cores of the
//! cluster. Operations are spread over the modules that define them:
//!
//! - [`crate::interrupt`]: masking, levels, handler registration, dispatch
//! - [`crate::exception`]: exception handlers and the fatal path
//! - [`crate::event`]: IPIs and the coalescing event protocol
//! - [`crate::clock`]: timer calibration
//! - [`crate::cluster`]: boot sequencing, idle loop and power management

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicUsize};

use nanvix_hal_abi::{CoreId, HalError, HalResult, MAX_CORES, Vaddr};

use crate::arch::{Arch, descriptor_is_valid, irq_bit};
use crate::backend::{ContextOf, CoreBackend};
use crate::clock::Clock;
use crate::cluster::{CoreTable, CoreWork};
use crate::console::Console;
use crate::context::{Context, ExecutionContext, RegisterDump, Stack, layout_is_valid};
use crate::event::EventTable;
use crate::exception::ExceptionTable;
use crate::fence::Fence;
use crate::interrupt::InterruptTable;

/// Interrupt state private to one core.
pub(crate) struct CpuState {
    pub(crate) irq_enabled: AtomicBool,
    pub(crate) level: AtomicUsize,
}

impl CpuState {
    const INIT: Self = Self {
        irq_enabled: AtomicBool::new(false),
        level: AtomicUsize::new(0),
    };
}

/// The hardware abstraction layer of one cluster.
pub struct Hal<B: CoreBackend> {
    backend: B,
    pub(crate) cpus: [CpuState; MAX_CORES],
    pub(crate) interrupts: InterruptTable,
    pub(crate) exceptions: ExceptionTable<ContextOf<B>>,
    pub(crate) events: EventTable,
    pub(crate) cores: CoreTable<CoreWork<B>>,
    pub(crate) fence: Fence,
    pub(crate) clock: Clock,
    pub(crate) shutdown: AtomicBool,
}

impl<B: CoreBackend> Hal<B> {
    /// Initializes the HAL for `backend`.
    ///
    /// Checks the architecture's context layout against its declared size
    /// and the cluster shape against the architecture. All interrupt
    /// sources start masked except the timer and IPI lines, and interrupts
    /// start disabled on every core.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the layout check or the configuration check
    /// fails.
    pub fn new(backend: B) -> HalResult<Self> {
        if !layout_is_valid::<ContextOf<B>>() || !descriptor_is_valid::<B::Arch>() {
            tracing::error!(
                arch = %<B::Arch as Arch>::ID,
                size = core::mem::size_of::<ContextOf<B>>(),
                declared = <ContextOf<B> as Context>::SIZE,
                "context layout does not match the architecture declaration"
            );
            return Err(HalError::InvalidArgument);
        }
        backend.config().validate::<B::Arch>()?;

        let mut open = irq_bit(<B::Arch as Arch>::INTERRUPT_TIMER);
        if let Some(ipi) = <B::Arch as Arch>::INTERRUPT_IPI {
            open |= irq_bit(ipi);
        }

        tracing::debug!(
            arch = %<B::Arch as Arch>::ID,
            cores = backend.config().num_cores,
            "hal initialized"
        );
        Ok(Self {
            backend,
            cpus: [const { CpuState::INIT }; MAX_CORES],
            interrupts: InterruptTable::new(<B::Arch as Arch>::NUM_INTERRUPTS, open),
            exceptions: ExceptionTable::new(<B::Arch as Arch>::NUM_EXCEPTIONS),
            events: EventTable::new(),
            cores: CoreTable::new(),
            fence: Fence::new(),
            clock: Clock::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// The machine this HAL drives.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Identity of the calling core.
    #[inline]
    #[must_use]
    pub fn core_get_id(&self) -> CoreId {
        self.backend.core_id()
    }

    /// Number of cores in the cluster.
    #[inline]
    #[must_use]
    pub fn cluster_get_num_cores(&self) -> usize {
        self.backend.config().num_cores
    }

    /// Whether the calling core is the cluster master.
    #[inline]
    #[must_use]
    pub fn cluster_is_master(&self) -> bool {
        self.core_get_id() == self.backend.config().master
    }

    /// Fails with `InvalidArgument` unless `core` belongs to the cluster.
    pub(crate) fn check_core(&self, core: CoreId) -> HalResult<()> {
        if core.as_usize() < self.cluster_get_num_cores() {
            Ok(())
        } else {
            Err(HalError::InvalidArgument)
        }
    }

    pub(crate) fn cpu(&self) -> &CpuState {
        &self.cpus[self.core_get_id().as_usize()]
    }

    /// Console writer.
    #[must_use]
    pub const fn console(&self) -> Console<'_, B> {
        Console::new(&self.backend)
    }

    /// Prepares the console.
    pub fn stdout_init(&self) {
        self.backend.stdout_init();
    }

    /// Writes raw bytes to the console.
    pub fn stdout_write(&self, bytes: &[u8]) {
        self.backend.stdout_write(bytes);
    }

    /// Synthesizes a context owned by the calling core that enters `entry`
    /// on the given stacks.
    ///
    /// # Errors
    ///
    /// See [`ExecutionContext::create`].
    pub fn context_create(
        &self,
        entry: Vaddr,
        user_stack: Stack,
        kernel_stack: Stack,
    ) -> HalResult<ExecutionContext<ContextOf<B>>> {
        ExecutionContext::create(self.core_get_id(), entry, user_stack, kernel_stack)
    }

    /// Saves the running context into `save_into` and resumes
    /// `restore_from`.
    ///
    /// Control comes back here only when some later switch restores
    /// `save_into`. Only the calling core is involved; nothing is
    /// synchronized with other cores.
    ///
    /// # Errors
    ///
    /// - `NotSupported` on architectures without multithreading.
    /// - `InvalidArgument` if `restore_from` was produced on another core
    ///   or has a null program counter.
    ///
    /// # Safety
    ///
    /// `restore_from` must describe a resumable state: code at its program
    /// counter and live stacks that nothing else uses.
    pub unsafe fn context_switch_to(
        &self,
        save_into: &mut ExecutionContext<ContextOf<B>>,
        restore_from: &ExecutionContext<ContextOf<B>>,
    ) -> HalResult<()> {
        if !<ContextOf<B> as Context>::SUPPORTS_MULTITHREADING {
            return Err(HalError::NotSupported);
        }
        let me = self.core_get_id();
        if restore_from.owner() != me || restore_from.pc() == 0 {
            return Err(HalError::InvalidArgument);
        }
        save_into.set_owner(me);
        // SAFETY: forwarded from this function's contract.
        unsafe {
            self.backend
                .switch_context(save_into.registers_mut(), restore_from.registers());
        }
        Ok(())
    }

    /// Writes a register dump of `ctx` to the console.
    pub fn context_dump(&self, ctx: &ContextOf<B>) {
        let mut console = self.console();
        // Console writes cannot fail.
        let _ = writeln!(console, "[hal] context dump ({}):", self.core_get_id());
        let _ = write!(console, "{}", RegisterDump(ctx));
    }

    /// Prints a diagnostic, dumps `ctx` if given, and halts the calling
    /// core.
    pub fn fatal(&self, cause: &dyn fmt::Display, ctx: Option<&ContextOf<B>>) -> ! {
        let core = self.core_get_id();
        tracing::error!(%core, "fatal: {cause}");
        let mut console = self.console();
        let _ = writeln!(console, "[hal] fatal on {core}: {cause}");
        if let Some(ctx) = ctx {
            self.context_dump(ctx);
        }
        self.core_halt()
    }
}

impl<B: CoreBackend> fmt::Debug for Hal<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hal")
            .field("arch", &<B::Arch as Arch>::ID)
            .field("cores", &self.cluster_get_num_cores())
            .field("fence_released", &self.fence.is_released())
            .finish_non_exhaustive()
    }
}
