// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Cluster boot and core management.
//!
//! Every core enters [`Hal::cluster_boot`]. The master initializes memory,
//! the core table, the interrupt controller, the console and the timer,
//! opens the boot fence and runs `kmain` exactly once. Slaves wait at the
//! fence, come online and settle in the idle loop, where they run work
//! posted by [`Hal::core_start`].
//!
//! ```text
//! RESETTING --fence--> RUNNING <--> SLEEPING
//!                         |
//!                         +--> OFFLINE
//! ```
//!
//! Each core descriptor carries an age, bumped on every reset. Work is
//! stamped with the age the target had when it was posted, and an idle
//! core drops work whose stamp no longer matches.

use core::sync::atomic::Ordering;

use nanvix_hal_abi::{CoreId, CoreState, HalError, HalResult, MAX_CORES};

use crate::backend::CoreBackend;
use crate::hal::Hal;
use crate::spinlock::{SpinLock, SpinLockGuard};

/// Kernel entry point run once on the master.
pub type KernelMain<B> = fn(&Hal<B>);

/// Work an idle slave runs on request.
pub type CoreWork<B> = fn(&Hal<B>);

struct CoreDescriptor<W> {
    state: CoreState,
    running: bool,
    idle: bool,
    age: u64,
    work: Option<(W, u64)>,
    wakeups: u32,
    shutdown: bool,
}

impl<W> CoreDescriptor<W> {
    const INIT: Self = Self {
        state: CoreState::Resetting,
        running: false,
        idle: false,
        age: 0,
        work: None,
        wakeups: 0,
        shutdown: false,
    };
}

/// Point-in-time view of a core descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreSnapshot {
    /// Lifecycle state.
    pub state: CoreState,
    /// Whether the core is executing: online and neither halted nor off.
    pub running: bool,
    /// Whether the core sits in the idle loop ready for work.
    pub idle: bool,
    /// Resets the core has gone through.
    pub age: u64,
}

/// Descriptors of every core, each behind its own lock.
pub struct CoreTable<W> {
    cores: [SpinLock<CoreDescriptor<W>>; MAX_CORES],
}

impl<W> CoreTable<W> {
    /// Creates a table with every core resetting.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cores: [const { SpinLock::new(CoreDescriptor::INIT) }; MAX_CORES],
        }
    }

    fn lock(&self, core: CoreId) -> SpinLockGuard<'_, CoreDescriptor<W>> {
        self.cores[core.as_usize()].lock()
    }

    /// Snapshot of `core`'s descriptor.
    #[must_use]
    pub fn snapshot(&self, core: CoreId) -> CoreSnapshot {
        let desc = self.lock(core);
        CoreSnapshot {
            state: desc.state,
            running: desc.running,
            idle: desc.idle,
            age: desc.age,
        }
    }
}

impl<W> Default for CoreTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Boots the calling core. Every core of the cluster enters here.
    ///
    /// Any failing setup step halts the core. On the master, returning
    /// from `kmain` powers the cluster off.
    pub fn cluster_boot(&self, kmain: KernelMain<B>) -> ! {
        if let Err(err) = self.backend().core_setup() {
            self.fatal(&format_args!("core setup failed: {err}"), None);
        }
        if self.cluster_is_master() {
            self.master_setup();
            tracing::info!(core = %self.core_get_id(), "entering kmain");
            kmain(self);
            tracing::info!("kmain returned");
            self.cluster_poweroff()
        } else {
            self.fence_wait();
            self.core_online();
            self.core_idle()
        }
    }

    fn master_setup(&self) {
        if let Err(err) = self.backend().memory_setup() {
            self.fatal(&format_args!("memory setup failed: {err}"), None);
        }

        let config = *self.backend().config();
        for core in config.cores() {
            let mut desc = self.cores.lock(core);
            *desc = CoreDescriptor::INIT;
            if core == config.master {
                desc.state = CoreState::Running;
                desc.running = true;
            }
        }

        if let Err(err) = self.backend().irq_controller_setup() {
            self.fatal(&format_args!("interrupt controller setup failed: {err}"), None);
        }
        for index in 0..self.interrupts.len() {
            // Source numbers are bounded by MAX_INTERRUPTS.
            let num = nanvix_hal_abi::InterruptNum::new(index as u16);
            if self.interrupts.is_masked(num) {
                self.backend().irq_mask(num);
            } else {
                self.backend().irq_unmask(num);
            }
        }

        self.stdout_init();
        if let Err(err) = self.timer_init(config.timer_frequency_hz) {
            self.fatal(&format_args!("timer setup failed: {err}"), None);
        }
        self.fence_release();
    }

    fn core_online(&self) {
        let me = self.core_get_id();
        {
            let mut desc = self.cores.lock(me);
            desc.state = CoreState::Running;
            desc.running = true;
        }
        tracing::info!(core = %me, "core online");
    }

    /// Idle loop of a slave: run posted work, reset after it, wait for the
    /// next event.
    fn core_idle(&self) -> ! {
        let me = self.core_get_id();
        loop {
            let work = {
                let mut desc = self.cores.lock(me);
                if desc.shutdown || self.shutdown.load(Ordering::Acquire) {
                    drop(desc);
                    self.core_poweroff();
                }
                desc.idle = true;
                match desc.work.take() {
                    Some((work, age)) if age == desc.age => {
                        desc.idle = false;
                        Some(work)
                    }
                    Some((_, age)) => {
                        tracing::warn!(
                            core = %me,
                            stamped = age,
                            age = desc.age,
                            "dropping stale work"
                        );
                        None
                    }
                    None => None,
                }
            };
            if let Some(work) = work {
                work(self);
                self.core_reset();
                continue;
            }
            self.event_wait();
        }
    }

    /// Posts `work` to the idle slave `target` and wakes it.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `target` is outside the cluster or is the
    ///   calling core.
    /// - `Busy` if `target` is not idle in the running state or already
    ///   has work queued.
    pub fn core_start(&self, target: CoreId, work: CoreWork<B>) -> HalResult<()> {
        self.check_core(target)?;
        if target == self.core_get_id() {
            return Err(HalError::InvalidArgument);
        }
        {
            let mut desc = self.cores.lock(target);
            if desc.state != CoreState::Running
                || !desc.idle
                || desc.work.is_some()
                || desc.shutdown
            {
                return Err(HalError::Busy);
            }
            desc.work = Some((work, desc.age));
        }
        tracing::debug!(core = %target, "work posted");
        self.event_notify(target)
    }

    /// Suspends the calling core until [`core_wakeup`](Self::core_wakeup)
    /// targets it. A wakeup sent before the sleep is not lost.
    pub fn core_sleep(&self) {
        let me = self.core_get_id();
        loop {
            {
                let mut desc = self.cores.lock(me);
                if desc.wakeups > 0 {
                    desc.wakeups -= 1;
                    desc.state = CoreState::Running;
                    return;
                }
                desc.state = CoreState::Sleeping;
            }
            if self.shutdown.load(Ordering::Acquire) {
                self.core_poweroff();
            }
            self.event_wait();
        }
    }

    /// Wakes `target` from [`core_sleep`](Self::core_sleep).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `target` is outside the cluster, is the
    /// calling core, or is not online.
    pub fn core_wakeup(&self, target: CoreId) -> HalResult<()> {
        self.check_core(target)?;
        if target == self.core_get_id() {
            return Err(HalError::InvalidArgument);
        }
        {
            let mut desc = self.cores.lock(target);
            if !desc.state.is_online() {
                return Err(HalError::InvalidArgument);
            }
            desc.wakeups = desc.wakeups.saturating_add(1);
        }
        self.event_notify(target)
    }

    /// Resets the calling core's bookkeeping: pending events and wakeups
    /// are dropped and the age advances, invalidating work stamped before
    /// the reset.
    pub fn core_reset(&self) {
        let me = self.core_get_id();
        self.event_drop();
        let age = {
            let mut desc = self.cores.lock(me);
            desc.wakeups = 0;
            desc.age += 1;
            desc.age
        };
        tracing::debug!(core = %me, age, "core reset");
    }

    /// Asks the idle slave `target` to power itself off.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `target` is outside the cluster or is the
    /// calling core, `Busy` if it is not idle.
    pub fn core_shutdown(&self, target: CoreId) -> HalResult<()> {
        self.check_core(target)?;
        if target == self.core_get_id() {
            return Err(HalError::InvalidArgument);
        }
        {
            let mut desc = self.cores.lock(target);
            if !desc.state.is_online() || !desc.idle {
                return Err(HalError::Busy);
            }
            desc.shutdown = true;
        }
        self.event_notify(target)
    }

    /// Snapshot of `core`'s descriptor.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is outside the cluster.
    pub fn core_state(&self, core: CoreId) -> HalResult<CoreSnapshot> {
        self.check_core(core)?;
        Ok(self.cores.snapshot(core))
    }

    /// Stops the calling core for good, leaving its state untouched.
    pub fn core_halt(&self) -> ! {
        let me = self.core_get_id();
        self.interrupts_disable();
        {
            let mut desc = self.cores.lock(me);
            desc.running = false;
            desc.idle = false;
        }
        tracing::info!(core = %me, "core halted");
        self.backend().halt()
    }

    /// Powers the calling core off.
    pub fn core_poweroff(&self) -> ! {
        let me = self.core_get_id();
        self.interrupts_disable();
        self.event_drop();
        {
            let mut desc = self.cores.lock(me);
            desc.state = CoreState::Offline;
            desc.running = false;
            desc.idle = false;
        }
        tracing::info!(core = %me, "core offline");
        self.backend().poweroff()
    }

    /// Powers off every other core, waits until they are offline, then
    /// powers off the calling core.
    pub fn cluster_poweroff(&self) -> ! {
        let me = self.core_get_id();
        self.shutdown.store(true, Ordering::Release);
        tracing::info!(core = %me, "cluster powering off");

        let config = *self.backend().config();
        for core in config.cores().filter(|&core| core != me) {
            if self.cores.snapshot(core).running {
                // Only fails for the calling core, which is filtered out.
                let _ = self.event_notify(core);
            }
        }
        for core in config.cores().filter(|&core| core != me) {
            loop {
                let snapshot = self.cores.snapshot(core);
                if !snapshot.running || snapshot.state == CoreState::Offline {
                    break;
                }
                self.backend().wait_for_event();
            }
        }
        self.core_poweroff()
    }

    /// Powers off the processor. A processor here is a single cluster.
    pub fn processor_poweroff(&self) -> ! {
        self.cluster_poweroff()
    }
}
