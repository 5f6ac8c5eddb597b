// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Simulated cluster on native threads.
//!
//! Each core is a `std` thread bound to its core id through a thread-local.
//! Interrupt lines are emulated with one pending word per core: raising a
//! line sets a bit and unparks the core's thread, and the HAL picks it up
//! at its polling points (`service_interrupts`, `event_wait`). The
//! processor register file of each core is a plain context record, so
//! context switches are observable swaps.
//!
//! Halting or powering off a core unwinds its thread with a [`CoreExit`]
//! payload, which [`HostedCluster`] collects. [`HostedBackend::kill`]
//! unwinds every core still waiting, so a test whose master dies never
//! leaves slaves spinning forever.

use std::any::Any;
use std::boxed::Box;
use std::cell::Cell;
use std::io;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::string::{String, ToString};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};
use std::vec::Vec;

use nanvix_hal_abi::{CoreId, HalError, HalResult, InterruptNum};

use crate::arch::{Arch, irq_bit, source_mask};
use crate::backend::CoreBackend;
use crate::cluster::KernelMain;
use crate::config::ClusterConfig;
use crate::hal::Hal;

/// How long an idle core parks before re-checking its wait condition.
const PARK_INTERVAL: Duration = Duration::from_micros(200);

const NANOS_PER_SEC: u128 = 1_000_000_000;

thread_local! {
    static CURRENT_CORE: Cell<Option<CoreId>> = const { Cell::new(None) };
}

/// Why a simulated core stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreExit {
    /// The core powered itself off.
    PoweredOff,
    /// The core halted, normally on a fatal error.
    Halted,
    /// The machine was killed while the core was waiting.
    Killed,
    /// The code running on the core panicked.
    Panicked(String),
}

/// Boot steps that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStep {
    /// Per-core early setup.
    CoreSetup,
    /// Master memory setup.
    MemorySetup,
    /// Master interrupt controller setup.
    IrqControllerSetup,
}

struct SimulatedCore<C> {
    registers: Mutex<C>,
    thread: Mutex<Option<Thread>>,
    pending: AtomicU64,
    irq_enabled: AtomicBool,
}

/// A simulated machine of architecture `A`.
pub struct HostedBackend<A: Arch> {
    config: ClusterConfig,
    cores: Vec<SimulatedCore<A::Context>>,
    masked: AtomicU64,
    timer: AtomicU64,
    killed: AtomicBool,
    failing: Mutex<Vec<BootStep>>,
    console: Mutex<Vec<u8>>,
    epoch: Instant,
    arch: PhantomData<fn() -> A>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A core unwinding with a lock held leaves plain data behind.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: Arch> HostedBackend<A> {
    /// Builds a machine shaped like `config`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `config` does not fit architecture `A`.
    pub fn new(config: ClusterConfig) -> HalResult<Self> {
        config.validate::<A>()?;
        let cores = (0..config.num_cores)
            .map(|_| SimulatedCore {
                registers: Mutex::new(A::Context::default()),
                thread: Mutex::new(None),
                pending: AtomicU64::new(0),
                irq_enabled: AtomicBool::new(false),
            })
            .collect();
        Ok(Self {
            config,
            cores,
            masked: AtomicU64::new(source_mask::<A>()),
            timer: AtomicU64::new(0),
            killed: AtomicBool::new(false),
            failing: Mutex::new(Vec::new()),
            console: Mutex::new(Vec::new()),
            epoch: Instant::now(),
            arch: PhantomData,
        })
    }

    fn core(&self, core: CoreId) -> HalResult<&SimulatedCore<A::Context>> {
        self.cores.get(core.as_usize()).ok_or(HalError::InvalidArgument)
    }

    fn current(&self) -> &SimulatedCore<A::Context> {
        &self.cores[self.core_id().as_usize()]
    }

    /// Binds the calling thread to `core`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is outside the cluster.
    pub fn bind_current_thread(&self, core: CoreId) -> HalResult<()> {
        let sim = self.core(core)?;
        *locked(&sim.thread) = Some(thread::current());
        CURRENT_CORE.with(|current| current.set(Some(core)));
        Ok(())
    }

    /// Unbinds the calling thread. It then acts as the master again.
    pub fn unbind_current_thread(&self) {
        CURRENT_CORE.with(|current| current.set(None));
    }

    /// Raises interrupt line `num` on `core`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` or `num` is out of range.
    pub fn raise_interrupt(&self, core: CoreId, num: InterruptNum) -> HalResult<()> {
        if num.as_usize() >= A::NUM_INTERRUPTS {
            return Err(HalError::InvalidArgument);
        }
        let sim = self.core(core)?;
        sim.pending.fetch_or(irq_bit(num), Ordering::AcqRel);
        Self::unpark(sim);
        Ok(())
    }

    /// Raises the timer line on `core`, as if the timer expired.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is out of range.
    pub fn fire_timer(&self, core: CoreId) -> HalResult<()> {
        self.raise_interrupt(core, A::INTERRUPT_TIMER)
    }

    /// Lines raised on `core` and not yet delivered.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is out of range.
    pub fn pending_interrupts(&self, core: CoreId) -> HalResult<u64> {
        Ok(self.core(core)?.pending.load(Ordering::Acquire))
    }

    /// Whether line `num` is masked at the simulated controller.
    #[must_use]
    pub fn is_masked(&self, num: InterruptNum) -> bool {
        self.masked.load(Ordering::Acquire) & irq_bit(num) != 0
    }

    /// Whether `core` has interrupts enabled at the simulated processor.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is out of range.
    pub fn irq_enabled_on(&self, core: CoreId) -> HalResult<bool> {
        Ok(self.core(core)?.irq_enabled.load(Ordering::Acquire))
    }

    /// Last value written to the timer.
    #[must_use]
    pub fn timer_value(&self) -> u64 {
        self.timer.load(Ordering::Acquire)
    }

    /// Makes `step` fail from now on.
    pub fn fail_at(&self, step: BootStep) {
        locked(&self.failing).push(step);
    }

    fn step(&self, step: BootStep) -> HalResult<()> {
        if locked(&self.failing).contains(&step) {
            tracing::debug!(?step, "injected boot failure");
            return Err(HalError::NotSupported);
        }
        Ok(())
    }

    /// Live register file of `core`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is out of range.
    pub fn live_context(&self, core: CoreId) -> HalResult<A::Context> {
        Ok(*locked(&self.core(core)?.registers))
    }

    /// Overwrites the live register file of `core`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `core` is out of range.
    pub fn load_context(&self, core: CoreId, ctx: A::Context) -> HalResult<()> {
        *locked(&self.core(core)?.registers) = ctx;
        Ok(())
    }

    /// Everything written to the console so far.
    #[must_use]
    pub fn console_output(&self) -> String {
        String::from_utf8_lossy(&locked(&self.console)).into_owned()
    }

    /// Unwinds every core that waits from now on.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
        self.wake_all();
    }

    /// Whether [`kill`](Self::kill) was called.
    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    fn unpark(sim: &SimulatedCore<A::Context>) {
        if let Some(thread) = locked(&sim.thread).as_ref() {
            thread.unpark();
        }
    }

    fn exit(exit: CoreExit) -> ! {
        panic::resume_unwind(Box::new(exit))
    }
}

impl<A: Arch> CoreBackend for HostedBackend<A> {
    type Arch = A;

    fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Unbound threads act as the master.
    fn core_id(&self) -> CoreId {
        CURRENT_CORE.with(Cell::get).unwrap_or(self.config.master)
    }

    fn core_setup(&self) -> HalResult<()> {
        self.step(BootStep::CoreSetup)
    }

    fn memory_setup(&self) -> HalResult<()> {
        self.step(BootStep::MemorySetup)
    }

    fn irq_controller_setup(&self) -> HalResult<()> {
        self.step(BootStep::IrqControllerSetup)?;
        self.masked.store(source_mask::<A>(), Ordering::Release);
        Ok(())
    }

    fn irq_enable(&self) {
        self.current().irq_enabled.store(true, Ordering::Release);
    }

    fn irq_disable(&self) {
        self.current().irq_enabled.store(false, Ordering::Release);
    }

    fn irq_mask(&self, num: InterruptNum) {
        self.masked.fetch_or(irq_bit(num), Ordering::AcqRel);
    }

    fn irq_unmask(&self, num: InterruptNum) {
        self.masked.fetch_and(!irq_bit(num), Ordering::AcqRel);
    }

    /// Signals are edge-triggered.
    fn irq_ack(&self, _num: InterruptNum) {}

    fn irq_next(&self, deliverable: u64) -> Option<InterruptNum> {
        let pending = &self.current().pending;
        let mut current = pending.load(Ordering::Acquire);
        loop {
            let ready = current & deliverable;
            if ready == 0 {
                return None;
            }
            let bit = ready & ready.wrapping_neg();
            let next = current & !bit;
            let swapped =
                pending.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire);
            match swapped {
                // Lines are bounded by 64.
                Ok(_) => return Some(InterruptNum::new(bit.trailing_zeros() as u16)),
                Err(actual) => current = actual,
            }
        }
    }

    fn ipi_send(&self, target: CoreId) {
        let Ok(sim) = self.core(target) else {
            return;
        };
        if let Some(ipi) = A::INTERRUPT_IPI {
            sim.pending.fetch_or(irq_bit(ipi), Ordering::AcqRel);
        }
        Self::unpark(sim);
    }

    fn ipi_ack(&self) {
        if let Some(ipi) = A::INTERRUPT_IPI {
            self.current().pending.fetch_and(!irq_bit(ipi), Ordering::AcqRel);
        }
    }

    fn wait_for_event(&self) {
        if self.is_killed() {
            Self::exit(CoreExit::Killed);
        }
        thread::park_timeout(PARK_INTERVAL);
        if self.is_killed() {
            Self::exit(CoreExit::Killed);
        }
    }

    fn wake_all(&self) {
        for sim in &self.cores {
            Self::unpark(sim);
        }
    }

    fn clock_read(&self) -> u64 {
        let nanos = self.epoch.elapsed().as_nanos();
        let ticks = nanos.saturating_mul(u128::from(A::TIMER.base_hz)) / NANOS_PER_SEC;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn timer_program(&self, value: u64) {
        self.timer.store(value, Ordering::Release);
    }

    unsafe fn switch_context(&self, save: &mut A::Context, restore: &A::Context) {
        let mut live = locked(&self.current().registers);
        *save = *live;
        *live = *restore;
    }

    fn stdout_init(&self) {}

    fn stdout_write(&self, bytes: &[u8]) {
        locked(&self.console).extend_from_slice(bytes);
    }

    fn halt(&self) -> ! {
        Self::exit(CoreExit::Halted)
    }

    fn poweroff(&self) -> ! {
        Self::exit(CoreExit::PoweredOff)
    }
}

/// Threads of a running simulated cluster.
#[derive(Debug)]
pub struct HostedCluster {
    threads: Vec<(CoreId, JoinHandle<CoreExit>)>,
}

impl HostedCluster {
    /// Starts one thread per core, each entering [`Hal::cluster_boot`].
    ///
    /// # Errors
    ///
    /// Returns the error of a failed thread spawn. Threads spawned before
    /// the failure are killed.
    pub fn spawn<A: Arch>(
        hal: &Arc<Hal<HostedBackend<A>>>,
        kmain: KernelMain<HostedBackend<A>>,
    ) -> io::Result<Self> {
        let mut threads = Vec::with_capacity(hal.cluster_get_num_cores());
        for core in hal.backend().config().cores() {
            let hal_ref = Arc::clone(hal);
            let spawned = thread::Builder::new()
                .name(std::format!("{core}"))
                .spawn(move || run_core(&hal_ref, core, kmain));
            match spawned {
                Ok(handle) => threads.push((core, handle)),
                Err(err) => {
                    hal.backend().kill();
                    for (_, handle) in threads {
                        let _ = handle.join();
                    }
                    return Err(err);
                }
            }
        }
        Ok(Self { threads })
    }

    /// Waits for every core to stop and returns how each one did, in core
    /// order.
    #[must_use]
    pub fn join(self) -> Vec<CoreExit> {
        self.threads
            .into_iter()
            .map(|(core, handle)| {
                handle.join().unwrap_or_else(|payload| {
                    CoreExit::Panicked(std::format!("{core}: {}", describe(&*payload)))
                })
            })
            .collect()
    }
}

fn run_core<A: Arch>(
    hal: &Hal<HostedBackend<A>>,
    core: CoreId,
    kmain: KernelMain<HostedBackend<A>>,
) -> CoreExit {
    let backend = hal.backend();
    if backend.bind_current_thread(core).is_err() {
        return CoreExit::Panicked(std::format!("{core} is outside the cluster"));
    }
    let exit = catch_exit(|| {
        hal.cluster_boot(kmain);
    })
    .unwrap_or(CoreExit::PoweredOff);
    let master = core == backend.config().master;
    if matches!(exit, CoreExit::Panicked(_)) || (master && exit == CoreExit::Halted) {
        tracing::debug!(%core, ?exit, "killing simulated cluster");
        backend.kill();
    }
    backend.unbind_current_thread();
    exit
}

/// Runs `f` on the calling thread and reports how a simulated core running
/// it stopped, or `None` if `f` returned.
pub fn catch_exit(f: impl FnOnce()) -> Option<CoreExit> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .err()
        .map(|payload| match payload.downcast::<CoreExit>() {
            Ok(exit) => *exit,
            Err(payload) => CoreExit::Panicked(describe(&*payload)),
        })
}

fn describe(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
