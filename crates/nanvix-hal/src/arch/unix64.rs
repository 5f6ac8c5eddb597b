// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Simulation on a 64-bit Linux host.
//!
//! Trap numbers are POSIX signal numbers for both interrupts and
//! exceptions: the scheduling tick is `SIGALRM`, IPIs are `SIGUSR1` and a
//! segmentation fault arrives as exception 11. There is no register
//! record to speak of, so the context only remembers the signal that
//! created it and reports 0 for its stack and program counters.

use nanvix_hal_abi::{ExceptionNum, InterruptNum};
use static_assertions::const_assert;

use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// Context of the hosted target: the delivering signal and nothing else.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostedContext {
    /// Signal that created this context.
    pub signal: u64,
    /// Pads the record to two words.
    pub reserved: u64,
}

/// Declared size of [`HostedContext`].
pub const HOSTED_CONTEXT_SIZE: usize = 16;

impl Context for HostedContext {
    const SIZE: usize = HOSTED_CONTEXT_SIZE;
    const WORD_SIZE: usize = 8;
    const STACK_ALIGN: u64 = 16;
    const SUPPORTS_MULTITHREADING: bool = false;

    fn pc(&self) -> u64 {
        0
    }

    fn set_pc(&mut self, _pc: u64) {}

    fn sp(&self) -> u64 {
        0
    }

    fn set_sp(&mut self, _sp: u64) {}

    fn forge(&mut self, _entry: u64, _user_sp: u64, _kernel_sp: u64) {}

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        f("signal", self.signal);
    }
}

const_assert!(layout_is_valid::<HostedContext>());

/// x86-64 style entry used for simulated page tables.
pub struct HostedEntry;

impl EntryLayout for HostedEntry {
    type Raw = u64;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = 1 << 0;
    const WRITABLE: Flag = Flag::Set(1 << 1);
    const EXECUTABLE: Flag = Flag::Clear(1 << 63);
    const USER: Flag = Flag::Set(1 << 2);
    const FRAME_MASK: u64 = 0x000F_FFFF_FFFF_F000;
    const FRAME_SHIFT: u32 = 12;
}

/// `SIGUSR1`.
pub const SIGUSR1: u16 = 10;
/// `SIGSEGV`.
pub const SIGSEGV: u16 = 11;
/// `SIGALRM`.
pub const SIGALRM: u16 = 14;

const NUM_SIGNALS: usize = 32;
const LEVELS: [u64; 4] = standard_levels(
    ((1u64 << NUM_SIGNALS) - 1) & !1,
    1 << SIGALRM,
    1 << SIGUSR1,
);

const SIGNAL_NAMES: &[&str] = &[
    "no signal",
    "hangup",
    "interrupt",
    "quit",
    "illegal instruction",
    "trace trap",
    "abort",
    "bus error",
    "floating point exception",
    "kill",
    "user signal 1",
    "segmentation fault",
    "user signal 2",
    "broken pipe",
    "alarm clock",
    "termination",
    "stack fault",
    "child status changed",
    "continue",
    "stop",
    "terminal stop",
    "background read",
    "background write",
    "urgent socket condition",
    "cpu time limit",
    "file size limit",
    "virtual alarm",
    "profiling alarm",
    "window size change",
    "i/o possible",
    "power failure",
    "bad system call",
];

/// Linux-hosted descriptor.
pub struct LinuxHosted;

impl Arch for LinuxHosted {
    const ID: ArchId = ArchId::LinuxHosted;
    const WORD_SIZE: usize = 8;
    const MAX_CORES: usize = 64;
    type Context = HostedContext;
    type PdeLayout = HostedEntry;
    type PteLayout = HostedEntry;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 21;
    const PGDIR_LENGTH: usize = 512;
    const PGTAB_LENGTH: usize = 512;
    const NUM_INTERRUPTS: usize = NUM_SIGNALS;
    const NUM_EXCEPTIONS: usize = NUM_SIGNALS;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(SIGALRM);
    const INTERRUPT_IPI: Option<InterruptNum> = Some(InterruptNum::new(SIGUSR1));
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = SIGNAL_NAMES;
    const EXCEPTION_NAMES: &'static [&'static str] = SIGNAL_NAMES;
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = None;
    const TIMER: TimerSpec = TimerSpec {
        base_hz: 1_000_000_000,
        counter_bits: 64,
        mode: TimerMode::OneShot,
    };
}

const_assert!(descriptor_is_valid::<LinuxHosted>());
