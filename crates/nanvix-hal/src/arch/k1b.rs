// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Kalray MPPA-256 k1b (VLIW), running on the mOS hypervisor.
//!
//! IPIs are mOS event lines: they wake a core sleeping in its wait
//! instruction but raise no interrupt, so the event protocol alone carries
//! them. Paging uses a software table the TLB refill handler walks.

use nanvix_hal_abi::{ExceptionNum, HalResult, InterruptNum};
use static_assertions::const_assert;

use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// `PS.IE`: interrupts enabled.
const PS_IE: u32 = 1 << 4;
/// `PS.PM`: privileged mode.
const PS_PM: u32 = 1 << 0;

/// Stack pointer (`r12`).
const SP: usize = 12;
/// First argument register (`r0`).
const ARG0: usize = 0;

/// Register record saved by the k1b trap handler.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct K1bContext {
    /// `r0..r63`.
    pub gpr: [u32; 64],
    /// Shadow program counter: resume address.
    pub spc: u32,
    /// Shadow processing status.
    pub sps: u32,
    /// Kernel stack for the next trap.
    pub ssp: u32,
    /// Return address.
    pub ra: u32,
    /// Compute status.
    pub cs: u32,
    /// Hardware loop count.
    pub lc: u32,
    /// Hardware loop start.
    pub ls: u32,
    /// Hardware loop end.
    pub le: u32,
}

impl Default for K1bContext {
    fn default() -> Self {
        Self {
            gpr: [0; 64],
            spc: 0,
            sps: 0,
            ssp: 0,
            ra: 0,
            cs: 0,
            lc: 0,
            ls: 0,
            le: 0,
        }
    }
}

/// Declared size of [`K1bContext`].
pub const K1B_CONTEXT_SIZE: usize = 288;

impl Context for K1bContext {
    const SIZE: usize = K1B_CONTEXT_SIZE;
    const WORD_SIZE: usize = 4;
    const STACK_ALIGN: u64 = 8;

    fn pc(&self) -> u64 {
        u64::from(self.spc)
    }

    fn set_pc(&mut self, pc: u64) {
        self.spc = pc as u32;
    }

    fn sp(&self) -> u64 {
        u64::from(self.gpr[SP])
    }

    fn set_sp(&mut self, sp: u64) {
        self.gpr[SP] = sp as u32;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.spc = entry as u32;
        self.gpr[SP] = user_sp as u32;
        self.ssp = kernel_sp as u32;
        self.sps = PS_PM | PS_IE;
    }

    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        self.ra = self.spc;
        self.gpr[ARG0] = arg as u32;
        self.spc = handler as u32;
        Ok(())
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        const NAMES: [&str; 64] = [
            "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
            "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25",
            "r26", "r27", "r28", "r29", "r30", "r31", "r32", "r33", "r34", "r35", "r36", "r37",
            "r38", "r39", "r40", "r41", "r42", "r43", "r44", "r45", "r46", "r47", "r48", "r49",
            "r50", "r51", "r52", "r53", "r54", "r55", "r56", "r57", "r58", "r59", "r60", "r61",
            "r62", "r63",
        ];
        for (name, value) in NAMES.into_iter().zip(self.gpr) {
            f(name, u64::from(value));
        }
        let special = [
            ("spc", self.spc),
            ("sps", self.sps),
            ("ssp", self.ssp),
            ("ra", self.ra),
            ("cs", self.cs),
            ("lc", self.lc),
            ("ls", self.ls),
            ("le", self.le),
        ];
        for (name, value) in special {
            f(name, u64::from(value));
        }
    }
}

const_assert!(layout_is_valid::<K1bContext>());

/// k1b software page-table entry.
pub struct K1bEntry;

impl EntryLayout for K1bEntry {
    type Raw = u32;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = 1 << 0;
    const WRITABLE: Flag = Flag::Set(1 << 1);
    const EXECUTABLE: Flag = Flag::Set(1 << 3);
    const USER: Flag = Flag::Set(1 << 2);
    const FRAME_MASK: u64 = 0xFFFF_F000;
    const FRAME_SHIFT: u32 = 12;
}

const NUM_INTERRUPTS: usize = 16;
const INTERRUPT_TIMER0: u16 = 0;
const LEVELS: [u64; 4] = standard_levels((1 << NUM_INTERRUPTS) - 1, 1 << INTERRUPT_TIMER0, 0);

/// Kalray k1b descriptor.
pub struct K1b;

impl Arch for K1b {
    const ID: ArchId = ArchId::K1b;
    const WORD_SIZE: usize = 4;
    const MAX_CORES: usize = 16;
    type Context = K1bContext;
    type PdeLayout = K1bEntry;
    type PteLayout = K1bEntry;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 22;
    const PGDIR_LENGTH: usize = 1024;
    const PGTAB_LENGTH: usize = 1024;
    const NUM_INTERRUPTS: usize = NUM_INTERRUPTS;
    const NUM_EXCEPTIONS: usize = 16;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(INTERRUPT_TIMER0);
    const INTERRUPT_IPI: Option<InterruptNum> = None;
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = &[
        "timer 0",
        "timer 1",
        "watchdog",
        "control noc",
        "data noc",
        "dma",
        "noc error",
        "watchdog overflow",
        "debug",
        "line 9",
        "line 10",
        "line 11",
        "line 12",
        "line 13",
        "line 14",
        "line 15",
    ];
    const EXCEPTION_NAMES: &'static [&'static str] = &[
        "reset",
        "opcode",
        "protection",
        "alignment",
        "program system error",
        "data system error",
        "program double ecc",
        "data double ecc",
        "program parity",
        "data parity",
        "program single ecc",
        "data single ecc",
        "tlb miss",
        "tlb protection",
        "write to clean",
        "atomic to clean",
    ];
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = None;
    const TIMER: TimerSpec = TimerSpec {
        base_hz: 400_000_000,
        counter_bits: 32,
        mode: TimerMode::Periodic,
    };
}

const_assert!(descriptor_is_valid::<K1b>());
