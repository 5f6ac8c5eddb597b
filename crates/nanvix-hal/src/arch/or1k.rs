// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! OpenRISC or1k.
//!
//! 8 KiB pages, software-walked tables (256-entry directory, 2048-entry
//! tables), OMPIC for IPIs. The tick timer is routed through the interrupt
//! table as line 0.

use nanvix_hal_abi::{ExceptionNum, HalResult, InterruptNum};
use static_assertions::const_assert;

use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// Supervisor mode.
const SR_SM: u32 = 1 << 0;
/// Tick timer exceptions enabled.
const SR_TEE: u32 = 1 << 1;
/// Interrupt exceptions enabled.
const SR_IEE: u32 = 1 << 2;

/// Stack pointer register (`r1`).
const SP: usize = 1;
/// First argument register (`r3`).
const ARG0: usize = 3;
/// Link register (`r9`).
const LR: usize = 9;

/// Register record saved by the or1k exception vectors.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Or1kContext {
    /// `r0..r31`.
    pub gpr: [u32; 32],
    /// `EPCR`: resume address.
    pub epcr: u32,
    /// `EEAR`: effective address of the fault.
    pub eear: u32,
    /// `ESR`: status to restore.
    pub esr: u32,
    /// Kernel stack for the next trap.
    pub ksp: u32,
}

/// Declared size of [`Or1kContext`].
pub const OR1K_CONTEXT_SIZE: usize = 144;

impl Context for Or1kContext {
    const SIZE: usize = OR1K_CONTEXT_SIZE;
    const WORD_SIZE: usize = 4;
    const STACK_ALIGN: u64 = 4;

    fn pc(&self) -> u64 {
        u64::from(self.epcr)
    }

    fn set_pc(&mut self, pc: u64) {
        self.epcr = pc as u32;
    }

    fn sp(&self) -> u64 {
        u64::from(self.gpr[SP])
    }

    fn set_sp(&mut self, sp: u64) {
        self.gpr[SP] = sp as u32;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.epcr = entry as u32;
        self.gpr[SP] = user_sp as u32;
        self.ksp = kernel_sp as u32;
        self.esr = SR_SM | SR_TEE | SR_IEE;
    }

    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        self.gpr[LR] = self.epcr;
        self.gpr[ARG0] = arg as u32;
        self.epcr = handler as u32;
        Ok(())
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        const NAMES: [&str; 32] = [
            "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
            "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25",
            "r26", "r27", "r28", "r29", "r30", "r31",
        ];
        for (name, value) in NAMES.into_iter().zip(self.gpr) {
            f(name, u64::from(value));
        }
        f("epcr", u64::from(self.epcr));
        f("eear", u64::from(self.eear));
        f("esr", u64::from(self.esr));
        f("ksp", u64::from(self.ksp));
    }
}

const_assert!(layout_is_valid::<Or1kContext>());

/// or1k software page-table entry.
///
/// Bits 0..5 carry the cache and access attributes the TLB refill code
/// copies into `DTLBTR`/`ITLBTR`; bits 6..8 are the permission triple and
/// bit 9 marks the entry present.
pub struct Or1kEntry;

impl EntryLayout for Or1kEntry {
    type Raw = u32;
    const PAGE_SHIFT: u32 = 13;
    const PRESENT: u64 = 1 << 9;
    const WRITABLE: Flag = Flag::Set(1 << 7);
    const EXECUTABLE: Flag = Flag::Set(1 << 8);
    const USER: Flag = Flag::Set(1 << 6);
    const FRAME_MASK: u64 = 0xFFFF_FC00;
    const FRAME_SHIFT: u32 = 10;
}

const NUM_INTERRUPTS: usize = 32;
const INTERRUPT_CLOCK: u16 = 0;
const INTERRUPT_OMPIC: u16 = 1;
const LEVELS: [u64; 4] = standard_levels(
    (1 << NUM_INTERRUPTS) - 1,
    1 << INTERRUPT_CLOCK,
    1 << INTERRUPT_OMPIC,
);

/// OpenRISC descriptor.
pub struct OpenRisc;

impl Arch for OpenRisc {
    const ID: ArchId = ArchId::OpenRisc;
    const WORD_SIZE: usize = 4;
    const MAX_CORES: usize = 4;
    type Context = Or1kContext;
    type PdeLayout = Or1kEntry;
    type PteLayout = Or1kEntry;
    const PAGE_SHIFT: u32 = 13;
    const PGTAB_SHIFT: u32 = 24;
    const PGDIR_LENGTH: usize = 256;
    const PGTAB_LENGTH: usize = 2048;
    const NUM_INTERRUPTS: usize = NUM_INTERRUPTS;
    const NUM_EXCEPTIONS: usize = 12;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(INTERRUPT_CLOCK);
    const INTERRUPT_IPI: Option<InterruptNum> = Some(InterruptNum::new(INTERRUPT_OMPIC));
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = &[
        "tick timer", "ompic", "uart", "line 3", "line 4", "line 5", "line 6", "line 7", "line 8",
        "line 9", "line 10", "line 11", "line 12", "line 13", "line 14", "line 15", "line 16",
        "line 17", "line 18", "line 19", "line 20", "line 21", "line 22", "line 23", "line 24",
        "line 25", "line 26", "line 27", "line 28", "line 29", "line 30", "line 31",
    ];
    const EXCEPTION_NAMES: &'static [&'static str] = &[
        "reset",
        "bus error",
        "data page fault",
        "instruction page fault",
        "alignment",
        "illegal instruction",
        "data tlb miss",
        "instruction tlb miss",
        "range",
        "system call",
        "floating point",
        "trap",
    ];
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = Some(ExceptionNum::new(9));
    const TIMER: TimerSpec = TimerSpec {
        base_hz: 50_000_000,
        counter_bits: 28,
        mode: TimerMode::Periodic,
    };
}

const_assert!(descriptor_is_valid::<OpenRisc>());
