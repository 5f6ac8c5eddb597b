// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! `AArch64` with a 4 KiB granule.
//!
//! The walker covers the last two translation levels: the root handed in
//! is an L2 table (1 GiB window) whose table descriptors point at L3
//! page tables. Exceptions are numbered by a dense class index derived
//! from `ESR_EL1.EC` by [`esr_class`].

use nanvix_hal_abi::{ExceptionNum, HalResult, InterruptNum};
use static_assertions::const_assert;

use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// `SPSR_EL1` for a new thread: EL0t, all exceptions unmasked.
pub const SPSR_EL0T: u64 = 0b0000;

/// Register record saved by the `AArch64` exception vectors.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Arm64Context {
    /// `x0..x30`; `x30` is the link register.
    pub x: [u64; 31],
    /// `SP_EL0`.
    pub sp: u64,
    /// `ELR_EL1`: resume address.
    pub elr: u64,
    /// `SPSR_EL1`.
    pub spsr: u64,
    /// `ESR_EL1` at trap time.
    pub esr: u64,
    /// `FAR_EL1` at trap time.
    pub far: u64,
    /// `SP_EL1`: kernel stack for the next trap.
    pub ksp: u64,
    /// Keeps the record a multiple of 16 bytes.
    pub reserved: u64,
}

/// Exception class of a syndrome value, as an index into the exception
/// table. Classes the table does not list yield `None`.
#[must_use]
pub const fn esr_class(esr: u64) -> Option<ExceptionNum> {
    let index = match (esr >> 26) & 0x3F {
        0x00 => 0,
        0x01 => 1,
        0x0E => 2,
        0x15 => 3,
        0x20 => 4,
        0x21 => 5,
        0x22 => 6,
        0x24 => 7,
        0x25 => 8,
        0x26 => 9,
        0x2C => 10,
        0x2F => 11,
        0x30 | 0x31 => 12,
        0x32 | 0x33 => 13,
        0x34 | 0x35 => 14,
        0x3C => 15,
        _ => return None,
    };
    Some(ExceptionNum::new(index))
}

/// Declared size of [`Arm64Context`].
pub const ARM64_CONTEXT_SIZE: usize = 304;

/// Link register index.
const LR: usize = 30;

impl Context for Arm64Context {
    const SIZE: usize = ARM64_CONTEXT_SIZE;
    const WORD_SIZE: usize = 8;
    const STACK_ALIGN: u64 = 16;

    fn pc(&self) -> u64 {
        self.elr
    }

    fn set_pc(&mut self, pc: u64) {
        self.elr = pc;
    }

    fn sp(&self) -> u64 {
        self.sp
    }

    fn set_sp(&mut self, sp: u64) {
        self.sp = sp;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.elr = entry;
        self.sp = user_sp;
        self.ksp = kernel_sp;
        self.spsr = SPSR_EL0T;
    }

    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        self.x[LR] = self.elr;
        self.x[0] = arg;
        self.elr = handler;
        Ok(())
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        const NAMES: [&str; 31] = [
            "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13",
            "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25",
            "x26", "x27", "x28", "fp", "lr",
        ];
        for (name, value) in NAMES.into_iter().zip(self.x) {
            f(name, value);
        }
        f("sp", self.sp);
        f("elr", self.elr);
        f("spsr", self.spsr);
        f("esr", self.esr);
        f("far", self.far);
        f("ksp", self.ksp);
    }
}

const_assert!(layout_is_valid::<Arm64Context>());

const VALID: u64 = 1 << 0;
/// Table descriptor at L2, page descriptor at L3.
const TYPE_TABLE_OR_PAGE: u64 = 1 << 1;
/// Access flag; clear entries fault on first touch.
const AF: u64 = 1 << 10;
/// Output address bits 12..47.
const OA_MASK: u64 = 0x0000_FFFF_FFFF_F000;

/// L2 table descriptor.
pub struct Arm64TableDescriptor;

impl EntryLayout for Arm64TableDescriptor {
    type Raw = u64;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = VALID;
    const TYPE_BITS: u64 = TYPE_TABLE_OR_PAGE;
    const WRITABLE: Flag = Flag::Always;
    const EXECUTABLE: Flag = Flag::Always;
    const USER: Flag = Flag::Always;
    const FRAME_MASK: u64 = OA_MASK;
    const FRAME_SHIFT: u32 = 12;
}

/// L3 page descriptor.
pub struct Arm64PageDescriptor;

impl EntryLayout for Arm64PageDescriptor {
    type Raw = u64;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = VALID;
    const TYPE_BITS: u64 = TYPE_TABLE_OR_PAGE | AF;
    /// `AP[2]` set means read-only.
    const WRITABLE: Flag = Flag::Clear(1 << 7);
    /// `PXN` and `UXN`.
    const EXECUTABLE: Flag = Flag::Clear((1 << 53) | (1 << 54));
    /// `AP[1]`: EL0 access.
    const USER: Flag = Flag::Set(1 << 6);
    const FRAME_MASK: u64 = OA_MASK;
    const FRAME_SHIFT: u32 = 12;
}

/// SGI used for IPIs.
const INTERRUPT_SGI_IPI: u16 = 0;
/// EL1 virtual timer PPI.
const INTERRUPT_VTIMER: u16 = 27;

const LEVELS: [u64; 4] = standard_levels(u64::MAX, 1 << INTERRUPT_VTIMER, 1 << INTERRUPT_SGI_IPI);

/// `AArch64` descriptor.
pub struct Arm64;

impl Arch for Arm64 {
    const ID: ArchId = ArchId::Arm64;
    const WORD_SIZE: usize = 8;
    const MAX_CORES: usize = 8;
    type Context = Arm64Context;
    type PdeLayout = Arm64TableDescriptor;
    type PteLayout = Arm64PageDescriptor;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 21;
    const PGDIR_LENGTH: usize = 512;
    const PGTAB_LENGTH: usize = 512;
    const NUM_INTERRUPTS: usize = 64;
    const NUM_EXCEPTIONS: usize = 16;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(INTERRUPT_VTIMER);
    const INTERRUPT_IPI: Option<InterruptNum> = Some(InterruptNum::new(INTERRUPT_SGI_IPI));
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = &[
        "sgi 0", "sgi 1", "sgi 2", "sgi 3", "sgi 4", "sgi 5", "sgi 6", "sgi 7", "sgi 8", "sgi 9",
        "sgi 10", "sgi 11", "sgi 12", "sgi 13", "sgi 14", "sgi 15", "ppi 16", "ppi 17", "ppi 18",
        "ppi 19", "ppi 20", "ppi 21", "ppi 22", "ppi 23", "ppi 24", "ppi 25", "hypervisor timer",
        "virtual timer", "ppi 28", "secure physical timer", "physical timer", "ppi 31", "spi 32",
        "spi 33", "spi 34", "spi 35", "spi 36", "spi 37", "spi 38", "spi 39", "spi 40", "spi 41",
        "spi 42", "spi 43", "spi 44", "spi 45", "spi 46", "spi 47", "spi 48", "spi 49", "spi 50",
        "spi 51", "spi 52", "spi 53", "spi 54", "spi 55", "spi 56", "spi 57", "spi 58", "spi 59",
        "spi 60", "spi 61", "spi 62", "spi 63",
    ];
    const EXCEPTION_NAMES: &'static [&'static str] = &[
        "unknown reason",
        "trapped wfi/wfe",
        "illegal execution state",
        "supervisor call",
        "instruction abort from lower el",
        "instruction abort",
        "pc alignment fault",
        "data abort from lower el",
        "data abort",
        "sp alignment fault",
        "floating point exception",
        "serror",
        "breakpoint",
        "software step",
        "watchpoint",
        "brk instruction",
    ];
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = Some(ExceptionNum::new(3));
    const TIMER: TimerSpec = TimerSpec {
        base_hz: 62_500_000,
        counter_bits: 32,
        mode: TimerMode::OneShot,
    };
}

const_assert!(descriptor_is_valid::<Arm64>());
