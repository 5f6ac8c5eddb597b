// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! RISC-V rv64gc with Sv39 paging.
//!
//! Sv39 has three levels. The HAL walks the last two: the root handed in
//! is the level-1 table covering the kernel's 1 GiB window, whose entries
//! point at level-0 leaf tables.

use nanvix_hal_abi::{ExceptionNum, HalResult, InterruptNum};
use static_assertions::const_assert;

use super::riscv::{
    A0, EXCEPTION_ECALL_U, EXCEPTION_NAMES, GPR_NAMES, INTERRUPT_NAMES, INTERRUPT_SSI,
    INTERRUPT_STI, NUM_INTERRUPTS, PPN_SHIFT, PTE_R, PTE_U, PTE_V, PTE_W, PTE_X, RA, SP,
    SSTATUS_SPIE, SSTATUS_SPP, TIMEBASE_HZ,
};
use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// Register record saved by the rv64gc trap vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rv64Context {
    /// `x0..x31`.
    pub gpr: [u64; 32],
    /// `sepc`.
    pub pc: u64,
    /// `sstatus`.
    pub status: u64,
    /// `sscratch`.
    pub scratch: u64,
    /// `scause`.
    pub cause: u64,
}

/// Declared size of [`Rv64Context`].
pub const RV64_CONTEXT_SIZE: usize = 288;

impl Context for Rv64Context {
    const SIZE: usize = RV64_CONTEXT_SIZE;
    const WORD_SIZE: usize = 8;
    const STACK_ALIGN: u64 = 16;

    fn pc(&self) -> u64 {
        self.pc
    }

    fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    fn sp(&self) -> u64 {
        self.gpr[SP]
    }

    fn set_sp(&mut self, sp: u64) {
        self.gpr[SP] = sp;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.pc = entry;
        self.gpr[SP] = user_sp;
        self.scratch = kernel_sp;
        self.status = SSTATUS_SPIE | SSTATUS_SPP;
    }

    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        self.gpr[RA] = self.pc;
        self.gpr[A0] = arg;
        self.pc = handler;
        Ok(())
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        for (name, value) in GPR_NAMES.into_iter().zip(self.gpr) {
            f(name, value);
        }
        f("pc", self.pc);
        f("status", self.status);
        f("scratch", self.scratch);
        f("cause", self.cause);
    }
}

const_assert!(layout_is_valid::<Rv64Context>());

/// Bits 10..53 hold the 44-bit physical page number.
const SV39_PPN_MASK: u64 = 0x003F_FFFF_FFFF_FC00;

/// Sv39 non-leaf entry.
pub struct Sv39Pde;

impl EntryLayout for Sv39Pde {
    type Raw = u64;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = PTE_V;
    const WRITABLE: Flag = Flag::Always;
    const EXECUTABLE: Flag = Flag::Always;
    const USER: Flag = Flag::Always;
    const FRAME_MASK: u64 = SV39_PPN_MASK;
    const FRAME_SHIFT: u32 = PPN_SHIFT;
}

/// Sv39 leaf entry.
pub struct Sv39Pte;

impl EntryLayout for Sv39Pte {
    type Raw = u64;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = PTE_V;
    const TYPE_BITS: u64 = PTE_R;
    const WRITABLE: Flag = PTE_W;
    const EXECUTABLE: Flag = PTE_X;
    const USER: Flag = PTE_U;
    const FRAME_MASK: u64 = SV39_PPN_MASK;
    const FRAME_SHIFT: u32 = PPN_SHIFT;
}

const LEVELS: [u64; 4] = standard_levels(
    (1 << NUM_INTERRUPTS) - 1,
    1 << INTERRUPT_STI,
    1 << INTERRUPT_SSI,
);

/// RISC-V rv64gc descriptor.
pub struct RiscV64Gc;

impl Arch for RiscV64Gc {
    const ID: ArchId = ArchId::RiscV64Gc;
    const WORD_SIZE: usize = 8;
    const MAX_CORES: usize = 8;
    type Context = Rv64Context;
    type PdeLayout = Sv39Pde;
    type PteLayout = Sv39Pte;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 21;
    const PGDIR_LENGTH: usize = 512;
    const PGTAB_LENGTH: usize = 512;
    const NUM_INTERRUPTS: usize = NUM_INTERRUPTS;
    const NUM_EXCEPTIONS: usize = 16;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(INTERRUPT_STI);
    const INTERRUPT_IPI: Option<InterruptNum> = Some(InterruptNum::new(INTERRUPT_SSI));
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = INTERRUPT_NAMES;
    const EXCEPTION_NAMES: &'static [&'static str] = EXCEPTION_NAMES;
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = Some(ExceptionNum::new(EXCEPTION_ECALL_U));
    const TIMER: TimerSpec = TimerSpec {
        base_hz: TIMEBASE_HZ,
        counter_bits: 64,
        mode: TimerMode::OneShot,
    };
}

const_assert!(descriptor_is_valid::<RiscV64Gc>());
