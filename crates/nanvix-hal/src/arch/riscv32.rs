// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! RISC-V rv32gc with Sv32 paging.

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

/// Register record saved by the rv32gc trap vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rv32Context {
    /// `x0..x31`; `x0` is stored but never restored.
    pub gpr: [u32; 32],
    /// `sepc`.
    pub pc: u32,
    /// `sstatus`.
    pub status: u32,
    /// `sscratch`: kernel stack for the next trap.
    pub scratch: u32,
    /// `scause`.
    pub cause: u32,
}

/// Declared size of [`Rv32Context`].
pub const RV32_CONTEXT_SIZE: usize = 144;

impl Context for Rv32Context {
    const SIZE: usize = RV32_CONTEXT_SIZE;
    const WORD_SIZE: usize = 4;
    const STACK_ALIGN: u64 = 16;

    fn pc(&self) -> u64 {
        u64::from(self.pc)
    }

    fn set_pc(&mut self, pc: u64) {
        self.pc = pc as u32;
    }

    fn sp(&self) -> u64 {
        u64::from(self.gpr[SP])
    }

    fn set_sp(&mut self, sp: u64) {
        self.gpr[SP] = sp as u32;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.pc = entry as u32;
        self.gpr[SP] = user_sp as u32;
        self.scratch = kernel_sp as u32;
        self.status = (SSTATUS_SPIE | SSTATUS_SPP) as u32;
    }

    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        self.gpr[RA] = self.pc;
        self.gpr[A0] = arg as u32;
        self.pc = handler as u32;
        Ok(())
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        for (name, value) in GPR_NAMES.into_iter().zip(self.gpr) {
            f(name, u64::from(value));
        }
        f("pc", u64::from(self.pc));
        f("status", u64::from(self.status));
        f("scratch", u64::from(self.scratch));
        f("cause", u64::from(self.cause));
    }
}

const_assert!(layout_is_valid::<Rv32Context>());

/// Sv32 non-leaf entry: valid, permissions clear.
pub struct Sv32Pde;

impl EntryLayout for Sv32Pde {
    type Raw = u32;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = PTE_V;
    const WRITABLE: Flag = Flag::Always;
    const EXECUTABLE: Flag = Flag::Always;
    const USER: Flag = Flag::Always;
    const FRAME_MASK: u64 = 0xFFFF_FC00;
    const FRAME_SHIFT: u32 = PPN_SHIFT;
}

/// Sv32 leaf entry.
pub struct Sv32Pte;

impl EntryLayout for Sv32Pte {
    type Raw = u32;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = PTE_V;
    const TYPE_BITS: u64 = PTE_R;
    const WRITABLE: Flag = PTE_W;
    const EXECUTABLE: Flag = PTE_X;
    const USER: Flag = PTE_U;
    const FRAME_MASK: u64 = 0xFFFF_FC00;
    const FRAME_SHIFT: u32 = PPN_SHIFT;
}

const LEVELS: [u64; 4] = standard_levels(
    (1 << NUM_INTERRUPTS) - 1,
    1 << INTERRUPT_STI,
    1 << INTERRUPT_SSI,
);

/// RISC-V rv32gc descriptor.
pub struct RiscV32;

impl Arch for RiscV32 {
    const ID: ArchId = ArchId::RiscV32;
    const WORD_SIZE: usize = 4;
    const MAX_CORES: usize = 8;
    type Context = Rv32Context;
    type PdeLayout = Sv32Pde;
    type PteLayout = Sv32Pte;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 22;
    const PGDIR_LENGTH: usize = 1024;
    const PGTAB_LENGTH: usize = 1024;
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

const_assert!(descriptor_is_valid::<RiscV32>());
