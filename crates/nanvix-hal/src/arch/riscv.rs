// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Definitions shared by the RISC-V targets.

use crate::mmu::Flag;

/// Register names in `x0..x31` order, ABI mnemonics.
pub(super) const GPR_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Return address register.
pub(super) const RA: usize = 1;
/// Stack pointer register.
pub(super) const SP: usize = 2;
/// First argument register.
pub(super) const A0: usize = 10;

/// `sstatus.SPIE`: interrupts re-enabled on `sret`.
pub(super) const SSTATUS_SPIE: u64 = 1 << 5;
/// `sstatus.SPP`: `sret` returns to supervisor mode.
pub(super) const SSTATUS_SPP: u64 = 1 << 8;

/// Valid bit.
pub(super) const PTE_V: u64 = 1 << 0;
/// Readable bit; set on every leaf entry.
pub(super) const PTE_R: u64 = 1 << 1;
pub(super) const PTE_W: Flag = Flag::Set(1 << 2);
pub(super) const PTE_X: Flag = Flag::Set(1 << 3);
pub(super) const PTE_U: Flag = Flag::Set(1 << 4);
/// Frame numbers start at bit 10.
pub(super) const PPN_SHIFT: u32 = 10;

/// Supervisor software interrupt: IPIs.
pub(super) const INTERRUPT_SSI: u16 = 1;
/// Supervisor timer interrupt.
pub(super) const INTERRUPT_STI: u16 = 5;

pub(super) const NUM_INTERRUPTS: usize = 12;

pub(super) const INTERRUPT_NAMES: &[&str] = &[
    "user software interrupt",
    "supervisor software interrupt",
    "reserved 2",
    "machine software interrupt",
    "user timer interrupt",
    "supervisor timer interrupt",
    "reserved 6",
    "machine timer interrupt",
    "user external interrupt",
    "supervisor external interrupt",
    "reserved 10",
    "machine external interrupt",
];

pub(super) const EXCEPTION_NAMES: &[&str] = &[
    "instruction address misaligned",
    "instruction access fault",
    "illegal instruction",
    "breakpoint",
    "load address misaligned",
    "load access fault",
    "store/amo address misaligned",
    "store/amo access fault",
    "environment call from u-mode",
    "environment call from s-mode",
    "reserved 10",
    "environment call from m-mode",
    "instruction page fault",
    "load page fault",
    "reserved 14",
    "store/amo page fault",
];

/// `ecall` from user mode.
pub(super) const EXCEPTION_ECALL_U: u16 = 8;

/// CLINT `mtime` frequency on the QEMU virt board.
pub(super) const TIMEBASE_HZ: u64 = 10_000_000;
