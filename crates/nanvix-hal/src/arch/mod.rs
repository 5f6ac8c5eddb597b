// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Architecture descriptors.
//!
//! Everything the architecture-neutral code needs to know about a target is
//! a constant on the [`Arch`] trait: register record, page-table geometry
//! and entry formats, trap-number spaces, timer hardware and core limits.
//! The dispatch tables, IPI protocol and boot sequencer are written against
//! this trait once.
//!
//! # Targets
//!
//! | Type | Word | Page | Trap numbers |
//! |------|------|------|--------------|
//! | [`X86`] | 32 | 4 KiB | PIC lines, Intel vectors |
//! | [`RiscV32`] | 32 | 4 KiB | `scause` codes |
//! | [`RiscV64Gc`] | 64 | 4 KiB | `scause` codes |
//! | [`Arm64`] | 64 | 4 KiB | GIC INTIDs, EC classes |
//! | [`OpenRisc`] | 32 | 8 KiB | PIC lines, vectors |
//! | [`K1b`] | 32 | 4 KiB | mOS lines, traps |
//! | [`LinuxHosted`] | 64 | 4 KiB | POSIX signals |

pub mod arm64;
pub mod k1b;
pub mod or1k;
mod riscv;
pub mod riscv32;
pub mod riscv64;
pub mod unix64;
pub mod x86;


use core::fmt;

use nanvix_hal_abi::{ExceptionNum, InterruptNum, MAX_CORES};

use crate::context::Context;
use crate::mmu::EntryLayout;

pub use arm64::Arm64;
pub use k1b::K1b;
pub use or1k::OpenRisc;
pub use riscv32::RiscV32;
pub use riscv64::RiscV64Gc;
pub use unix64::LinuxHosted;
pub use x86::X86;

/// Capacity of the interrupt dispatch table and width of mask words.
pub const MAX_INTERRUPTS: usize = 64;

/// Capacity of the exception dispatch table.
pub const MAX_EXCEPTIONS: usize = 64;

/// Identifies a target architecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchId {
    /// Intel i486.
    X86,
    /// RISC-V rv32gc.
    RiscV32,
    /// RISC-V rv64gc.
    RiscV64Gc,
    /// `AArch64`.
    Arm64,
    /// OpenRISC or1k.
    OpenRisc,
    /// Kalray MPPA-256 k1b.
    K1b,
    /// Simulation on a Linux host.
    LinuxHosted,
}

impl fmt::Display for ArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X86 => "i486",
            Self::RiscV32 => "rv32gc",
            Self::RiscV64Gc => "rv64gc",
            Self::Arm64 => "arm64",
            Self::OpenRisc => "or1k",
            Self::K1b => "k1b",
            Self::LinuxHosted => "unix64",
        };
        f.write_str(name)
    }
}

/// How the timer re-arms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    /// Hardware reloads the counter by itself.
    Periodic,
    /// A compare register must be pushed forward after every tick.
    OneShot,
}

/// Timer hardware description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSpec {
    /// Input clock of the timer in Hz.
    pub base_hz: u64,
    /// Width of the reload/compare field in bits.
    pub counter_bits: u32,
    /// Re-arm behavior.
    pub mode: TimerMode,
}

/// A target architecture.
pub trait Arch: Send + Sync + 'static {
    /// Which architecture this is.
    const ID: ArchId;

    /// Native word size in bytes.
    const WORD_SIZE: usize;

    /// Largest cluster the architecture supports.
    const MAX_CORES: usize;

    /// Saved register record.
    type Context: Context;

    /// Page directory entry format.
    type PdeLayout: EntryLayout;

    /// Page table entry format.
    type PteLayout: EntryLayout;

    /// log2 of the page size.
    const PAGE_SHIFT: u32;

    /// log2 of the virtual span one directory entry covers.
    const PGTAB_SHIFT: u32;

    /// Directory entries the walker visits.
    const PGDIR_LENGTH: usize;

    /// Entries per page table.
    const PGTAB_LENGTH: usize;

    /// Interrupt sources, numbered `0..NUM_INTERRUPTS`.
    const NUM_INTERRUPTS: usize;

    /// Exceptions, numbered `0..NUM_EXCEPTIONS`.
    const NUM_EXCEPTIONS: usize;

    /// Interrupt raised by the scheduling timer.
    const INTERRUPT_TIMER: InterruptNum;

    /// Interrupt raised by an inter-processor interrupt, if IPIs arrive as
    /// an interrupt at all. Event-line architectures only wake the core.
    const INTERRUPT_IPI: Option<InterruptNum>;

    /// Interrupt priority levels: entry `i` is the set of sources blocked
    /// at level `i`. Level 0 blocks nothing.
    const INTERRUPT_LEVELS: &'static [u64];

    /// Human-readable interrupt names, indexed by number.
    const INTERRUPT_NAMES: &'static [&'static str];

    /// Human-readable exception names, indexed by number.
    const EXCEPTION_NAMES: &'static [&'static str];

    /// Exception used for system calls, if they trap through the table.
    const SYSCALL_EXCEPTION: Option<ExceptionNum>;

    /// Scheduling timer.
    const TIMER: TimerSpec;
}

/// Virtual span covered by a full page walk.
#[must_use]
pub const fn mappable_span<A: Arch>() -> u64 {
    (A::PGDIR_LENGTH as u64) << A::PGTAB_SHIFT
}

/// Mask with one bit per interrupt source the architecture declares.
#[must_use]
pub const fn source_mask<A: Arch>() -> u64 {
    if A::NUM_INTERRUPTS >= 64 {
        u64::MAX
    } else {
        (1u64 << A::NUM_INTERRUPTS) - 1
    }
}

/// Four levels shared by most targets: nothing blocked, everything but
/// timer and IPI blocked, everything but IPI blocked, everything blocked.
#[must_use]
pub const fn standard_levels(all: u64, timer: u64, ipi: u64) -> [u64; 4] {
    [0, all & !(timer | ipi), all & !ipi, all]
}

/// Bit for an interrupt number in a mask word.
#[must_use]
pub const fn irq_bit(num: InterruptNum) -> u64 {
    1u64 << num.as_u16()
}

/// Structural checks every descriptor must pass. Evaluated at compile time
/// by each architecture module.
#[must_use]
pub const fn descriptor_is_valid<A: Arch>() -> bool {
    let geometry = A::PAGE_SHIFT == <A::PteLayout as EntryLayout>::PAGE_SHIFT
        && A::PAGE_SHIFT == <A::PdeLayout as EntryLayout>::PAGE_SHIFT
        && A::PGTAB_LENGTH.is_power_of_two()
        && A::PGTAB_SHIFT == A::PAGE_SHIFT + A::PGTAB_LENGTH.trailing_zeros()
        && A::PGDIR_LENGTH > 0
        && A::PGTAB_SHIFT + A::PGDIR_LENGTH.trailing_zeros() <= 64;
    let traps = A::NUM_INTERRUPTS <= MAX_INTERRUPTS
        && A::NUM_EXCEPTIONS <= MAX_EXCEPTIONS
        && A::INTERRUPT_NAMES.len() == A::NUM_INTERRUPTS
        && A::EXCEPTION_NAMES.len() == A::NUM_EXCEPTIONS
        && A::INTERRUPT_TIMER.as_usize() < A::NUM_INTERRUPTS
        && !A::INTERRUPT_LEVELS.is_empty()
        && A::INTERRUPT_LEVELS[0] == 0;
    let ipi = match A::INTERRUPT_IPI {
        Some(num) => num.as_usize() < A::NUM_INTERRUPTS,
        None => true,
    };
    let syscall = match A::SYSCALL_EXCEPTION {
        Some(num) => num.as_usize() < A::NUM_EXCEPTIONS,
        None => true,
    };
    let cores = A::MAX_CORES > 0 && A::MAX_CORES <= MAX_CORES;
    let word = A::WORD_SIZE == <A::Context as Context>::WORD_SIZE;
    geometry && traps && ipi && syscall && cores && word
}
