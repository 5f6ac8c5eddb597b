// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Intel i486.
//!
//! Uniprocessor, 8259 PIC, 8253 PIT, classic 10/10/12 paging without NX.

use nanvix_hal_abi::{ExceptionNum, InterruptNum};
use static_assertions::const_assert;

use super::{Arch, ArchId, TimerMode, TimerSpec, descriptor_is_valid, standard_levels};
use crate::context::{Context, layout_is_valid};
use crate::mmu::{EntryLayout, Flag};

/// Kernel code segment selector.
const KERNEL_CS: u32 = 0x08;
/// Kernel data segment selector.
const KERNEL_DS: u32 = 0x10;
/// `EFLAGS` with interrupts enabled and the reserved bit 1 set.
const EFLAGS_IF: u32 = 0x202;

/// Register record pushed by the i486 trap-entry stub.
///
/// Segment registers and the `pusha` block come first, then the error
/// code and the frame the processor pushes itself.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct X86Context {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Kernel stack pointer at trap time.
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub err: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    /// Stack pointer of the interrupted code.
    pub useresp: u32,
    pub ss: u32,
}

/// Declared size of [`X86Context`].
pub const X86_CONTEXT_SIZE: usize = 72;

impl Context for X86Context {
    const SIZE: usize = X86_CONTEXT_SIZE;
    const WORD_SIZE: usize = 4;
    const STACK_ALIGN: u64 = 4;

    fn pc(&self) -> u64 {
        u64::from(self.eip)
    }

    fn set_pc(&mut self, pc: u64) {
        self.eip = pc as u32;
    }

    fn sp(&self) -> u64 {
        u64::from(self.useresp)
    }

    fn set_sp(&mut self, sp: u64) {
        self.useresp = sp as u32;
    }

    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64) {
        self.gs = KERNEL_DS;
        self.fs = KERNEL_DS;
        self.es = KERNEL_DS;
        self.ds = KERNEL_DS;
        self.ss = KERNEL_DS;
        self.cs = KERNEL_CS;
        self.eflags = EFLAGS_IF;
        self.eip = entry as u32;
        self.useresp = user_sp as u32;
        self.esp = kernel_sp as u32;
    }

    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64)) {
        let regs = [
            ("gs", self.gs),
            ("fs", self.fs),
            ("es", self.es),
            ("ds", self.ds),
            ("edi", self.edi),
            ("esi", self.esi),
            ("ebp", self.ebp),
            ("esp", self.esp),
            ("ebx", self.ebx),
            ("edx", self.edx),
            ("ecx", self.ecx),
            ("eax", self.eax),
            ("err", self.err),
            ("eip", self.eip),
            ("cs", self.cs),
            ("eflags", self.eflags),
            ("useresp", self.useresp),
            ("ss", self.ss),
        ];
        for (name, value) in regs {
            f(name, u64::from(value));
        }
    }
}

const_assert!(layout_is_valid::<X86Context>());

/// i486 page directory and page table entry.
pub struct X86Entry;

impl EntryLayout for X86Entry {
    type Raw = u32;
    const PAGE_SHIFT: u32 = 12;
    const PRESENT: u64 = 1 << 0;
    const WRITABLE: Flag = Flag::Set(1 << 1);
    const EXECUTABLE: Flag = Flag::Always;
    const USER: Flag = Flag::Set(1 << 2);
    const FRAME_MASK: u64 = 0xFFFF_F000;
    const FRAME_SHIFT: u32 = 12;
}

const NUM_INTERRUPTS: usize = 16;
const LEVELS: [u64; 4] = standard_levels((1 << NUM_INTERRUPTS) - 1, 1 << 0, 0);

/// Intel i486 descriptor.
pub struct X86;

impl Arch for X86 {
    const ID: ArchId = ArchId::X86;
    const WORD_SIZE: usize = 4;
    const MAX_CORES: usize = 1;
    type Context = X86Context;
    type PdeLayout = X86Entry;
    type PteLayout = X86Entry;
    const PAGE_SHIFT: u32 = 12;
    const PGTAB_SHIFT: u32 = 22;
    const PGDIR_LENGTH: usize = 1024;
    const PGTAB_LENGTH: usize = 1024;
    const NUM_INTERRUPTS: usize = NUM_INTERRUPTS;
    const NUM_EXCEPTIONS: usize = 32;
    const INTERRUPT_TIMER: InterruptNum = InterruptNum::new(0);
    const INTERRUPT_IPI: Option<InterruptNum> = None;
    const INTERRUPT_LEVELS: &'static [u64] = &LEVELS;
    const INTERRUPT_NAMES: &'static [&'static str] = &[
        "programmable interval timer",
        "keyboard",
        "cascade",
        "com2",
        "com1",
        "lpt2",
        "floppy disk",
        "lpt1",
        "cmos real-time clock",
        "free 9",
        "free 10",
        "free 11",
        "ps/2 mouse",
        "coprocessor",
        "primary ata hard disk",
        "secondary ata hard disk",
    ];
    const EXCEPTION_NAMES: &'static [&'static str] = &[
        "division-by-zero error",
        "debug exception",
        "non-maskable interrupt",
        "breakpoint exception",
        "overflow exception",
        "bounds check exception",
        "invalid opcode exception",
        "coprocessor not available",
        "double fault",
        "coprocessor segment overrun",
        "invalid tss",
        "segment not present",
        "stack segment fault",
        "general protection fault",
        "page fault",
        "reserved 15",
        "floating point unit exception",
        "alignment check",
        "machine check",
        "smid unit exception",
        "virtual exception",
        "reserved 21",
        "reserved 22",
        "reserved 23",
        "reserved 24",
        "reserved 25",
        "reserved 26",
        "reserved 27",
        "reserved 28",
        "reserved 29",
        "security exception",
        "reserved 31",
    ];
    const SYSCALL_EXCEPTION: Option<ExceptionNum> = None;
    const TIMER: TimerSpec = TimerSpec {
        base_hz: 1_193_182,
        counter_bits: 16,
        mode: TimerMode::Periodic,
    };
}

const_assert!(descriptor_is_valid::<X86>());
