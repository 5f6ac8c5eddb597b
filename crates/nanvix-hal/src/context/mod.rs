// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Execution contexts.
//!
//! A context is the register record the trap-entry code pushes when a core
//! is interrupted, and the record a context switch restores. Its layout is
//! fixed per architecture: each backend's `#[repr(C)]` struct must match
//! byte for byte what its trap-entry assembly writes, so every
//! implementation declares its size in [`Context::SIZE`] and the HAL
//! refuses to initialize if the two disagree.
//!
//! [`ExecutionContext`] wraps the raw record with the id of the core that
//! produced it. A context may only be restored on that core.


use core::fmt;

use nanvix_hal_abi::{CoreId, HalError, HalResult, Vaddr};

/// Size of the machine double-word every context size is a multiple of.
pub const DOUBLE_WORD: usize = 8;

/// Architecture-specific saved register record.
pub trait Context: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Declared size in bytes. Must equal `size_of::<Self>()`.
    const SIZE: usize;

    /// Native register width in bytes.
    const WORD_SIZE: usize;

    /// Required stack pointer alignment in bytes (power of two).
    const STACK_ALIGN: u64;

    /// Whether contexts can be created and switched on this architecture.
    const SUPPORTS_MULTITHREADING: bool = true;

    /// Program counter the context resumes at.
    fn pc(&self) -> u64;

    /// Sets the program counter.
    fn set_pc(&mut self, pc: u64);

    /// Stack pointer the context resumes with.
    fn sp(&self) -> u64;

    /// Sets the stack pointer.
    fn set_sp(&mut self, sp: u64);

    /// Initializes a fresh context so that restoring it enters `entry` on
    /// `user_sp`, with `kernel_sp` as the stack for the next trap.
    ///
    /// Implementations also set whatever status bits a freshly started
    /// thread needs (interrupts on, privilege level).
    fn forge(&mut self, entry: u64, user_sp: u64, kernel_sp: u64);

    /// Redirects the context into `handler(arg)`, arranging for the handler
    /// to return to the interrupted program counter.
    ///
    /// Architectures without a link register cannot do this without
    /// writing to the interrupted stack and report `NotSupported`.
    fn forge_upcall(&mut self, handler: u64, arg: u64) -> HalResult<()> {
        let _ = (handler, arg);
        Err(HalError::NotSupported)
    }

    /// Calls `f` with the name and value of every register, in layout order.
    fn for_each_register(&self, f: &mut dyn FnMut(&'static str, u64));
}

/// Returns `true` if `C` satisfies the layout rules every trap-entry path
/// relies on.
#[must_use]
pub const fn layout_is_valid<C: Context>() -> bool {
    core::mem::size_of::<C>() == C::SIZE
        && C::SIZE % DOUBLE_WORD == 0
        && C::SIZE % C::WORD_SIZE == 0
}

/// A stack region handed to [`ExecutionContext::create`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stack {
    base: Vaddr,
    size: u64,
}

impl Stack {
    /// Describes the stack occupying `[base, base + size)`.
    #[inline]
    #[must_use]
    pub const fn new(base: Vaddr, size: u64) -> Self {
        Self { base, size }
    }

    /// Lowest address of the stack.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> Vaddr {
        self.base
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the descriptor cannot describe real memory.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.base.is_null() || self.size == 0
    }

    /// Initial stack pointer: the end of the region, rounded down to
    /// `align`. `None` if the region wraps the address space.
    #[must_use]
    pub const fn top(&self, align: u64) -> Option<u64> {
        match self.base.as_u64().checked_add(self.size) {
            Some(end) => Some(end & !(align - 1)),
            None => None,
        }
    }
}

/// A register record together with the core it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext<C: Context> {
    owner: CoreId,
    regs: C,
}

impl<C: Context> ExecutionContext<C> {
    /// Wraps a record captured on `owner`.
    #[inline]
    #[must_use]
    pub const fn from_saved(owner: CoreId, regs: C) -> Self {
        Self { owner, regs }
    }

    /// Empty save slot for `owner`, to be filled by a context switch.
    #[inline]
    #[must_use]
    pub fn empty(owner: CoreId) -> Self {
        Self {
            owner,
            regs: C::default(),
        }
    }

    /// Synthesizes a context that enters `entry` on the given stacks.
    ///
    /// # Errors
    ///
    /// - `NotSupported` if the architecture has no multithreading.
    /// - `InvalidArgument` if `entry` is null, a stack is null or empty, or
    ///   a stack wraps the address space.
    pub fn create(
        owner: CoreId,
        entry: Vaddr,
        user_stack: Stack,
        kernel_stack: Stack,
    ) -> HalResult<Self> {
        if !C::SUPPORTS_MULTITHREADING {
            return Err(HalError::NotSupported);
        }
        if entry.is_null() || user_stack.is_null() || kernel_stack.is_null() {
            return Err(HalError::InvalidArgument);
        }
        let user_sp = user_stack
            .top(C::STACK_ALIGN)
            .ok_or(HalError::InvalidArgument)?;
        let kernel_sp = kernel_stack
            .top(C::STACK_ALIGN)
            .ok_or(HalError::InvalidArgument)?;

        let mut regs = C::default();
        regs.forge(entry.as_u64(), user_sp, kernel_sp);
        Ok(Self { owner, regs })
    }

    /// Core that produced this context.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> CoreId {
        self.owner
    }

    /// Raw register record.
    #[inline]
    #[must_use]
    pub const fn registers(&self) -> &C {
        &self.regs
    }

    /// Mutable raw register record.
    #[inline]
    pub fn registers_mut(&mut self) -> &mut C {
        &mut self.regs
    }

    /// Program counter (0 on backends without one).
    #[inline]
    #[must_use]
    pub fn pc(&self) -> u64 {
        self.regs.pc()
    }

    /// Sets the program counter (no-op on backends without one).
    #[inline]
    pub fn set_pc(&mut self, pc: u64) {
        self.regs.set_pc(pc);
    }

    /// Stack pointer (0 on backends without one).
    #[inline]
    #[must_use]
    pub fn sp(&self) -> u64 {
        self.regs.sp()
    }

    /// Sets the stack pointer (no-op on backends without one).
    #[inline]
    pub fn set_sp(&mut self, sp: u64) {
        self.regs.set_sp(sp);
    }

    /// Redirects this context into `handler(arg)`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a null handler, `NotSupported` where the
    /// architecture cannot forge upcalls.
    pub fn forge_upcall(&mut self, handler: Vaddr, arg: u64) -> HalResult<()> {
        if handler.is_null() {
            return Err(HalError::InvalidArgument);
        }
        self.regs.forge_upcall(handler.as_u64(), arg)
    }

    pub(crate) fn set_owner(&mut self, owner: CoreId) {
        self.owner = owner;
    }
}

/// Human-readable register dump, four registers per line.
pub struct RegisterDump<'a, C: Context>(pub &'a C);

impl<C: Context> fmt::Display for RegisterDump<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = C::WORD_SIZE * 2;
        let mut column = 0usize;
        let mut result = Ok(());
        self.0.for_each_register(&mut |name, value| {
            if result.is_err() {
                return;
            }
            let sep = if column % 4 == 3 { "\n" } else { "  " };
            result = write!(f, "{name:>6}={value:0width$x}{sep}");
            column += 1;
        });
        result?;
        if column % 4 != 0 {
            writeln!(f)?;
        }
        Ok(())
    }
}
