// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Exception dispatch.
//!
//! Exceptions are synchronous: the faulting context is handed to the
//! handler, which may repair it and resume (system calls, demand paging)
//! or give up. An exception nobody handles, or a handler giving up, halts
//! the core after a register dump.

use core::fmt;

use nanvix_hal_abi::{ExceptionNum, HalError, HalResult, Vaddr};

use crate::arch::{Arch, MAX_EXCEPTIONS};
use crate::backend::{ContextOf, CoreBackend};
use crate::context::Context;
use crate::hal::Hal;
use crate::spinlock::SpinLock;

/// A synchronous fault as seen by its handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exception {
    /// Exception number.
    pub num: ExceptionNum,
    /// Architecture name of the exception.
    pub name: &'static str,
    /// Faulting data address, or null if the exception has none.
    pub addr: Vaddr,
    /// Program counter of the faulting instruction.
    pub pc: Vaddr,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.name, self.num, self.pc)?;
        if !self.addr.is_null() {
            write!(f, ", address {}", self.addr)?;
        }
        Ok(())
    }
}

/// What to do once an exception handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionAction {
    /// Return to the (possibly modified) context.
    Resume,
    /// The fault is unrecoverable.
    Halt,
}

/// Exception handler.
pub type ExceptionHandler<C> = fn(&Exception, &mut C) -> ExceptionAction;

/// Handler slots for every exception.
pub struct ExceptionTable<C> {
    len: usize,
    handlers: SpinLock<[Option<ExceptionHandler<C>>; MAX_EXCEPTIONS]>,
}

impl<C> ExceptionTable<C> {
    /// Creates an empty table for `len` exceptions.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self {
            len,
            handlers: SpinLock::new([const { None }; MAX_EXCEPTIONS]),
        }
    }

    fn check(&self, num: ExceptionNum) -> HalResult<()> {
        if num.as_usize() < self.len {
            Ok(())
        } else {
            Err(HalError::InvalidArgument)
        }
    }

    fn handler(&self, num: ExceptionNum) -> Option<ExceptionHandler<C>> {
        self.handlers.lock().get(num.as_usize()).copied().flatten()
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Architecture name of exception `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range.
    pub fn exception_name(&self, num: ExceptionNum) -> HalResult<&'static str> {
        <B::Arch as Arch>::EXCEPTION_NAMES
            .get(num.as_usize())
            .copied()
            .ok_or(HalError::InvalidArgument)
    }

    /// Installs `handler` for exception `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `Busy` if the slot is
    /// taken.
    pub fn exception_register(
        &self,
        num: ExceptionNum,
        handler: ExceptionHandler<ContextOf<B>>,
    ) -> HalResult<()> {
        self.exceptions.check(num)?;
        let mut handlers = self.exceptions.handlers.lock();
        let slot = &mut handlers[num.as_usize()];
        if slot.is_some() {
            return Err(HalError::Busy);
        }
        *slot = Some(handler);
        tracing::debug!(%num, "exception handler registered");
        Ok(())
    }

    /// Removes the handler for exception `num`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `num` is out of range, `NotFound` if the slot
    /// is empty.
    pub fn exception_unregister(&self, num: ExceptionNum) -> HalResult<()> {
        self.exceptions.check(num)?;
        self.exceptions.handlers.lock()[num.as_usize()]
            .take()
            .map(|_| ())
            .ok_or(HalError::NotFound)?;
        tracing::debug!(%num, "exception handler unregistered");
        Ok(())
    }

    /// Runs the handler for exception `num` raised in `ctx`.
    ///
    /// Returns only if a handler resumes. Unknown numbers, missing
    /// handlers and handlers answering [`ExceptionAction::Halt`] are fatal.
    pub fn dispatch_exception(&self, num: ExceptionNum, addr: Vaddr, ctx: &mut ContextOf<B>) {
        let Ok(name) = self.exception_name(num) else {
            self.fatal(&format_args!("dispatch of unknown exception {num}"), Some(ctx));
        };
        let exception = Exception {
            num,
            name,
            addr,
            pc: Vaddr::new(ctx.pc()),
        };
        let Some(handler) = self.exceptions.handler(num) else {
            self.fatal(&format_args!("unhandled exception: {exception}"), Some(ctx));
        };
        if handler(&exception, ctx) == ExceptionAction::Halt {
            self.fatal(&format_args!("unrecoverable exception: {exception}"), Some(ctx));
        }
    }
}
