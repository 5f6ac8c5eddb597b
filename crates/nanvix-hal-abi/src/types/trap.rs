// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Trap source numbers.
//!
//! Interrupts and exceptions are numbered independently, each densely from
//! zero up to the count the architecture declares. The numbers are not
//! range-checked here: only the HAL knows the architecture's limits.

use core::fmt;

/// Number of an asynchronous interrupt source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct InterruptNum(u16);

impl InterruptNum {
    /// Creates an interrupt number.
    #[inline]
    #[must_use]
    pub const fn new(num: u16) -> Self {
        Self(num)
    }

    /// Returns the raw number.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the number as a table index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for InterruptNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterruptNum({})", self.0)
    }
}

impl fmt::Display for InterruptNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq:{}", self.0)
    }
}

/// Number of a synchronous exception.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct ExceptionNum(u16);

impl ExceptionNum {
    /// Creates an exception number.
    #[inline]
    #[must_use]
    pub const fn new(num: u16) -> Self {
        Self(num)
    }

    /// Returns the raw number.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the number as a table index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExceptionNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionNum({})", self.0)
    }
}

impl fmt::Display for ExceptionNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception:{}", self.0)
    }
}
