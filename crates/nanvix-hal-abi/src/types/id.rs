// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core identifiers.

use core::fmt;

/// Upper bound on cores per cluster.
///
/// Pending-event sets keep one bit per potential sender in a `u64`, so no
/// cluster may have more cores than that word has bits.
pub const MAX_CORES: usize = 64;

/// Logical identifier of a core within its cluster.
///
/// Core ids are dense, starting at 0. Whether a given id exists on the
/// running machine is decided by the cluster configuration, not by this
/// type; `CoreId` only guarantees the id fits a pending-set bit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct CoreId(u16);

impl CoreId {
    /// Core 0, the conventional master of a cluster.
    pub const MASTER: Self = Self(0);

    /// Creates a core id, returning `None` if it exceeds [`MAX_CORES`].
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Option<Self> {
        if (id as usize) < MAX_CORES {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Creates a core id from an index, returning `None` if out of range.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < MAX_CORES {
            Some(Self(index as u16))
        } else {
            None
        }
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the id as a table index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns this core's bit in a pending set.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << self.0
    }
}

impl fmt::Debug for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoreId({})", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core:{}", self.0)
    }
}
