// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Physical and virtual address types.
//!
//! Separate newtypes keep the page walker from confusing the address it
//! was asked about with the address it reconstructs.

use core::fmt;

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// The null address.
            pub const NULL: Self = Self(0);

            /// Creates an address.
            #[inline]
            #[must_use]
            pub const fn new(addr: u64) -> Self {
                Self(addr)
            }

            /// Returns `true` for the null address.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }

            /// Returns the raw address.
            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Adds a byte offset, wrapping on overflow.
            #[inline]
            #[must_use]
            pub const fn add(self, offset: u64) -> Self {
                Self(self.0.wrapping_add(offset))
            }

            /// Rounds down to a multiple of `1 << shift`.
            #[inline]
            #[must_use]
            pub const fn align_down(self, shift: u32) -> Self {
                Self(self.0 & !low_mask(shift))
            }

            /// Returns the byte offset within a `1 << shift` sized block.
            #[inline]
            #[must_use]
            pub const fn offset_in(self, shift: u32) -> u64 {
                self.0 & low_mask(shift)
            }

            /// Returns `true` if aligned to `1 << shift`.
            #[inline]
            #[must_use]
            pub const fn is_aligned(self, shift: u32) -> bool {
                self.offset_in(shift) == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{:#x}"), self.0)
            }
        }
    };
}

/// Mask of the `shift` low bits. Shifts of 64 or more select every bit.
const fn low_mask(shift: u32) -> u64 {
    if shift >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << shift) - 1
    }
}

address_type!(
    /// A physical memory address, as stored in page-table frame fields.
    Paddr,
    "pa"
);

address_type!(
    /// A virtual memory address, as produced by a page walk.
    Vaddr,
    "va"
);
