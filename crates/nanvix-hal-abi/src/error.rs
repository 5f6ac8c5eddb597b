// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! HAL error taxonomy.
//!
//! Only recoverable conditions are represented here. Unhandled exceptions
//! and boot failures never become an `Err`: they take the fatal path and
//! halt the core.

use core::fmt;

/// Result type for fallible HAL operations.
pub type HalResult<T> = Result<T, HalError>;

/// Recoverable HAL error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HalError {
    /// Null address, out-of-range core id, trap number or interrupt level.
    InvalidArgument,
    /// The architecture does not provide the requested capability.
    NotSupported,
    /// The slot or core is already taken.
    Busy,
    /// Nothing is registered at the given slot.
    NotFound,
    /// A computed value does not fit the hardware field it targets.
    Overflow,
}

impl HalError {
    /// Returns the negative error code used at the C-compatible boundary.
    #[inline]
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => -22,
            Self::NotSupported => -95,
            Self::Busy => -16,
            Self::NotFound => -2,
            Self::Overflow => -34,
        }
    }

    /// Maps a negative error code back to an error.
    #[must_use]
    pub const fn from_errno(code: i32) -> Option<Self> {
        match code {
            -22 => Some(Self::InvalidArgument),
            -95 => Some(Self::NotSupported),
            -16 => Some(Self::Busy),
            -2 => Some(Self::NotFound),
            -34 => Some(Self::Overflow),
            _ => None,
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NotSupported => write!(f, "operation not supported"),
            Self::Busy => write!(f, "resource busy"),
            Self::NotFound => write!(f, "no such entry"),
            Self::Overflow => write!(f, "value out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::HalError;

    #[test]
    fn codes_are_negative_and_distinct() {
        let all = [
            HalError::InvalidArgument,
            HalError::NotSupported,
            HalError::Busy,
            HalError::NotFound,
            HalError::Overflow,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.errno() < 0);
            assert_eq!(HalError::from_errno(a.errno()), Some(*a));
            for b in &all[i + 1..] {
                assert_ne!(a.errno(), b.errno());
            }
        }
    }

    #[test]
    fn invalid_argument_differs_from_not_supported() {
        assert_ne!(
            HalError::InvalidArgument.errno(),
            HalError::NotSupported.errno()
        );
        assert_eq!(HalError::from_errno(0), None);
    }
}
