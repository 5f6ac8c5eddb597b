// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core lifecycle states.

use core::fmt;

/// Lifecycle state of a core.
///
/// ```text
/// Resetting -> Running <-> Sleeping
///                 |
///                 v
///              Offline
/// ```
///
/// A core advances its own state. The master writes slave entries only
/// while initializing the core table, before the boot fence is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CoreState {
    /// Powered but not yet past early boot, or being reset.
    #[default]
    Resetting = 0,
    /// Online and either running work or waiting in the idle loop.
    Running = 1,
    /// Suspended in `core_sleep` until woken.
    Sleeping = 2,
    /// Powered off. Terminal.
    Offline = 3,
}

impl CoreState {
    /// Returns `true` once the core has passed the boot fence and not
    /// yet powered off.
    #[inline]
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Running | Self::Sleeping)
    }
}

impl fmt::Display for CoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resetting => "resetting",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Offline => "offline",
        };
        f.write_str(name)
    }
}
