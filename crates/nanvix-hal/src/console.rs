// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Console sink.
//!
//! Register dumps and fatal diagnostics are written straight to the
//! backend's console, bypassing the `tracing` subscriber, so they still
//! reach the user when no subscriber is installed or the failure happened
//! before one could be.

use core::fmt;

use crate::backend::CoreBackend;

/// `fmt::Write` adapter over [`CoreBackend::stdout_write`].
pub struct Console<'a, B: CoreBackend> {
    backend: &'a B,
}

impl<'a, B: CoreBackend> Console<'a, B> {
    /// Creates a writer for `backend`'s console.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }
}

impl<B: CoreBackend> fmt::Write for Console<'_, B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.backend.stdout_write(s.as_bytes());
        Ok(())
    }
}
