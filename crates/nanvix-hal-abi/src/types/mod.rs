// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core types for the HAL boundary.

mod addr;
mod id;
mod state;
mod trap;

#[cfg(test)]
mod addr_test;

pub use addr::{Paddr, Vaddr};
pub use id::{CoreId, MAX_CORES};
pub use state::CoreState;
pub use trap::{ExceptionNum, InterruptNum};
