// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Architecture-neutral types shared by the Nanvix HAL and the kernel.
//!
//! This crate holds the vocabulary both sides of the HAL boundary agree on:
//! - Identifier types for cores and trap sources
//! - Physical and virtual address newtypes
//! - Core lifecycle states
//! - The error taxonomy and its negative error codes
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **Stable layout**: Newtypes are `#[repr(transparent)]`
//! - **Width-agnostic**: Addresses are stored as `u64` and narrowed by the
//!   architecture that consumes them

#![no_std]

pub mod error;
pub mod types;

pub use error::{HalError, HalResult};
pub use types::{CoreId, CoreState, ExceptionNum, InterruptNum, MAX_CORES, Paddr, Vaddr};
