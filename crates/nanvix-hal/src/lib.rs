// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Nanvix HAL
//!
//! Architecture-neutral core of the Nanvix hardware abstraction layer.
//!
//! This crate provides:
//! - Spinlocks
//! - Fixed-layout execution contexts and context switching
//! - Interrupt and exception dispatch with masking and priority levels
//! - Timer calibration
//! - Coalescing inter-core events
//! - Two-level page-table walking
//! - The cluster boot sequencer and slave idle loop
//!
//! All of it is written once against [`CoreBackend`]. Per-architecture
//! constants live in [`arch`]; machine access lives in [`backend`]. The
//! [`Hal`] struct owns every table and is shared by all cores.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod arch;
pub mod backend;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod console;
pub mod context;
pub mod event;
pub mod exception;
pub mod fence;
pub mod hal;
pub mod interrupt;
pub mod mmu;
pub mod spinlock;

pub use backend::{ContextOf, CoreBackend};
pub use cluster::{CoreSnapshot, CoreWork, KernelMain};
pub use config::ClusterConfig;
pub use context::{Context, ExecutionContext, RegisterDump, Stack};
pub use exception::{Exception, ExceptionAction, ExceptionHandler};
pub use hal::Hal;
pub use interrupt::InterruptHandler;
pub use nanvix_hal_abi::{
    CoreId, CoreState, ExceptionNum, HalError, HalResult, InterruptNum, MAX_CORES, Paddr, Vaddr,
};
pub use spinlock::{RawSpinlock, SpinLock, SpinLockGuard};

#[cfg(test)]
mod hal_test;
