// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap-backed page tables for hosted runs and tests.

use std::collections::BTreeMap;
use std::vec;
use std::vec::Vec;

use nanvix_hal_abi::{HalError, HalResult, Paddr};

use super::{Pde, Pte, TableResolver};
use crate::arch::Arch;

/// Page tables kept in host memory, keyed by the frame address they would
/// occupy on the target.
pub struct HostPageTables<A: Arch> {
    tables: BTreeMap<u64, Vec<Pte<A>>>,
}

impl<A: Arch> HostPageTables<A> {
    /// Creates an empty set of tables.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// A zeroed root directory of the architecture's length.
    #[must_use]
    pub fn new_root() -> Vec<Pde<A>> {
        vec![Pde::<A>::empty(); A::PGDIR_LENGTH]
    }

    /// Allocates a zeroed page table at `frame`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `frame` is unaligned, `Busy` if a table already
    /// lives there.
    pub fn insert_table(&mut self, frame: Paddr) -> HalResult<()> {
        if !frame.is_aligned(A::PAGE_SHIFT) {
            return Err(HalError::InvalidArgument);
        }
        if self.tables.contains_key(&frame.as_u64()) {
            return Err(HalError::Busy);
        }
        self.tables
            .insert(frame.as_u64(), vec![Pte::<A>::empty(); A::PGTAB_LENGTH]);
        Ok(())
    }

    /// Number of tables allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no table has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<A: Arch> Default for HostPageTables<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Arch> TableResolver<A> for HostPageTables<A> {
    fn table(&self, frame: Paddr) -> Option<&[Pte<A>]> {
        self.tables.get(&frame.as_u64()).map(Vec::as_slice)
    }

    fn table_mut(&mut self, frame: Paddr) -> Option<&mut [Pte<A>]> {
        self.tables.get_mut(&frame.as_u64()).map(Vec::as_mut_slice)
    }
}
