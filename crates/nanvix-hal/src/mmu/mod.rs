// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Two-level page tables.
//!
//! The HAL never allocates page-table memory. Callers hand in the root
//! directory and a [`TableResolver`] that turns a table's frame address
//! into something addressable, and are responsible for locking both.
//!
//! - [`page_walk`]: physical to virtual, by linear scan
//! - [`lookup`]: virtual to physical
//! - [`page_map`] / [`page_unmap`] / [`pde_link`]: entry mutation

mod entry;
mod identity;
mod walk;

#[cfg(any(test, feature = "std"))]
mod host;

#[cfg(test)]
mod mmu_test;

pub use entry::{EntryLayout, Flag, PackedEntry, PageFlags};
pub use identity::IdentityTables;
pub use walk::{TableResolver, lookup, page_map, page_unmap, page_walk, pde_link};

#[cfg(any(test, feature = "std"))]
pub use host::HostPageTables;

use nanvix_hal_abi::{HalResult, Paddr, Vaddr};

use crate::arch::Arch;
use crate::backend::CoreBackend;
use crate::hal::Hal;

/// Page directory entry of architecture `A`.
pub type Pde<A> = PackedEntry<<A as Arch>::PdeLayout>;

/// Page table entry of architecture `A`.
pub type Pte<A> = PackedEntry<<A as Arch>::PteLayout>;

/// Page directory entry of backend `B`'s architecture.
type PdeOf<B> = Pde<<B as CoreBackend>::Arch>;

impl<B: CoreBackend> Hal<B> {
    /// Virtual address mapping `paddr` under `root`, found by scanning
    /// every present entry.
    ///
    /// Meant for diagnostics; the cost grows with the number of mapped
    /// pages.
    pub fn mmu_page_walk<R: TableResolver<B::Arch>>(
        &self,
        root: &[PdeOf<B>],
        tables: &R,
        paddr: Paddr,
    ) -> Option<Vaddr> {
        page_walk::<B::Arch, R>(root, tables, paddr)
    }

    /// Physical address `vaddr` translates to under `root`.
    pub fn mmu_lookup<R: TableResolver<B::Arch>>(
        &self,
        root: &[PdeOf<B>],
        tables: &R,
        vaddr: Vaddr,
    ) -> Option<Paddr> {
        lookup::<B::Arch, R>(root, tables, vaddr)
    }

    /// Maps the page at `vaddr` to `paddr` with `flags`.
    ///
    /// # Errors
    ///
    /// See [`page_map`].
    pub fn mmu_page_map<R: TableResolver<B::Arch>>(
        &self,
        root: &[PdeOf<B>],
        tables: &mut R,
        paddr: Paddr,
        vaddr: Vaddr,
        flags: PageFlags,
    ) -> HalResult<()> {
        page_map::<B::Arch, R>(root, tables, paddr, vaddr, flags)?;
        tracing::trace!(%vaddr, %paddr, ?flags, "page mapped");
        Ok(())
    }

    /// Unmaps the page at `vaddr` and returns the frame it mapped.
    ///
    /// # Errors
    ///
    /// See [`page_unmap`].
    pub fn mmu_page_unmap<R: TableResolver<B::Arch>>(
        &self,
        root: &[PdeOf<B>],
        tables: &mut R,
        vaddr: Vaddr,
    ) -> HalResult<Paddr> {
        let paddr = page_unmap::<B::Arch, R>(root, tables, vaddr)?;
        tracing::trace!(%vaddr, %paddr, "page unmapped");
        Ok(paddr)
    }
}
