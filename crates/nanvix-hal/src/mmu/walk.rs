// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Page walking and entry mutation.

use nanvix_hal_abi::{HalError, HalResult, Paddr, Vaddr};

use super::{PageFlags, Pde, Pte};
use crate::arch::{Arch, mappable_span};

/// Resolves the frame address of a page table to the table itself.
pub trait TableResolver<A: Arch> {
    /// Table stored at `frame`, if addressable.
    fn table(&self, frame: Paddr) -> Option<&[Pte<A>]>;

    /// Mutable table stored at `frame`, if addressable.
    fn table_mut(&mut self, frame: Paddr) -> Option<&mut [Pte<A>]>;
}

/// Splits a virtual address into directory index, table index and offset.
fn split<A: Arch>(vaddr: Vaddr) -> Option<(usize, usize, u64)> {
    if vaddr.as_u64() >= mappable_span::<A>() {
        return None;
    }
    let dir = usize::try_from(vaddr.as_u64() >> A::PGTAB_SHIFT).ok()?;
    let table = usize::try_from(vaddr.as_u64() >> A::PAGE_SHIFT).ok()? & (A::PGTAB_LENGTH - 1);
    Some((dir, table, vaddr.offset_in(A::PAGE_SHIFT)))
}

/// Finds a virtual address that currently maps `paddr`.
///
/// Scans every present directory entry and every present table entry
/// below it, in ascending virtual order, and returns the first match with
/// `paddr`'s byte offset within the page preserved. Cost is linear in the
/// number of table entries reachable from `root`; this is a diagnostic
/// path, not a translation fast path.
///
/// Only present entries are trusted: a non-present entry is skipped
/// without reading its frame field.
pub fn page_walk<A: Arch, R: TableResolver<A>>(
    root: &[Pde<A>],
    tables: &R,
    paddr: Paddr,
) -> Option<Vaddr> {
    let target = paddr.align_down(A::PAGE_SHIFT);
    let offset = paddr.offset_in(A::PAGE_SHIFT);

    for (dir, pde) in root.iter().take(A::PGDIR_LENGTH).enumerate() {
        let Some(table_frame) = pde.frame() else {
            continue;
        };
        let Some(table) = tables.table(table_frame) else {
            tracing::trace!(%table_frame, dir, "page table not addressable, skipped");
            continue;
        };
        let window = (dir as u64) << A::PGTAB_SHIFT;
        for (index, pte) in table.iter().take(A::PGTAB_LENGTH).enumerate() {
            if pte.frame() == Some(target) {
                return Some(Vaddr::new(window + ((index as u64) << A::PAGE_SHIFT) + offset));
            }
        }
    }
    None
}

/// Translates `vaddr` to the physical address it maps to.
pub fn lookup<A: Arch, R: TableResolver<A>>(
    root: &[Pde<A>],
    tables: &R,
    vaddr: Vaddr,
) -> Option<Paddr> {
    let (dir, index, offset) = split::<A>(vaddr)?;
    let table = tables.table(root.get(dir)?.frame()?)?;
    let frame = table.get(index)?.frame()?;
    Some(frame.add(offset))
}

/// Points directory slot `dir` at the page table stored at `table_frame`.
///
/// # Errors
///
/// `InvalidArgument` for an out-of-range slot or unaligned frame; `Busy`
/// if the slot already points somewhere.
pub fn pde_link<A: Arch>(root: &mut [Pde<A>], dir: usize, table_frame: Paddr) -> HalResult<()> {
    if dir >= A::PGDIR_LENGTH {
        return Err(HalError::InvalidArgument);
    }
    let pde = root.get_mut(dir).ok_or(HalError::InvalidArgument)?;
    if pde.is_present() {
        return Err(HalError::Busy);
    }
    let mut entry = Pde::<A>::empty();
    entry.set_frame(table_frame)?;
    entry.set_flags(PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER);
    *pde = entry;
    Ok(())
}

/// Maps the page at `paddr` to `vaddr` with `flags` (present is implied).
///
/// # Errors
///
/// - `InvalidArgument`: unaligned address, or `vaddr` beyond the span.
/// - `NotFound`: no page table linked for `vaddr`'s directory slot.
/// - `Busy`: `vaddr` is already mapped.
pub fn page_map<A: Arch, R: TableResolver<A>>(
    root: &[Pde<A>],
    tables: &mut R,
    paddr: Paddr,
    vaddr: Vaddr,
    flags: PageFlags,
) -> HalResult<()> {
    if !paddr.is_aligned(A::PAGE_SHIFT) || !vaddr.is_aligned(A::PAGE_SHIFT) {
        return Err(HalError::InvalidArgument);
    }
    let (dir, index, _) = split::<A>(vaddr).ok_or(HalError::InvalidArgument)?;
    let table_frame = root
        .get(dir)
        .ok_or(HalError::InvalidArgument)?
        .frame()
        .ok_or(HalError::NotFound)?;
    let table = tables.table_mut(table_frame).ok_or(HalError::NotFound)?;
    let pte = table.get_mut(index).ok_or(HalError::InvalidArgument)?;
    if pte.is_present() {
        return Err(HalError::Busy);
    }

    let mut entry = Pte::<A>::empty();
    entry.set_frame(paddr)?;
    entry.set_flags(flags | PageFlags::PRESENT);
    *pte = entry;
    Ok(())
}

/// Removes the mapping at `vaddr`, returning the frame it pointed to.
///
/// # Errors
///
/// `InvalidArgument` for an unaligned or out-of-span address, `NotFound`
/// if nothing is mapped there.
pub fn page_unmap<A: Arch, R: TableResolver<A>>(
    root: &[Pde<A>],
    tables: &mut R,
    vaddr: Vaddr,
) -> HalResult<Paddr> {
    if !vaddr.is_aligned(A::PAGE_SHIFT) {
        return Err(HalError::InvalidArgument);
    }
    let (dir, index, _) = split::<A>(vaddr).ok_or(HalError::InvalidArgument)?;
    let table_frame = root
        .get(dir)
        .ok_or(HalError::InvalidArgument)?
        .frame()
        .ok_or(HalError::NotFound)?;
    let table = tables.table_mut(table_frame).ok_or(HalError::NotFound)?;
    let pte = table.get_mut(index).ok_or(HalError::InvalidArgument)?;
    let frame = pte.frame().ok_or(HalError::NotFound)?;
    pte.clear();
    Ok(frame)
}
