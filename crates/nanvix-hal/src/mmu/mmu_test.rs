// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for page-table entries and the walker.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::vec::Vec;

use nanvix_hal_abi::{HalError, Paddr, Vaddr};
use proptest::prelude::*;

use super::*;
use crate::arch::{Arch, Arm64, LinuxHosted, OpenRisc, RiscV32, X86};

/// Root directory plus tables, with one table linked at directory slot
/// `dir` for every entry of `dirs`.
fn tables_with<A: Arch>(dirs: &[usize]) -> (Vec<Pde<A>>, HostPageTables<A>) {
    let mut root = HostPageTables::<A>::new_root();
    let mut tables = HostPageTables::<A>::new();
    for (i, dir) in dirs.iter().enumerate() {
        let frame = Paddr::new(0x0010_0000 + ((i as u64) << A::PAGE_SHIFT));
        tables.insert_table(frame).unwrap();
        pde_link::<A>(&mut root, *dir, frame).unwrap();
    }
    (root, tables)
}

#[test]
fn x86_entry_bits() {
    let mut pte = Pte::<X86>::empty();
    assert!(!pte.is_present());
    assert_eq!(pte.frame(), None);

    pte.set_frame(Paddr::new(0x1234_5000)).unwrap();
    pte.set_flags(PageFlags::PRESENT | PageFlags::WRITABLE);
    assert_eq!(pte.raw(), 0x1234_5003);
    assert_eq!(pte.frame(), Some(Paddr::new(0x1234_5000)));
    assert!(pte.is_executable(), "i486 cannot deny execution");
}

#[test]
fn sv32_frames_shift_by_ten() {
    let mut pte = Pte::<RiscV32>::empty();
    pte.set_frame(Paddr::new(0x8020_0000)).unwrap();
    pte.set_present(true);
    // PPN 0x80200 at bit 10, plus V and R.
    assert_eq!(pte.raw(), (0x80200 << 10) | 0b11);
    assert_eq!(pte.frame(), Some(Paddr::new(0x8020_0000)));
}

#[test]
fn arm64_inverted_permissions() {
    let mut pte = Pte::<Arm64>::empty();
    pte.set_frame(Paddr::new(0x4000_0000)).unwrap();
    pte.set_flags(PageFlags::PRESENT);
    assert!(!pte.is_writable());
    assert!(!pte.is_executable());
    assert_eq!(pte.raw() & 0b11, 0b11);
    assert_ne!(pte.raw() & (1 << 10), 0, "access flag set");

    pte.set_flags(PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::EXECUTABLE);
    assert!(pte.is_writable());
    assert!(pte.is_executable());
}

#[test]
fn or1k_eight_kib_frames() {
    let mut pte = Pte::<OpenRisc>::empty();
    assert_eq!(pte.set_frame(Paddr::new(0x1000)), Err(HalError::InvalidArgument));
    pte.set_frame(Paddr::new(0x0040_2000)).unwrap();
    pte.set_present(true);
    assert_eq!(pte.frame(), Some(Paddr::new(0x0040_2000)));
}

#[test]
fn frame_too_wide_for_entry() {
    let mut pte = Pte::<X86>::empty();
    assert_eq!(pte.set_frame(Paddr::new(0x1_0000_0000)), Err(HalError::Overflow));
}

#[test]
fn non_present_entry_hides_frame() {
    let mut pte = Pte::<X86>::empty();
    pte.set_frame(Paddr::new(0x5000)).unwrap();
    assert_eq!(pte.frame(), None);
    pte.set_present(true);
    pte.set_present(false);
    assert_eq!(pte.frame(), None);
}

#[test]
fn walk_finds_mapping_with_offset() {
    let (root, mut tables) = tables_with::<X86>(&[3]);
    let vaddr = Vaddr::new((3 << 22) | (7 << 12));
    let frame = Paddr::new(0x00AB_C000);
    page_map::<X86, _>(&root, &mut tables, frame, vaddr, PageFlags::WRITABLE).unwrap();

    let found = page_walk::<X86, _>(&root, &tables, Paddr::new(0x00AB_C123));
    assert_eq!(found, Some(Vaddr::new(vaddr.as_u64() + 0x123)));
    assert_eq!(lookup::<X86, _>(&root, &tables, found.unwrap()), Some(Paddr::new(0x00AB_C123)));
}

#[test]
fn walk_of_unmapped_address_is_none() {
    let (root, mut tables) = tables_with::<RiscV32>(&[0]);
    let frame = Paddr::new(0x8000_0000);
    page_map::<RiscV32, _>(&root, &mut tables, frame, Vaddr::new(0x1000), PageFlags::empty())
        .unwrap();
    assert_eq!(
        page_walk::<RiscV32, _>(&root, &tables, Paddr::new(0x8000_1000)),
        None
    );
}

#[test]
fn walk_ignores_non_present_entries() {
    let (root, mut tables) = tables_with::<X86>(&[0]);
    // A stale frame number without the present bit.
    let table = tables.table_mut(root[0].frame().unwrap()).unwrap();
    table[5].set_frame(Paddr::new(0x0077_7000)).unwrap();
    assert_eq!(page_walk::<X86, _>(&root, &tables, Paddr::new(0x0077_7000)), None);
}

#[test]
fn walk_skips_directory_slots_without_tables() {
    let (mut root, tables) = tables_with::<X86>(&[]);
    // Present directory entry pointing at a frame the resolver does not know.
    pde_link::<X86>(&mut root, 1, Paddr::new(0x00F0_0000)).unwrap();
    assert_eq!(page_walk::<X86, _>(&root, &tables, Paddr::new(0x1000)), None);
}

#[test]
fn walk_returns_lowest_virtual_alias() {
    let (root, mut tables) = tables_with::<Arm64>(&[0, 2]);
    let frame = Paddr::new(0x4010_0000);
    let high = Vaddr::new((2 << 21) | 0x3000);
    page_map::<Arm64, _>(&root, &mut tables, frame, high, PageFlags::empty()).unwrap();
    let low = Vaddr::new(0x5000);
    page_map::<Arm64, _>(&root, &mut tables, frame, low, PageFlags::empty()).unwrap();
    assert_eq!(page_walk::<Arm64, _>(&root, &tables, frame), Some(Vaddr::new(0x5000)));
}

#[test]
fn map_errors() {
    let (root, mut tables) = tables_with::<X86>(&[0]);
    let pa = Paddr::new(0x2000);
    let misaligned = Paddr::new(0x2001);

    assert_eq!(
        page_map::<X86, _>(&root, &mut tables, misaligned, Vaddr::new(0x1000), PageFlags::empty()),
        Err(HalError::InvalidArgument)
    );
    assert_eq!(
        page_map::<X86, _>(&root, &mut tables, pa, Vaddr::new(1 << 22), PageFlags::empty()),
        Err(HalError::NotFound)
    );
    page_map::<X86, _>(&root, &mut tables, pa, Vaddr::new(0x1000), PageFlags::empty()).unwrap();
    assert_eq!(
        page_map::<X86, _>(&root, &mut tables, pa, Vaddr::new(0x1000), PageFlags::empty()),
        Err(HalError::Busy)
    );
}

#[test]
fn map_beyond_span_rejected() {
    let (root, mut tables) = tables_with::<Arm64>(&[0]);
    let frame = Paddr::new(0x1000);
    assert_eq!(
        page_map::<Arm64, _>(&root, &mut tables, frame, Vaddr::new(1 << 30), PageFlags::empty()),
        Err(HalError::InvalidArgument)
    );
}

#[test]
fn unmap_returns_frame_and_clears() {
    let (root, mut tables) = tables_with::<X86>(&[0]);
    let va = Vaddr::new(0x3000);
    page_map::<X86, _>(&root, &mut tables, Paddr::new(0x9000), va, PageFlags::empty()).unwrap();
    assert_eq!(page_unmap::<X86, _>(&root, &mut tables, va), Ok(Paddr::new(0x9000)));
    assert_eq!(page_unmap::<X86, _>(&root, &mut tables, va), Err(HalError::NotFound));
    assert_eq!(page_walk::<X86, _>(&root, &tables, Paddr::new(0x9000)), None);
}

#[test]
fn pde_link_rejects_occupied_slot() {
    let (mut root, _tables) = tables_with::<X86>(&[4]);
    assert_eq!(pde_link::<X86>(&mut root, 4, Paddr::new(0x7000)), Err(HalError::Busy));
    assert_eq!(
        pde_link::<X86>(&mut root, 1024, Paddr::new(0x7000)),
        Err(HalError::InvalidArgument)
    );
}

#[test]
fn host_tables_reject_duplicates() {
    let mut tables = HostPageTables::<X86>::new();
    assert!(tables.is_empty());
    tables.insert_table(Paddr::new(0x1000)).unwrap();
    assert_eq!(tables.insert_table(Paddr::new(0x1000)), Err(HalError::Busy));
    assert_eq!(tables.insert_table(Paddr::new(0x1001)), Err(HalError::InvalidArgument));
    assert_eq!(tables.len(), 1);
}

#[repr(C, align(4096))]
struct AlignedTable([Pte<LinuxHosted>; 512]);

#[test]
fn identity_tables_walk_real_memory() {
    let mut table = std::boxed::Box::new(AlignedTable([Pte::<LinuxHosted>::empty(); 512]));
    let table_frame = Paddr::new(table.0.as_mut_ptr() as u64);
    let mut root = HostPageTables::<LinuxHosted>::new_root();
    pde_link::<LinuxHosted>(&mut root, 0, table_frame).unwrap();

    // SAFETY: the only linked table is `table`, live for the whole test and
    // only reached through the resolver.
    let mut resolver = unsafe { IdentityTables::<LinuxHosted>::new() };
    let frame = Paddr::new(0xA000);
    page_map::<LinuxHosted, _>(&root, &mut resolver, frame, Vaddr::new(0x2000), PageFlags::WRITABLE)
        .unwrap();
    assert_eq!(
        page_walk::<LinuxHosted, _>(&root, &resolver, Paddr::new(0xA010)),
        Some(Vaddr::new(0x2010))
    );
    drop(resolver);
    assert!(table.0[2].is_present());
}

proptest! {
    #[test]
    fn walk_inverts_lookup(
        dir in 0usize..4,
        index in 0usize..1024,
        frame in 1u64..0x000F_FFFF,
        offset in 0u64..4096,
    ) {
        let (root, mut tables) = tables_with::<X86>(&[0, 1, 2, 3]);
        let vaddr = Vaddr::new(((dir as u64) << 22) | ((index as u64) << 12));
        let paddr = Paddr::new(frame << 12);
        page_map::<X86, _>(&root, &mut tables, paddr, vaddr, PageFlags::WRITABLE).unwrap();

        let found = page_walk::<X86, _>(&root, &tables, paddr.add(offset)).unwrap();
        prop_assert_eq!(found, vaddr.add(offset));
        let back = lookup::<X86, _>(&root, &tables, found.align_down(12)).unwrap();
        prop_assert_eq!(back, paddr);
    }
}

#[test]
fn hal_maps_walks_and_unmaps() {
    use crate::backend::hosted::HostedBackend;
    use crate::config::ClusterConfig;
    use crate::hal::Hal;

    let hal = Hal::new(HostedBackend::<Arm64>::new(ClusterConfig::DEFAULT).unwrap()).unwrap();
    let (root, mut tables) = tables_with::<Arm64>(&[1]);
    let frame = Paddr::new(0x4020_0000);
    let vaddr = Vaddr::new((1 << 21) | 0x7000);

    hal.mmu_page_map(&root, &mut tables, frame, vaddr, PageFlags::WRITABLE).unwrap();
    assert_eq!(hal.mmu_page_walk(&root, &tables, frame), Some(vaddr));
    assert_eq!(hal.mmu_lookup(&root, &tables, vaddr), Some(frame));
    assert_eq!(hal.mmu_page_unmap(&root, &mut tables, vaddr), Ok(frame));
    assert_eq!(hal.mmu_page_walk(&root, &tables, frame), None);
}
