// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for address types.

#![allow(clippy::unwrap_used, clippy::expect_used)]

extern crate std;

use std::format;

use super::addr::{Paddr, Vaddr};

#[test]
fn null_addresses() {
    assert!(Paddr::NULL.is_null());
    assert!(Vaddr::new(0).is_null());
    assert!(!Vaddr::new(0x1000).is_null());
}

#[test]
fn page_alignment_helpers() {
    let pa = Paddr::new(0x1234_5678);
    assert_eq!(pa.align_down(12), Paddr::new(0x1234_5000));
    assert_eq!(pa.offset_in(12), 0x678);
    assert!(!pa.is_aligned(12));
    assert!(pa.align_down(12).is_aligned(12));
}

#[test]
fn eight_kib_pages() {
    let va = Vaddr::new(0x0040_3abc);
    assert_eq!(va.align_down(13), Vaddr::new(0x0040_2000));
    assert_eq!(va.offset_in(13), 0x1abc);
}

#[test]
fn full_width_shift_masks_everything() {
    let va = Vaddr::new(u64::MAX);
    assert_eq!(va.offset_in(64), u64::MAX);
    assert_eq!(va.align_down(64), Vaddr::NULL);
}

#[test]
fn display_formats() {
    assert_eq!(format!("{}", Paddr::new(0x1000)), "pa:0x1000");
    assert_eq!(format!("{:?}", Vaddr::new(0x2000)), "Vaddr(0x2000)");
}
