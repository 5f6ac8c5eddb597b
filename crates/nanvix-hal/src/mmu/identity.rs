// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resolver for page tables reachable at their physical address.

use core::marker::PhantomData;

use nanvix_hal_abi::Paddr;

use super::{Pte, TableResolver};
use crate::arch::Arch;

/// Treats every table frame as directly addressable: the usual situation
/// for a kernel that identity-maps the memory page tables live in.
pub struct IdentityTables<A: Arch> {
    arch: PhantomData<fn() -> A>,
}

impl<A: Arch> IdentityTables<A> {
    /// Creates the resolver.
    ///
    /// # Safety
    ///
    /// Every frame that a present directory entry handed to the walker
    /// points at must be mapped at the same virtual address, hold
    /// `A::PGTAB_LENGTH` initialized entries, and not be mutated through
    /// another path while a walk or mapping call is in progress.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { arch: PhantomData }
    }

    fn address(frame: Paddr) -> Option<usize> {
        let addr = usize::try_from(frame.as_u64()).ok()?;
        if addr == 0 || addr % core::mem::align_of::<Pte<A>>() != 0 {
            return None;
        }
        Some(addr)
    }
}

impl<A: Arch> TableResolver<A> for IdentityTables<A> {
    fn table(&self, frame: Paddr) -> Option<&[Pte<A>]> {
        let addr = Self::address(frame)?;
        // SAFETY: guaranteed by the contract of `IdentityTables::new`.
        Some(unsafe { core::slice::from_raw_parts(addr as *const Pte<A>, A::PGTAB_LENGTH) })
    }

    fn table_mut(&mut self, frame: Paddr) -> Option<&mut [Pte<A>]> {
        let addr = Self::address(frame)?;
        // SAFETY: guaranteed by the contract of `IdentityTables::new`; `&mut
        // self` serializes mutation through this resolver.
        Some(unsafe { core::slice::from_raw_parts_mut(addr as *mut Pte<A>, A::PGTAB_LENGTH) })
    }
}
