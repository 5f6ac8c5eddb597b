// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bit-packed page directory and page table entries.
//!
//! Each architecture describes its entry format as an [`EntryLayout`]: raw
//! width, where the present bit lives, how permissions are encoded and
//! where the frame number sits. [`PackedEntry`] turns that description
//! into the uniform view the walker uses.

use core::fmt;
use core::marker::PhantomData;

use bitflags::bitflags;
use nanvix_hal_abi::{HalError, HalResult, Paddr};
use num_traits::{Bounded, PrimInt, ToPrimitive, Zero};

bitflags! {
    /// Logical view of an entry's permission bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PageFlags: u8 {
        /// The entry maps something.
        const PRESENT = 1 << 0;
        /// Writes are permitted.
        const WRITABLE = 1 << 1;
        /// Instruction fetches are permitted.
        const EXECUTABLE = 1 << 2;
        /// Accessible from user mode.
        const USER = 1 << 3;
    }
}

/// Encoding of a single permission in the raw entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// Permission granted when these bits are set.
    Set(u64),
    /// Permission granted when these bits are clear (e.g. NX, read-only).
    Clear(u64),
    /// The format cannot deny this permission.
    Always,
    /// The format cannot grant this permission.
    Never,
}

impl Flag {
    const fn read(self, bits: u64) -> bool {
        match self {
            Self::Set(mask) => bits & mask == mask,
            Self::Clear(mask) => bits & mask == 0,
            Self::Always => true,
            Self::Never => false,
        }
    }

    const fn apply(self, bits: u64, on: bool) -> u64 {
        match (self, on) {
            (Self::Set(mask), true) | (Self::Clear(mask), false) => bits | mask,
            (Self::Set(mask), false) | (Self::Clear(mask), true) => bits & !mask,
            (Self::Always | Self::Never, _) => bits,
        }
    }
}

/// Description of an architecture's entry format.
pub trait EntryLayout: 'static {
    /// Raw storage type (`u32` or `u64`).
    type Raw: PrimInt + Default + fmt::Debug + Send + Sync + 'static;

    /// log2 of the page size frames are counted in.
    const PAGE_SHIFT: u32;

    /// Present/valid bit.
    const PRESENT: u64;

    /// Bits that must accompany `PRESENT` (descriptor type, access flag).
    const TYPE_BITS: u64 = 0;

    /// Write permission encoding.
    const WRITABLE: Flag;

    /// Execute permission encoding.
    const EXECUTABLE: Flag;

    /// User-mode access encoding.
    const USER: Flag;

    /// Bits holding the frame number.
    const FRAME_MASK: u64;

    /// Bit position of the frame number's least significant bit.
    const FRAME_SHIFT: u32;
}

/// A page directory or page table entry of layout `L`.
#[repr(transparent)]
pub struct PackedEntry<L: EntryLayout> {
    raw: L::Raw,
    layout: PhantomData<fn() -> L>,
}

impl<L: EntryLayout> PackedEntry<L> {
    /// A cleared, non-present entry.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::from_raw(L::Raw::zero())
    }

    /// Wraps a raw entry as read from memory.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: L::Raw) -> Self {
        Self {
            raw,
            layout: PhantomData,
        }
    }

    /// Raw entry as stored in memory.
    #[inline]
    #[must_use]
    pub fn raw(self) -> L::Raw {
        self.raw
    }

    fn bits(self) -> u64 {
        self.raw.to_u64().unwrap_or(0)
    }

    fn store(&mut self, bits: u64) {
        // Every mask a layout declares fits its raw width, so the cast
        // only drops bits no layout defines.
        let truncated = bits & L::Raw::max_value().to_u64().unwrap_or(u64::MAX);
        if let Some(raw) = num_traits::cast(truncated) {
            self.raw = raw;
        }
    }

    /// Whether the entry maps anything.
    #[inline]
    #[must_use]
    pub fn is_present(self) -> bool {
        self.bits() & L::PRESENT != 0
    }

    /// Marks the entry present or not present.
    pub fn set_present(&mut self, present: bool) {
        let bits = self.bits();
        if present {
            self.store(bits | L::PRESENT | L::TYPE_BITS);
        } else {
            self.store(bits & !L::PRESENT);
        }
    }

    /// Whether writes are permitted.
    #[inline]
    #[must_use]
    pub fn is_writable(self) -> bool {
        L::WRITABLE.read(self.bits())
    }

    /// Grants or denies writes. Ignored where the format cannot express it.
    pub fn set_writable(&mut self, writable: bool) {
        let bits = self.bits();
        self.store(L::WRITABLE.apply(bits, writable));
    }

    /// Whether instruction fetches are permitted.
    #[inline]
    #[must_use]
    pub fn is_executable(self) -> bool {
        L::EXECUTABLE.read(self.bits())
    }

    /// Grants or denies execution. Ignored where the format cannot express it.
    pub fn set_executable(&mut self, executable: bool) {
        let bits = self.bits();
        self.store(L::EXECUTABLE.apply(bits, executable));
    }

    /// Whether user mode may access the page.
    #[inline]
    #[must_use]
    pub fn is_user(self) -> bool {
        L::USER.read(self.bits())
    }

    /// Grants or denies user access. Ignored where the format cannot express it.
    pub fn set_user(&mut self, user: bool) {
        let bits = self.bits();
        self.store(L::USER.apply(bits, user));
    }

    /// Physical frame address, or `None` if the entry is not present.
    ///
    /// The frame field of a non-present entry may hold anything (swap
    /// slots, stale data), so it is never exposed.
    #[inline]
    #[must_use]
    pub fn frame(self) -> Option<Paddr> {
        if self.is_present() {
            Some(self.frame_unchecked())
        } else {
            None
        }
    }

    fn frame_unchecked(self) -> Paddr {
        let number = (self.bits() & L::FRAME_MASK) >> L::FRAME_SHIFT;
        Paddr::new(number << L::PAGE_SHIFT)
    }

    /// Points the entry at `frame`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `frame` is not page-aligned, `Overflow` if its
    /// frame number does not fit the entry's frame field.
    pub fn set_frame(&mut self, frame: Paddr) -> HalResult<()> {
        if !frame.is_aligned(L::PAGE_SHIFT) {
            return Err(HalError::InvalidArgument);
        }
        let number = frame.as_u64() >> L::PAGE_SHIFT;
        let field = number
            .checked_shl(L::FRAME_SHIFT)
            .filter(|field| field >> L::FRAME_SHIFT == number)
            .ok_or(HalError::Overflow)?;
        if field & !L::FRAME_MASK != 0 {
            return Err(HalError::Overflow);
        }
        let bits = self.bits();
        self.store((bits & !L::FRAME_MASK) | field);
        Ok(())
    }

    /// Logical permission view.
    #[must_use]
    pub fn flags(self) -> PageFlags {
        let mut flags = PageFlags::empty();
        flags.set(PageFlags::PRESENT, self.is_present());
        flags.set(PageFlags::WRITABLE, self.is_writable());
        flags.set(PageFlags::EXECUTABLE, self.is_executable());
        flags.set(PageFlags::USER, self.is_user());
        flags
    }

    /// Applies a logical permission set.
    pub fn set_flags(&mut self, flags: PageFlags) {
        self.set_writable(flags.contains(PageFlags::WRITABLE));
        self.set_executable(flags.contains(PageFlags::EXECUTABLE));
        self.set_user(flags.contains(PageFlags::USER));
        self.set_present(flags.contains(PageFlags::PRESENT));
    }

    /// Resets the entry to all zeroes.
    pub fn clear(&mut self) {
        self.raw = L::Raw::zero();
    }
}

impl<L: EntryLayout> Clone for PackedEntry<L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: EntryLayout> Copy for PackedEntry<L> {}

impl<L: EntryLayout> Default for PackedEntry<L> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<L: EntryLayout> PartialEq for PackedEntry<L> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<L: EntryLayout> Eq for PackedEntry<L> {}

impl<L: EntryLayout> fmt::Debug for PackedEntry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame() {
            Some(frame) => write!(f, "Entry({:#x} -> {frame}, {:?})", self.bits(), self.flags()),
            None => write!(f, "Entry({:#x}, not present)", self.bits()),
        }
    }
}
