use crate::{DIRECTORY_SHIFT, PAGE_SHIFT, PAGE_SIZE, TABLE_INDEX_MASK};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Virtual memory address.
///
/// Denotes an address that is translated through a process's page directory.
/// It carries the *kind* of address at the type level so virtual and physical
/// values are not mixed up; no validation is performed.
///
/// ### Semantics
/// - [`directory_index`](Self::directory_index) yields bits `[31:22]`.
/// - [`table_index`](Self::table_index) yields bits `[21:12]`.
/// - [`page_offset`](Self::page_offset) yields bits `[11:0]`.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::from_indices(0x3FF, 0x3FF);
/// assert_eq!(va.as_u32(), 0xFFFF_F000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u32);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    /// Build the base address of the page selected by a directory/table index pair.
    ///
    /// ### Debug assertions
    /// - Both indices must be `< 1024`.
    #[inline]
    #[must_use]
    pub const fn from_indices(directory: u16, table: u16) -> Self {
        debug_assert!(directory < 1024 && table < 1024);
        Self(((directory as u32) << DIRECTORY_SHIFT) | ((table as u32) << PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index into the page directory (bits `[31:22]`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn directory_index(self) -> u16 {
        (self.0 >> DIRECTORY_SHIFT) as u16
    }

    /// Index into the page table (bits `[21:12]`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table_index(self) -> u16 {
        ((self.0 >> PAGE_SHIFT) & TABLE_INDEX_MASK) as u16
    }

    /// Byte offset within the 4 KiB page (bits `[11:0]`).
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u32 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Index of the virtual page containing this address.
    #[inline]
    #[must_use]
    pub const fn page_index(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl Add<u32> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}
