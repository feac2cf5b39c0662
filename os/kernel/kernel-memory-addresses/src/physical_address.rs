use crate::{PAGE_SHIFT, PAGE_SIZE};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Physical memory address.
///
/// Like [`VirtualAddress`](super::VirtualAddress), this type carries intent and
/// prevents accidental VA↔PA mix-ups.
///
/// ### Notes
/// - Page-table entries store a **page index** (`address >> 12`) in their upper
///   20 bits; use [`page_index`](Self::page_index) and
///   [`from_page_index`](Self::from_page_index) to move between the two views.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0010_2042);
/// assert_eq!(pa.page_index(), 0x102);
/// assert_eq!(PhysicalAddress::from_page_index(0x102).as_u32(), 0x0010_2000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u32);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    /// Base address of the frame with the given page index.
    #[inline]
    #[must_use]
    pub const fn from_page_index(page: u32) -> Self {
        Self(page << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index of the frame containing this address.
    #[inline]
    #[must_use]
    pub const fn page_index(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// Byte offset within the containing 4 KiB frame.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u32 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// `true` if the address is a multiple of `align` (a power of two).
    #[inline]
    #[must_use]
    pub const fn is_aligned_to(self, align: u32) -> bool {
        self.0 & (align - 1) == 0
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:08X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for PhysicalAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl Add<u32> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}
