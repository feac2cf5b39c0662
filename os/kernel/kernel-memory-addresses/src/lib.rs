//! # 32-bit Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses used by the paging and
//! frame allocation code of a 32-bit (non-PAE) x86 kernel.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address translated through the page tables. |
//! | [`PhysicalAddress`] | An address on the memory bus (RAM / MMIO). |
//!
//! Both are zero-cost `#[repr(transparent)]` wrappers around `u32`. Physical
//! memory is managed in 4 KiB frames identified by their **page index**
//! (`address >> 12`); the conversions between addresses and page indices live
//! on the address types.
//!
//! ## Virtual Address Split
//!
//! A 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22     | 21‒12  | 11‒0   |
//! | Directory | Table  | Offset |
//! ```
//!
//! The directory index selects one of 1024 entries in the page directory, each
//! covering a 4 MiB window. The table index selects one of 1024 entries in the
//! page table of that window, each mapping a single 4 KiB page.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x4012_3456);
//! assert_eq!(va.directory_index(), 0x100);
//! assert_eq!(va.table_index(), 0x123);
//! assert_eq!(va.page_offset(), 0x456);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod virtual_address;

pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// Size of a page frame in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// log2 of [`PAGE_SIZE`]; the number of offset bits in an address.
pub const PAGE_SHIFT: u32 = 12;

/// Number of entries in a page directory or a page table.
pub const ENTRIES_PER_TABLE: usize = 1024;

/// Shift that extracts the directory index from a virtual address.
pub const DIRECTORY_SHIFT: u32 = 22;

/// Mask applied to `va >> PAGE_SHIFT` to extract the table index.
pub const TABLE_INDEX_MASK: u32 = 0x3FF;

/// Number of 4 KiB frames in the 32-bit physical address space.
pub const MAX_PAGE_INDICES: usize = 1 << 20;

/// Align `x` down to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two.
///
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two and `x + a - 1` must not overflow.
///
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(1, 4096), 4096);
/// assert_eq!(align_up(4096, 4096), 4096);
/// assert_eq!(align_up(4097, 4096), 8192);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> u64 {
    (x + a - 1) & !(a - 1)
}
