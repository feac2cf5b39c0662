//! # Kernel Boot Information
//!
//! The bootloader hands the kernel a table of physical memory ranges. This
//! module defines the ABI of a single range and the [`MemoryMap`] view the
//! memory manager consumes.

/// Region type value marking a range as usable RAM.
pub const MEMORY_AVAILABLE: u32 = 1;

/// Region type value marking a range as reserved by firmware or devices.
pub const MEMORY_RESERVED: u32 = 2;

/// Read-only view of the hardware memory map.
///
/// Ranges are expected in ascending address order, as reported by the
/// firmware. Indices are in `0..range_count()`.
pub trait MemoryMap {
    /// Number of ranges in the map.
    fn range_count(&self) -> usize;

    /// Physical start address of range `i`.
    fn range_start(&self, i: usize) -> u64;

    /// Length of range `i` in bytes.
    fn range_length(&self, i: usize) -> u64;

    /// Whether range `i` is usable RAM.
    fn range_is_usable(&self, i: usize) -> bool;

    /// Exclusive end address of range `i`.
    #[inline]
    fn range_end(&self, i: usize) -> u64 {
        self.range_start(i).saturating_add(self.range_length(i))
    }
}

/// A single memory map entry.
///
/// Keep this `#[repr(C)]`: the layout matches the multiboot2 memory area
/// entry (64-bit base, 64-bit length, 32-bit type, 32-bit reserved) so a
/// boot-time table can be reinterpreted without copying.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryMapEntry {
    /// Physical start address.
    pub base: u64,
    /// Length in bytes.
    pub length: u64,
    /// Region type; [`MEMORY_AVAILABLE`] denotes usable RAM.
    pub kind: u32,
    /// Reserved, must be zero.
    pub reserved: u32,
}

impl MemoryMapEntry {
    /// A usable RAM range.
    #[must_use]
    pub const fn available(base: u64, length: u64) -> Self {
        Self {
            base,
            length,
            kind: MEMORY_AVAILABLE,
            reserved: 0,
        }
    }

    /// A reserved range.
    #[must_use]
    pub const fn reserved(base: u64, length: u64) -> Self {
        Self {
            base,
            length,
            kind: MEMORY_RESERVED,
            reserved: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.kind == MEMORY_AVAILABLE
    }
}

impl MemoryMap for [MemoryMapEntry] {
    fn range_count(&self) -> usize {
        self.len()
    }

    fn range_start(&self, i: usize) -> u64 {
        self[i].base
    }

    fn range_length(&self, i: usize) -> u64 {
        self[i].length
    }

    fn range_is_usable(&self, i: usize) -> bool {
        self[i].is_usable()
    }
}

impl<const N: usize> MemoryMap for [MemoryMapEntry; N] {
    fn range_count(&self) -> usize {
        N
    }

    fn range_start(&self, i: usize) -> u64 {
        self[i].base
    }

    fn range_length(&self, i: usize) -> u64 {
        self[i].length
    }

    fn range_is_usable(&self, i: usize) -> bool {
        self[i].is_usable()
    }
}

const _: () = {
    assert!(size_of::<MemoryMapEntry>() == 24);
};
