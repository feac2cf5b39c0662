//! # Frame Allocation Table
//!
//! One byte of state per 4 KiB physical frame of the 32-bit space: a
//! [`FramePermission`] class and an allocated flag. The table is built once
//! from the boot memory map by [`FrameTable::init_memory`] and afterwards only
//! mutated by the frame allocator.
//!
//! ## Classification
//!
//! ```text
//! 0 ──────────── USER_LO ─────────────────── USER_HI ──────────── 4 GiB
//! │  Reserved    │  Normal / Unusable         │  Reserved          │
//! ```
//!
//! Inside the user region a frame is [`Normal`](FramePermission::Normal) iff
//! its whole 4 KiB span lies inside a single usable range; partially covered
//! frames stay [`Unusable`](FramePermission::Unusable).

use alloc::boxed::Box;
use alloc::vec;
use bitfield_struct::bitfield;
use kernel_info::boot::MemoryMap;
use kernel_info::memory::{
    MAX_PAGE_INDICES, PAGE_SIZE, USER_HI_PAGE_INDEX, USER_LO_PAGE_INDEX, is_user_page_index,
};
use kernel_memory_addresses::{align_down, align_up};

/// End of the 32-bit physical address space; range bounds are clamped to it.
const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Whether a frame may ever be handed out.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum FramePermission {
    /// Inside the user region but not backed by usable RAM.
    Unusable = 0,
    /// Outside the user region; owned by the kernel.
    Reserved = 1,
    /// Usable RAM inside the user region.
    Normal = 2,
}

impl FramePermission {
    #[inline]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            1 => Self::Reserved,
            2 => Self::Normal,
            _ => Self::Unusable,
        }
    }
}

/// A single FAT entry.
///
/// | Bits | Name         |
/// |------|--------------|
/// | 0–1  | `permission` |
/// | 2    | `allocated`  |
/// | 3–7  | reserved     |
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct FrameEntry {
    #[bits(2)]
    pub permission: FramePermission,

    /// Meaningful only for [`FramePermission::Normal`] frames.
    pub allocated: bool,

    #[bits(5)]
    __: u8,
}

/// The Frame Allocation Table.
pub struct FrameTable {
    entries: Box<[FrameEntry]>,
    frame_count: u32,
}

impl FrameTable {
    /// An empty table: no frames, every entry [`Unusable`](FramePermission::Unusable).
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![FrameEntry::new(); MAX_PAGE_INDICES].into_boxed_slice(),
            frame_count: 0,
        }
    }

    /// Build a table from the boot memory map.
    #[must_use]
    pub fn from_memory_map<M: MemoryMap + ?Sized>(map: &M) -> Self {
        let mut table = Self::new();
        table.init_memory(map);
        table
    }

    /// Classify every frame according to `map`.
    ///
    /// `frame_count` becomes the number of pages needed to cover the end of the
    /// last range (ranges are in ascending order), `0` for an empty map.
    /// Kernel-region frames are marked reserved; user-region frames are
    /// unusable unless fully contained in a usable range. All allocation state
    /// is cleared.
    #[allow(clippy::cast_possible_truncation)]
    pub fn init_memory<M: MemoryMap + ?Sized>(&mut self, map: &M) {
        let count = map.range_count();
        self.frame_count = match count.checked_sub(1) {
            Some(last) => {
                let end = map.range_end(last).min(ADDRESS_SPACE_END);
                let end = align_up(end, u64::from(PAGE_SIZE)) / u64::from(PAGE_SIZE);
                end.min(MAX_PAGE_INDICES as u64) as u32
            }
            None => 0,
        };

        for (i, entry) in self.entries.iter_mut().enumerate() {
            let permission = if is_user_page_index(i as u32) {
                FramePermission::Unusable
            } else {
                FramePermission::Reserved
            };
            *entry = FrameEntry::new().with_permission(permission);
        }

        for i in 0..count {
            if !map.range_is_usable(i) {
                continue;
            }

            let start = map.range_start(i).min(ADDRESS_SPACE_END);
            let first = align_up(start, u64::from(PAGE_SIZE)) / u64::from(PAGE_SIZE);
            let end = align_down(map.range_end(i), u64::from(PAGE_SIZE)) / u64::from(PAGE_SIZE);
            let first = first.max(u64::from(USER_LO_PAGE_INDEX));
            let end = end.min(u64::from(USER_HI_PAGE_INDEX));
            log::debug!(
                "usable range {:#x}..{:#x}: {} frames in the user region",
                map.range_start(i),
                map.range_end(i),
                end.saturating_sub(first)
            );

            for page in first..end {
                self.entries[page as usize].set_permission(FramePermission::Normal);
            }
        }

        log::info!(
            "frame table initialized: {} frames, {} allocable",
            self.frame_count,
            self.free_normal_count()
        );
    }

    /// Number of frames covered by the memory map.
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Permission class of frame `page`. Out-of-range indices read as reserved.
    #[must_use]
    pub fn permission(&self, page: u32) -> FramePermission {
        self.entries
            .get(page as usize)
            .map_or(FramePermission::Reserved, FrameEntry::permission)
    }

    #[must_use]
    pub fn is_normal(&self, page: u32) -> bool {
        self.permission(page) == FramePermission::Normal
    }

    #[must_use]
    pub fn is_allocated(&self, page: u32) -> bool {
        self.entries.get(page as usize).is_some_and(FrameEntry::allocated)
    }

    /// Set or clear the allocated flag of frame `page`.
    ///
    /// Indices outside the table are ignored.
    pub fn set_allocated(&mut self, page: u32, allocated: bool) {
        debug_assert!((page as usize) < MAX_PAGE_INDICES);
        if let Some(e) = self.entries.get_mut(page as usize) {
            e.set_allocated(allocated);
        }
    }

    /// Number of [`Normal`](FramePermission::Normal) frames not currently allocated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn free_normal_count(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.permission() == FramePermission::Normal && !e.allocated())
            .count() as u32
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::boot::MemoryMapEntry;
    use kernel_info::memory::USER_LO;

    #[test]
    fn entry_layout() {
        let e = FrameEntry::new()
            .with_permission(FramePermission::Normal)
            .with_allocated(true);
        assert_eq!(e.into_bits(), 0b110);
        assert_eq!(FrameEntry::from_bits(0b001).permission(), FramePermission::Reserved);
    }

    #[test]
    fn empty_map_has_no_frames() {
        let map: [MemoryMapEntry; 0] = [];
        let table = FrameTable::from_memory_map(&map);
        assert_eq!(table.frame_count(), 0);
        assert_eq!(table.free_normal_count(), 0);
        assert_eq!(table.permission(0), FramePermission::Reserved);
        assert_eq!(table.permission(USER_LO_PAGE_INDEX), FramePermission::Unusable);
    }

    #[test]
    fn frame_count_rounds_last_end_up() {
        let map = [
            MemoryMapEntry::available(0, 0x9_FC00),
            MemoryMapEntry::reserved(0x9_FC00, 0x401),
        ];
        let table = FrameTable::from_memory_map(&map);
        assert_eq!(table.frame_count(), 0xA1);
    }

    #[test]
    fn partial_pages_stay_unusable() {
        let base = u64::from(USER_LO);
        let map = [MemoryMapEntry::available(base + 0x800, 0x3000)];
        let table = FrameTable::from_memory_map(&map);

        assert_eq!(table.permission(USER_LO_PAGE_INDEX), FramePermission::Unusable);
        assert!(table.is_normal(USER_LO_PAGE_INDEX + 1));
        assert!(table.is_normal(USER_LO_PAGE_INDEX + 2));
        assert_eq!(table.permission(USER_LO_PAGE_INDEX + 3), FramePermission::Unusable);
        assert_eq!(table.free_normal_count(), 2);
    }

    #[test]
    fn kernel_region_ranges_never_become_normal() {
        let map = [MemoryMapEntry::available(0x10_0000, 0x40_0000)];
        let table = FrameTable::from_memory_map(&map);
        assert_eq!(table.frame_count(), 0x500);
        assert_eq!(table.free_normal_count(), 0);
        assert_eq!(table.permission(0x100), FramePermission::Reserved);
    }

    #[test]
    fn allocation_flag_is_tracked() {
        let map = [MemoryMapEntry::available(u64::from(USER_LO), 0x2000)];
        let mut table = FrameTable::from_memory_map(&map);
        table.set_allocated(USER_LO_PAGE_INDEX, true);
        assert!(table.is_allocated(USER_LO_PAGE_INDEX));
        assert_eq!(table.free_normal_count(), 1);
        table.init_memory(&map);
        assert!(!table.is_allocated(USER_LO_PAGE_INDEX));
    }
}
