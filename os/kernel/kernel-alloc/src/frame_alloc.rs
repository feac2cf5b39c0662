//! Physical frame allocator over the [`FrameTable`].
//!
//! Allocation is a circular first-fit scan of the user region that resumes
//! where the previous successful scan stopped.

use crate::frame_table::FrameTable;
use kernel_info::boot::MemoryMap;
use kernel_info::memory::{FRAME_ALLOC_FAILED, USER_HI_PAGE_INDEX, USER_LO_PAGE_INDEX};

pub struct FrameAllocator {
    table: FrameTable,
    /// Next page index to inspect.
    cursor: u32,
}

impl FrameAllocator {
    #[must_use]
    pub const fn new(table: FrameTable) -> Self {
        Self {
            table,
            cursor: USER_LO_PAGE_INDEX,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &FrameTable {
        &self.table
    }

    /// Rebuild the table from `map` and rewind the cursor.
    pub fn init_memory<M: MemoryMap + ?Sized>(&mut self, map: &M) {
        self.table.init_memory(map);
        self.cursor = USER_LO_PAGE_INDEX;
    }

    /// Allocate one frame.
    ///
    /// Returns its page index, or [`FRAME_ALLOC_FAILED`] if the table is empty
    /// or a full lap over the user region found no free normal frame.
    pub fn alloc_frame(&mut self) -> u32 {
        if self.table.frame_count() == 0 {
            return FRAME_ALLOC_FAILED;
        }

        let start = if self.cursor >= USER_HI_PAGE_INDEX {
            USER_LO_PAGE_INDEX
        } else {
            self.cursor
        };

        let mut page = start;
        loop {
            if self.table.is_normal(page) && !self.table.is_allocated(page) {
                self.table.set_allocated(page, true);
                self.cursor = page + 1;
                log::trace!("allocated frame {page:#x}");
                return page;
            }

            page += 1;
            if page >= USER_HI_PAGE_INDEX {
                page = USER_LO_PAGE_INDEX;
            }
            if page == start {
                log::debug!("no free frame left");
                return FRAME_ALLOC_FAILED;
            }
        }
    }

    /// Mark frame `page` free.
    ///
    /// There is no double-free or ownership check at this level.
    pub fn free_frame(&mut self, page: u32) {
        log::trace!("freed frame {page:#x}");
        self.table.set_allocated(page, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::boot::MemoryMapEntry;
    use kernel_info::memory::USER_LO;

    fn allocator(frames: u64) -> FrameAllocator {
        let map = [MemoryMapEntry::available(u64::from(USER_LO), frames * 4096)];
        FrameAllocator::new(FrameTable::from_memory_map(&map))
    }

    #[test]
    fn hands_out_frames_in_order() {
        let mut a = allocator(3);
        assert_eq!(a.alloc_frame(), USER_LO_PAGE_INDEX);
        assert_eq!(a.alloc_frame(), USER_LO_PAGE_INDEX + 1);
        assert_eq!(a.alloc_frame(), USER_LO_PAGE_INDEX + 2);
        assert_eq!(a.alloc_frame(), FRAME_ALLOC_FAILED);
    }

    #[test]
    fn scan_wraps_to_freed_frames() {
        let mut a = allocator(2);
        let first = a.alloc_frame();
        let second = a.alloc_frame();
        a.free_frame(first);
        assert_eq!(a.alloc_frame(), first);
        a.free_frame(second);
        assert_eq!(a.alloc_frame(), second);
    }

    #[test]
    fn scan_resumes_after_the_last_allocation() {
        let mut alloc = allocator(3);
        let a = alloc.alloc_frame();
        let b = alloc.alloc_frame();
        alloc.free_frame(a);

        let c = alloc.alloc_frame();
        assert_eq!(c, b + 1);
        assert_ne!(c, a);

        // The next lap wraps around to the frame freed first.
        assert_eq!(alloc.alloc_frame(), a);
        assert_eq!(alloc.alloc_frame(), FRAME_ALLOC_FAILED);
    }

    #[test]
    fn empty_table_never_allocates() {
        let mut a = FrameAllocator::new(FrameTable::new());
        assert_eq!(a.alloc_frame(), FRAME_ALLOC_FAILED);
    }
}
