//! # Mapping Façade
//!
//! The operations higher kernel layers call to change a process's mappings.
//! Page tables are allocated on demand from the process's container through
//! [`FrameAlloc`]; they are never reclaimed automatically.

use crate::address_space::AddressSpaces;
use crate::{FrameAlloc, FrameStore, PageEntryBits};
use kernel_info::memory::{FRAME_ALLOC_FAILED, MAP_FAILED};
use kernel_memory_addresses::VirtualAddress;

impl<S: FrameStore> AddressSpaces<S> {
    /// Allocate a page table for the 4 MiB window containing `va`.
    ///
    /// The frame is taken from `process`'s container, installed in the
    /// directory with present, writable and user permissions, and zero-filled.
    /// Returns the frame index, or [`FRAME_ALLOC_FAILED`] if the container
    /// could not provide one (the directory is left untouched).
    ///
    /// Any existing directory entry for the window is overwritten; callers
    /// check for an absent entry first, as [`map_page`](Self::map_page) does.
    pub fn alloc_page_table<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        process: usize,
        va: VirtualAddress,
    ) -> u32 {
        let Some(page) = alloc.alloc_frame(process) else {
            log::debug!("process {process}: no frame for page table at {va}");
            return FRAME_ALLOC_FAILED;
        };

        self.set_pdir_entry_by_va(process, va, page);
        self.frames.table_mut(page).zero();
        log::debug!(
            "process {process}: page table {page:#x} installed for directory index {:#x}",
            va.directory_index()
        );
        page
    }

    /// Remove the page table covering `va` and return its frame to
    /// `process`'s container.
    ///
    /// Entries still present in the table are discarded with it. Directory
    /// entries that are absent or point at the shared identity bank are left
    /// alone.
    pub fn free_page_table<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        process: usize,
        va: VirtualAddress,
    ) {
        let pde = va.directory_index();
        let entry = PageEntryBits::from_bits(self.get_pdir_entry(process, pde));
        if !entry.present() {
            return;
        }
        if self.identity.table_index_of(entry.frame()).is_some() {
            log::warn!("process {process}: refusing to free shared identity table {pde:#x}");
            return;
        }

        self.rmv_pdir_entry(process, pde);
        alloc.free_frame(process, entry.frame());
        log::debug!("process {process}: page table {:#x} released", entry.frame());
    }

    /// Map `va` to frame `page` with permission bits `perm`.
    ///
    /// A page table is allocated first if the directory entry for `va` is
    /// absent. Returns the frame of the page table that now holds the mapping,
    /// or [`MAP_FAILED`] if no page table could be allocated or the window is
    /// backed by a shared identity table.
    ///
    /// `page` is not checked against the caller's ownership; a process mapping
    /// a frame it did not allocate is a caller error.
    pub fn map_page<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        process: usize,
        va: VirtualAddress,
        page: u32,
        perm: u32,
    ) -> u32 {
        self.try_map_page(alloc, process, va, page, perm)
            .unwrap_or(MAP_FAILED)
    }

    /// Checked variant of [`map_page`](Self::map_page).
    ///
    /// # Errors
    /// - [`MapError::PageTableAllocation`] if a page table was needed and the
    ///   container had no frame.
    /// - [`MapError::SharedIdentityTable`] if the directory entry for `va`
    ///   points at the shared identity bank.
    pub fn try_map_page<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        process: usize,
        va: VirtualAddress,
        page: u32,
        perm: u32,
    ) -> Result<u32, MapError> {
        let pde = va.directory_index();
        if self.get_pdir_entry_by_va(process, va) == 0
            && self.alloc_page_table(alloc, process, va) == FRAME_ALLOC_FAILED
        {
            return Err(MapError::PageTableAllocation);
        }
        if self.is_shared_table(process, pde) {
            log::warn!("process {process}: cannot map {va} through shared identity table");
            return Err(MapError::SharedIdentityTable);
        }

        self.set_ptbl_entry_by_va(process, va, page, perm);
        log::trace!("process {process}: mapped {va} -> frame {page:#x} ({perm:#x})");
        Ok(PageEntryBits::from_bits(self.get_pdir_entry(process, pde)).frame())
    }

    /// Remove the mapping for `va`, if any.
    ///
    /// Returns the table entry observed afterwards, which is `0` whenever the
    /// call completes. The page table is kept even if it becomes empty.
    pub fn unmap_page(&mut self, process: usize, va: VirtualAddress) -> u32 {
        if self.get_ptbl_entry_by_va(process, va) != 0 {
            self.rmv_ptbl_entry_by_va(process, va);
            log::trace!("process {process}: unmapped {va}");
        }
        self.get_ptbl_entry_by_va(process, va)
    }
}

/// Failure of [`AddressSpaces::try_map_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("no frame available for a page table")]
    PageTableAllocation,
    #[error("window is backed by a shared identity table")]
    SharedIdentityTable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PTE_P, PTE_U, PTE_W, SparseFrames, decode_frame, decode_perm};
    use alloc::vec::Vec;
    use kernel_info::memory::{USER_HI, USER_LO, USER_LO_PAGE_INDEX};
    use kernel_memory_addresses::PhysicalAddress;

    /// Hands out consecutive user-region frames up to a fixed count.
    struct CountingAlloc {
        next: u32,
        left: usize,
        freed: Vec<(usize, u32)>,
    }

    impl CountingAlloc {
        fn new(frames: usize) -> Self {
            Self {
                next: USER_LO_PAGE_INDEX,
                left: frames,
                freed: Vec::new(),
            }
        }
    }

    impl FrameAlloc for CountingAlloc {
        fn alloc_frame(&mut self, _owner: usize) -> Option<u32> {
            if self.left == 0 {
                return None;
            }
            self.left -= 1;
            let page = self.next;
            self.next += 1;
            Some(page)
        }

        fn free_frame(&mut self, owner: usize, page: u32) {
            self.freed.push((owner, page));
        }
    }

    fn booted() -> AddressSpaces<SparseFrames> {
        let mut spaces = AddressSpaces::new(SparseFrames::new());
        spaces.init_identity_tables();
        spaces.init_page_directories();
        spaces
    }

    #[test]
    fn map_then_unmap_round_trip() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(4);
        let va = VirtualAddress::new(USER_LO + 0x0123_4000);
        let perm = PTE_P | PTE_W | PTE_U;

        let table = spaces.map_page(&mut alloc, 1, va, 0x50000, perm);
        assert_eq!(table, USER_LO_PAGE_INDEX);

        let e = spaces.get_ptbl_entry_by_va(1, va);
        assert_eq!(decode_frame(e), 0x50000);
        assert_eq!(decode_perm(e), perm);
        assert_eq!(
            spaces.translate(1, va + 0x10).map(PhysicalAddress::as_u32),
            Some(0x5000_0010)
        );

        assert_eq!(spaces.unmap_page(1, va), 0);
        assert_eq!(spaces.get_ptbl_entry_by_va(1, va), 0);
        assert_ne!(spaces.get_pdir_entry_by_va(1, va), 0);
    }

    #[test]
    fn second_mapping_in_window_reuses_table() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(4);
        let va = VirtualAddress::new(USER_LO);

        let first = spaces.map_page(&mut alloc, 2, va, 0x50000, PTE_P);
        let second = spaces.map_page(&mut alloc, 2, va + 0x1000, 0x50001, PTE_P);
        assert_eq!(first, second);
        assert_eq!(alloc.left, 3);
    }

    #[test]
    fn fresh_table_starts_empty() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(1);
        let va = VirtualAddress::new(USER_LO + 0x0040_0000);

        let page = spaces.alloc_page_table(&mut alloc, 3, va);
        assert_eq!(page, USER_LO_PAGE_INDEX);
        assert_eq!(
            decode_perm(spaces.get_pdir_entry_by_va(3, va)),
            PTE_P | PTE_W | PTE_U
        );
        for pte in 0..1024u16 {
            assert_eq!(spaces.get_ptbl_entry(3, va.directory_index(), pte), 0);
        }
    }

    #[test]
    fn exhausted_container_fails_with_magic_value() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(0);
        let va = VirtualAddress::new(USER_LO);

        assert_eq!(spaces.map_page(&mut alloc, 4, va, 0x50000, PTE_P), MAP_FAILED);
        assert_eq!(
            spaces.try_map_page(&mut alloc, 4, va, 0x50000, PTE_P),
            Err(MapError::PageTableAllocation)
        );
        assert_eq!(spaces.get_pdir_entry_by_va(4, va), 0);
    }

    #[test]
    fn kernel_windows_cannot_be_remapped() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(1);
        let va = VirtualAddress::new(USER_HI);

        assert_eq!(
            spaces.try_map_page(&mut alloc, 5, va, 0x50000, PTE_P),
            Err(MapError::SharedIdentityTable)
        );
        assert_eq!(alloc.left, 1);
        assert_eq!(spaces.translate(5, va).map(PhysicalAddress::as_u32), Some(USER_HI));
    }

    #[test]
    fn unmap_of_absent_page_is_a_no_op() {
        let mut spaces = booted();
        let va = VirtualAddress::new(USER_LO + 0x8000);
        assert_eq!(spaces.unmap_page(6, va), 0);
        assert!(spaces.frames().is_empty());
    }

    #[test]
    fn free_page_table_returns_frame_to_owner() {
        let mut spaces = booted();
        let mut alloc = CountingAlloc::new(1);
        let va = VirtualAddress::new(USER_LO + 0x0080_0000);

        let page = spaces.alloc_page_table(&mut alloc, 7, va);
        spaces.free_page_table(&mut alloc, 7, va);
        assert_eq!(alloc.freed, [(7, page)]);
        assert_eq!(spaces.get_pdir_entry_by_va(7, va), 0);

        spaces.free_page_table(&mut alloc, 7, va);
        spaces.free_page_table(&mut alloc, 7, VirtualAddress::new(0));
        assert_eq!(alloc.freed.len(), 1);
        assert!(spaces.is_shared_table(7, 0));
    }
}
