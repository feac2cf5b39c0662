//! Owning memory manager for the kernel.
//!
//! [`MemoryManager`] holds every piece of memory state (frame table, container
//! tree, page directories, identity bank) and exposes the operations higher
//! kernel layers use. It is passed around explicitly; there is no global
//! instance.
//!
//! # Example
//! ```
//! use kernel_alloc::MemoryManager;
//! use kernel_info::boot::MemoryMapEntry;
//! use kernel_info::memory::USER_LO;
//! use kernel_memory_addresses::VirtualAddress;
//! use kernel_vmem::{PTE_P, PTE_U, PTE_W};
//!
//! let map = [MemoryMapEntry::available(u64::from(USER_LO), 0x10_0000)];
//! let mut mm = MemoryManager::boot(&map);
//!
//! let child = mm.split(0, 16);
//! let page = mm.alloc(child);
//! let va = VirtualAddress::new(USER_LO);
//! mm.map_page(child, va, page, PTE_P | PTE_W | PTE_U);
//! assert_eq!(mm.address_spaces().get_ptbl_entry_by_va(child, va) >> 12, page);
//! ```

use crate::container::{ContainerError, ContainerTree};
use crate::frame_table::FrameTable;
use kernel_info::boot::MemoryMap;
use kernel_memory_addresses::VirtualAddress;
use kernel_vmem::{AddressSpaces, FrameStore, MapError, SparseFrames, TranslationRoot};

/// Physical and virtual memory state of the kernel.
pub struct MemoryManager<S: FrameStore = SparseFrames> {
    containers: ContainerTree,
    spaces: AddressSpaces<S>,
}

impl MemoryManager<SparseFrames> {
    /// Boot with heap-backed page-table frames.
    #[must_use]
    pub fn boot<M: MemoryMap + ?Sized>(map: &M) -> Self {
        Self::boot_with_store(map, SparseFrames::new())
    }
}

impl<S: FrameStore> MemoryManager<S> {
    /// An uninitialized manager: no frames, no containers, empty directories.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            containers: ContainerTree::new(FrameTable::new()),
            spaces: AddressSpaces::new(store),
        }
    }

    /// Run the boot sequence: frame table, root container, identity bank,
    /// page directories.
    #[must_use]
    pub fn boot_with_store<M: MemoryMap + ?Sized>(map: &M, store: S) -> Self {
        let mut mm = Self::new(store);
        mm.init_memory(map);
        mm.init_root_container();
        mm.init_identity_tables();
        mm.init_page_directories();
        log::info!("memory manager ready");
        mm
    }

    /// Build the frame allocation table from the boot memory map.
    pub fn init_memory<M: MemoryMap + ?Sized>(&mut self, map: &M) {
        self.containers.init_memory(map);
    }

    /// Give the root container every free normal frame.
    pub fn init_root_container(&mut self) {
        self.containers.init_root_container();
    }

    pub fn init_identity_tables(&mut self) {
        self.spaces.init_identity_tables();
    }

    pub fn init_page_directories(&mut self) {
        self.spaces.init_page_directories();
    }

    #[must_use]
    pub const fn containers(&self) -> &ContainerTree {
        &self.containers
    }

    #[must_use]
    pub const fn address_spaces(&self) -> &AddressSpaces<S> {
        &self.spaces
    }

    /// Direct access to the entry accessors.
    pub const fn address_spaces_mut(&mut self) -> &mut AddressSpaces<S> {
        &mut self.spaces
    }

    /* ----------------------------- containers ---------------------------- */

    #[must_use]
    pub const fn get_parent(&self, id: usize) -> usize {
        self.containers.get_parent(id)
    }

    #[must_use]
    pub const fn get_child_count(&self, id: usize) -> usize {
        self.containers.get_child_count(id)
    }

    #[must_use]
    pub const fn get_quota(&self, id: usize) -> u32 {
        self.containers.get_quota(id)
    }

    #[must_use]
    pub const fn get_usage(&self, id: usize) -> u32 {
        self.containers.get_usage(id)
    }

    #[must_use]
    pub const fn can_consume(&self, id: usize, n: u32) -> bool {
        self.containers.can_consume(id, n)
    }

    /// See [`ContainerTree::split`].
    pub fn split(&mut self, id: usize, quota: u32) -> usize {
        self.containers.split(id, quota)
    }

    /// See [`ContainerTree::try_split`].
    ///
    /// # Errors
    /// Quota or slot exhaustion, as [`ContainerError`].
    pub fn try_split(&mut self, id: usize, quota: u32) -> Result<usize, ContainerError> {
        self.containers.try_split(id, quota)
    }

    /// See [`ContainerTree::alloc`].
    pub fn alloc(&mut self, id: usize) -> u32 {
        self.containers.alloc(id)
    }

    /// See [`ContainerTree::try_alloc`].
    ///
    /// # Errors
    /// Quota or frame exhaustion, as [`ContainerError`].
    pub fn try_alloc(&mut self, id: usize) -> Result<u32, ContainerError> {
        self.containers.try_alloc(id)
    }

    /// See [`ContainerTree::free`].
    pub fn free(&mut self, id: usize, page: u32) {
        self.containers.free(id, page);
    }

    /* ------------------------------- paging ------------------------------ */

    /// Load `process`'s page directory into the translation root.
    pub fn set_active_directory<R: TranslationRoot>(&self, process: usize, root: &mut R) {
        self.spaces.set_active_directory(process, root);
    }

    /// See [`AddressSpaces::map_page`]; page tables are charged to `process`'s container.
    pub fn map_page(&mut self, process: usize, va: VirtualAddress, page: u32, perm: u32) -> u32 {
        self.spaces
            .map_page(&mut self.containers, process, va, page, perm)
    }

    /// See [`AddressSpaces::try_map_page`].
    ///
    /// # Errors
    /// See [`MapError`].
    pub fn try_map_page(
        &mut self,
        process: usize,
        va: VirtualAddress,
        page: u32,
        perm: u32,
    ) -> Result<u32, MapError> {
        self.spaces
            .try_map_page(&mut self.containers, process, va, page, perm)
    }

    /// See [`AddressSpaces::unmap_page`].
    pub fn unmap_page(&mut self, process: usize, va: VirtualAddress) -> u32 {
        self.spaces.unmap_page(process, va)
    }

    /// See [`AddressSpaces::alloc_page_table`].
    pub fn alloc_page_table(&mut self, process: usize, va: VirtualAddress) -> u32 {
        self.spaces
            .alloc_page_table(&mut self.containers, process, va)
    }

    /// See [`AddressSpaces::free_page_table`].
    pub fn free_page_table(&mut self, process: usize, va: VirtualAddress) {
        self.spaces
            .free_page_table(&mut self.containers, process, va);
    }
}
