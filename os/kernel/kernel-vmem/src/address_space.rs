//! # Address Spaces (32-bit, two-level)
//!
//! [`AddressSpaces`] owns the paging state of every process: the
//! [`DirectoryPool`], the shared [`IdentityTables`] and the [`FrameStore`]
//! that holds dynamically allocated page tables.
//!
//! ## Layers
//!
//! - **Boot**: [`init_identity_tables`](AddressSpaces::init_identity_tables)
//!   then [`init_page_directories`](AddressSpaces::init_page_directories).
//! - **Entry accessors**: index-based `get`/`set`/`rmv` primitives on
//!   directory and table entries, and `*_by_va` wrappers that derive
//!   `pde = va >> 22` and `pte = (va >> 12) & 0x3FF`.
//! - **Mapping façade** ([`mapping`]): `map_page`, `unmap_page`,
//!   `alloc_page_table`, `free_page_table`.
//!
//! ## Table resolution
//!
//! A directory entry stores a frame index. If that frame lies inside the
//! identity bank the entry refers to a shared identity table; otherwise the
//! frame is looked up in the [`FrameStore`]. Shared tables are read-only after
//! boot: per-process writes that would land in them are refused.
//!
//! ## Raw values
//!
//! Entry reads return the raw 32-bit encoding `(frame << 12) | perm`, `0`
//! meaning absent. Use [`decode_frame`](crate::decode_frame) and
//! [`decode_perm`](crate::decode_perm) to pick them apart.

pub mod mapping;

pub use crate::address_space::mapping::MapError;
use crate::{
    DirectoryPool, FrameStore, IdentityTables, PERM_TABLE, PageEntryBits, PageTable,
    TranslationRoot,
};
use kernel_info::memory::{ENTRIES_PER_TABLE, NUM_IDS, is_kernel_directory_index};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_registers::cr3::Cr3;

/// Where a directory entry's table lives.
enum TableRef {
    /// One of the shared identity tables.
    Shared(u16),
    /// A private table in the frame store.
    Private(u32),
}

/// Paging state of all process slots.
pub struct AddressSpaces<S: FrameStore> {
    directories: DirectoryPool,
    identity: IdentityTables,
    frames: S,
}

impl<S: FrameStore> AddressSpaces<S> {
    /// Create zeroed directories and an empty identity bank.
    ///
    /// Nothing is mapped until the boot initializers have run.
    #[must_use]
    pub fn new(frames: S) -> Self {
        Self {
            directories: DirectoryPool::new(),
            identity: IdentityTables::new(),
            frames,
        }
    }

    /// Build the identity page-table bank for the whole 32-bit space.
    pub fn init_identity_tables(&mut self) {
        self.identity.init();
    }

    /// Point every directory's kernel-region entries at the identity tables
    /// and clear the user-region entries.
    ///
    /// Process 0 is the privileged bootstrap process: it receives identity
    /// pointers for **all** directory indices, user region included.
    #[allow(clippy::cast_possible_truncation)]
    pub fn init_page_directories(&mut self) {
        for process in 0..NUM_IDS {
            for pde in 0..ENTRIES_PER_TABLE as u16 {
                if is_kernel_directory_index(pde) {
                    self.set_pdir_entry_identity(process, pde);
                } else {
                    self.rmv_pdir_entry(process, pde);
                }
            }
        }
        for pde in 0..ENTRIES_PER_TABLE as u16 {
            self.set_pdir_entry_identity(0, pde);
        }
        log::debug!("page directories initialized for {NUM_IDS} processes");
    }

    /// Install `process`'s page directory as the active translation root.
    pub fn set_active_directory<R: TranslationRoot>(&self, process: usize, root: &mut R) {
        let cr3 = Cr3::from_directory_phys(self.directory_base(process));
        log::trace!("activating directory of process {process} ({cr3:?})");
        root.install(cr3);
    }

    /// Physical base of `process`'s page directory.
    #[must_use]
    pub const fn directory_base(&self, process: usize) -> PhysicalAddress {
        self.directories.directory_phys(process)
    }

    /// Borrow the identity bank.
    #[must_use]
    pub const fn identity_tables(&self) -> &IdentityTables {
        &self.identity
    }

    /// Borrow the frame store.
    #[must_use]
    pub const fn frames(&self) -> &S {
        &self.frames
    }

    /// `true` if `process`'s directory entry `pde` refers to a shared identity table.
    #[must_use]
    pub fn is_shared_table(&self, process: usize, pde: u16) -> bool {
        let e = self.directories.entry(process, pde);
        e.present() && self.identity.table_index_of(e.frame()).is_some()
    }

    /* ------------------------- directory entries ------------------------- */

    /// Raw directory entry `pde` of `process`. `0` if cleared.
    #[must_use]
    pub fn get_pdir_entry(&self, process: usize, pde: u16) -> u32 {
        self.directories.entry(process, pde).into_bits()
    }

    /// Point directory entry `pde` at the page table in frame `page`
    /// with present, writable and user permissions.
    pub fn set_pdir_entry(&mut self, process: usize, pde: u16, page: u32) {
        self.directories
            .set_entry(process, pde, PageEntryBits::from_parts(page, PERM_TABLE));
    }

    /// Point directory entry `pde` at identity table `pde`
    /// with present, writable and user permissions.
    pub fn set_pdir_entry_identity(&mut self, process: usize, pde: u16) {
        let frame = self.identity.table_frame(pde);
        self.directories
            .set_entry(process, pde, PageEntryBits::from_parts(frame, PERM_TABLE));
    }

    /// Clear directory entry `pde`.
    pub fn rmv_pdir_entry(&mut self, process: usize, pde: u16) {
        self.directories.set_entry(process, pde, PageEntryBits::new());
    }

    /* --------------------------- table entries --------------------------- */

    fn table_ref(&self, process: usize, pde: u16) -> TableRef {
        let frame = self.directories.entry(process, pde).frame();
        match self.identity.table_index_of(frame) {
            Some(i) => TableRef::Shared(i),
            None => TableRef::Private(frame),
        }
    }

    fn table(&self, process: usize, pde: u16) -> Option<&PageTable> {
        match self.table_ref(process, pde) {
            TableRef::Shared(i) => Some(self.identity.table(i)),
            TableRef::Private(frame) => self.frames.table(frame),
        }
    }

    /// Mutable access to the private table behind directory entry `pde`.
    ///
    /// Returns `None` (and logs) if the entry is not present or refers to a
    /// shared identity table.
    fn private_table_mut(&mut self, process: usize, pde: u16) -> Option<&mut PageTable> {
        if !self.directories.entry(process, pde).present() {
            log::warn!("process {process}: table write through absent directory entry {pde:#x}");
            return None;
        }
        match self.table_ref(process, pde) {
            TableRef::Shared(_) => {
                log::warn!("process {process}: refusing write to shared identity table {pde:#x}");
                None
            }
            TableRef::Private(frame) => Some(self.frames.table_mut(frame)),
        }
    }

    /// Raw entry `pte` of the table referenced by directory entry `pde`.
    ///
    /// The directory entry is not checked for presence; see
    /// [`get_ptbl_entry_by_va`](Self::get_ptbl_entry_by_va).
    #[must_use]
    pub fn get_ptbl_entry(&self, process: usize, pde: u16, pte: u16) -> u32 {
        self.table(process, pde)
            .map_or(0, |t| t.get(pte).into_bits())
    }

    /// Set entry `pte` of the table referenced by directory entry `pde` to
    /// map frame `page` with `perm` (masked to the low 12 bits).
    ///
    /// The directory entry must be present and refer to a private table.
    pub fn set_ptbl_entry(&mut self, process: usize, pde: u16, pte: u16, page: u32, perm: u32) {
        if let Some(table) = self.private_table_mut(process, pde) {
            table.set(pte, PageEntryBits::from_parts(page, perm));
        }
    }

    /// Set entry `pte` of identity table `pde` to map its own address with `perm`.
    pub fn set_ptbl_entry_identity(&mut self, pde: u16, pte: u16, perm: u32) {
        self.identity.set_entry(pde, pte, perm);
    }

    /// Clear entry `pte` of the table referenced by directory entry `pde`.
    pub fn rmv_ptbl_entry(&mut self, process: usize, pde: u16, pte: u16) {
        if let Some(table) = self.private_table_mut(process, pde) {
            table.set(pte, PageEntryBits::new());
        }
    }

    /* ------------------------ virtual-address API ------------------------ */

    /// Raw directory entry covering `va`, or `0` if it is not present.
    #[must_use]
    pub fn get_pdir_entry_by_va(&self, process: usize, va: VirtualAddress) -> u32 {
        let e = self.directories.entry(process, va.directory_index());
        if e.present() { e.into_bits() } else { 0 }
    }

    /// Raw table entry mapping `va`, or `0` if either level is not present.
    #[must_use]
    pub fn get_ptbl_entry_by_va(&self, process: usize, va: VirtualAddress) -> u32 {
        let pde = va.directory_index();
        if !self.directories.entry(process, pde).present() {
            return 0;
        }
        let pte = self.get_ptbl_entry(process, pde, va.table_index());
        if PageEntryBits::from_bits(pte).present() { pte } else { 0 }
    }

    /// Point the directory entry covering `va` at the page table in frame `page`.
    pub fn set_pdir_entry_by_va(&mut self, process: usize, va: VirtualAddress, page: u32) {
        self.set_pdir_entry(process, va.directory_index(), page);
    }

    /// Map `va` to frame `page` with `perm` in an already installed page table.
    pub fn set_ptbl_entry_by_va(&mut self, process: usize, va: VirtualAddress, page: u32, perm: u32) {
        self.set_ptbl_entry(process, va.directory_index(), va.table_index(), page, perm);
    }

    /// Clear the directory entry covering `va`; no-op if it is not present.
    pub fn rmv_pdir_entry_by_va(&mut self, process: usize, va: VirtualAddress) {
        let pde = va.directory_index();
        if self.directories.entry(process, pde).present() {
            self.rmv_pdir_entry(process, pde);
        }
    }

    /// Clear the table entry mapping `va`; no-op if either level is not present.
    pub fn rmv_ptbl_entry_by_va(&mut self, process: usize, va: VirtualAddress) {
        if self.get_ptbl_entry_by_va(process, va) != 0 {
            self.rmv_ptbl_entry(process, va.directory_index(), va.table_index());
        }
    }

    /// Walk both levels and translate `va` to a physical address.
    #[must_use]
    pub fn translate(&self, process: usize, va: VirtualAddress) -> Option<PhysicalAddress> {
        let pte = PageEntryBits::from_bits(self.get_ptbl_entry_by_va(process, va));
        pte.present()
            .then(|| pte.physical_address() + va.page_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PERM_KERNEL, PTE_P, PTE_U, PTE_W, SparseFrames, decode_frame, decode_perm};
    use kernel_info::memory::{USER_HI, USER_LO};

    fn booted() -> AddressSpaces<SparseFrames> {
        let mut spaces = AddressSpaces::new(SparseFrames::new());
        spaces.init_identity_tables();
        spaces.init_page_directories();
        spaces
    }

    #[test]
    fn kernel_windows_point_at_identity_tables() {
        let spaces = booted();
        for process in [1, NUM_IDS - 1] {
            assert!(spaces.is_shared_table(process, 0));
            assert!(spaces.is_shared_table(process, 0x3FF));
            assert_eq!(spaces.get_pdir_entry(process, 0x100), 0);
            assert_eq!(spaces.get_pdir_entry(process, 0x3BF), 0);
            let e = spaces.get_pdir_entry(process, 0x3C0);
            assert_eq!(decode_perm(e), PTE_P | PTE_W | PTE_U);
            assert_eq!(decode_frame(e), spaces.identity_tables().table_frame(0x3C0));
        }
    }

    #[test]
    fn process_zero_sees_flat_memory() {
        let spaces = booted();
        for addr in [0u32, 0x0012_3456, USER_LO, USER_HI - 1, USER_HI, 0xFFFF_FFFF] {
            let va = VirtualAddress::new(addr);
            assert_eq!(spaces.translate(0, va), Some(PhysicalAddress::new(addr)));
        }
    }

    #[test]
    fn other_processes_have_no_user_mappings_after_boot() {
        let spaces = booted();
        let va = VirtualAddress::new(USER_LO + 0x5000);
        assert_eq!(spaces.get_pdir_entry_by_va(7, va), 0);
        assert_eq!(spaces.get_ptbl_entry_by_va(7, va), 0);
        assert_eq!(spaces.translate(7, va), None);
        assert_eq!(
            spaces.translate(7, VirtualAddress::new(0x1000)),
            Some(PhysicalAddress::new(0x1000))
        );
    }

    #[test]
    fn table_entry_round_trip() {
        let mut spaces = booted();
        spaces.set_pdir_entry(2, 0x100, 0x40000);
        spaces.set_ptbl_entry(2, 0x100, 5, 0x40123, PTE_P | PTE_W | PTE_U);
        assert_eq!(spaces.get_ptbl_entry(2, 0x100, 5), 0x4012_3007);

        let va = VirtualAddress::from_indices(0x100, 5);
        assert_eq!(spaces.get_ptbl_entry_by_va(2, va), 0x4012_3007);

        spaces.rmv_ptbl_entry_by_va(2, va);
        assert_eq!(spaces.get_ptbl_entry_by_va(2, va), 0);
    }

    #[test]
    fn va_wrappers_short_circuit_on_absent_directory() {
        let mut spaces = booted();
        let va = VirtualAddress::new(USER_LO);
        spaces.rmv_ptbl_entry_by_va(3, va);
        spaces.rmv_pdir_entry_by_va(3, va);
        assert_eq!(spaces.get_ptbl_entry_by_va(3, va), 0);
        assert!(spaces.frames().is_empty());
    }

    #[test]
    fn shared_identity_tables_reject_per_process_writes() {
        let mut spaces = booted();
        let va = VirtualAddress::new(0x0010_0000);
        let before = spaces.get_ptbl_entry_by_va(1, va);
        assert_eq!(decode_perm(before), PERM_KERNEL);

        spaces.set_ptbl_entry_by_va(1, va, 0x40000, PTE_P);
        spaces.rmv_ptbl_entry_by_va(1, va);
        assert_eq!(spaces.get_ptbl_entry_by_va(1, va), before);
        assert_eq!(spaces.get_ptbl_entry_by_va(2, va), before);
    }

    #[test]
    fn active_directory_loads_pool_slot() {
        struct Recorder(Option<Cr3>);
        impl TranslationRoot for Recorder {
            fn install(&mut self, root: Cr3) {
                self.0 = Some(root);
            }
        }

        let spaces = booted();
        let mut root = Recorder(None);
        spaces.set_active_directory(5, &mut root);
        let cr3 = root.0.expect("root installed");
        assert_eq!(cr3.directory_phys(), spaces.directory_base(5));
    }
}
