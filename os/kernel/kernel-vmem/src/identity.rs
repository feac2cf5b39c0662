//! # Identity Page-Table Bank
//!
//! 1024 statically placed page tables that together identity-map the entire
//! 32-bit address space. Every page directory points its kernel-region
//! entries at these tables, so the kernel is visible at the same addresses in
//! every process.
//!
//! The bank is built once by [`IdentityTables::init`] and read-only afterwards.

use crate::{PERM_KERNEL, PERM_USER_IDENTITY, PageEntryBits, PageTable};
use alloc::boxed::Box;
use alloc::vec;
use kernel_info::memory::{ENTRIES_PER_TABLE, IDENTITY_TABLES_BASE, is_user_address};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The shared identity page-table bank.
pub struct IdentityTables {
    tables: Box<[PageTable]>,
    base: PhysicalAddress,
}

impl IdentityTables {
    /// Allocate a zeroed bank placed at [`IDENTITY_TABLES_BASE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(PhysicalAddress::new(IDENTITY_TABLES_BASE))
    }

    /// Allocate a zeroed bank placed at `base` (4 KiB-aligned).
    #[must_use]
    pub fn with_base(base: PhysicalAddress) -> Self {
        debug_assert!(base.is_aligned_to(0x1000));
        Self {
            tables: vec![PageTable::zeroed(); ENTRIES_PER_TABLE].into_boxed_slice(),
            base,
        }
    }

    /// Write the identity mapping for every page of the 32-bit space.
    ///
    /// Pages outside `[USER_LO, USER_HI)` get [`PERM_KERNEL`] (present,
    /// writable, global); pages inside get [`PERM_USER_IDENTITY`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn init(&mut self) {
        for pde in 0..ENTRIES_PER_TABLE as u16 {
            for pte in 0..ENTRIES_PER_TABLE as u16 {
                let addr = VirtualAddress::from_indices(pde, pte).as_u32();
                let perm = if is_user_address(addr) {
                    PERM_USER_IDENTITY
                } else {
                    PERM_KERNEL
                };
                self.set_entry(pde, pte, perm);
            }
        }
        log::debug!(
            "identity bank initialized at {} ({} tables)",
            self.base,
            ENTRIES_PER_TABLE
        );
    }

    /// Set entry `pte` of identity table `pde` to map its own address with `perm`.
    ///
    /// The frame written is `(pde << 10) | pte`, i.e. physical equals virtual.
    pub fn set_entry(&mut self, pde: u16, pte: u16, perm: u32) {
        let frame = VirtualAddress::from_indices(pde, pte).page_index();
        self.tables[pde as usize].set(pte, PageEntryBits::from_parts(frame, perm));
    }

    /// Read entry `pte` of identity table `pde`.
    #[must_use]
    pub fn entry(&self, pde: u16, pte: u16) -> PageEntryBits {
        self.tables[pde as usize].get(pte)
    }

    /// Borrow identity table `pde`.
    #[must_use]
    pub fn table(&self, pde: u16) -> &PageTable {
        &self.tables[pde as usize]
    }

    /// Physical base of the bank.
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// Frame index of identity table `pde`.
    #[must_use]
    pub const fn table_frame(&self, pde: u16) -> u32 {
        self.base.page_index() + pde as u32
    }

    /// If `frame` holds one of the bank's tables, return that table's index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table_index_of(&self, frame: u32) -> Option<u16> {
        let first = self.base.page_index();
        if frame >= first && frame < first + ENTRIES_PER_TABLE as u32 {
            Some((frame - first) as u16)
        } else {
            None
        }
    }
}

impl Default for IdentityTables {
    fn default() -> Self {
        Self::new()
    }
}
