//! # Page Directory Pool
//!
//! One statically placed page directory per process slot. Directory `i` lives
//! at `PAGE_DIRECTORY_POOL_BASE + i * 4 KiB`, which is the value loaded into
//! CR3 when process `i` becomes active.

use crate::{PageDirectory, PageEntryBits};
use alloc::boxed::Box;
use alloc::vec;
use kernel_info::memory::{NUM_IDS, PAGE_DIRECTORY_POOL_BASE, PAGE_SIZE};
use kernel_memory_addresses::PhysicalAddress;

/// Page directories for all `NUM_IDS` process slots.
pub struct DirectoryPool {
    directories: Box<[PageDirectory]>,
    base: PhysicalAddress,
}

impl DirectoryPool {
    /// Allocate zeroed directories placed at [`PAGE_DIRECTORY_POOL_BASE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            directories: vec![PageDirectory::zeroed(); NUM_IDS].into_boxed_slice(),
            base: PhysicalAddress::new(PAGE_DIRECTORY_POOL_BASE),
        }
    }

    /// Read entry `pde` of process `process`'s directory.
    ///
    /// ### Panics
    /// If `process >= NUM_IDS` or `pde >= 1024`.
    #[inline]
    #[must_use]
    pub fn entry(&self, process: usize, pde: u16) -> PageEntryBits {
        self.directories[process].get(pde)
    }

    /// Write entry `pde` of process `process`'s directory.
    #[inline]
    pub fn set_entry(&mut self, process: usize, pde: u16, e: PageEntryBits) {
        self.directories[process].set(pde, e);
    }

    /// Borrow the whole directory of `process`.
    #[must_use]
    pub fn directory(&self, process: usize) -> &PageDirectory {
        &self.directories[process]
    }

    /// Physical base of `process`'s directory.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn directory_phys(&self, process: usize) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u32() + process as u32 * PAGE_SIZE)
    }
}

impl Default for DirectoryPool {
    fn default() -> Self {
        Self::new()
    }
}
