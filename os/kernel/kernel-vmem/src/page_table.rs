//! # Page Tables and Page Directories
//!
//! On 32-bit x86 without PAE both levels of the translation tree have the same
//! shape: 1024 four-byte entries in a 4 KiB-aligned frame. [`PageTable`] models
//! that frame as an indexed array of [`PageEntryBits`]; it is used for page
//! directories as well as for the page tables they point to.
//!
//! An entry is addressed as `table_base | (index << 2)` by the hardware; here
//! the index is used directly.

use crate::PageEntryBits;
use kernel_memory_addresses::ENTRIES_PER_TABLE;

/// A 4 KiB-aligned array of 1024 entries.
#[doc(alias = "PT")]
#[doc(alias = "PD")]
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageTable {
    entries: [PageEntryBits; ENTRIES_PER_TABLE],
}

/// A page directory has the same layout as a page table.
pub type PageDirectory = PageTable;

impl PageTable {
    /// Create a fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntryBits::new(); ENTRIES_PER_TABLE],
        }
    }

    /// Clear every entry.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageEntryBits::new());
    }

    /// Read the entry at `i`.
    ///
    /// ### Panics
    /// If `i >= 1024`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: u16) -> PageEntryBits {
        self.entries[i as usize]
    }

    /// Write the entry at `i`.
    ///
    /// Caller must handle any required TLB invalidation when changing active mappings.
    #[inline]
    pub const fn set(&mut self, i: u16, e: PageEntryBits) {
        self.entries[i as usize] = e;
    }

    /// `true` if no entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| !e.present())
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::zeroed()
    }
}

const _: () = {
    assert!(size_of::<PageTable>() == 4096);
    assert!(align_of::<PageTable>() == 4096);
};
