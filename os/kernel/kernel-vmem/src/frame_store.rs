//! # Page-Table Frame Storage
//!
//! Page tables allocated at run time live in ordinary physical frames taken
//! from the user region. [`FrameStore`] turns a frame index into a typed
//! [`PageTable`] so the accessors never cast addresses to pointers.

use crate::PageTable;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;

/// Resolves physical frames holding dynamically allocated page tables.
pub trait FrameStore {
    /// Borrow the table stored in frame `page`.
    ///
    /// Returns `None` if the frame has never been written, which callers
    /// treat as a table of absent entries.
    fn table(&self, page: u32) -> Option<&PageTable>;

    /// Mutably borrow the table stored in frame `page`, materializing it if needed.
    fn table_mut(&mut self, page: u32) -> &mut PageTable;
}

/// Heap-backed [`FrameStore`] that only keeps frames that were written.
///
/// Each frame is a boxed, 4 KiB-aligned [`PageTable`].
#[derive(Default)]
pub struct SparseFrames {
    frames: BTreeMap<u32, Box<PageTable>>,
}

impl SparseFrames {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }

    /// Number of frames that have been materialized.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `true` if frame `page` has been materialized.
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.frames.contains_key(&page)
    }
}

impl FrameStore for SparseFrames {
    fn table(&self, page: u32) -> Option<&PageTable> {
        self.frames.get(&page).map(AsRef::as_ref)
    }

    fn table_mut(&mut self, page: u32) -> &mut PageTable {
        self.frames
            .entry(page)
            .or_insert_with(|| Box::new(PageTable::zeroed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PTE_P, PageEntryBits};

    #[test]
    fn frames_materialize_on_write() {
        let mut store = SparseFrames::new();
        assert!(store.table(0x40000).is_none());

        store
            .table_mut(0x40000)
            .set(7, PageEntryBits::from_parts(0x40001, PTE_P));
        assert!(store.contains(0x40000));
        assert_eq!(store.len(), 1);
        assert_eq!(store.table(0x40000).map(|t| t.get(7).frame()), Some(0x40001));
    }
}
