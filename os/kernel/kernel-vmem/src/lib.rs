//! # Virtual Memory Support
//!
//! Two-level 32-bit x86 paging (no PAE) for a small layered kernel.
//!
//! ## What you get
//! - Raw entry encoding ([`encode_entry`], [`decode_frame`], [`decode_perm`])
//!   and a typed bitfield view ([`PageEntryBits`]).
//! - A 4 KiB-aligned [`PageTable`] used for both directories and tables.
//! - The shared [`IdentityTables`] bank and the per-process [`DirectoryPool`].
//! - [`AddressSpaces`]: entry accessors, boot initializers and the mapping
//!   façade (`map_page`, `unmap_page`, `alloc_page_table`, `free_page_table`).
//! - Seams to the rest of the kernel: [`FrameAlloc`] (frames for page tables),
//!   [`FrameStore`] (where table frames live) and [`TranslationRoot`] (CR3).
//!
//! ## 32-bit Virtual Address → Physical Address Walk
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |  PD   |  PT   | Offset |
//! ```
//!
//! CR3 holds the physical base of the page directory. The directory index
//! selects a PDE, which points at a page table; the table index selects a PTE,
//! which holds the frame of the 4 KiB page. The offset selects the byte.
//!
//! ```text
//!  CR3 → PD[pde] → PT[pte] → frame << 12 | offset
//! ```
//!
//! Each directory covers the whole 4 GiB space with 1024 windows of 4 MiB.
//! Windows in the kernel regions point at the shared identity tables, so the
//! kernel sees physical memory at its own address in every process.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod frame_store;
mod identity;
mod page_directory;
mod page_entry_bits;
mod page_table;

extern crate alloc;

pub use crate::address_space::{AddressSpaces, MapError};
pub use crate::frame_store::{FrameStore, SparseFrames};
pub use crate::identity::IdentityTables;
pub use crate::page_directory::DirectoryPool;
pub use crate::page_entry_bits::*;
pub use crate::page_table::{PageDirectory, PageTable};
pub use kernel_registers::cr3::Cr3;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Source of **physical** 4 KiB frames for page tables.
///
/// Frames are charged to an owner (a process / container id). Implementations
/// return user-region page indices only.
pub trait FrameAlloc {
    /// Allocate one frame on behalf of `owner`. Returns `None` when exhausted.
    fn alloc_frame(&mut self, owner: usize) -> Option<u32>;

    /// Return frame `page` to `owner`.
    ///
    /// The caller guarantees that `owner` allocated `page`.
    fn free_frame(&mut self, owner: usize, page: u32);
}

/// Installs a page directory as the active translation root.
pub trait TranslationRoot {
    fn install(&mut self, root: Cr3);
}

/// Writes CR3 directly.
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub struct HardwareRoot {
    _private: (),
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl HardwareRoot {
    /// # Safety
    /// Must run in ring 0, and every directory installed through the returned
    /// value must map the currently executing code and stack.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl TranslationRoot for HardwareRoot {
    fn install(&mut self, root: Cr3) {
        use kernel_registers::StoreRegisterUnsafe;

        // SAFETY: upheld by the contract of `HardwareRoot::new`.
        unsafe { root.store_unsafe() }
    }
}
