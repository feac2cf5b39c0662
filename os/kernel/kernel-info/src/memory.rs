//! # Memory Layout

pub use kernel_memory_addresses::{ENTRIES_PER_TABLE, MAX_PAGE_INDICES, PAGE_SIZE};

/// Start of the user region; everything below is the low kernel region.
pub const USER_LO: u32 = 0x4000_0000;

/// End (exclusive) of the user region; everything above is the high kernel region.
pub const USER_HI: u32 = 0xF000_0000;

/// First page index of the user region.
pub const USER_LO_PAGE_INDEX: u32 = USER_LO / PAGE_SIZE;

/// Page index one past the end of the user region.
pub const USER_HI_PAGE_INDEX: u32 = USER_HI / PAGE_SIZE;

/// First page directory index whose 4 MiB window lies in the user region.
#[allow(clippy::cast_possible_truncation)]
pub const USER_LO_DIRECTORY_INDEX: u16 = (USER_LO >> 22) as u16;

/// First page directory index past the user region.
#[allow(clippy::cast_possible_truncation)]
pub const USER_HI_DIRECTORY_INDEX: u16 = (USER_HI >> 22) as u16;

/// Number of process slots (containers, page directories).
pub const NUM_IDS: usize = 64;

/// Maximum number of children per container.
pub const MAX_CHILDREN: usize = 8;

/// Physical base of the shared identity page-table bank (1024 tables, 4 MiB).
pub const IDENTITY_TABLES_BASE: u32 = 0x0040_0000;

/// Size of the identity page-table bank in bytes.
pub const IDENTITY_TABLES_SIZE: u32 = 1024 * PAGE_SIZE;

/// Physical base of the page directory pool (one 4 KiB directory per process).
pub const PAGE_DIRECTORY_POOL_BASE: u32 = 0x0080_0000;

/// Size of the page directory pool in bytes.
#[allow(clippy::cast_possible_truncation)]
pub const PAGE_DIRECTORY_POOL_SIZE: u32 = NUM_IDS as u32 * PAGE_SIZE;

/// Returned by frame allocation when no frame is available.
///
/// Page index `0` lies in the low kernel region and is never handed out.
pub const FRAME_ALLOC_FAILED: u32 = 0;

/// Returned by a container split when the tree has no slot for the child.
pub const CONTAINER_OVERFLOW: usize = NUM_IDS;

/// Returned by `map_page` when no page table could be obtained.
pub const MAP_FAILED: u32 = 0x0010_0001;

/// `true` if `addr` lies in `[USER_LO, USER_HI)`.
#[inline]
#[must_use]
pub const fn is_user_address(addr: u32) -> bool {
    addr >= USER_LO && addr < USER_HI
}

/// `true` if `page` lies in `[USER_LO_PAGE_INDEX, USER_HI_PAGE_INDEX)`.
#[inline]
#[must_use]
pub const fn is_user_page_index(page: u32) -> bool {
    page >= USER_LO_PAGE_INDEX && page < USER_HI_PAGE_INDEX
}

/// `true` if the 4 MiB window of directory index `pde` lies in a kernel region.
#[inline]
#[must_use]
pub const fn is_kernel_directory_index(pde: u16) -> bool {
    pde < USER_LO_DIRECTORY_INDEX || pde >= USER_HI_DIRECTORY_INDEX
}

const _: () = {
    assert!(USER_LO.is_multiple_of(4 * 1024 * 1024));
    assert!(USER_HI.is_multiple_of(4 * 1024 * 1024));
    assert!(USER_LO < USER_HI);
    assert!(!is_user_page_index(FRAME_ALLOC_FAILED));
    assert!(MAP_FAILED as usize >= MAX_PAGE_INDICES);
    assert!(IDENTITY_TABLES_BASE.is_multiple_of(PAGE_SIZE));
    assert!(PAGE_DIRECTORY_POOL_BASE.is_multiple_of(PAGE_SIZE));
    assert!(IDENTITY_TABLES_BASE + IDENTITY_TABLES_SIZE <= PAGE_DIRECTORY_POOL_BASE);
    assert!(PAGE_DIRECTORY_POOL_BASE + PAGE_DIRECTORY_POOL_SIZE <= USER_LO);
    assert!(MAX_CHILDREN >= 1 && NUM_IDS > MAX_CHILDREN);
};
