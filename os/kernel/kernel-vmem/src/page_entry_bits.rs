use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// **Present** (bit 0).
pub const PTE_P: u32 = 1 << 0;

/// **Writable** (bit 1).
pub const PTE_W: u32 = 1 << 1;

/// **User** (bit 2).
pub const PTE_U: u32 = 1 << 2;

/// **Global** (bit 8).
pub const PTE_G: u32 = 1 << 8;

/// Mask of the permission bits (low 12 bits) of an entry.
pub const PERM_MASK: u32 = 0xFFF;

/// Mask of the frame bits (high 20 bits) of an entry.
pub const FRAME_MASK: u32 = !PERM_MASK;

/// Directory entries pointing at a page table: present, writable, user.
pub const PERM_TABLE: u32 = PTE_P | PTE_W | PTE_U;

/// Identity entries in the kernel regions: present, writable, global.
pub const PERM_KERNEL: u32 = PTE_P | PTE_W | PTE_G;

/// Identity entries in the user region: present, writable.
pub const PERM_USER_IDENTITY: u32 = PTE_P | PTE_W;

/// Encode a frame index and permission bits into a raw entry.
///
/// Permission bits above bit 11 are discarded.
///
/// ```rust
/// # use kernel_vmem::{encode_entry, PTE_P, PTE_W};
/// assert_eq!(encode_entry(0x40001, PTE_P | PTE_W), 0x4000_1003);
/// ```
#[inline]
#[must_use]
pub const fn encode_entry(frame: u32, perm: u32) -> u32 {
    (frame << 12) | (perm & PERM_MASK)
}

/// Frame index stored in a raw entry.
#[inline]
#[must_use]
pub const fn decode_frame(entry: u32) -> u32 {
    entry >> 12
}

/// Permission bits stored in a raw entry.
#[inline]
#[must_use]
pub const fn decode_perm(entry: u32) -> u32 {
    entry & PERM_MASK
}

/// A single 32-bit page directory or page table entry in bitfield form.
///
/// Directory entries (PDEs) and table entries (PTEs) share the layout; bit 7
/// is the page-size flag in a PDE and the PAT selector in a PTE. Huge pages
/// are not used, so it is always clear in entries written by this crate.
///
/// ### Bit layout
///
/// | Bits  | Name            | Meaning |
/// |-------|-----------------|---------|
/// | 0     | `P`             | Valid entry if set |
/// | 1     | `RW`            | Writable if set |
/// | 2     | `US`            | User-mode accessible if set |
/// | 3     | `PWT`           | Write-through caching |
/// | 4     | `PCD`           | Disable caching |
/// | 5     | `A`             | Accessed |
/// | 6     | `D`             | Dirty (PTE only) |
/// | 7     | `PS` / `PAT`    | Page size (PDE) / PAT (PTE) |
/// | 8     | `G`             | Global (PTE only) |
/// | 9–11  | OS available    | Ignored by hardware |
/// | 12–31 | `frame`         | Physical frame index |
///
/// ```rust
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::from_bits(0x4000_1007);
/// assert!(e.present() && e.writable() && e.user_access());
/// assert_eq!(e.frame(), 0x40001);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on first write through a PTE.
    pub dirty: bool,

    /// Page Size (PS, bit 7) in a PDE; PAT in a PTE.
    pub large_page: bool,

    /// Global (G, bit 8). Survives CR3 reloads when CR4.PGE is set.
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame index (bits 12..=31).
    #[bits(20)]
    pub frame: u32,
}

impl PageEntryBits {
    /// Build an entry from a frame index and raw permission bits.
    #[inline]
    #[must_use]
    pub const fn from_parts(frame: u32, perm: u32) -> Self {
        Self::from_bits(encode_entry(frame, perm))
    }

    /// Raw permission bits (low 12 bits).
    #[inline]
    #[must_use]
    pub const fn perm(self) -> u32 {
        decode_perm(self.into_bits())
    }

    /// Base address of the referenced frame.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::from_page_index(self.frame())
    }
}
