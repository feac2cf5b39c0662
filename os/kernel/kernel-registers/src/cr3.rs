#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3: Page-Directory Base Register (32-bit paging, PAE disabled).
///
/// Holds the physical base address of the active page directory and
/// cache-control flags for directory walks. The directory must be 4 KiB
/// aligned.
#[bitfield(u32)]
pub struct Cr3 {
    /// Bits 0–2: Ignored.
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3 (PWT): Page-level Write-Through for the page directory.
    pub pwt: bool,

    /// Bit 4 (PCD): Page-level Cache Disable for the page directory.
    pub pcd: bool,

    /// Bits 5–11: Ignored.
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–31: Page directory physical base >> 12.
    ///
    /// To get the full physical address:
    /// `pdir_base_phys = pdir_base_4k << 12`.
    #[bits(20)]
    pdir_base_4k: u32,
}

impl Cr3 {
    /// Create a `Cr3` value from a page directory physical base address.
    ///
    /// `pdir_phys` must be 4 KiB-aligned. Caching flags are left clear.
    #[must_use]
    pub fn from_directory_phys(pdir_phys: PhysicalAddress) -> Self {
        debug_assert!(
            pdir_phys.is_aligned_to(0x1000),
            "page directory base must be 4K-aligned"
        );
        Self::new().with_pdir_base_4k(pdir_phys.page_index())
    }

    /// Return the full physical address of the page directory base.
    #[must_use]
    pub fn directory_phys(&self) -> PhysicalAddress {
        PhysicalAddress::from_page_index(self.pdir_base_4k())
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
