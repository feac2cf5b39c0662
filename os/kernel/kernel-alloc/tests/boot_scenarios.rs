use kernel_alloc::{FramePermission, MemoryManager};
use kernel_info::boot::MemoryMapEntry;
use kernel_info::memory::{
    CONTAINER_OVERFLOW, FRAME_ALLOC_FAILED, MAX_CHILDREN, USER_HI, USER_LO, USER_LO_PAGE_INDEX,
};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{PTE_P, PTE_U, PTE_W, decode_frame, decode_perm};

/// A typical PC map: low RAM, the BIOS hole, then RAM running into the user region.
fn pc_map() -> [MemoryMapEntry; 4] {
    [
        MemoryMapEntry::available(0, 0x9_FC00),
        MemoryMapEntry::reserved(0x9_FC00, 0x6_0400),
        MemoryMapEntry::available(0x10_0000, u64::from(USER_LO) - 0x10_0000 + 0x40_0000),
        MemoryMapEntry::reserved(0xFFFC_0000, 0x4_0000),
    ]
}

#[test]
fn four_mib_of_user_ram_yields_1024_frames() {
    let base = u64::from(USER_LO) + 0x10_0000;
    let map = [MemoryMapEntry::available(base, 0x40_0000)];
    let mm = MemoryManager::boot(&map);
    let fat = mm.containers().frame_table();

    let first = USER_LO_PAGE_INDEX + 0x100;
    assert_eq!(fat.free_normal_count(), 1024);
    assert_eq!(fat.frame_count(), first + 1024);
    assert!(fat.is_normal(first));
    assert!(fat.is_normal(first + 1023));
    assert_eq!(fat.permission(first - 1), FramePermission::Unusable);
    assert_eq!(fat.permission(first + 1024), FramePermission::Unusable);
    assert_eq!(fat.permission(0x100), FramePermission::Reserved);
    assert_eq!(mm.get_quota(0), 1024);
}

#[test]
fn low_memory_is_never_allocable() {
    // [1 MiB, 5 MiB) lies below USER_LO (1 GiB), inside the kernel region.
    let map = [MemoryMapEntry::available(0x10_0000, 0x40_0000)];
    let mut mm = MemoryManager::boot(&map);
    assert_eq!(mm.containers().frame_table().frame_count(), 0x500);
    assert_eq!(mm.get_quota(0), 0);
    assert_eq!(mm.alloc(0), FRAME_ALLOC_FAILED);
}

#[test]
fn pc_map_only_exposes_the_user_part() {
    let mm = MemoryManager::boot(&pc_map());
    let fat = mm.containers().frame_table();
    assert_eq!(fat.frame_count(), 0x10_0000);
    assert_eq!(fat.free_normal_count(), 1024);
    assert_eq!(fat.permission(0xFFFFF), FramePermission::Reserved);
}

#[test]
fn split_scenario() {
    let mut mm = MemoryManager::boot(&pc_map());
    assert!(mm.can_consume(0, 10));
    assert_eq!(mm.split(0, 10), 1);
    assert_eq!(mm.split(0, 10), 2);
    assert_eq!(mm.get_child_count(0), 2);
    assert_eq!(mm.get_usage(0), 20);
    assert_eq!(mm.get_quota(2), 10);
    assert_eq!(mm.get_usage(2), 0);
    assert_eq!(mm.get_parent(2), 0);
}

#[test]
fn split_stops_at_max_children() {
    let mut mm = MemoryManager::boot(&pc_map());
    let children: Vec<_> = (0..MAX_CHILDREN).map(|_| mm.split(0, 1)).collect();
    assert_eq!(children, (1..=MAX_CHILDREN).collect::<Vec<_>>());
    assert_eq!(mm.split(0, 1), CONTAINER_OVERFLOW);
}

#[test]
fn exhaustion_is_sticky_until_a_free() {
    let map = [MemoryMapEntry::available(u64::from(USER_LO), 3 * 0x1000)];
    let mut mm = MemoryManager::boot(&map);

    let pages: Vec<_> = (0..3).map(|_| mm.alloc(0)).collect();
    assert!(pages.iter().all(|&p| p != FRAME_ALLOC_FAILED));
    assert_eq!(mm.alloc(0), FRAME_ALLOC_FAILED);
    assert_eq!(mm.alloc(0), FRAME_ALLOC_FAILED);
    assert_eq!(mm.get_usage(0), 3);

    mm.free(0, pages[1]);
    assert_eq!(mm.alloc(0), pages[1]);
}

#[test]
fn map_unmap_round_trip() {
    let mut mm = MemoryManager::boot(&pc_map());
    let pid = mm.split(0, 8);
    let page = mm.alloc(pid);
    let va = VirtualAddress::new(0x8000_1000);
    let perm = PTE_P | PTE_W | PTE_U;

    let table = mm.map_page(pid, va, page, perm);
    assert_eq!(decode_frame(mm.address_spaces().get_pdir_entry_by_va(pid, va)), table);

    let e = mm.address_spaces().get_ptbl_entry_by_va(pid, va);
    assert_eq!(decode_frame(e), page);
    assert_eq!(decode_perm(e), perm);
    assert_eq!(
        mm.address_spaces().translate(pid, va + 0x123),
        Some(PhysicalAddress::from_page_index(page) + 0x123)
    );

    assert_eq!(mm.unmap_page(pid, va), 0);
    assert_eq!(mm.address_spaces().get_ptbl_entry_by_va(pid, va), 0);
    assert_eq!(mm.unmap_page(pid, va), 0);
}

#[test]
fn process_zero_is_identity_mapped_outside_user_region() {
    let mm = MemoryManager::boot(&pc_map());
    let spaces = mm.address_spaces();
    let mut addr = 0u32;
    loop {
        if addr < USER_LO || addr >= USER_HI {
            let va = VirtualAddress::new(addr | 0x7FF);
            assert_eq!(spaces.translate(0, va), Some(PhysicalAddress::new(addr | 0x7FF)));
        }
        match addr.checked_add(0x0003_3000) {
            Some(next) => addr = next,
            None => break,
        }
    }
}

#[test]
fn set_active_directory_installs_the_pool_slot() {
    struct Capture(u32);
    impl kernel_vmem::TranslationRoot for Capture {
        fn install(&mut self, root: kernel_vmem::Cr3) {
            self.0 = root.into_bits();
        }
    }

    let mm = MemoryManager::boot(&pc_map());
    let mut root = Capture(0);
    mm.set_active_directory(3, &mut root);
    assert_eq!(root.0, mm.address_spaces().directory_base(3).as_u32());
}

#[test]
fn entries_written_by_hand_translate() {
    let map = [MemoryMapEntry::available(u64::from(USER_LO), 0x10_0000)];
    let mut mm = MemoryManager::boot(&map);
    let child = mm.split(0, 4);
    let table = mm.alloc(child);
    let page = mm.alloc(child);
    let va = VirtualAddress::new(USER_LO + 0x0080_0123);

    let spaces = mm.address_spaces_mut();
    spaces.set_pdir_entry_by_va(child, va, table);
    spaces.set_ptbl_entry_by_va(child, va, page, PTE_P | PTE_W | PTE_U);
    assert_eq!(
        spaces.translate(child, va),
        Some(PhysicalAddress::new((page << 12) | 0x123))
    );

    spaces.rmv_ptbl_entry_by_va(child, va);
    assert_eq!(spaces.translate(child, va), None);
    assert_eq!(mm.address_spaces().get_pdir_entry_by_va(child, va) >> 12, table);
}
