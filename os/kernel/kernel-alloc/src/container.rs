//! # Quota Container Tree
//!
//! Every process slot owns a container recording how many frames it may use
//! (`quota`) and how many it currently holds (`usage`). The root container
//! (id `0`) starts with every allocable frame; children are carved out of their
//! parent by [`ContainerTree::split`], which charges the child's quota to the
//! parent's usage.
//!
//! ## Layout
//!
//! The tree is stored in a fixed array of `NUM_IDS` slots. The `k`-th child of
//! container `id` lives at `id * MAX_CHILDREN + 1 + k`:
//!
//! ```text
//! 0 ─┬─ 1 ─┬─ 9
//!    │     ├─ 10
//!    │     └─ …
//!    ├─ 2 ─── 17 …
//!    └─ …
//! ```
//!
//! ## Contracts
//!
//! The unchecked operations (`split`, `alloc`, `free`) do not enforce quotas
//! or ownership. Callers check [`can_consume`](ContainerTree::can_consume)
//! first and only free frames the container allocated. The `try_*` variants
//! perform the checks and report violations as [`ContainerError`].

use crate::frame_alloc::FrameAllocator;
use crate::frame_table::FrameTable;
use kernel_info::boot::MemoryMap;
use kernel_info::memory::{CONTAINER_OVERFLOW, FRAME_ALLOC_FAILED, MAX_CHILDREN, NUM_IDS};
use kernel_vmem::FrameAlloc;

/// Accounting record of one process slot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Container {
    pub quota: u32,
    pub usage: u32,
    pub parent: usize,
    pub nchildren: usize,
    pub used: bool,
}

/// All containers plus the frame allocator they draw from.
pub struct ContainerTree {
    containers: [Container; NUM_IDS],
    frames: FrameAllocator,
}

impl ContainerTree {
    /// A tree with no used containers over `table`.
    ///
    /// Call [`init_root_container`](Self::init_root_container) before
    /// allocating.
    #[must_use]
    pub fn new(table: FrameTable) -> Self {
        Self {
            containers: [Container::default(); NUM_IDS],
            frames: FrameAllocator::new(table),
        }
    }

    /// Rebuild the frame table from `map`.
    ///
    /// Container records are left as they are; boot calls this before
    /// creating the root container.
    pub fn init_memory<M: MemoryMap + ?Sized>(&mut self, map: &M) {
        self.frames.init_memory(map);
    }

    /// Create the root container with every free normal frame as its quota.
    pub fn init_root_container(&mut self) {
        let quota = self.frames.table().free_normal_count();
        self.init_root(quota);
    }

    /// Create the root container (id `0`) with `quota` frames.
    pub fn init_root(&mut self, quota: u32) {
        self.containers[0] = Container {
            quota,
            usage: 0,
            parent: 0,
            nchildren: 0,
            used: true,
        };
        log::info!("root container quota: {quota} frames");
    }

    #[must_use]
    pub const fn frame_table(&self) -> &FrameTable {
        self.frames.table()
    }

    /// The full record of container `id`.
    #[must_use]
    pub const fn container(&self, id: usize) -> &Container {
        &self.containers[id]
    }

    #[must_use]
    pub const fn get_quota(&self, id: usize) -> u32 {
        self.containers[id].quota
    }

    #[must_use]
    pub const fn get_usage(&self, id: usize) -> u32 {
        self.containers[id].usage
    }

    #[must_use]
    pub const fn get_parent(&self, id: usize) -> usize {
        self.containers[id].parent
    }

    #[must_use]
    pub const fn get_child_count(&self, id: usize) -> usize {
        self.containers[id].nchildren
    }

    #[must_use]
    pub const fn is_used(&self, id: usize) -> bool {
        self.containers[id].used
    }

    /// `true` if container `id` has at least `n` frames of quota left.
    #[must_use]
    pub const fn can_consume(&self, id: usize, n: u32) -> bool {
        let c = &self.containers[id];
        c.quota.saturating_sub(c.usage) >= n
    }

    /// Create the next child of `id` with `quota` frames carved out of `id`.
    ///
    /// Returns the child's id, or [`CONTAINER_OVERFLOW`] if the child's slot
    /// would lie outside the table or `id` already has `MAX_CHILDREN` children.
    ///
    /// The parent's remaining quota is **not** checked; callers must ensure
    /// `can_consume(id, quota)`.
    pub fn split(&mut self, id: usize, quota: u32) -> usize {
        let nchildren = self.containers[id].nchildren;
        let child = id * MAX_CHILDREN + 1 + nchildren;
        if nchildren >= MAX_CHILDREN || child >= NUM_IDS {
            log::debug!("container {id}: no slot for another child");
            return CONTAINER_OVERFLOW;
        }

        let parent = &mut self.containers[id];
        parent.nchildren += 1;
        parent.usage = parent.usage.saturating_add(quota);

        self.containers[child] = Container {
            quota,
            usage: 0,
            parent: id,
            nchildren: 0,
            used: true,
        };
        log::debug!("container {id}: split child {child} with quota {quota}");
        child
    }

    /// Checked variant of [`split`](Self::split).
    ///
    /// # Errors
    /// - [`ContainerError::QuotaExceeded`] if `id` cannot spare `quota` frames.
    /// - [`ContainerError::CapacityOverflow`] if `id` has no free child slot.
    pub fn try_split(&mut self, id: usize, quota: u32) -> Result<usize, ContainerError> {
        if !self.can_consume(id, quota) {
            return Err(ContainerError::QuotaExceeded);
        }
        match self.split(id, quota) {
            CONTAINER_OVERFLOW => Err(ContainerError::CapacityOverflow),
            child => Ok(child),
        }
    }

    /// Allocate one frame on behalf of container `id`.
    ///
    /// Returns the page index, or [`FRAME_ALLOC_FAILED`] if no frame is free.
    /// Usage grows only on success. The quota is **not** checked; callers must
    /// ensure `can_consume(id, 1)`.
    pub fn alloc(&mut self, id: usize) -> u32 {
        let page = self.frames.alloc_frame();
        if page != FRAME_ALLOC_FAILED {
            let c = &mut self.containers[id];
            c.usage = c.usage.saturating_add(1);
        }
        page
    }

    /// Checked variant of [`alloc`](Self::alloc).
    ///
    /// # Errors
    /// - [`ContainerError::QuotaExceeded`] if `id` has no quota left.
    /// - [`ContainerError::Exhausted`] if no physical frame is free.
    pub fn try_alloc(&mut self, id: usize) -> Result<u32, ContainerError> {
        if !self.can_consume(id, 1) {
            return Err(ContainerError::QuotaExceeded);
        }
        match self.alloc(id) {
            FRAME_ALLOC_FAILED => Err(ContainerError::Exhausted),
            page => Ok(page),
        }
    }

    /// Free frame `page` and release one unit of `id`'s usage.
    ///
    /// The caller guarantees that `id` allocated `page`; this is not checked.
    pub fn free(&mut self, id: usize, page: u32) {
        self.frames.free_frame(page);
        let c = &mut self.containers[id];
        c.usage = c.usage.saturating_sub(1);
    }
}

impl FrameAlloc for ContainerTree {
    fn alloc_frame(&mut self, owner: usize) -> Option<u32> {
        match self.alloc(owner) {
            FRAME_ALLOC_FAILED => None,
            page => Some(page),
        }
    }

    fn free_frame(&mut self, owner: usize, page: u32) {
        self.free(owner, page);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("no free physical frame")]
    Exhausted,
    #[error("container quota exceeded")]
    QuotaExceeded,
    #[error("container tree has no free slot")]
    CapacityOverflow,
}
