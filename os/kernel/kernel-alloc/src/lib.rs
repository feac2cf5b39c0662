//! # Kernel Physical Memory Management
//!
//! This crate owns the physical side of the kernel's memory: which frames
//! exist, which are free, and how they are divided among processes. Together
//! with `kernel-vmem` it forms the memory core that higher layers (process
//! creation, system calls) build on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 MemoryManager                       │
//! │    • Boot sequence                                  │
//! │    • map_page / unmap_page (via kernel-vmem)        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Quota Container Tree                   │
//! │    • Per-process quota and usage                    │
//! │    • split / alloc / free                           │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │               Frame Allocator                       │
//! │    • Circular first-fit over the user region        │
//! │    • Memoized scan cursor                           │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │            Frame Allocation Table                   │
//! │    • One byte per 4 KiB frame                       │
//! │    • Built from the boot memory map                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Boot Order
//!
//! [`MemoryManager::boot`] runs, in order:
//!
//! 1. `init_memory`: classify every frame from the memory map.
//! 2. `init_root_container`: give container `0` every free frame.
//! 3. `init_identity_tables`: build the shared identity page tables.
//! 4. `init_page_directories`: point every directory's kernel windows at them.
//!
//! ## Error Signaling
//!
//! The primary interface returns sentinel values, as listed in
//! [`kernel_info::memory`]: `FRAME_ALLOC_FAILED` (`0`) when no frame is free,
//! `CONTAINER_OVERFLOW` when the container tree is full and `MAP_FAILED` when
//! `map_page` cannot obtain a page table. Checked `try_*` variants return
//! [`ContainerError`] and [`MapError`](kernel_vmem::MapError) instead.
//!
//! ## Concurrency
//!
//! None. The manager is a plain value; callers serialize access.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod container;
pub mod frame_alloc;
pub mod frame_table;
mod manager;

pub use crate::container::{Container, ContainerError, ContainerTree};
pub use crate::frame_table::{FrameEntry, FramePermission, FrameTable};
pub use crate::manager::MemoryManager;
