//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the memory layout constants and the boot interface
//! contract that govern the kernel's memory core. It is the single source of
//! truth for values that must agree between the frame allocator, the quota
//! containers and the page-table code.
//!
//! ## Modules
//!
//! ### Boot Information ([`boot`])
//! The hardware memory map handed over by the bootloader:
//! * **[`MemoryMap`](boot::MemoryMap)**: range count, start, length and usability
//! * **[`MemoryMapEntry`](boot::MemoryMapEntry)**: `#[repr(C)]` multiboot2-compatible entry
//!
//! ### Memory Layout ([`memory`])
//! The 32-bit address space split and process limits:
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │      Low Kernel Region          │
//!             │  (identity mapped, reserved)    │
//! USER_LO     ├─────────────────────────────────┤ 0x4000_0000
//!             │                                 │
//!             │         User Region             │
//!             │  (frames handed to containers)  │
//!             │                                 │
//! USER_HI     ├─────────────────────────────────┤ 0xF000_0000
//!             │      High Kernel Region         │
//!             │  (identity mapped, MMIO)        │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! Physical frames and virtual pages share the same split: a frame is only
//! ever allocable if its page index lies inside the user region.
//!
//! ## Compile-Time Checks
//! All layout constants are `const` values; a `const` block asserts that the
//! regions are 4 MiB aligned, that the identity table bank and the page
//! directory pool fit below [`USER_LO`](memory::USER_LO), and that the
//! failure sentinels can never collide with valid values.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
