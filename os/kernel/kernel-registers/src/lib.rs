//! # Typed `x86` Control Registers

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr3")]
pub mod cr3;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}
