//! Boot Services Context
//!
//! The firmware boot-services surface the loader consumes, expressed as
//! a trait so every component takes an explicit services context
//! instead of reaching for a global table. The UEFI implementation is
//! [`crate::firmware::UefiServices`]; tests substitute a double.

use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::error::BootResult;
use crate::gop::GraphicsMode;
use crate::memory_map::{MapKey, MapMeta};

/// Firmware boot services consumed by the loader.
pub trait BootServices {
    /// Fill `buf` with the current memory descriptor table and return
    /// its metadata. Each successful call yields a fresh map key; any
    /// allocation made afterwards invalidates that key.
    ///
    /// Fails with `BufferTooSmall` if `buf` is empty or cannot hold the
    /// full table.
    fn memory_map(&mut self, buf: &mut [u8]) -> BootResult<MapMeta>;

    /// Allocate `pages` physical pages at exactly `base`, returning a
    /// pointer to the start of the region.
    ///
    /// Fails with `AllocationFailure` if the range is occupied or the
    /// firmware is out of memory.
    fn allocate_pages_at(&mut self, base: u64, pages: usize) -> BootResult<NonNull<u8>>;

    /// Report the active mode of every handle exposing a graphics
    /// output capability, in firmware enumeration order. An empty
    /// vector means no graphics output exists; callers must not assume
    /// a first element.
    fn graphics_modes(&mut self) -> BootResult<Vec<GraphicsMode>>;

    /// Terminate firmware boot services. `key` must identify the most
    /// recent memory-map snapshot; a stale key fails with
    /// `StaleMemoryMap` and leaves boot services running.
    fn exit_boot_services(&mut self, key: MapKey) -> BootResult<()>;
}
