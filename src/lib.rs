//! UEFI Boot Handoff
//!
//! This loader:
//! 1. Snapshots the UEFI memory map into a caller-provided buffer
//! 2. Writes the map to `\memmap.txt` on the boot volume (best effort)
//! 3. Discovers the GOP framebuffer and paints it as a liveness check
//! 4. Loads `\kernel.elf` at the fixed physical base `0x100000`
//! 5. Exits boot services, retrying once with a refreshed map key
//! 6. Transfers control to the kernel entry point and never returns
//!
//! All firmware access goes through the [`services::BootServices`] and
//! [`volume::Volume`] traits, so the whole sequence can be exercised on
//! the host against test doubles. The real implementations live in
//! [`firmware`], which only exists on the UEFI target.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod exit;
pub mod gop;
pub mod handoff;
pub mod kernel_loader;
pub mod memmap_writer;
pub mod memory_map;
pub mod services;
pub mod volume;

#[cfg(target_os = "uefi")]
pub mod firmware;

#[cfg(test)]
mod testing;
