//! Control Transfer
//!
//! Extracts the kernel's entry address from its fixed header field and
//! performs the one-way jump. This is the only place in the loader
//! that turns a physical address into code, and the only terminal
//! states the loader has: transfer to the kernel, or halt.

use crate::config::ENTRY_FIELD_OFFSET;
use crate::error::{BootError, BootResult};

/// Read the 8-byte little-endian entry address stored at
/// [`ENTRY_FIELD_OFFSET`] inside the loaded image. No further header
/// structure is interpreted; the field position is the load contract
/// with the kernel.
pub fn entry_address(image: &[u8]) -> BootResult<u64> {
    let field = image
        .get(ENTRY_FIELD_OFFSET..ENTRY_FIELD_OFFSET + 8)
        .ok_or(BootError::ShortRead {
            expected: ENTRY_FIELD_OFFSET + 8,
            actual: image.len(),
        })?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(field);
    Ok(u64::from_le_bytes(raw))
}

/// Jump to the kernel entry point. One-way: after the call the
/// loader's stack and any firmware services are no longer its own. If
/// the callee ever returns, execution drops into the terminal halt.
///
/// # Safety
/// `entry_addr` must be the entry point of a kernel image loaded at
/// its linked base, and boot services must already be terminated.
pub unsafe fn transfer(entry_addr: u64) -> ! {
    // SAFETY: caller guarantees entry_addr points at the kernel entry.
    let entry: unsafe extern "C" fn() = unsafe { core::mem::transmute(entry_addr as usize) };
    // SAFETY: as above; the kernel takes no arguments and never returns.
    unsafe { entry() };
    halt()
}

/// Terminal halt state, reachable from any fatal error and from a
/// kernel that unexpectedly returns. Never resumes.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
