//! Boot Services Termination
//!
//! Ends firmware boot services using the map key of the most recent
//! snapshot. The key is almost always stale at this point (the
//! graphics and kernel-loading steps allocate), so a single rejection
//! is expected and recovered by exactly one re-snapshot. A second
//! snapshot taken with no allocations in between is guaranteed
//! current, so a second rejection means the firmware state is no
//! longer trustworthy and the boot cannot continue.

use crate::error::{BootError, BootResult};
use crate::memory_map::MemoryMap;
use crate::services::BootServices;

/// Terminate boot services with at most two attempts: the current key,
/// then once more with a freshly snapshotted key. Never a third.
pub fn terminate<S: BootServices + ?Sized>(
    services: &mut S,
    map: &mut MemoryMap<'_>,
) -> BootResult<()> {
    match services.exit_boot_services(map.key()) {
        Ok(()) => Ok(()),
        Err(BootError::StaleMemoryMap) => {
            log::warn!("memory map key stale, re-snapshotting");
            map.refresh(services)?;
            services.exit_boot_services(map.key()).map_err(|err| {
                log::error!("could not exit boot services: {:?}", err);
                BootError::Unrecoverable
            })
        }
        Err(err) => {
            log::error!("could not exit boot services: {:?}", err);
            Err(BootError::Unrecoverable)
        }
    }
}
