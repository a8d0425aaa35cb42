//! UEFI Boot Handoff Entry Point
//!
//! One linear pass: snapshot the memory map, persist it, discover the
//! framebuffer, load the kernel at its fixed base, end boot services,
//! and jump. Every failure before the jump is terminal; this binary
//! never returns to the firmware.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(target_os = "uefi")]
mod loader {
    use kiso_boot::config::{FRAMEBUFFER_FILL, MEMMAP_BUFFER_SIZE, MEMMAP_PATH};
    use kiso_boot::error::BootError;
    use kiso_boot::firmware::{UefiServices, UefiVolume};
    use kiso_boot::memory_map::MemoryMap;
    use kiso_boot::volume::Volume;
    use kiso_boot::{exit, gop, handoff, kernel_loader, memmap_writer};
    use uefi::prelude::*;
    use uefi::system;

    #[entry]
    fn efi_main() -> Status {
        uefi::helpers::init().unwrap();

        log::info!(
            "{} {} starting",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        log::info!("UEFI firmware vendor: {}", system::firmware_vendor());
        log::info!("UEFI firmware revision: {:#x}", system::firmware_revision());

        let mut services = UefiServices;

        // Snapshot the memory map before the loader makes allocations
        // of its own; the key will be refreshed at termination anyway.
        let mut memmap_buf = [0u8; MEMMAP_BUFFER_SIZE];
        let mut map = match MemoryMap::snapshot(&mut services, &mut memmap_buf) {
            Ok(map) => map,
            Err(err) => fatal(err),
        };

        // Persist the map as a diagnostic artifact. Opening the volume
        // is required for the kernel anyway; the report itself is best
        // effort.
        let mut volume = match UefiVolume::open_root() {
            Ok(volume) => volume,
            Err(err) => fatal(err),
        };
        match volume.open_create(MEMMAP_PATH) {
            Ok(mut report) => memmap_writer::save_memory_map(&map, &mut report),
            Err(err) => log::warn!("could not create {}: {:?}", MEMMAP_PATH, err),
        }

        // Framebuffer discovery, then a solid fill as a liveness check.
        let mode = match gop::discover(&mut services) {
            Ok(mode) => mode,
            Err(err) => fatal(err),
        };
        // SAFETY: base and size come straight from the firmware's mode
        // report.
        unsafe { gop::paint(&mode, FRAMEBUFFER_FILL) };

        let kernel = match kernel_loader::load_kernel(&mut services, &mut volume) {
            Ok(kernel) => kernel,
            Err(err) => fatal(err),
        };

        // SAFETY: the kernel allocation stays untouched until transfer.
        let entry = match handoff::entry_address(unsafe { kernel.image() }) {
            Ok(entry) => entry,
            Err(err) => fatal(err),
        };
        log::info!("kernel entry point: {:#x}", entry);

        // Past this point no boot service, console included, exists.
        if let Err(err) = exit::terminate(&mut services, &mut map) {
            fatal(err)
        }

        // SAFETY: boot services are terminated and the image is loaded
        // at its linked base; this call does not return.
        unsafe { handoff::transfer(entry) }
    }

    /// Log the failure and enter the terminal halt. There is no kernel
    /// to hand off to and no firmware state worth returning to.
    fn fatal(err: BootError) -> ! {
        log::error!("boot failed: {:?}", err);
        handoff::halt()
    }

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        log::error!("LOADER PANIC: {}", info);
        handoff::halt()
    }
}

/// The loader only means something as a UEFI application; this stub
/// keeps host builds (`cargo test`) linking.
#[cfg(not(target_os = "uefi"))]
fn main() {}
