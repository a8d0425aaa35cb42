//! Kernel Image Loader
//!
//! Loads the kernel file from the boot volume into physical pages at
//! the fixed link-time base address. The image is allocated once,
//! populated by a single bulk read, and never freed: ownership passes
//! to the kernel at control transfer.

use core::ptr::NonNull;

use crate::config::{KERNEL_BASE_ADDR, KERNEL_PATH, PAGE_SIZE};
use crate::error::{BootError, BootResult};
use crate::services::BootServices;
use crate::volume::{Volume, VolumeFile};

/// A kernel image resident at its fixed physical base.
#[derive(Debug)]
pub struct LoadedKernel {
    /// Physical base address of the image
    pub phys_base: u64,
    /// Stored file size in bytes
    pub file_size: u64,
    /// Pages allocated for the image (`ceil(file_size / PAGE_SIZE)`)
    pub pages: usize,
    image: NonNull<u8>,
}

impl LoadedKernel {
    /// The loaded image bytes.
    ///
    /// # Safety
    /// Valid only while the allocation at `phys_base` is untouched,
    /// which holds for the remainder of the boot: the region is never
    /// freed or reused before control transfer.
    pub unsafe fn image(&self) -> &[u8] {
        // SAFETY: `image` covers `file_size` bytes, written by load_kernel.
        unsafe { core::slice::from_raw_parts(self.image.as_ptr(), self.file_size as usize) }
    }
}

/// Load the kernel from the boot volume into pages at
/// [`KERNEL_BASE_ADDR`].
///
/// The page count rounds up, never down, so the tail of the image is
/// never truncated. Fails if the file is absent, the fixed range is
/// occupied, or the bulk read comes up short; each is fatal, there is
/// no kernel to run without it.
pub fn load_kernel<S, V>(services: &mut S, volume: &mut V) -> BootResult<LoadedKernel>
where
    S: BootServices + ?Sized,
    V: Volume,
{
    log::info!("loading kernel from {}", KERNEL_PATH);

    let mut file = volume.open_read(KERNEL_PATH)?;
    let file_size = file.size()?;
    let pages = (file_size as usize).div_ceil(PAGE_SIZE);

    let region = services.allocate_pages_at(KERNEL_BASE_ADDR, pages)?;

    // SAFETY: the allocation spans pages * PAGE_SIZE >= file_size bytes.
    let dst = unsafe { core::slice::from_raw_parts_mut(region.as_ptr(), file_size as usize) };
    let read = file.read(dst)?;
    if read != file_size as usize {
        log::error!("kernel read truncated: {} of {} bytes", read, file_size);
        return Err(BootError::ShortRead {
            expected: file_size as usize,
            actual: read,
        });
    }

    log::info!(
        "kernel: {:#x} ({} bytes, {} pages)",
        KERNEL_BASE_ADDR,
        file_size,
        pages
    );

    Ok(LoadedKernel {
        phys_base: KERNEL_BASE_ADDR,
        file_size,
        pages,
        image: region,
    })
}
