//! UEFI Implementations of the Loader Seams
//!
//! Real [`BootServices`] and [`Volume`] implementations over the `uefi`
//! crate. The memory-map snapshot and boot-services termination go
//! through the raw function-pointer table because the map-key contract
//! (snapshot key offered back at termination) belongs to this loader;
//! the high-level wrapper hides the key.

extern crate alloc;

use alloc::vec::Vec;
use core::ptr::NonNull;

use uefi::boot::{
    self, AllocateType, MemoryType, OpenProtocolAttributes, OpenProtocolParams, SearchType,
};
use uefi::proto::console::gop::{GraphicsOutput, PixelFormat};
use uefi::proto::loaded_image::LoadedImage;
use uefi::proto::media::file::{
    Directory, File, FileAttribute, FileInfo, FileMode, FileType, RegularFile,
};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CStr16, Status};

use crate::error::{BootError, BootResult};
use crate::gop::{GraphicsMode, PixelFormatTag};
use crate::memory_map::{check_buffer, MapKey, MapMeta};
use crate::services::BootServices;
use crate::volume::{Volume, VolumeFile};

fn status_to_error(status: Status) -> BootError {
    match status {
        Status::BUFFER_TOO_SMALL => BootError::BufferTooSmall,
        Status::NOT_FOUND => BootError::ResourceNotFound,
        Status::OUT_OF_RESOURCES => BootError::AllocationFailure,
        _ => BootError::Unrecoverable,
    }
}

fn boot_services_raw() -> BootResult<NonNull<uefi_raw::table::boot::BootServices>> {
    let system_table = uefi::table::system_table_raw().ok_or(BootError::Unrecoverable)?;
    // SAFETY: the firmware provides a valid system table while boot
    // services are running.
    let boot_services = unsafe { (*system_table.as_ptr()).boot_services };
    NonNull::new(boot_services).ok_or(BootError::Unrecoverable)
}

/// The running firmware's boot services.
pub struct UefiServices;

impl BootServices for UefiServices {
    fn memory_map(&mut self, buf: &mut [u8]) -> BootResult<MapMeta> {
        check_buffer(buf)?;
        let bs = boot_services_raw()?;

        let mut map_size = buf.len();
        let mut map_key = 0usize;
        let mut descriptor_size = 0usize;
        let mut descriptor_version = 0u32;
        // SAFETY: the table pointer is valid while boot services run;
        // buf covers map_size bytes and the out-parameters are local.
        let status = unsafe {
            ((*bs.as_ptr()).get_memory_map)(
                &mut map_size,
                buf.as_mut_ptr().cast(),
                &mut map_key,
                &mut descriptor_size,
                &mut descriptor_version,
            )
        };
        match status {
            Status::SUCCESS => Ok(MapMeta {
                map_size,
                map_key: MapKey(map_key),
                descriptor_size,
                descriptor_version,
            }),
            Status::BUFFER_TOO_SMALL => Err(BootError::BufferTooSmall),
            other => Err(status_to_error(other)),
        }
    }

    fn allocate_pages_at(&mut self, base: u64, pages: usize) -> BootResult<NonNull<u8>> {
        boot::allocate_pages(AllocateType::Address(base), MemoryType::LOADER_DATA, pages).map_err(
            |err| {
                log::error!(
                    "failed to allocate {} pages at {:#x}: {:?}",
                    pages,
                    base,
                    err.status()
                );
                BootError::AllocationFailure
            },
        )
    }

    fn graphics_modes(&mut self) -> BootResult<Vec<GraphicsMode>> {
        let handles = match boot::locate_handle_buffer(SearchType::from_proto::<GraphicsOutput>()) {
            Ok(handles) => handles,
            Err(err) if err.status() == Status::NOT_FOUND => return Ok(Vec::new()),
            Err(err) => return Err(status_to_error(err.status())),
        };

        let mut modes = Vec::new();
        for &handle in handles.iter() {
            // Open with non-exclusive access: the firmware keeps using
            // the framebuffer for its own console until boot services
            // end.
            // SAFETY: GetProtocol does not track usage; we only read
            // mode information and paint the framebuffer the firmware
            // reported.
            let mut gop = match unsafe {
                boot::open_protocol::<GraphicsOutput>(
                    OpenProtocolParams {
                        handle,
                        agent: boot::image_handle(),
                        controller: None,
                    },
                    OpenProtocolAttributes::GetProtocol,
                )
            } {
                Ok(gop) => gop,
                Err(err) => {
                    log::warn!("failed to open GOP handle: {:?}", err.status());
                    continue;
                }
            };

            let info = gop.current_mode_info();
            let (width, height) = info.resolution();
            let format = match info.pixel_format() {
                PixelFormat::Rgb => PixelFormatTag::Rgb,
                PixelFormat::Bgr => PixelFormatTag::Bgr,
                PixelFormat::Bitmask => PixelFormatTag::Bitmask,
                PixelFormat::BltOnly => PixelFormatTag::BltOnly,
            };
            let mut fb = gop.frame_buffer();

            modes.push(GraphicsMode {
                width: width as u32,
                height: height as u32,
                stride: info.stride() as u32,
                format,
                framebuffer_base: fb.as_mut_ptr() as u64,
                framebuffer_size: fb.size() as u64,
            });
        }
        Ok(modes)
    }

    fn exit_boot_services(&mut self, key: MapKey) -> BootResult<()> {
        let bs = boot_services_raw()?;
        let image_handle = boot::image_handle().as_ptr();
        // SAFETY: single-threaded, no firmware callback in progress;
        // on success no boot service is touched again.
        let status = unsafe { ((*bs.as_ptr()).exit_boot_services)(image_handle, key.0) };
        match status {
            Status::SUCCESS => Ok(()),
            // A rejected key means the map generation moved on.
            Status::INVALID_PARAMETER => Err(BootError::StaleMemoryMap),
            other => Err(status_to_error(other)),
        }
    }
}

/// Root directory of the volume this image was loaded from.
pub struct UefiVolume {
    root: Directory,
}

impl UefiVolume {
    /// Resolve the boot volume: running image -> device handle ->
    /// simple file system -> root directory. Any gap in that chain
    /// means the boot cannot proceed.
    pub fn open_root() -> BootResult<Self> {
        let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())
            .map_err(|err| {
                log::error!("no loaded-image protocol: {:?}", err.status());
                BootError::ResourceNotFound
            })?;
        let device = loaded_image.device().ok_or(BootError::ResourceNotFound)?;
        let mut fs = boot::open_protocol_exclusive::<SimpleFileSystem>(device).map_err(|err| {
            log::error!("no file-system protocol on boot device: {:?}", err.status());
            BootError::ResourceNotFound
        })?;
        let root = fs.open_volume().map_err(|err| {
            log::error!("failed to open boot volume root: {:?}", err.status());
            BootError::ResourceNotFound
        })?;
        Ok(Self { root })
    }

    fn open(&mut self, path: &str, mode: FileMode) -> BootResult<UefiFile> {
        let mut path_buf = [0u16; 64];
        let cpath = CStr16::from_str_with_buf(path, &mut path_buf)
            .map_err(|_| BootError::ResourceNotFound)?;
        let handle = self
            .root
            .open(cpath, mode, FileAttribute::empty())
            .map_err(|err| status_to_error(err.status()))?;
        match handle.into_type().map_err(|err| status_to_error(err.status()))? {
            FileType::Regular(file) => Ok(UefiFile { file }),
            FileType::Dir(_) => Err(BootError::ResourceNotFound),
        }
    }
}

impl Volume for UefiVolume {
    type File = UefiFile;

    fn open_read(&mut self, path: &str) -> BootResult<UefiFile> {
        self.open(path, FileMode::Read)
    }

    fn open_create(&mut self, path: &str) -> BootResult<UefiFile> {
        self.open(path, FileMode::CreateReadWrite)
    }
}

/// An open regular file on the boot volume.
pub struct UefiFile {
    file: RegularFile,
}

impl VolumeFile for UefiFile {
    fn size(&mut self) -> BootResult<u64> {
        let info = self
            .file
            .get_boxed_info::<FileInfo>()
            .map_err(|err| status_to_error(err.status()))?;
        Ok(info.file_size())
    }

    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize> {
        self.file.read(buf).map_err(|err| {
            log::error!("file read failed: {:?}", err.status());
            BootError::Unrecoverable
        })
    }

    fn write(&mut self, bytes: &[u8]) -> BootResult<()> {
        self.file
            .write(bytes)
            .map_err(|_| BootError::Unrecoverable)
    }
}
