//! Graphics Output Discovery
//!
//! Locates the platform's graphics output capability, reports its
//! active mode, and paints the framebuffer as a boot liveness
//! indicator. Ownership of the framebuffer passes implicitly to the
//! kernel at control transfer.

use crate::error::{BootError, BootResult};
use crate::services::BootServices;

/// Pixel layout of the active graphics mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormatTag {
    Rgb,
    Bgr,
    Bitmask,
    BltOnly,
}

impl PixelFormatTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rgb => "PixelRedGreenBlueReserved8BitPerColor",
            Self::Bgr => "PixelBlueGreenRedReserved8BitPerColor",
            Self::Bitmask => "PixelBitMask",
            Self::BltOnly => "PixelBltOnly",
        }
    }
}

/// Active mode of a graphics output handle.
#[derive(Debug, Clone, Copy)]
pub struct GraphicsMode {
    /// Horizontal resolution in pixels
    pub width: u32,
    /// Vertical resolution in pixels
    pub height: u32,
    /// Pixels per scan line (may exceed `width`)
    pub stride: u32,
    /// Pixel layout
    pub format: PixelFormatTag,
    /// Physical base address of the linear framebuffer
    pub framebuffer_base: u64,
    /// Framebuffer length in bytes
    pub framebuffer_size: u64,
}

/// Select the first graphics output the firmware reports.
///
/// Zero handles is a real condition on headless systems and must yield
/// `ResourceNotFound`, never an unchecked first-element access.
pub fn discover<S: BootServices + ?Sized>(services: &mut S) -> BootResult<GraphicsMode> {
    let modes = services.graphics_modes()?;
    let mode = modes.into_iter().next().ok_or(BootError::ResourceNotFound)?;

    log::info!(
        "GOP: {}x{}, {}, {} pixels/line",
        mode.width,
        mode.height,
        mode.format.name(),
        mode.stride
    );
    log::info!(
        "framebuffer: {:#x} - {:#x} ({} bytes)",
        mode.framebuffer_base,
        mode.framebuffer_base + mode.framebuffer_size,
        mode.framebuffer_size
    );

    Ok(mode)
}

/// Paint the entire framebuffer with a single byte value.
///
/// Purely a visual liveness indicator; nothing depends on the contents
/// afterwards.
///
/// # Safety
/// `mode.framebuffer_base` must point to a writable region of at least
/// `mode.framebuffer_size` bytes, as reported by the firmware.
pub unsafe fn paint(mode: &GraphicsMode, value: u8) {
    // SAFETY: caller guarantees the framebuffer range is valid.
    unsafe {
        core::ptr::write_bytes(
            mode.framebuffer_base as *mut u8,
            value,
            mode.framebuffer_size as usize,
        );
    }
}
