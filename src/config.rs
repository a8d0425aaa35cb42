//! Loader Configuration Constants

/// Kernel file name on the boot volume
pub const KERNEL_PATH: &str = "\\kernel.elf";

/// Memory map diagnostic file name on the boot volume
pub const MEMMAP_PATH: &str = "\\memmap.txt";

/// Physical address the kernel image is loaded at.
/// Matches the `--image-base` the kernel is linked against.
pub const KERNEL_BASE_ADDR: u64 = 0x10_0000;

/// UEFI page size (fixed by the firmware interface)
pub const PAGE_SIZE: usize = 4096;

/// Size of the memory map snapshot buffer.
/// The descriptor count is unknowable in advance, so this is sized
/// generously; a typical firmware map is well under 16 KiB.
pub const MEMMAP_BUFFER_SIZE: usize = 16 * 1024;

/// Byte offset of the kernel's 8-byte little-endian entry address field.
/// This is the loader/kernel contract; no further header structure is
/// parsed.
pub const ENTRY_FIELD_OFFSET: usize = 24;

/// Width the descriptor attribute bits are masked to in the memmap report
pub const ATTRIBUTE_MASK: u64 = 0xf_ffff;

/// Byte value painted across the framebuffer as a liveness indicator
pub const FRAMEBUFFER_FILL: u8 = 200;
