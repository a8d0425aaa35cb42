//! Boot Volume Access
//!
//! File access seam over the boot volume's root directory. The UEFI
//! realization ([`crate::firmware::UefiVolume`]) resolves the root from
//! the running image's device handle; tests substitute an in-memory
//! double.

use crate::error::BootResult;

/// The boot volume's root directory.
pub trait Volume {
    type File: VolumeFile;

    /// Open an existing file read-only. Fails with `ResourceNotFound`
    /// if the path does not exist.
    fn open_read(&mut self, path: &str) -> BootResult<Self::File>;

    /// Open a file for writing, creating it if absent.
    fn open_create(&mut self, path: &str) -> BootResult<Self::File>;
}

/// An open file on the boot volume.
pub trait VolumeFile {
    /// Stored size of the file in bytes.
    fn size(&mut self) -> BootResult<u64>;

    /// Read from the current position, returning the byte count
    /// actually read.
    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize>;

    /// Write at the current position.
    fn write(&mut self, bytes: &[u8]) -> BootResult<()>;
}
