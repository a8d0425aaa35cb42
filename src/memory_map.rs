//! Memory Map Snapshot
//!
//! Captures the firmware's physical memory descriptor table into a
//! caller-provided buffer and exposes a strided, bounds-checked view
//! over the descriptors. The descriptor stride comes from the firmware
//! (`descriptor_size`) and may exceed `size_of::<MemoryDescriptor>()`;
//! iteration is bounded by the filled length, never the buffer
//! capacity.

use crate::error::{BootError, BootResult};
use crate::services::BootServices;

/// Opaque token identifying one memory-layout generation. Only the key
/// from the most recent snapshot is accepted by `ExitBootServices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapKey(pub usize);

/// Metadata returned by a memory map snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MapMeta {
    /// Bytes of the buffer actually filled
    pub map_size: usize,
    /// Key identifying this layout generation
    pub map_key: MapKey,
    /// Stride of one descriptor record
    pub descriptor_size: usize,
    /// Descriptor format version
    pub descriptor_version: u32,
}

/// One memory descriptor record, in the EFI layout.
///
/// `ty` is followed by 4 bytes of padding in the wire format, which
/// `repr(C)` reproduces here.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDescriptor {
    /// Memory region classification code
    pub ty: u32,
    /// Physical start address of the region
    pub phys_start: u64,
    /// Virtual start address (unused before runtime relocation)
    pub virt_start: u64,
    /// Region length in 4 KiB pages
    pub page_count: u64,
    /// Attribute bitmask
    pub attribute: u64,
}

/// A snapshot of the firmware memory map over a caller-owned buffer.
#[derive(Debug)]
pub struct MemoryMap<'buf> {
    buf: &'buf mut [u8],
    meta: MapMeta,
}

impl<'buf> MemoryMap<'buf> {
    /// Take a snapshot into `buf`. Each call produces an independent
    /// map key.
    pub fn snapshot<S: BootServices + ?Sized>(
        services: &mut S,
        buf: &'buf mut [u8],
    ) -> BootResult<Self> {
        let meta = services.memory_map(buf)?;
        Ok(Self { buf, meta })
    }

    /// Re-snapshot into the same buffer, replacing the map key and
    /// metadata. Used when `ExitBootServices` rejects the old key.
    pub fn refresh<S: BootServices + ?Sized>(&mut self, services: &mut S) -> BootResult<()> {
        self.meta = services.memory_map(self.buf)?;
        Ok(())
    }

    /// Map key of the most recent snapshot.
    pub fn key(&self) -> MapKey {
        self.meta.map_key
    }

    pub fn meta(&self) -> &MapMeta {
        &self.meta
    }

    /// Number of descriptors, derived from the filled length at the
    /// firmware-reported stride.
    pub fn descriptor_count(&self) -> usize {
        if self.meta.descriptor_size == 0 {
            return 0;
        }
        self.filled().len() / self.meta.descriptor_size
    }

    /// Iterate the descriptors in encounter order.
    pub fn descriptors(&self) -> Descriptors<'_> {
        Descriptors {
            data: self.filled(),
            stride: self.meta.descriptor_size,
            offset: 0,
        }
    }

    /// Total pages across all descriptors. Without intervening frees
    /// this is non-decreasing between successive snapshots.
    pub fn total_pages(&self) -> u64 {
        self.descriptors().map(|d| d.page_count).sum()
    }

    fn filled(&self) -> &[u8] {
        let len = self.meta.map_size.min(self.buf.len());
        &self.buf[..len]
    }
}

/// Strided iterator over the filled portion of a map buffer.
pub struct Descriptors<'a> {
    data: &'a [u8],
    stride: usize,
    offset: usize,
}

impl Iterator for Descriptors<'_> {
    type Item = MemoryDescriptor;

    fn next(&mut self) -> Option<MemoryDescriptor> {
        // A stride smaller than the record itself means the metadata is
        // malformed; yield nothing rather than read out of bounds.
        if self.stride < core::mem::size_of::<MemoryDescriptor>() {
            return None;
        }
        if self.offset + self.stride > self.data.len() {
            return None;
        }
        // SAFETY: offset + stride <= data.len() and stride covers the
        // full record, so the read stays inside `data`. The buffer has
        // no alignment guarantee, hence read_unaligned.
        let desc = unsafe {
            core::ptr::read_unaligned(self.data.as_ptr().add(self.offset) as *const MemoryDescriptor)
        };
        self.offset += self.stride;
        Some(desc)
    }
}

/// Name of an EFI memory type code. The mapping is total over the
/// defined codes; anything else falls back to `InvalidMemoryType`,
/// which never occurs for codes produced by a snapshot in the same
/// session.
pub fn memory_type_name(ty: u32) -> &'static str {
    match ty {
        0 => "EfiReservedMemoryType",
        1 => "EfiLoaderCode",
        2 => "EfiLoaderData",
        3 => "EfiBootServicesCode",
        4 => "EfiBootServicesData",
        5 => "EfiRuntimeServicesCode",
        6 => "EfiRuntimeServicesData",
        7 => "EfiConventionalMemory",
        8 => "EfiUnusableMemory",
        9 => "EfiACPIReclaimMemory",
        10 => "EfiACPIMemoryNVS",
        11 => "EfiMemoryMappedIO",
        12 => "EfiMemoryMappedIOPortSpace",
        13 => "EfiPalCode",
        14 => "EfiPersistentMemory",
        15 => "EfiMaxMemoryType",
        _ => "InvalidMemoryType",
    }
}

/// Snapshot helper guarding the degenerate buffer case before asking
/// the firmware.
pub fn check_buffer(buf: &[u8]) -> BootResult<()> {
    if buf.is_empty() {
        return Err(BootError::BufferTooSmall);
    }
    Ok(())
}
