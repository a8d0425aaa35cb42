//! Test Doubles
//!
//! In-memory implementations of the services and volume traits, plus a
//! helper that encodes descriptors in the firmware wire layout. Only
//! compiled for tests.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::config::PAGE_SIZE;
use crate::error::{BootError, BootResult};
use crate::gop::GraphicsMode;
use crate::memory_map::{check_buffer, MapKey, MapMeta, MemoryDescriptor};
use crate::services::BootServices;
use crate::volume::{Volume, VolumeFile};

/// Descriptor stride the mock firmware reports. Larger than the record
/// itself, as real firmware strides are.
pub(crate) const TEST_STRIDE: usize = 48;

/// Encode descriptors at the given stride in the EFI wire layout.
pub(crate) fn encode_descriptors(descs: &[MemoryDescriptor], stride: usize) -> Vec<u8> {
    let mut out = vec![0u8; descs.len() * stride];
    for (i, desc) in descs.iter().enumerate() {
        let rec = &mut out[i * stride..(i + 1) * stride];
        rec[0..4].copy_from_slice(&desc.ty.to_ne_bytes());
        rec[8..16].copy_from_slice(&desc.phys_start.to_ne_bytes());
        rec[16..24].copy_from_slice(&desc.virt_start.to_ne_bytes());
        rec[24..32].copy_from_slice(&desc.page_count.to_ne_bytes());
        rec[32..40].copy_from_slice(&desc.attribute.to_ne_bytes());
    }
    out
}

/// Scriptable firmware double.
pub(crate) struct MockFirmware {
    /// Descriptors every snapshot reports
    pub descriptors: Vec<MemoryDescriptor>,
    /// Extra bytes added to the reported map size (trailing partial
    /// record)
    pub extra_map_bytes: usize,
    /// Graphics modes returned in enumeration order
    pub graphics: Vec<GraphicsMode>,
    /// Reject the next allocation
    pub fail_allocation: bool,
    /// Fail the next snapshot with `BufferTooSmall`
    pub fail_next_snapshot: bool,
    /// Reject this many exit attempts as stale regardless of key
    pub stale_exits: usize,
    /// Every (base, pages) allocation request, in order
    pub allocations: Vec<(u64, usize)>,
    /// Every map key offered to `exit_boot_services`, in order
    pub exit_keys: Vec<MapKey>,
    /// Whether boot services have been terminated
    pub exited: bool,
    /// Snapshots taken so far
    pub snapshots: usize,
    next_key: usize,
    current_key: Option<MapKey>,
    backing: Vec<Vec<u8>>,
}

impl MockFirmware {
    pub fn new(descriptors: Vec<MemoryDescriptor>) -> Self {
        Self {
            descriptors,
            extra_map_bytes: 0,
            graphics: Vec::new(),
            fail_allocation: false,
            fail_next_snapshot: false,
            stale_exits: 0,
            allocations: Vec::new(),
            exit_keys: Vec::new(),
            exited: false,
            snapshots: 0,
            next_key: 0,
            current_key: None,
            backing: Vec::new(),
        }
    }
}

impl BootServices for MockFirmware {
    fn memory_map(&mut self, buf: &mut [u8]) -> BootResult<MapMeta> {
        check_buffer(buf)?;
        if self.fail_next_snapshot {
            self.fail_next_snapshot = false;
            return Err(BootError::BufferTooSmall);
        }
        let bytes = encode_descriptors(&self.descriptors, TEST_STRIDE);
        let map_size = bytes.len() + self.extra_map_bytes;
        if map_size > buf.len() {
            return Err(BootError::BufferTooSmall);
        }
        buf[..bytes.len()].copy_from_slice(&bytes);

        self.snapshots += 1;
        self.next_key += 1;
        let key = MapKey(self.next_key);
        self.current_key = Some(key);
        Ok(MapMeta {
            map_size,
            map_key: key,
            descriptor_size: TEST_STRIDE,
            descriptor_version: 1,
        })
    }

    fn allocate_pages_at(&mut self, base: u64, pages: usize) -> BootResult<NonNull<u8>> {
        if self.fail_allocation {
            return Err(BootError::AllocationFailure);
        }
        self.allocations.push((base, pages));
        // Any allocation invalidates the outstanding map key.
        self.current_key = None;

        let mut region = vec![0u8; pages * PAGE_SIZE];
        let ptr = NonNull::new(region.as_mut_ptr()).unwrap_or(NonNull::dangling());
        self.backing.push(region);
        Ok(ptr)
    }

    fn graphics_modes(&mut self) -> BootResult<Vec<GraphicsMode>> {
        Ok(self.graphics.clone())
    }

    fn exit_boot_services(&mut self, key: MapKey) -> BootResult<()> {
        self.exit_keys.push(key);
        if self.stale_exits > 0 {
            self.stale_exits -= 1;
            return Err(BootError::StaleMemoryMap);
        }
        if self.current_key != Some(key) {
            return Err(BootError::StaleMemoryMap);
        }
        self.exited = true;
        Ok(())
    }
}

/// In-memory file. `written` collects everything passed to `write`.
pub(crate) struct MockFile {
    data: Vec<u8>,
    pos: usize,
    read_limit: Option<usize>,
    pub written: Vec<u8>,
}

impl MockFile {
    pub fn empty() -> Self {
        Self::with_data(Vec::new(), None)
    }

    fn with_data(data: Vec<u8>, read_limit: Option<usize>) -> Self {
        Self {
            data,
            pos: 0,
            read_limit,
            written: Vec::new(),
        }
    }
}

impl VolumeFile for MockFile {
    fn size(&mut self) -> BootResult<u64> {
        Ok(self.data.len() as u64)
    }

    fn read(&mut self, buf: &mut [u8]) -> BootResult<usize> {
        let mut n = (self.data.len() - self.pos).min(buf.len());
        if let Some(limit) = self.read_limit {
            n = n.min(limit);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> BootResult<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }
}

/// In-memory boot volume keyed by path.
pub(crate) struct MockVolume {
    files: BTreeMap<String, Vec<u8>>,
    /// Cap every read at this many bytes to simulate a short read
    pub read_limit: Option<usize>,
}

impl MockVolume {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            read_limit: None,
        }
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(String::from(path), data);
    }
}

impl Volume for MockVolume {
    type File = MockFile;

    fn open_read(&mut self, path: &str) -> BootResult<MockFile> {
        let data = self
            .files
            .get(path)
            .ok_or(BootError::ResourceNotFound)?
            .clone();
        Ok(MockFile::with_data(data, self.read_limit))
    }

    fn open_create(&mut self, _path: &str) -> BootResult<MockFile> {
        Ok(MockFile::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FRAMEBUFFER_FILL, KERNEL_BASE_ADDR, MEMMAP_BUFFER_SIZE};
    use crate::gop::PixelFormatTag;
    use crate::memory_map::MemoryMap;
    use crate::{exit, gop, handoff, kernel_loader, memmap_writer};

    /// The whole handoff sequence against the doubles, in the order the
    /// binary runs it.
    #[test]
    fn test_boot_sequence_end_to_end() {
        let mut fw = MockFirmware::new(vec![
            MemoryDescriptor {
                ty: 7,
                phys_start: 0,
                virt_start: 0,
                page_count: 0x100,
                attribute: 0xf,
            },
            MemoryDescriptor {
                ty: 7,
                phys_start: 0x100000,
                virt_start: 0,
                page_count: 0x700,
                attribute: 0xf,
            },
            MemoryDescriptor {
                ty: 3,
                phys_start: 0x800000,
                virt_start: 0,
                page_count: 0x80,
                attribute: 0xf,
            },
        ]);

        let mut framebuffer = vec![0u8; 1024];
        fw.graphics = vec![GraphicsMode {
            width: 16,
            height: 16,
            stride: 16,
            format: PixelFormatTag::Bgr,
            framebuffer_base: framebuffer.as_mut_ptr() as u64,
            framebuffer_size: framebuffer.len() as u64,
        }];

        let mut volume = MockVolume::new();
        let mut kernel = vec![0u8; 4097];
        kernel[24..32].copy_from_slice(&0x0010_1120u64.to_le_bytes());
        volume.insert("\\kernel.elf", kernel);

        // Snapshot, then report.
        let mut buf = [0u8; MEMMAP_BUFFER_SIZE];
        let mut map = MemoryMap::snapshot(&mut fw, &mut buf).unwrap();
        let mut report = volume.open_create("\\memmap.txt").unwrap();
        memmap_writer::save_memory_map(&map, &mut report);
        assert_eq!(report.written.iter().filter(|&&b| b == b'\n').count(), 4);

        // Graphics discovery and liveness paint.
        let mode = gop::discover(&mut fw).unwrap();
        // SAFETY: the mode points at `framebuffer`, still alive.
        unsafe { gop::paint(&mode, FRAMEBUFFER_FILL) };
        assert!(framebuffer.iter().all(|&b| b == FRAMEBUFFER_FILL));

        // Kernel load at the fixed base.
        let loaded = kernel_loader::load_kernel(&mut fw, &mut volume).unwrap();
        assert_eq!(loaded.phys_base, KERNEL_BASE_ADDR);
        assert_eq!(loaded.pages, 2);

        // The load allocated, so termination must retry once.
        exit::terminate(&mut fw, &mut map).unwrap();
        assert!(fw.exited);
        assert_eq!(fw.exit_keys.len(), 2);
        assert_eq!(fw.snapshots, 2);

        // Entry extraction from the loaded image.
        // SAFETY: the mock's backing allocation is still alive.
        let entry = handoff::entry_address(unsafe { loaded.image() }).unwrap();
        assert_eq!(entry, 0x0010_1120);
    }
}
