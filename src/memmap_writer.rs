//! Memory Map Report
//!
//! Serializes a memory map snapshot to a CSV record format and writes
//! it to a file on the boot volume. The report is a diagnostic
//! artifact only: write failures are deliberately not checked, and the
//! boot proceeds regardless.

use alloc::format;

use crate::config::ATTRIBUTE_MASK;
use crate::memory_map::{memory_type_name, MemoryMap};
use crate::volume::VolumeFile;

const HEADER: &str = "Index, Type, Type(name), PhysicalStart, NumberOfPages, Attribute\n";

/// Write one header line plus one record per descriptor, in encounter
/// order. Best effort by design.
pub fn save_memory_map<F: VolumeFile>(map: &MemoryMap<'_>, file: &mut F) {
    log::info!(
        "memory map: {} descriptors, {} bytes",
        map.descriptor_count(),
        map.meta().map_size
    );

    let _ = file.write(HEADER.as_bytes());

    for (i, desc) in map.descriptors().enumerate() {
        let line = format!(
            "{}, {:x}, {}, {:08x}, {:x}, {:x}\n",
            i,
            desc.ty,
            memory_type_name(desc.ty),
            desc.phys_start,
            desc.page_count,
            desc.attribute & ATTRIBUTE_MASK,
        );
        let _ = file.write(line.as_bytes());
    }
}
