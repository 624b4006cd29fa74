//! ELF image loading
//!
//! Parses a 32-bit ELF executable (little- or big-endian), walks its
//! program headers and copies each segment onto the bus at its
//! virtual address: `filesz` bytes come from the file image and the
//! remainder up to `memsz` is zero-filled. Segment type and flags are
//! ignored. Returns the entry point for the driver to load into the
//! pc. Anything that goes wrong here is a host error, reported before
//! execution starts; it is not an in-guest fault.

use std::fs;
use std::path::Path;

use elf::endian::AnyEndian;
use elf::file::Class;
use elf::ElfBytes;
use thiserror::Error;

use crate::bus::Bus;
use crate::memory::Wordsize;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse ELF image: {0}")]
    Parse(#[from] elf::parse::ParseError),
    #[error("image is not a 32-bit ELF file")]
    NotElf32,
    #[error("segment at file offset 0x{offset:x} (0x{filesz:x} bytes) lies outside the image")]
    SegmentOutOfBounds { offset: u64, filesz: u64 },
}

/// Load the ELF image at the given path onto the bus and return its
/// entry point
pub fn load_image(bus: &mut Bus, path: &Path) -> Result<u32, LoadError> {
    let file_data = fs::read(path)?;
    load_image_bytes(bus, &file_data)
}

/// Load an ELF image already resident in host memory
pub fn load_image_bytes(bus: &mut Bus, file_data: &[u8]) -> Result<u32, LoadError> {
    let file = ElfBytes::<AnyEndian>::minimal_parse(file_data)?;
    if file.ehdr.class != Class::ELF32 {
        return Err(LoadError::NotElf32);
    }

    if let Some(segments) = file.segments() {
        for phdr in segments.iter() {
            let offset = phdr.p_offset as usize;
            let filesz = phdr.p_filesz as usize;
            let data = file_data
                .get(offset..offset.saturating_add(filesz))
                .ok_or(LoadError::SegmentOutOfBounds {
                    offset: phdr.p_offset,
                    filesz: phdr.p_filesz,
                })?;

            let mut vaddr = phdr.p_vaddr as u32;
            for n in 0..phdr.p_memsz as usize {
                let byte = data.get(n).copied().unwrap_or(0);
                bus.write(vaddr, byte.into(), Wordsize::Byte);
                vaddr = vaddr.wrapping_add(1);
            }
        }
    }

    Ok(file.ehdr.e_entry as u32)
}
