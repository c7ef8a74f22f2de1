//! Image headers down to the data directory array, and the CLI header.

use bitflags::bitflags;

use super::error::{truncated, PeError, Result};
use crate::formats::bytes::LeBytes;

pub const DIRECTORY_SECURITY: usize = 4;
pub const DIRECTORY_CLI: usize = 14;
const DIRECTORY_COUNT: usize = 16;

const DOS_MAGIC: u16 = 0x5a4d;
const PE32: u16 = 0x10b;
const PE32_PLUS: u16 = 0x20b;
const COFF_SIZE: usize = 20;

/// An (address, size) pair from a directory table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub address: u32,
    pub size: u32,
}

impl DataDirectory {
    fn read(data: &[u8], offset: usize) -> Option<Self> {
        Some(Self {
            address: data.u32_at(offset)?,
            size: data.u32_at(offset + 4)?,
        })
    }

    pub fn is_present(&self) -> bool {
        self.address != 0 && self.size != 0
    }
}

/// What the inspector needs from the DOS, COFF and optional headers
#[derive(Debug, Clone)]
pub struct ImageHeaders {
    pub pe_offset: usize,
    pub pe32_plus: bool,
    pub section_count: u16,
    /// File offset of the first section header
    pub section_table: usize,
    pub directories: [DataDirectory; DIRECTORY_COUNT],
}

pub fn read_headers(data: &[u8]) -> Result<ImageHeaders> {
    if data.len() < 64 {
        return Err(truncated(data, 64));
    }
    if data.u16_at(0) != Some(DOS_MAGIC) {
        return Err(PeError::BadDosSignature);
    }

    let pe_offset = data.u32_at(0x3c).ok_or_else(|| truncated(data, 64))? as usize;
    match data.slice_at(pe_offset, 4) {
        Some(b"PE\0\0") => {}
        Some(_) => return Err(PeError::BadPeSignature(pe_offset)),
        None => return Err(truncated(data, pe_offset.saturating_add(4))),
    }

    let coff = pe_offset + 4;
    let section_count = data.u16_at(coff + 2).ok_or_else(|| truncated(data, coff + COFF_SIZE))?;
    let optional_size = data.u16_at(coff + 16).ok_or_else(|| truncated(data, coff + COFF_SIZE))? as usize;

    let optional = coff + COFF_SIZE;
    let magic = data.u16_at(optional).ok_or_else(|| truncated(data, optional + 2))?;
    let (count_at, directories_at) = match magic {
        PE32 => (92, 96),
        PE32_PLUS => (108, 112),
        other => return Err(PeError::BadMagic(other)),
    };
    if optional_size < directories_at || data.len() < optional + directories_at {
        return Err(truncated(data, optional + directories_at));
    }

    // Entries past the declared count or the optional header stay empty
    let declared = data.u32_at(optional + count_at).unwrap_or(0) as usize;
    let fits = (optional_size - directories_at) / 8;
    let mut directories = [DataDirectory::default(); DIRECTORY_COUNT];
    for (index, slot) in directories
        .iter_mut()
        .enumerate()
        .take(declared.min(fits))
    {
        match DataDirectory::read(data, optional + directories_at + index * 8) {
            Some(dir) => *slot = dir,
            None => break,
        }
    }

    Ok(ImageHeaders {
        pe_offset,
        pe32_plus: magic == PE32_PLUS,
        section_count,
        section_table: optional + optional_size,
        directories,
    })
}

bitflags! {
    /// COMIMAGE_FLAGS_* from the CLI header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CliFlags: u32 {
        const IL_ONLY = 0x0000_0001;
        const REQUIRES_32BIT = 0x0000_0002;
        const STRONG_NAME_SIGNED = 0x0000_0008;
        const NATIVE_ENTRYPOINT = 0x0000_0010;
    }
}

/// The CLI (COR20) header of a managed image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliHeader {
    pub runtime_version: (u16, u16),
    pub metadata: DataDirectory,
    pub flags: CliFlags,
}

pub fn read_cli_header(data: &[u8], offset: usize) -> Result<CliHeader> {
    // cb, runtime version, metadata directory, flags
    let end = offset.saturating_add(20);
    let field = |at: usize| data.u32_at(offset + at).ok_or_else(|| truncated(data, end));
    let version = field(4)?;
    Ok(CliHeader {
        runtime_version: (version as u16, (version >> 16) as u16),
        metadata: DataDirectory {
            address: field(8)?,
            size: field(12)?,
        },
        flags: CliFlags::from_bits_retain(field(16)?),
    })
}
