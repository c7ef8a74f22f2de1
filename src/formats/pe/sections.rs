//! Section table and RVA translation.

use super::error::{truncated, Result};
use crate::formats::bytes::LeBytes;

const SECTION_HEADER_SIZE: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_offset: u32,
    pub raw_size: u32,
}

impl SectionHeader {
    fn read(data: &[u8], offset: usize) -> Option<Self> {
        Some(Self {
            name: data.slice_at(offset, 8)?.try_into().ok()?,
            virtual_size: data.u32_at(offset + 8)?,
            virtual_address: data.u32_at(offset + 12)?,
            raw_size: data.u32_at(offset + 16)?,
            raw_offset: data.u32_at(offset + 20)?,
        })
    }

    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

/// Sections ordered by virtual address
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    sections: Vec<SectionHeader>,
}

impl SectionMap {
    pub fn read(data: &[u8], offset: usize, count: u16) -> Result<Self> {
        let mut sections = (0..count as usize)
            .map(|i| {
                let at = offset + i * SECTION_HEADER_SIZE;
                SectionHeader::read(data, at).ok_or_else(|| truncated(data, at + SECTION_HEADER_SIZE))
            })
            .collect::<Result<Vec<_>>>()?;
        sections.sort_by_key(|s| s.virtual_address);
        Ok(Self { sections })
    }

    pub fn headers(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// File offset backing `rva`, or `None` for unmapped and zero-fill addresses
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        // Last section starting at or below `rva`
        let index = self
            .sections
            .partition_point(|s| s.virtual_address <= rva)
            .checked_sub(1)?;
        let section = &self.sections[index];
        let delta = rva - section.virtual_address;
        if delta >= section.raw_size {
            return None;
        }
        Some(section.raw_offset as usize + delta as usize)
    }
}
