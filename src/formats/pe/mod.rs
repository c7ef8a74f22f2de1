//! Minimal PE/COFF image reader.
//!
//! Reads the headers, the section table and the CLI header of a PE32 or
//! PE32+ image. Nothing is copied; every accessor borrows from the input.

use std::cell::OnceCell;

pub mod error;
pub mod headers;
pub mod sections;

pub use error::{PeError, Result};
pub use headers::{CliFlags, CliHeader, DataDirectory, ImageHeaders};
pub use sections::{SectionHeader, SectionMap};

use error::truncated;
use headers::{read_cli_header, read_headers, DIRECTORY_CLI, DIRECTORY_SECURITY};

pub struct PeImage<'data> {
    data: &'data [u8],
    headers: ImageHeaders,
    sections: SectionMap,
    cli: OnceCell<Option<CliHeader>>,
}

impl<'data> PeImage<'data> {
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let headers = read_headers(data)?;
        let sections = SectionMap::read(data, headers.section_table, headers.section_count)?;
        Ok(Self {
            data,
            headers,
            sections,
            cli: OnceCell::new(),
        })
    }

    pub fn headers(&self) -> &ImageHeaders {
        &self.headers
    }

    pub fn sections(&self) -> &[SectionHeader] {
        self.sections.headers()
    }

    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.sections.rva_to_offset(rva)
    }

    /// `size` bytes of file content starting at `rva`
    pub fn slice_at_rva(&self, rva: u32, size: u32) -> Result<&'data [u8]> {
        let offset = self.rva_to_offset(rva).ok_or(PeError::UnmappedRva(rva))?;
        let end = offset.saturating_add(size as usize);
        self.data
            .get(offset..end)
            .ok_or_else(|| truncated(self.data, end))
    }

    /// Whether the image carries an Authenticode certificate table.
    ///
    /// Presence only; the certificate blob is not validated.
    pub fn has_certificate_table(&self) -> bool {
        self.headers.directories[DIRECTORY_SECURITY].is_present()
    }

    /// Whether the image declares a CLI header
    pub fn has_cli_header(&self) -> bool {
        self.headers.directories[DIRECTORY_CLI].is_present()
    }

    /// CLI header, read on first use; `NotManaged` when absent or unreadable
    pub fn cli_header(&self) -> Result<&CliHeader> {
        self.cli
            .get_or_init(|| {
                let dir = self.headers.directories[DIRECTORY_CLI];
                if !dir.is_present() {
                    return None;
                }
                let offset = self.rva_to_offset(dir.address)?;
                read_cli_header(self.data, offset).ok()
            })
            .as_ref()
            .ok_or(PeError::NotManaged)
    }

    /// Metadata root bytes referenced by the CLI header
    pub fn metadata(&self) -> Result<&'data [u8]> {
        let cli = self.cli_header()?;
        self.slice_at_rva(cli.metadata.address, cli.metadata.size)
    }
}
