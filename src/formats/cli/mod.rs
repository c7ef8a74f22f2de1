//! Read-only ECMA-335 metadata access.
//!
//! Just enough of the CLI metadata format to answer two questions about a
//! managed image without loading it: which public key the assembly is
//! strong-named with, and which assembly-level custom attributes it
//! carries. Everything is bounds-checked structural decoding.

pub mod attributes;
pub mod heaps;
pub mod root;
pub mod tables;

use thiserror::Error;

use crate::formats::pe::{PeError, PeImage};
use heaps::{BlobHeap, StringsHeap};
use root::MetadataRoot;
use tables::TableStream;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Invalid metadata signature 0x{0:08x}")]
    BadSignature(u32),

    #[error("Metadata truncated at offset {offset:#x}")]
    Truncated { offset: usize },

    #[error("Missing metadata stream {0}")]
    MissingStream(&'static str),

    #[error("Invalid {heap} index {index:#x}")]
    BadHeapIndex { heap: &'static str, index: u32 },

    #[error("Invalid compressed integer at offset {offset:#x}")]
    BadCompressedInteger { offset: usize },

    #[error("Invalid row {row} in table 0x{table:02x}")]
    BadRow { table: u8, row: u32 },

    #[error("Malformed custom attribute blob")]
    BadAttributeBlob,

    #[error(transparent)]
    Pe(#[from] PeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// The Assembly manifest row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRow<'a> {
    pub name: &'a str,
    pub culture: &'a str,
    pub version: (u16, u16, u16, u16),
    pub flags: u32,
    pub public_key: &'a [u8],
}

/// A namespace-qualified type name borrowed from the `#Strings` heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeName<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
}

/// Parsed metadata of one managed image
#[derive(Debug, Clone)]
pub struct Metadata<'a> {
    pub root: MetadataRoot<'a>,
    pub tables: TableStream<'a>,
    pub strings: StringsHeap<'a>,
    pub blobs: BlobHeap<'a>,
}

impl<'a> Metadata<'a> {
    /// Parse the metadata root referenced by a PE image's CLI header
    pub fn from_pe(pe: &PeImage<'a>) -> Result<Self> {
        Self::parse(pe.metadata()?)
    }

    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let root = MetadataRoot::parse(data)?;

        let tables = match root.stream("#~")? {
            Some(s) => s,
            None => root.stream("#-")?.ok_or(MetadataError::MissingStream("#~"))?,
        };
        let tables = TableStream::parse(tables)?;
        let strings = StringsHeap::new(root.stream("#Strings")?.unwrap_or(&[]));
        let blobs = BlobHeap::new(root.stream("#Blob")?.unwrap_or(&[]));

        Ok(Self {
            root,
            tables,
            strings,
            blobs,
        })
    }

    /// The assembly manifest; `None` for a netmodule
    pub fn assembly(&self) -> Result<Option<AssemblyRow<'a>>> {
        use tables::ASSEMBLY;
        if self.tables.row_count(ASSEMBLY) == 0 {
            return Ok(None);
        }
        let cell = |column| self.tables.cell(ASSEMBLY, 1, column);
        Ok(Some(AssemblyRow {
            version: (
                cell(1)? as u16,
                cell(2)? as u16,
                cell(3)? as u16,
                cell(4)? as u16,
            ),
            flags: cell(5)?,
            public_key: self.blobs.get(cell(6)?)?,
            name: self.strings.get(cell(7)?)?,
            culture: self.strings.get(cell(8)?)?,
        }))
    }

    pub fn type_ref_name(&self, row: u32) -> Result<TypeName<'a>> {
        use tables::TYPE_REF;
        Ok(TypeName {
            name: self.strings.get(self.tables.cell(TYPE_REF, row, 1)?)?,
            namespace: self.strings.get(self.tables.cell(TYPE_REF, row, 2)?)?,
        })
    }

    pub fn type_def_name(&self, row: u32) -> Result<TypeName<'a>> {
        use tables::TYPE_DEF;
        Ok(TypeName {
            name: self.strings.get(self.tables.cell(TYPE_DEF, row, 1)?)?,
            namespace: self.strings.get(self.tables.cell(TYPE_DEF, row, 2)?)?,
        })
    }

    /// The TypeDef row whose method list contains MethodDef `method`
    pub fn method_owner(&self, method: u32) -> Result<u32> {
        use tables::{METHOD_DEF, TYPE_DEF};
        if method == 0 || method > self.tables.row_count(METHOD_DEF) {
            return Err(MetadataError::BadRow {
                table: METHOD_DEF,
                row: method,
            });
        }
        let mut owner = None;
        for row in 1..=self.tables.row_count(TYPE_DEF) {
            let start = self.tables.cell(TYPE_DEF, row, 5)?;
            if start <= method {
                owner = Some(row);
            } else {
                break;
            }
        }
        owner.ok_or(MetadataError::BadRow {
            table: METHOD_DEF,
            row: method,
        })
    }
}
