//! `#Strings` and `#Blob` heap readers.

use super::{MetadataError, Result};
use crate::formats::bytes::LeBytes;

/// Decode an ECMA-335 compressed unsigned integer (II.23.2).
///
/// Returns the value and the number of bytes it occupied.
pub fn read_compressed_u32(data: &[u8], offset: usize) -> Result<(u32, usize)> {
    let b0 = data
        .u8_at(offset)
        .ok_or(MetadataError::Truncated { offset })? as u32;

    if b0 & 0x80 == 0 {
        return Ok((b0, 1));
    }

    if b0 & 0xC0 == 0x80 {
        let b1 = data
            .u8_at(offset + 1)
            .ok_or(MetadataError::Truncated { offset: offset + 1 })? as u32;
        return Ok((((b0 & 0x3F) << 8) | b1, 2));
    }

    if b0 & 0xE0 == 0xC0 {
        let rest = data
            .slice_at(offset + 1, 3)
            .ok_or(MetadataError::Truncated { offset: offset + 1 })?;
        let value = ((b0 & 0x1F) << 24)
            | ((rest[0] as u32) << 16)
            | ((rest[1] as u32) << 8)
            | rest[2] as u32;
        return Ok((value, 4));
    }

    Err(MetadataError::BadCompressedInteger { offset })
}

/// Null-terminated UTF-8 identifiers.
#[derive(Debug, Clone, Copy)]
pub struct StringsHeap<'a> {
    data: &'a [u8],
}

impl<'a> StringsHeap<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn get(&self, index: u32) -> Result<&'a str> {
        let offset = index as usize;
        if offset >= self.data.len() {
            // Index 0 in an absent heap is the empty string
            return if index == 0 {
                Ok("")
            } else {
                Err(MetadataError::BadHeapIndex {
                    heap: "#Strings",
                    index,
                })
            };
        }
        self.data
            .cstr_at(offset, self.data.len() - offset)
            .ok_or(MetadataError::BadHeapIndex {
                heap: "#Strings",
                index,
            })
    }
}

/// Length-prefixed binary blobs.
#[derive(Debug, Clone, Copy)]
pub struct BlobHeap<'a> {
    data: &'a [u8],
}

impl<'a> BlobHeap<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn get(&self, index: u32) -> Result<&'a [u8]> {
        if index == 0 && self.data.is_empty() {
            return Ok(&[]);
        }
        let offset = index as usize;
        let bad = MetadataError::BadHeapIndex {
            heap: "#Blob",
            index,
        };
        let (len, width) = read_compressed_u32(self.data, offset).map_err(|_| bad.clone())?;
        self.data
            .slice_at(offset + width, len as usize)
            .ok_or(bad)
    }
}
