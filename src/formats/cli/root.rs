//! Metadata root and stream headers (ECMA-335 II.24.2.1 / II.24.2.2).

use super::{MetadataError, Result};
use crate::formats::bytes::LeBytes;

pub const METADATA_SIGNATURE: u32 = 0x424A_5342; // "BSJB"

/// Stream names are at most 32 bytes including the terminator
const MAX_STREAM_NAME: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct MetadataRoot<'a> {
    data: &'a [u8],
    pub major_version: u16,
    pub minor_version: u16,
    pub version: String,
    pub streams: Vec<StreamHeader>,
}

impl<'a> MetadataRoot<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let signature = data
            .u32_at(0)
            .ok_or(MetadataError::Truncated { offset: 0 })?;
        if signature != METADATA_SIGNATURE {
            return Err(MetadataError::BadSignature(signature));
        }

        let u16_at = |offset: usize| {
            data.u16_at(offset)
                .ok_or(MetadataError::Truncated { offset })
        };
        let u32_at = |offset: usize| {
            data.u32_at(offset)
                .ok_or(MetadataError::Truncated { offset })
        };

        let major_version = u16_at(4)?;
        let minor_version = u16_at(6)?;
        let version_len = u32_at(12)? as usize;
        let version = data
            .cstr_at(16, version_len)
            .ok_or(MetadataError::Truncated { offset: 16 })?
            .to_string();

        let mut cursor = 16usize.saturating_add(version_len);
        let stream_count = u16_at(cursor + 2)?;
        cursor += 4;

        let mut streams = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let offset = u32_at(cursor)?;
            let size = u32_at(cursor + 4)?;
            let name = data
                .cstr_at(cursor + 8, MAX_STREAM_NAME)
                .ok_or(MetadataError::Truncated { offset: cursor + 8 })?
                .to_string();
            // Name plus terminator, padded to a 4-byte boundary
            cursor += 8 + ((name.len() + 4) & !3);
            streams.push(StreamHeader { name, offset, size });
        }

        Ok(Self {
            data,
            major_version,
            minor_version,
            version,
            streams,
        })
    }

    /// Bytes of the first stream called `name`, if present
    pub fn stream(&self, name: &str) -> Result<Option<&'a [u8]>> {
        let Some(header) = self.streams.iter().find(|s| s.name == name) else {
            return Ok(None);
        };
        self.data
            .slice_at(header.offset as usize, header.size as usize)
            .map(Some)
            .ok_or(MetadataError::Truncated {
                offset: header.offset as usize,
            })
    }
}
