//! Bounded file access for binary inspection.
//!
//! This module provides a `SafeReader` that memory-maps a file and enforces
//! resource limits, so an oversized or hostile build output cannot exhaust
//! memory while it is being inspected.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Defines the resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
    /// The maximum total number of bytes that can be read from the file across all operations.
    pub max_read_bytes: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024,  // 1GB
            max_read_bytes: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// Reads up to `len` leading bytes of a file.
///
/// No size cap applies, so callers can classify a file before deciding
/// whether it is worth mapping.
pub fn sniff_prefix<P: AsRef<Path>>(path: P, len: u64) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(len as usize);
    File::open(path.as_ref())?.take(len).read_to_end(&mut buf)?;
    Ok(Bytes::from(buf))
}

/// A safe, bounded file reader that uses memory-mapping for efficient access.
pub struct SafeReader {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    limits: IOLimits,
    bytes_read: u64,
    file_size: u64,
}

impl SafeReader {
    /// Opens a file, memory-maps it, and wraps it in a `SafeReader`.
    ///
    /// This function will fail if the file size exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Opening file for safe reading"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file; the build tree is not
            // expected to change underneath a signing run.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            limits,
            bytes_read: 0,
            file_size,
        })
    }

    /// Returns the total size of the underlying file in bytes.
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// Returns the total number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn charge(&mut self, len: u64) -> Result<()> {
        if self.bytes_read.saturating_add(len) > self.limits.max_read_bytes {
            warn!(
                path = %self.path.display(),
                current_read = self.bytes_read,
                requested = len,
                limit = self.limits.max_read_bytes,
                "Read limit exceeded"
            );
            return Err(IoError::ReadLimitExceeded {
                limit: self.limits.max_read_bytes,
                current: self.bytes_read,
            });
        }
        Ok(())
    }

    /// Reads a slice of the file at a given offset.
    ///
    /// Reads past EOF are truncated; a read starting at or past EOF is empty.
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        self.charge(len)?;

        let map = match &self.mmap {
            Some(m) => m,
            None => return Ok(Bytes::new()),
        };

        let offset = offset as usize;
        if offset >= map.len() {
            return Ok(Bytes::new());
        }
        let end = std::cmp::min(offset.saturating_add(len as usize), map.len());
        let out = Bytes::copy_from_slice(&map[offset..end]);
        self.bytes_read += (end - offset) as u64;

        trace!(
            path = %self.path.display(),
            offset = offset,
            len = end - offset,
            total_read = self.bytes_read,
            "Performed read"
        );

        Ok(out)
    }

    /// Equivalent to `read_at(0, len)`.
    pub fn read_prefix(&mut self, len: u64) -> Result<Bytes> {
        self.read_at(0, len)
    }

    /// Borrows the whole mapped file, charging its full size to the read budget.
    pub fn view(&mut self) -> Result<&[u8]> {
        self.charge(self.file_size)?;
        self.bytes_read += self.file_size;
        Ok(self.mmap.as_deref().unwrap_or(&[]))
    }
}
