//! Container unpacking.
//!
//! Entries are hashed straight out of the archive. Only content that has
//! not been tracked under the same name is extracted, to
//! `<temp>/ContainerSigning/<hash>/<name>`, and then tracked like any other
//! file one level deeper.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Result, SignToolError};
use crate::hashing::{hash_reader, ContentHash};
use crate::span_trace;

use super::engine::{base_name, RunContext};
use super::types::{ContainerDescriptor, ContentIdentityKey, TrackedFile, ZipPart};

impl RunContext<'_> {
    /// Walk `container` and track every entry the extension policy selects.
    ///
    /// Any failure abandons the whole container.
    pub(crate) fn unpack_container(
        &mut self,
        container: &TrackedFile,
        depth: usize,
    ) -> Result<ContainerDescriptor> {
        let path = container.path.as_path();
        if depth >= self.config.max_container_depth {
            return Err(SignToolError::ContainerDepthExceeded {
                path: path.to_path_buf(),
                limit: self.config.max_container_depth,
            });
        }

        let span = span_trace!("unpack", path = %path.display(), depth);
        let _guard = span.enter();

        let file = File::open(path).map_err(|e| SignToolError::io(path, e))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(path, e))?;

        let mut parts = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| archive_error(path, e))?;
            if entry.is_dir() {
                continue;
            }
            let relative_path = entry.name().to_string();
            let Some(enclosed) = entry.enclosed_name() else {
                warn!(container = %path.display(), entry = %relative_path, "Skipping unsafe entry name");
                continue;
            };
            let file_name = base_name(&enclosed);
            if file_name.is_empty() || !self.resolver.policy_allows(&file_name) {
                debug!(entry = %relative_path, "Entry not selected by extension policy");
                continue;
            }

            let hash = hash_reader(&mut entry).map_err(|e| SignToolError::io(path, e))?;
            drop(entry);

            let key = ContentIdentityKey::new(hash, file_name.clone());
            let file = match self.cached(&key).cloned() {
                Some(existing) => {
                    debug!(entry = %relative_path, "Entry content already tracked");
                    existing
                }
                None => {
                    let staged = self.stage_entry(&mut archive, index, hash, &file_name, path)?;
                    self.track(&staged, hash, depth + 1)?
                }
            };
            parts.push(ZipPart {
                relative_path,
                file,
            });
        }

        debug!(parts = parts.len(), "Unpacked container");
        Ok(ContainerDescriptor {
            file: container.clone(),
            parts,
        })
    }

    fn stage_entry<R: io::Read + io::Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
        hash: ContentHash,
        file_name: &str,
        container: &Path,
    ) -> Result<PathBuf> {
        let dir = self.config.staging_root().join(hash.to_hex());
        fs::create_dir_all(&dir).map_err(|e| SignToolError::io(&dir, e))?;
        let staged = dir.join(file_name);

        let mut entry = archive
            .by_index(index)
            .map_err(|e| archive_error(container, e))?;
        let mut out = File::create(&staged).map_err(|e| SignToolError::io(&staged, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| SignToolError::io(&staged, e))?;
        debug!(staged = %staged.display(), "Extracted entry");
        Ok(staged)
    }
}

fn archive_error(path: &Path, source: zip::result::ZipError) -> SignToolError {
    SignToolError::Archive {
        path: path.to_path_buf(),
        source,
    }
}
