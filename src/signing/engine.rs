//! The tracking engine.
//!
//! All state of one run lives in [`RunContext`]. Files are tracked
//! depth-first: a container is unpacked, and each of its entries tracked,
//! before `track` returns for the container itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::SignToolConfig;
use crate::error::{Result, SignToolError};
use crate::hashing::ContentHash;
use crate::inspect::inspect;
use crate::{log_error, span_trace};

use super::resolver::CertificateResolver;
use super::types::{
    ContainerDescriptor, ContentIdentityKey, CopyInstruction, MissingCertificate, TrackedFile,
};

/// Mutable state of a single signing run
pub struct RunContext<'a> {
    pub(crate) config: &'a SignToolConfig,
    pub(crate) resolver: CertificateResolver<'a>,
    pub(crate) cache: HashMap<ContentIdentityKey, TrackedFile>,
    pub(crate) files_to_sign: Vec<TrackedFile>,
    pub(crate) copies: Vec<CopyInstruction>,
    pub(crate) containers: HashMap<ContentHash, ContainerDescriptor>,
    pub(crate) missing: Vec<MissingCertificate>,
    pub(crate) unreadable: Vec<PathBuf>,
    /// Cache keys and container hashes in insertion order, for rollback
    tracked: Vec<ContentIdentityKey>,
    unpacked: Vec<ContentHash>,
}

/// Run state lengths taken before a container is unpacked
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    files_to_sign: usize,
    missing: usize,
    tracked: usize,
    unpacked: usize,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a SignToolConfig, resolver: CertificateResolver<'a>) -> Self {
        Self {
            config,
            resolver,
            cache: HashMap::new(),
            files_to_sign: Vec::new(),
            copies: Vec::new(),
            containers: HashMap::new(),
            missing: Vec::new(),
            unreadable: Vec::new(),
            tracked: Vec::new(),
            unpacked: Vec::new(),
        }
    }

    /// Tracked file for a content identity, if one exists already
    pub fn cached(&self, key: &ContentIdentityKey) -> Option<&TrackedFile> {
        self.cache.get(key)
    }

    /// Track a top-level input.
    pub fn track_top_level(&mut self, path: &Path, hash: ContentHash) -> Result<TrackedFile> {
        self.track(path, hash, 0)
    }

    /// Track `path` with known content `hash`.
    ///
    /// `depth` is 0 for top-level inputs and the container nesting level
    /// for staged entries.
    pub(crate) fn track(
        &mut self,
        path: &Path,
        hash: ContentHash,
        depth: usize,
    ) -> Result<TrackedFile> {
        let file_name = base_name(path);
        let key = ContentIdentityKey::new(hash, file_name.clone());
        let nested = depth > 0;

        if let Some(existing) = self.cache.get(&key) {
            // Nested entries are deduplicated before they are extracted
            debug_assert!(!nested, "nested duplicate reached track: {}", path.display());
            debug!(
                source = %existing.path.display(),
                destination = %path.display(),
                "Duplicate content, copying signed result"
            );
            self.copies.push(CopyInstruction {
                source: existing.path.clone(),
                destination: path.to_path_buf(),
            });
            return Ok(existing.clone());
        }

        let span = span_trace!("track", path = %path.display(), nested);
        let _guard = span.enter();

        let info = inspect(path, &self.config.io).map_err(|source| SignToolError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let resolution = self.resolver.resolve_info(&file_name, &info);
        if let Some(missing) = resolution.missing {
            self.missing.push(missing);
        }

        let file = TrackedFile {
            path: path.to_path_buf(),
            file_name,
            hash,
            decision: resolution.decision,
        };
        debug!(kind = ?info.kind, decision = %file.decision, "Tracked file");
        self.tracked.push(file.key());
        self.cache.insert(key, file.clone());

        if self.config.is_container(&file.file_name) && !self.containers.contains_key(&hash) {
            let checkpoint = self.checkpoint();
            match self.unpack_container(&file, depth) {
                Ok(descriptor) => {
                    self.unpacked.push(hash);
                    self.containers.insert(hash, descriptor);
                }
                Err(e) => {
                    let discarded = self.rollback(checkpoint);
                    log_error!(e, "nested files of this container will not be signed");
                    if discarded > 0 {
                        warn!(
                            container = %path.display(),
                            discarded,
                            "Dropped entries tracked before the container failed"
                        );
                    }
                    self.unreadable.push(path.to_path_buf());
                }
            }
        }

        if file.decision.should_sign() {
            self.files_to_sign.push(file.clone());
        }
        Ok(file)
    }
}

impl RunContext<'_> {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            files_to_sign: self.files_to_sign.len(),
            missing: self.missing.len(),
            tracked: self.tracked.len(),
            unpacked: self.unpacked.len(),
        }
    }

    /// Forget everything tracked since `checkpoint`.
    ///
    /// Entries of a container that failed part-way would otherwise be
    /// signed without ever being repacked. Returns the number of tracked
    /// files discarded.
    fn rollback(&mut self, checkpoint: Checkpoint) -> usize {
        self.files_to_sign.truncate(checkpoint.files_to_sign);
        self.missing.truncate(checkpoint.missing);
        for hash in self.unpacked.drain(checkpoint.unpacked..) {
            self.containers.remove(&hash);
        }
        let discarded = self.tracked.len() - checkpoint.tracked;
        for key in self.tracked.drain(checkpoint.tracked..) {
            self.cache.remove(&key);
        }
        discarded
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
