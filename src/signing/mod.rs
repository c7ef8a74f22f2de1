//! Signing-plan computation.
//!
//! [`BatchSigner`] drives a run: every input is hashed, then tracked in
//! input order through a [`RunContext`], and the context is finally
//! turned into a [`SigningPlan`].

pub mod engine;
pub mod plan;
pub mod resolver;
pub mod types;
pub mod unpacker;

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{CertificateTables, ExtensionPolicy, SignToolConfig};
use crate::error::{Result, SignToolError};
use crate::hashing::{hash_file, ContentHash};
use crate::span_trace;

pub use engine::RunContext;
pub use resolver::{CertificateResolver, Resolution};
pub use types::{
    ContainerDescriptor, ContentIdentityKey, CopyInstruction, MissingCertificate, PlanSummary,
    SignDecision, SigningPlan, TrackedFile, ZipPart,
};

/// Computes signing plans for batches of build outputs.
#[derive(Debug, Clone)]
pub struct BatchSigner {
    config: SignToolConfig,
    tables: CertificateTables,
    policy: ExtensionPolicy,
}

impl BatchSigner {
    pub fn new(config: SignToolConfig, tables: CertificateTables, policy: ExtensionPolicy) -> Self {
        Self {
            config,
            tables,
            policy,
        }
    }

    pub fn config(&self) -> &SignToolConfig {
        &self.config
    }

    pub fn resolver(&self) -> CertificateResolver<'_> {
        CertificateResolver::new(&self.config, &self.tables, &self.policy)
    }

    /// Plan signing for `paths`, in order.
    ///
    /// Hashing runs in parallel; tracking is sequential so duplicate
    /// detection and output order depend only on input order.
    pub fn run<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<SigningPlan> {
        self.config.validate()?;
        let span = span_trace!("signing_run", inputs = paths.len());
        let _guard = span.enter();

        let hashed: Vec<(PathBuf, ContentHash)> = paths
            .par_iter()
            .map(|p| {
                let path = p.as_ref();
                let meta = path.metadata().map_err(|e| SignToolError::io(path, e))?;
                if !meta.is_file() {
                    return Err(SignToolError::io(
                        path,
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
                    ));
                }
                let hash = hash_file(path).map_err(|e| SignToolError::io(path, e))?;
                Ok((path.to_path_buf(), hash))
            })
            .collect::<Result<_>>()?;
        info!(inputs = hashed.len(), "Hashed inputs");

        let mut ctx = RunContext::new(&self.config, self.resolver());
        for (path, hash) in &hashed {
            ctx.track_top_level(path, *hash)?;
        }
        ctx.emit()
    }
}
