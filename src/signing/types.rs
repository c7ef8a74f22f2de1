//! Records produced by a signing run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::hashing::ContentHash;

/// What to do with one tracked file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "certificate")]
pub enum SignDecision {
    ShouldSign(String),
    AlreadySigned,
    Ignore,
}

impl SignDecision {
    pub fn should_sign(&self) -> bool {
        matches!(self, Self::ShouldSign(_))
    }

    pub fn certificate(&self) -> Option<&str> {
        match self {
            Self::ShouldSign(cert) => Some(cert),
            _ => None,
        }
    }
}

impl fmt::Display for SignDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShouldSign(cert) => write!(f, "sign with {cert}"),
            Self::AlreadySigned => f.write_str("already signed"),
            Self::Ignore => f.write_str("ignore"),
        }
    }
}

/// Content plus base name: the unit of deduplication.
///
/// The same bytes under two names are tracked twice because an archive may
/// need each name signed on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentIdentityKey {
    pub hash: ContentHash,
    pub file_name: String,
}

impl ContentIdentityKey {
    pub fn new(hash: ContentHash, file_name: impl Into<String>) -> Self {
        Self {
            hash,
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub hash: ContentHash,
    pub decision: SignDecision,
}

impl TrackedFile {
    pub fn key(&self) -> ContentIdentityKey {
        ContentIdentityKey::new(self.hash, self.file_name.clone())
    }
}

/// A nested file and where it lives inside its container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipPart {
    pub relative_path: String,
    pub file: TrackedFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub file: TrackedFile,
    pub parts: Vec<ZipPart>,
}

/// Copy already-processed content from `source` to `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyInstruction {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A file no certificate could be resolved for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MissingCertificate {
    pub file_name: String,
    pub suggested_certificate: String,
}

/// Output of a successful run, consumed by the signing executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPlan {
    pub files_to_sign: Vec<TrackedFile>,
    pub containers: BTreeMap<ContentHash, ContainerDescriptor>,
    pub copies: Vec<CopyInstruction>,
}

/// Counts for the end-of-run log line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub files_to_sign: usize,
    pub containers: usize,
    pub nested_parts: usize,
    pub copies: usize,
}

impl SigningPlan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            files_to_sign: self.files_to_sign.len(),
            containers: self.containers.len(),
            nested_parts: self.containers.values().map(|c| c.parts.len()).sum(),
            copies: self.copies.len(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
