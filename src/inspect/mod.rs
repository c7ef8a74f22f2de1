//! Binary inspection: classify a file and pull out its signing identity.
//!
//! A file is sniffed as a PE image first. PE images report whether their
//! certificate table is populated; managed images additionally report the
//! strong-name public-key token and the assembly-level target framework.
//! Non-PE input and native PE input are ordinary outcomes, not errors.

pub mod framework;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::Path;
use tracing::{debug, warn};

use crate::formats::cli::attributes::fixed_string_argument;
use crate::formats::cli::{Metadata, MetadataError};
use crate::formats::pe::PeImage;
use crate::io::error::IoError;
use crate::io::{sniff_prefix, IOLimits, SafeReader};
use framework::normalize_framework_name;

pub const TARGET_FRAMEWORK_NAMESPACE: &str = "System.Runtime.Versioning";
pub const TARGET_FRAMEWORK_ATTRIBUTE: &str = "TargetFrameworkAttribute";

/// How a file was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssemblyKind {
    /// PE image with readable CLI metadata
    Managed,
    /// PE image without (usable) CLI metadata
    Native,
    /// Not a PE image
    #[default]
    Unrecognized,
}

/// Identity attributes of one file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinaryInfo {
    pub kind: AssemblyKind,
    pub is_signed: bool,
    /// Lowercase hex, empty when not strong-named
    pub public_key_token: String,
    /// Display form such as `.NETFramework,Version=v4.7.2`, or empty
    pub target_framework: String,
}

impl BinaryInfo {
    pub fn is_structured_executable(&self) -> bool {
        self.kind != AssemblyKind::Unrecognized
    }

    pub fn is_managed(&self) -> bool {
        self.kind == AssemblyKind::Managed
    }
}

/// Inspect a file on disk.
///
/// Only I/O failures are errors; anything unparsable degrades to a less
/// specific classification. Non-PE files are classified from their first
/// bytes, and a PE image past the configured limits is left unclassified.
pub fn inspect(path: impl AsRef<Path>, limits: &IOLimits) -> Result<BinaryInfo, IoError> {
    let path = path.as_ref();
    if sniff_prefix(path, 2)?.as_ref() != b"MZ" {
        return Ok(BinaryInfo::default());
    }

    let mut reader = match SafeReader::open(path, limits.clone()) {
        Ok(reader) => reader,
        Err(e @ IoError::FileTooLarge { .. }) => {
            warn!(path = %path.display(), error = %e, "Image too large to inspect");
            return Ok(BinaryInfo::default());
        }
        Err(e) => return Err(e),
    };
    let data = match reader.view() {
        Ok(data) => data,
        Err(e @ IoError::ReadLimitExceeded { .. }) => {
            warn!(path = %path.display(), error = %e, "Image too large to inspect");
            return Ok(BinaryInfo::default());
        }
        Err(e) => return Err(e),
    };
    let info = inspect_bytes(data);
    debug!(
        path = %path.display(),
        kind = ?info.kind,
        signed = info.is_signed,
        token = %info.public_key_token,
        framework = %info.target_framework,
        "Inspected binary"
    );
    Ok(info)
}

/// Inspect an in-memory image.
pub fn inspect_bytes(data: &[u8]) -> BinaryInfo {
    let pe = match PeImage::parse(data) {
        Ok(pe) => pe,
        Err(e) => {
            debug!(error = %e, "Not a PE image");
            return BinaryInfo::default();
        }
    };

    let mut info = BinaryInfo {
        kind: AssemblyKind::Native,
        is_signed: pe.has_certificate_table(),
        ..Default::default()
    };

    if !pe.has_cli_header() {
        return info;
    }

    match managed_identity(&pe) {
        Ok((token, framework)) => {
            info.kind = AssemblyKind::Managed;
            info.public_key_token = token;
            info.target_framework = framework;
        }
        Err(e) => debug!(error = %e, "CLI metadata unreadable, treating as native"),
    }
    info
}

fn managed_identity(pe: &PeImage<'_>) -> Result<(String, String), MetadataError> {
    let metadata = Metadata::from_pe(pe)?;

    // A netmodule has no manifest and therefore no strong name
    let token = metadata
        .assembly()?
        .map(|a| public_key_token(a.public_key))
        .unwrap_or_default();

    let framework = match metadata
        .assembly_attribute(TARGET_FRAMEWORK_NAMESPACE, TARGET_FRAMEWORK_ATTRIBUTE)?
    {
        Some(blob) => match fixed_string_argument(blob) {
            Ok(Some(raw)) => normalize_framework_name(&raw).unwrap_or_else(|| {
                debug!(value = %raw, "Unparsable target framework");
                String::new()
            }),
            Ok(None) => String::new(),
            Err(e) => {
                debug!(error = %e, "Unreadable target framework attribute");
                String::new()
            }
        },
        None => String::new(),
    };

    Ok((token, framework))
}

/// Strong-name public-key token: the last eight bytes of the key's SHA-1
/// digest in reverse order, as lowercase hex. Empty key, empty token.
pub fn public_key_token(public_key: &[u8]) -> String {
    if public_key.is_empty() {
        return String::new();
    }
    let digest = Sha1::digest(public_key);
    let token: Vec<u8> = digest[digest.len() - 8..].iter().rev().copied().collect();
    hex::encode(token)
}
