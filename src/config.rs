//! Configuration for a signing run.
//!
//! `SignToolConfig` carries run-wide settings with defaults for every field,
//! so a JSON file only needs the values it overrides. The certificate
//! tables and the archive-entry extension policy are supplied by the host
//! build separately and are plain serde types as well.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Result, SignToolError};
use crate::io::IOLimits;

/// Name of the staging directory created under `temp_dir`
pub const STAGING_DIR_NAME: &str = "ContainerSigning";

/// File name of the missing-certificate report written under `temp_dir`
pub const SUGGESTIONS_FILE_NAME: &str = "SigningSuggestions.props";

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignToolConfig {
    /// Root for staged container entries and the suggestions report.
    pub temp_dir: PathBuf,
    /// Certificate suggested for files that resolve to nothing.
    pub default_certificate: String,
    /// Certificate name meaning "do not sign this file".
    pub ignore_certificate: String,
    /// Certificates that may replace an existing signature.
    pub resign_certificates: Vec<String>,
    /// Extensions (with leading dot) that are unpacked as containers.
    pub container_extensions: Vec<String>,
    /// How deeply containers may nest inside one another.
    pub max_container_depth: usize,
    /// Fail the run when any container could not be unpacked.
    pub fail_on_unreadable_container: bool,
    /// Limits for reading binaries during inspection.
    pub io: IOLimits,
}

impl Default for SignToolConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            default_certificate: "Microsoft400".to_string(),
            ignore_certificate: "None".to_string(),
            resign_certificates: Vec::new(),
            container_extensions: vec![".zip".into(), ".nupkg".into(), ".vsix".into()],
            max_container_depth: 16,
            fail_on_unreadable_container: false,
            io: IOLimits::default(),
        }
    }
}

impl SignToolConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SignToolError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ignore_certificate.is_empty() {
            return Err(SignToolError::Config(
                "ignore_certificate must not be empty".into(),
            ));
        }
        if let Some(ext) = self
            .container_extensions
            .iter()
            .find(|e| !e.starts_with('.'))
        {
            return Err(SignToolError::Config(format!(
                "container extension {ext:?} must start with '.'"
            )));
        }
        Ok(())
    }

    pub fn is_ignore(&self, certificate: &str) -> bool {
        certificate.eq_ignore_ascii_case(&self.ignore_certificate)
    }

    pub fn is_resign_capable(&self, certificate: &str) -> bool {
        self.resign_certificates
            .iter()
            .any(|c| c.eq_ignore_ascii_case(certificate))
    }

    pub fn is_container(&self, file_name: &str) -> bool {
        let ext = extension_of(file_name);
        !ext.is_empty()
            && self
                .container_extensions
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&ext))
    }

    pub fn staging_root(&self) -> PathBuf {
        self.temp_dir.join(STAGING_DIR_NAME)
    }

    pub fn suggestions_path(&self) -> PathBuf {
        self.temp_dir.join(SUGGESTIONS_FILE_NAME)
    }
}

/// Lowercase extension of a file name including the dot, or empty.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Key into the explicit certificate table.
///
/// File names and tokens are case-folded on construction; the target
/// framework is compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExplicitCertificateKey {
    pub file_name: String,
    pub public_key_token: Option<String>,
    pub target_framework: Option<String>,
}

impl ExplicitCertificateKey {
    pub fn new(
        file_name: &str,
        public_key_token: Option<&str>,
        target_framework: Option<&str>,
    ) -> Self {
        Self {
            file_name: file_name.to_lowercase(),
            public_key_token: public_key_token
                .filter(|t| !t.is_empty())
                .map(str::to_ascii_lowercase),
            target_framework: target_framework
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    pub fn name_only(file_name: &str) -> Self {
        Self::new(file_name, None, None)
    }
}

/// One row of the explicit table as it appears in JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ExplicitEntry {
    file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_framework: Option<String>,
    certificate: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CertificateTablesFile {
    #[serde(default)]
    file_names: BTreeMap<String, String>,
    #[serde(default)]
    explicit: Vec<ExplicitEntry>,
}

/// Certificate tables supplied by the host build.
///
/// `file_names` maps a base name to a certificate; `explicit` maps a base
/// name qualified by public-key token and target framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CertificateTablesFile", into = "CertificateTablesFile")]
pub struct CertificateTables {
    file_names: HashMap<String, String>,
    explicit: HashMap<ExplicitCertificateKey, String>,
}

impl CertificateTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file_name(&mut self, file_name: &str, certificate: impl Into<String>) {
        self.file_names
            .insert(file_name.to_lowercase(), certificate.into());
    }

    pub fn insert_explicit(&mut self, key: ExplicitCertificateKey, certificate: impl Into<String>) {
        self.explicit.insert(key, certificate.into());
    }

    pub fn with_file_name(mut self, file_name: &str, certificate: impl Into<String>) -> Self {
        self.insert_file_name(file_name, certificate);
        self
    }

    pub fn with_explicit(
        mut self,
        key: ExplicitCertificateKey,
        certificate: impl Into<String>,
    ) -> Self {
        self.insert_explicit(key, certificate);
        self
    }

    pub fn file_name(&self, file_name: &str) -> Option<&str> {
        self.file_names
            .get(&file_name.to_lowercase())
            .map(String::as_str)
    }

    pub fn explicit(&self, key: &ExplicitCertificateKey) -> Option<&str> {
        self.explicit.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.file_names.len() + self.explicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SignToolError::io(path, e))?;
        Self::from_json_str(&json)
    }
}

impl From<CertificateTablesFile> for CertificateTables {
    fn from(file: CertificateTablesFile) -> Self {
        let mut tables = Self::new();
        for (name, cert) in file.file_names {
            tables.insert_file_name(&name, cert);
        }
        for entry in file.explicit {
            let key = ExplicitCertificateKey::new(
                &entry.file_name,
                entry.public_key_token.as_deref(),
                entry.target_framework.as_deref(),
            );
            tables.insert_explicit(key, entry.certificate);
        }
        tables
    }
}

impl From<CertificateTables> for CertificateTablesFile {
    fn from(tables: CertificateTables) -> Self {
        let mut explicit: Vec<ExplicitEntry> = tables
            .explicit
            .into_iter()
            .map(|(key, certificate)| ExplicitEntry {
                file_name: key.file_name,
                public_key_token: key.public_key_token,
                target_framework: key.target_framework,
                certificate,
            })
            .collect();
        explicit.sort_by(|a, b| {
            (&a.file_name, &a.public_key_token, &a.target_framework).cmp(&(
                &b.file_name,
                &b.public_key_token,
                &b.target_framework,
            ))
        });
        Self {
            file_names: tables.file_names.into_iter().collect(),
            explicit,
        }
    }
}

/// Per-extension signing policy for archive entries.
///
/// Keys are lowercase extensions with the leading dot. An entry whose
/// extension is unknown, or maps to the ignore certificate, is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct ExtensionPolicy {
    entries: BTreeMap<String, String>,
}

impl ExtensionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, extension: &str, certificate: impl Into<String>) -> Self {
        self.insert(extension, certificate);
        self
    }

    pub fn insert(&mut self, extension: &str, certificate: impl Into<String>) {
        let ext = extension.to_ascii_lowercase();
        let ext = if ext.starts_with('.') { ext } else { format!(".{ext}") };
        self.entries.insert(ext, certificate.into());
    }

    /// Certificate registered for the extension of `file_name`
    pub fn certificate_for(&self, file_name: &str) -> Option<&str> {
        self.entries
            .get(&extension_of(file_name))
            .map(String::as_str)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<BTreeMap<String, String>> for ExtensionPolicy {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut policy = Self::new();
        for (ext, cert) in map {
            policy.insert(&ext, cert);
        }
        policy
    }
}

impl From<ExtensionPolicy> for BTreeMap<String, String> {
    fn from(policy: ExtensionPolicy) -> Self {
        policy.entries
    }
}
