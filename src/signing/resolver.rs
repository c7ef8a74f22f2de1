//! Certificate resolution.
//!
//! Lookups go from most to least specific key and the first hit wins:
//! (name, token, framework), then (name, token), then the name alone.
//! Token and framework are each optional, so (name, framework) entries
//! serve assemblies without a strong name.

use tracing::{debug, warn};

use crate::config::{CertificateTables, ExplicitCertificateKey, ExtensionPolicy, SignToolConfig};
use crate::inspect::BinaryInfo;

use super::types::{MissingCertificate, SignDecision};

/// Decision for one file, plus the report entry when nothing matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: SignDecision,
    pub missing: Option<MissingCertificate>,
}

impl Resolution {
    fn decided(decision: SignDecision) -> Self {
        Self {
            decision,
            missing: None,
        }
    }
}

pub struct CertificateResolver<'a> {
    config: &'a SignToolConfig,
    tables: &'a CertificateTables,
    policy: &'a ExtensionPolicy,
}

impl<'a> CertificateResolver<'a> {
    pub fn new(
        config: &'a SignToolConfig,
        tables: &'a CertificateTables,
        policy: &'a ExtensionPolicy,
    ) -> Self {
        Self {
            config,
            tables,
            policy,
        }
    }

    /// Most specific table entry for the given identity
    pub fn lookup(
        &self,
        file_name: &str,
        public_key_token: &str,
        target_framework: &str,
    ) -> Option<&'a str> {
        // Empty token or framework collapse to absent key parts, so an
        // unsigned assembly can still match a (name, framework) entry
        let keys = [
            ExplicitCertificateKey::new(file_name, Some(public_key_token), Some(target_framework)),
            ExplicitCertificateKey::new(file_name, Some(public_key_token), None),
            ExplicitCertificateKey::name_only(file_name),
        ];
        keys.iter()
            .find_map(|key| self.tables.explicit(key))
            .or_else(|| self.tables.file_name(file_name))
    }

    pub fn resolve(
        &self,
        file_name: &str,
        public_key_token: &str,
        target_framework: &str,
        is_signed: bool,
    ) -> Resolution {
        let Some(cert) = self.lookup(file_name, public_key_token, target_framework) else {
            if is_signed {
                debug!(file = %file_name, "No certificate entry, keeping existing signature");
                return Resolution::decided(SignDecision::AlreadySigned);
            }
            let suggested = self.suggest(file_name);
            warn!(file = %file_name, suggested = %suggested, "No certificate entry");
            return Resolution {
                decision: SignDecision::Ignore,
                missing: Some(MissingCertificate {
                    file_name: file_name.to_string(),
                    suggested_certificate: suggested,
                }),
            };
        };

        if self.config.is_ignore(cert) {
            return Resolution::decided(SignDecision::Ignore);
        }
        if is_signed && !self.config.is_resign_capable(cert) {
            debug!(
                file = %file_name,
                certificate = %cert,
                "Already signed and certificate cannot re-sign"
            );
            return Resolution::decided(SignDecision::AlreadySigned);
        }
        Resolution::decided(SignDecision::ShouldSign(cert.to_string()))
    }

    pub fn resolve_info(&self, file_name: &str, info: &BinaryInfo) -> Resolution {
        self.resolve(
            file_name,
            &info.public_key_token,
            &info.target_framework,
            info.is_signed,
        )
    }

    /// Certificate to propose in the suggestions report
    pub fn suggest(&self, file_name: &str) -> String {
        match self.policy.certificate_for(file_name) {
            Some(cert) if !self.config.is_ignore(cert) => cert.to_string(),
            _ => self.config.default_certificate.clone(),
        }
    }

    /// Whether an archive entry with this name is considered at all
    pub fn policy_allows(&self, file_name: &str) -> bool {
        self.policy
            .certificate_for(file_name)
            .is_some_and(|cert| !self.config.is_ignore(cert))
    }
}
