//! Plan emission and the missing-certificate report.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, SignToolError};

use super::engine::RunContext;
use super::types::{MissingCertificate, SigningPlan};

impl RunContext<'_> {
    /// Close the run.
    ///
    /// Missing certificates fail the run after writing the suggestions
    /// report. Unreadable containers fail it only in strict mode.
    pub fn emit(self) -> Result<SigningPlan> {
        if !self.missing.is_empty() {
            let report = self.config.suggestions_path();
            write_suggestions(&report, &self.missing)?;
            warn!(
                count = self.missing.len(),
                report = %report.display(),
                "Files without a certificate"
            );
            return Err(SignToolError::MissingCertificates {
                entries: self.missing,
                report,
            });
        }

        if self.config.fail_on_unreadable_container && !self.unreadable.is_empty() {
            return Err(SignToolError::UnreadableContainers {
                paths: self.unreadable,
            });
        }

        let plan = SigningPlan {
            files_to_sign: self.files_to_sign,
            containers: self.containers.into_iter().collect(),
            copies: self.copies,
        };
        let summary = plan.summary();
        info!(
            files_to_sign = summary.files_to_sign,
            containers = summary.containers,
            nested_parts = summary.nested_parts,
            copies = summary.copies,
            unreadable_containers = self.unreadable.len(),
            "Signing plan ready"
        );
        Ok(plan)
    }
}

/// Render the suggestions as an MSBuild item group, one line per file
pub fn render_suggestions(missing: &[MissingCertificate]) -> String {
    let unique: BTreeSet<&MissingCertificate> = missing.iter().collect();
    let mut out = String::from("<Project>\n  <ItemGroup>\n");
    for entry in unique {
        let _ = writeln!(
            out,
            "    <FileSignInfo Include=\"{}\" CertificateName=\"{}\" />",
            escape_attribute(&entry.file_name),
            escape_attribute(&entry.suggested_certificate)
        );
    }
    out.push_str("  </ItemGroup>\n</Project>\n");
    out
}

pub fn write_suggestions(path: &Path, missing: &[MissingCertificate]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SignToolError::io(parent, e))?;
    }
    fs::write(path, render_suggestions(missing)).map_err(|e| SignToolError::io(path, e))
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
