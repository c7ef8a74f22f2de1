//! Target framework display names.
//!
//! The `TargetFrameworkAttribute` argument is a framework name such as
//! `.NETCoreApp, Version = 3.1`. It is normalized to the canonical display
//! form `Identifier,Version=vX.Y[,Profile=Name]` so certificate tables can
//! key on it verbatim.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkName {
    pub identifier: String,
    pub version: Vec<u32>,
    pub profile: Option<String>,
}

impl FrameworkName {
    /// Parse a framework name; `None` when it is malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut components = raw.split(',');
        let identifier = components.next()?.trim();
        if identifier.is_empty() {
            return None;
        }

        let mut version = None;
        let mut profile = None;
        for component in components {
            let (key, value) = component.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("version") {
                if version.is_some() {
                    return None;
                }
                version = Some(parse_version(value)?);
            } else if key.eq_ignore_ascii_case("profile") {
                if profile.is_some() {
                    return None;
                }
                profile = Some(value.to_string());
            } else {
                return None;
            }
        }

        Some(Self {
            identifier: identifier.to_string(),
            version: version?,
            profile: profile.filter(|p| !p.is_empty()),
        })
    }
}

fn parse_version(value: &str) -> Option<Vec<u32>> {
    let value = value
        .strip_prefix('v')
        .or_else(|| value.strip_prefix('V'))
        .unwrap_or(value);
    let parts = value
        .split('.')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    (2..=4).contains(&parts.len()).then_some(parts)
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self
            .version
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{},Version=v{}", self.identifier, version)?;
        if let Some(profile) = &self.profile {
            write!(f, ",Profile={}", profile)?;
        }
        Ok(())
    }
}

/// Canonical display form of `raw`, or `None` when it does not parse.
pub fn normalize_framework_name(raw: &str) -> Option<String> {
    FrameworkName::parse(raw).map(|f| f.to_string())
}
