//! Canonical `os-arch` target identifiers.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// An operating system / architecture pair, written as `os-arch` (e.g. `linux-amd64`).
///
/// This string form is also the name of the per-target directory that holds
/// built binaries, so it must round-trip exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct OsArch {
    pub os: String,
    pub arch: String,
}

/// Error returned when an `os-arch` string is malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid os-arch '{0}': expected exactly two non-empty components of the form 'os-arch'")]
pub struct ParseOsArchError(pub String);

impl OsArch {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The os-arch of the running platform, using the canonical names
    /// build tools use for output directories (`darwin`, `amd64`, ...).
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "powerpc64" => "ppc64",
            other => other,
        };
        Self::new(os, arch)
    }
}

impl fmt::Display for OsArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for OsArch {
    type Err = ParseOsArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(os), Some(arch), None) if !os.is_empty() && !arch.is_empty() => {
                Ok(Self::new(os, arch))
            }
            _ => Err(ParseOsArchError(s.to_string())),
        }
    }
}

impl TryFrom<String> for OsArch {
    type Error = ParseOsArchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
