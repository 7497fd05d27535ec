//! Package spec parser: `[@scope/]name[@range]`

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::version::range::RangeSpec;

/// Range used when a spec names no version: every stable release
pub const ANY_VERSION: &str = ">=0";

// Capturing groups: @scope/package-name, @scope, package-name, range
static PACKAGE_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:(@[a-z0-9~-][a-z0-9._~-]*)/)?([a-z0-9~-][a-z0-9._~-]*))(?:@([^@]+))?$")
        .expect("valid package spec pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("Invalid package string: '{0}'")]
    InvalidSpec(String),

    #[error("Invalid version range '{range}' for package '{name}'")]
    InvalidRange { name: String, range: String },
}

/// A package identifier with an optional scope and version range
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    name: String,
    scope: Option<String>,
    version_range: String,
    range: RangeSpec,
}

impl PackageSpec {
    /// Parse `pkg`, `@scope/pkg`, `pkg@1.x`, `@scope/pkg@>=2.0.0 <3.0.0`, ...
    pub fn parse(input: &str) -> Result<Self, SpecError> {
        let captures = PACKAGE_SPEC
            .captures(input)
            .ok_or_else(|| SpecError::InvalidSpec(input.to_string()))?;

        let name = captures[1].to_string();
        let scope = captures.get(2).map(|m| m.as_str().to_string());
        let version_range = captures
            .get(4)
            .map_or(ANY_VERSION, |m| m.as_str())
            .to_string();

        let range = RangeSpec::parse(&version_range).ok_or_else(|| SpecError::InvalidRange {
            name: name.clone(),
            range: version_range.clone(),
        })?;

        Ok(Self {
            name,
            scope,
            version_range,
            range,
        })
    }

    /// Full package name, including the scope
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `@scope`, for scoped packages
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The range as written, or [`ANY_VERSION`]
    pub fn version_range(&self) -> &str {
        &self.version_range
    }

    pub fn range(&self) -> &RangeSpec {
        &self.range
    }
}

impl FromStr for PackageSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version_range)
    }
}
