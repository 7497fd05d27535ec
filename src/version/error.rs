use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::version::types::LatestRelease;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid client configuration: {0}")]
    Client(String),
}

/// Why no release could be reported for a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchErrorKind {
    /// The package identifier or its range is malformed
    InvalidSpec,
    /// Nothing satisfying the range has been published
    NoReleases,
    /// Releases satisfy the range, but all predate the grace window
    TooOld,
    /// The session gave up before a release showed up
    Timeout,
}

/// A package has no qualifying release (yet), or could not be looked up at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({package_name}@{target_version_range})")]
pub struct ReleaseMatchError {
    pub kind: MatchErrorKind,
    pub message: String,
    pub package_name: String,
    pub target_version_range: String,
    pub released_after: DateTime<Utc>,
    /// Most recent release satisfying the range, when one exists
    pub latest: Option<LatestRelease>,
}

impl ReleaseMatchError {
    fn new(
        kind: MatchErrorKind,
        message: String,
        package_name: &str,
        target_version_range: &str,
        released_after: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            message,
            package_name: package_name.to_string(),
            target_version_range: target_version_range.to_string(),
            released_after,
            latest: None,
        }
    }

    pub fn invalid_spec(input: &str, released_after: DateTime<Utc>) -> Self {
        Self::new(
            MatchErrorKind::InvalidSpec,
            format!("Invalid package string: '{input}'"),
            input,
            "?",
            released_after,
        )
    }

    pub fn invalid_range(
        package_name: &str,
        target_version_range: &str,
        released_after: DateTime<Utc>,
    ) -> Self {
        Self::new(
            MatchErrorKind::InvalidSpec,
            format!("Invalid version range: '{target_version_range}'"),
            package_name,
            target_version_range,
            released_after,
        )
    }

    /// `empty_registry` distinguishes a package with no publish records at all
    pub fn no_releases(
        package_name: &str,
        target_version_range: &str,
        released_after: DateTime<Utc>,
        empty_registry: bool,
    ) -> Self {
        let message = if empty_registry {
            "No releases found"
        } else {
            "No matching releases found"
        };
        Self::new(
            MatchErrorKind::NoReleases,
            message.to_string(),
            package_name,
            target_version_range,
            released_after,
        )
    }

    pub fn too_old(
        package_name: &str,
        target_version_range: &str,
        released_after: DateTime<Utc>,
        latest: LatestRelease,
    ) -> Self {
        let mut error = Self::new(
            MatchErrorKind::TooOld,
            format!("Latest release ({}) is too old", latest.version),
            package_name,
            target_version_range,
            released_after,
        );
        error.latest = Some(latest);
        error
    }

    pub fn timeout(
        package_name: &str,
        target_version_range: &str,
        released_after: DateTime<Utc>,
        timeout_secs: f64,
        latest: Option<LatestRelease>,
    ) -> Self {
        let mut error = Self::new(
            MatchErrorKind::Timeout,
            format!("Timeout after {timeout_secs}s"),
            package_name,
            target_version_range,
            released_after,
        );
        error.latest = latest;
        error
    }

    /// "Not yet" outcomes the poll loop keeps retrying
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, MatchErrorKind::NoReleases | MatchErrorKind::TooOld)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn released_after() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn display_names_package_and_range() {
        let error = ReleaseMatchError::no_releases("lodash", ">=0", released_after(), true);

        assert_eq!(error.to_string(), "No releases found (lodash@>=0)");
        assert!(error.is_transient());
    }

    #[test]
    fn too_old_reports_latest_version() {
        let latest = LatestRelease {
            version: "1.2.0".to_string(),
            time: released_after(),
        };
        let error = ReleaseMatchError::too_old("lodash", "1.x", released_after(), latest.clone());

        assert_eq!(
            error.to_string(),
            "Latest release (1.2.0) is too old (lodash@1.x)"
        );
        assert_eq!(error.kind, MatchErrorKind::TooOld);
        assert_eq!(error.latest, Some(latest));
        assert!(error.is_transient());
    }

    #[test]
    fn invalid_spec_and_timeout_are_not_transient() {
        let invalid = ReleaseMatchError::invalid_spec("%bad", released_after());
        let timeout = ReleaseMatchError::timeout("lodash", ">=0", released_after(), 1.5, None);

        assert_eq!(invalid.to_string(), "Invalid package string: '%bad' (%bad@?)");
        assert_eq!(timeout.to_string(), "Timeout after 1.5s (lodash@>=0)");
        assert!(!invalid.is_transient());
        assert!(!timeout.is_transient());
    }
}
