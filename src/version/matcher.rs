//! Release selection: newest version satisfying a range and the grace window

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::parser::spec::PackageSpec;
use crate::version::error::ReleaseMatchError;
use crate::version::types::{LatestRelease, RegistryMetadata, Release};

/// Pick the most recently published version of `spec` released at or after `released_after`
///
/// Versions are ordered by publish time, newest first, then filtered by the spec's range.
/// - No version in range: `NoReleases`
/// - Versions in range, all older than the cutoff: `TooOld`, naming the newest of them
///
/// Manifest keys starting with any of `private_prefixes` are dropped from the release.
pub fn match_release(
    metadata: &RegistryMetadata,
    spec: &PackageSpec,
    released_after: DateTime<Utc>,
    private_prefixes: &[String],
) -> Result<Release, ReleaseMatchError> {
    let mut candidates: Vec<(&str, &str, DateTime<Utc>)> = metadata
        .times
        .iter()
        .filter(|(version, _)| spec.range().satisfies_str(version))
        .filter_map(|(version, time)| {
            parse_time(time).map(|parsed| (version.as_str(), time.as_str(), parsed))
        })
        .collect();

    // Newest first; equal instants fall back to the raw timestamp, then the version string
    candidates.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| b.1.cmp(a.1))
            .then_with(|| b.0.cmp(a.0))
    });

    let Some(&(latest_version, _, latest_time)) = candidates.first() else {
        return Err(ReleaseMatchError::no_releases(
            spec.name(),
            spec.version_range(),
            released_after,
            metadata.is_empty(),
        ));
    };

    match candidates.iter().find(|(_, _, time)| *time >= released_after) {
        Some(&(version, _, time)) => Ok(Release::new(
            spec.name(),
            version,
            time,
            metadata.manifests.get(version),
            private_prefixes,
        )),
        None => Err(ReleaseMatchError::too_old(
            spec.name(),
            spec.version_range(),
            released_after,
            LatestRelease {
                version: latest_version.to_string(),
                time: latest_time,
            },
        )),
    }
}

fn parse_time(time: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(time)
        .map(|t| t.with_timezone(&Utc))
        .inspect_err(|e| debug!("Skipping unparseable publish time {:?}: {}", time, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::error::MatchErrorKind;
    use crate::version::types::Manifest;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn iso(hour: u32) -> String {
        at(hour).to_rfc3339()
    }

    fn metadata(releases: &[(&str, u32)]) -> RegistryMetadata {
        releases
            .iter()
            .fold(RegistryMetadata::new(), |metadata, (version, hour)| {
                metadata.with_release(version, &iso(*hour), Manifest::new())
            })
    }

    fn spec(input: &str) -> PackageSpec {
        PackageSpec::parse(input).unwrap()
    }

    fn prefixes() -> Vec<String> {
        vec!["_".to_string()]
    }

    #[test]
    fn match_release_picks_newest_qualifying_version() {
        let metadata = metadata(&[("1.0.0", 1), ("1.1.0", 2)]);

        let release = match_release(&metadata, &spec("foo@>=1.0.0"), at(0), &prefixes()).unwrap();

        assert_eq!(release.version, "1.1.0");
        assert_eq!(release.time, at(2));
        assert_eq!(release.spec, "foo@1.1.0");
    }

    #[test]
    fn match_release_orders_by_time_not_by_version() {
        // A backport published after the next major
        let metadata = metadata(&[("2.0.0", 3), ("1.9.1", 5)]);

        let release = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();

        assert_eq!(release.version, "1.9.1");
    }

    #[rstest]
    #[case("foo@1.x", "1.5.0")]
    #[case("foo@^2.0.0", "2.1.0")]
    #[case("foo@>=1.0.0 <1.5.0", "1.2.0")]
    fn match_release_never_returns_version_outside_range(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let metadata = metadata(&[("1.2.0", 1), ("1.5.0", 2), ("2.1.0", 3), ("3.0.0", 4)]);

        let release = match_release(&metadata, &spec(input), at(0), &prefixes()).unwrap();

        assert_eq!(release.version, expected);
    }

    #[test]
    fn match_release_accepts_release_exactly_at_cutoff() {
        let metadata = metadata(&[("1.0.0", 4)]);

        let release = match_release(&metadata, &spec("foo"), at(4), &prefixes()).unwrap();

        assert_eq!(release.time, at(4));
    }

    #[test]
    fn match_release_too_old_reports_most_recent_in_range() {
        let metadata = metadata(&[("1.0.0", 1), ("1.2.0", 3), ("1.1.0", 2), ("2.0.0", 9)]);

        let error = match_release(&metadata, &spec("foo@1.x"), at(5), &prefixes()).unwrap_err();

        assert_eq!(error.kind, MatchErrorKind::TooOld);
        assert_eq!(
            error.latest,
            Some(LatestRelease {
                version: "1.2.0".to_string(),
                time: at(3),
            })
        );
        assert_eq!(error.released_after, at(5));
    }

    #[test]
    fn match_release_no_releases_when_range_excludes_everything() {
        let metadata = metadata(&[("1.0.0", 1), ("2.0.0", 9)]);

        let error = match_release(&metadata, &spec("foo@3.x"), at(0), &prefixes()).unwrap_err();

        assert_eq!(error.kind, MatchErrorKind::NoReleases);
        assert_eq!(error.message, "No matching releases found");
        assert_eq!(error.latest, None);
    }

    #[test]
    fn match_release_no_releases_for_empty_metadata() {
        let error =
            match_release(&RegistryMetadata::new(), &spec("foo"), at(0), &prefixes()).unwrap_err();

        assert_eq!(error.kind, MatchErrorKind::NoReleases);
        assert_eq!(error.message, "No releases found");
    }

    #[test]
    fn match_release_ignores_created_and_modified_keys() {
        let metadata = RegistryMetadata::new()
            .with_release("created", &iso(1), Manifest::new())
            .with_release("modified", &iso(9), Manifest::new())
            .with_release("1.0.0", &iso(2), Manifest::new());

        let release = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();

        assert_eq!(release.version, "1.0.0");
    }

    #[test]
    fn match_release_skips_unparseable_times() {
        let metadata = RegistryMetadata::new()
            .with_release("1.1.0", "yesterday", Manifest::new())
            .with_release("1.0.0", &iso(2), Manifest::new());

        let release = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();

        assert_eq!(release.version, "1.0.0");
    }

    #[test]
    fn match_release_breaks_time_ties_deterministically() {
        let metadata = metadata(&[("1.0.1", 2), ("1.0.2", 2)]);

        let first = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();
        let second = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();

        assert_eq!(first.version, "1.0.2");
        assert_eq!(first, second);
    }

    #[test]
    fn match_release_is_idempotent_on_errors() {
        let metadata = metadata(&[("1.0.0", 1)]);

        let first = match_release(&metadata, &spec("foo"), at(5), &prefixes());
        let second = match_release(&metadata, &spec("foo"), at(5), &prefixes());

        assert_eq!(first, second);
    }

    #[test]
    fn match_release_merges_public_manifest_fields() {
        let manifest: Manifest = serde_json::from_value(json!({
            "name": "foo",
            "version": "2.0.0",
            "_id": "foo@2.0.0",
            "_shasum": "abc",
            "dist": { "tarball": "https://example.com/foo-2.0.0.tgz" }
        }))
        .unwrap();
        let metadata = RegistryMetadata::new().with_release("2.0.0", &iso(3), manifest);

        let release = match_release(&metadata, &spec("foo"), at(0), &prefixes()).unwrap();

        assert_eq!(release.manifest.keys().collect::<Vec<_>>(), vec!["dist"]);
    }
}
