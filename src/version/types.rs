//! Data exchanged between the registry client, the matcher and the reporters

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Arbitrary key/value metadata of one published version
pub type Manifest = IndexMap<String, Value>;

/// Publish records of one package, as returned by a single registry fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryMetadata {
    /// version -> publish timestamp (ISO-8601, as sent by the registry)
    pub times: HashMap<String, String>,
    /// version -> manifest
    pub manifests: HashMap<String, Manifest>,
}

impl RegistryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published version
    pub fn with_release(mut self, version: &str, time: &str, manifest: Manifest) -> Self {
        self.times.insert(version.to_string(), time.to_string());
        self.manifests.insert(version.to_string(), manifest);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Version and publish time of the newest release satisfying a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestRelease {
    pub version: String,
    pub time: DateTime<Utc>,
}

/// A release that satisfied the range and the grace window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Release {
    pub name: String,
    pub version: String,
    pub time: DateTime<Utc>,
    /// `name@version`
    pub spec: String,
    /// Public manifest fields of the matched version
    #[serde(flatten)]
    pub manifest: Manifest,
}

impl Release {
    /// Build a release from a manifest, dropping keys that carry any of `private_prefixes`
    /// and keys that would shadow the release's own fields
    pub fn new(
        name: &str,
        version: &str,
        time: DateTime<Utc>,
        manifest: Option<&Manifest>,
        private_prefixes: &[String],
    ) -> Self {
        let manifest = manifest
            .into_iter()
            .flatten()
            .filter(|(key, _)| !is_private_key(key, private_prefixes))
            .filter(|(key, _)| !matches!(key.as_str(), "name" | "version" | "time" | "spec"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            name: name.to_string(),
            version: version.to_string(),
            time,
            spec: format!("{name}@{version}"),
            manifest,
        }
    }
}

fn is_private_key(key: &str, private_prefixes: &[String]) -> bool {
    private_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn release_new_strips_private_and_shadowing_keys() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let manifest = manifest(json!({
            "name": "foo",
            "version": "2.0.0",
            "_id": "foo@2.0.0",
            "_npmUser": { "name": "someone" },
            "description": "a package",
            "license": "MIT"
        }));

        let release = Release::new("foo", "2.0.0", time, Some(&manifest), &["_".to_string()]);

        assert_eq!(release.spec, "foo@2.0.0");
        assert_eq!(
            release.manifest.keys().collect::<Vec<_>>(),
            vec!["description", "license"]
        );
    }

    #[test]
    fn release_new_honors_custom_private_prefixes() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let manifest = manifest(json!({ "_id": "x", "$internal": true, "main": "index.js" }));

        let release = Release::new("foo", "1.0.0", time, Some(&manifest), &["$".to_string()]);

        assert_eq!(
            release.manifest.keys().collect::<Vec<_>>(),
            vec!["_id", "main"]
        );
    }

    #[test]
    fn release_serializes_flat_with_rfc3339_time() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let manifest = manifest(json!({ "description": "a package" }));

        let release = Release::new("foo", "2.0.0", time, Some(&manifest), &[]);

        assert_eq!(
            serde_json::to_value(&release).unwrap(),
            json!({
                "name": "foo",
                "version": "2.0.0",
                "time": "2024-03-01T12:00:00Z",
                "spec": "foo@2.0.0",
                "description": "a package"
            })
        );
    }
}
