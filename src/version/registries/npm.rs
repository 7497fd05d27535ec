//! npm registry API implementation

use std::collections::HashMap;

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::NpmConfig;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{Manifest, RegistryMetadata};

const USER_AGENT: &str = concat!("await-release/", env!("CARGO_PKG_VERSION"));

/// Full (non-abbreviated) packument; only the full document carries `time`
#[derive(Debug, Deserialize)]
struct NpmPackageDocument {
    #[serde(default)]
    time: HashMap<String, Value>,
    #[serde(default)]
    versions: HashMap<String, Value>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    config: NpmConfig,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            config: NpmConfig::with_registry(base_url),
        }
    }

    /// Creates a registry client honoring registries, tokens and proxies from npm configuration
    pub fn from_config(config: NpmConfig) -> Result<Self, RegistryError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(proxy) = config.proxy_for("https:") {
            let proxy = reqwest::Proxy::https(proxy)
                .map_err(|e| RegistryError::Client(format!("invalid https proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if let Some(proxy) = config.proxy_for("http:") {
            let proxy = reqwest::Proxy::http(proxy)
                .map_err(|e| RegistryError::Client(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REGISTRY)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<RegistryMetadata, RegistryError> {
        let registry = self.config.registry_for(package_name);
        let url = format!("{}{}", registry, Self::encode_package_name(package_name));
        debug!("Fetching {}", url);

        // Always go to the registry: a stale cached document would never show the new release
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = self.config.auth_token_for(registry) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let document: NpmPackageDocument = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // `unpublished` and similar entries are objects, not timestamps
        let times: HashMap<String, String> = document
            .time
            .into_iter()
            .filter_map(|(version, time)| match time {
                Value::String(time) => Some((version, time)),
                _ => None,
            })
            .collect();

        if times.is_empty() {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        let manifests: HashMap<String, Manifest> = document
            .versions
            .into_iter()
            .filter_map(|(version, manifest)| match manifest {
                Value::Object(fields) => Some((version, fields.into_iter().collect())),
                _ => None,
            })
            .collect();

        Ok(RegistryMetadata { times, manifests })
    }
}
