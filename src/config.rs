use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;

// =============================================================================
// Polling defaults
// =============================================================================

/// Accept releases published up to this many seconds before invocation
pub const DEFAULT_GRACE_SECS: u64 = 10;

/// Zero disables the timeout: poll until a release shows up
pub const DEFAULT_TIMEOUT_SECS: u64 = 0;

/// Wait between polling requests
pub const DEFAULT_DELAY_SECS: u64 = 2;

/// Manifest keys starting with this prefix are registry internals (`_id`, `_npmUser`, ...)
pub const DEFAULT_PRIVATE_FIELD_PREFIX: &str = "_";

/// Registry used when no configuration names one
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Options shared by every poll session of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AwaitOptions {
    /// Width of the "not too old" window
    pub grace: Duration,
    /// Give up after this long; zero means never
    pub timeout: Duration,
    /// Wait between two polls of the same package
    pub delay: Duration,
    /// Manifest keys with any of these prefixes are stripped from releases
    pub private_field_prefixes: Vec<String>,
}

impl Default for AwaitOptions {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
            private_field_prefixes: vec![DEFAULT_PRIVATE_FIELD_PREFIX.to_string()],
        }
    }
}

impl AwaitOptions {
    /// The armed timeout, or None when polling is unbounded
    pub fn timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }
}

// =============================================================================
// npm configuration
// =============================================================================

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env reference pattern"));

/// Registry location, credentials and proxies, read the way npm reads them
#[derive(Debug, Clone, PartialEq)]
pub struct NpmConfig {
    pub registry: String,
    /// `@scope` -> registry URL
    pub scoped_registries: HashMap<String, String>,
    /// Nerf-darted registry prefix (`//host/path/`) -> token
    pub auth_tokens: HashMap<String, String>,
    pub proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            scoped_registries: HashMap::new(),
            auth_tokens: HashMap::new(),
            proxy: None,
            https_proxy: None,
        }
    }
}

impl NpmConfig {
    /// Configuration pointing at a single registry, without credentials
    pub fn with_registry(registry: &str) -> Self {
        Self {
            registry: with_trailing_slash(registry),
            ..Self::default()
        }
    }

    /// Load user `.npmrc`, project `.npmrc` and `npm_config_*` environment variables,
    /// later sources overriding earlier ones.
    pub fn load() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let mut files = Vec::new();
        if let Some(user) = user_config_path(&env, dirs::home_dir()) {
            files.push(user);
        }
        if let Ok(cwd) = std::env::current_dir() {
            files.push(cwd.join(".npmrc"));
        }
        Self::load_from(&files, &env)
    }

    fn load_from(files: &[PathBuf], env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in files {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    debug!("Reading npm config from {:?}", path);
                    config.apply_npmrc(&contents, env);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ConfigError::Read {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }

        config.apply_env(env);
        Ok(config)
    }

    /// Apply `key=value` lines of an `.npmrc` file
    pub fn apply_npmrc(&mut self, contents: &str, env: &HashMap<String, String>) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = expand_env(unquote(value.trim()), env);
            self.set(key.trim(), value);
        }
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) {
        // Sorted so that the outcome does not depend on HashMap order
        let sorted: BTreeMap<&String, &String> = env.iter().collect();
        for (name, value) in sorted {
            let lower = name.to_ascii_lowercase();
            let Some(key) = lower.strip_prefix("npm_config_") else {
                continue;
            };
            self.set(&key.replace('_', "-"), value.clone());
        }
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "registry" => self.registry = with_trailing_slash(&value),
            "proxy" => self.proxy = Some(value),
            "https-proxy" => self.https_proxy = Some(value),
            _ => {
                if let Some(scope) = key.strip_suffix(":registry") {
                    if scope.starts_with('@') {
                        self.scoped_registries
                            .insert(scope.to_string(), with_trailing_slash(&value));
                    }
                } else if let Some(prefix) = key.strip_suffix(":_authToken") {
                    if prefix.starts_with("//") {
                        self.auth_tokens
                            .insert(with_trailing_slash(prefix), value);
                    }
                }
            }
        }
    }

    /// Registry serving `package_name`, honoring `@scope:registry`
    pub fn registry_for(&self, package_name: &str) -> &str {
        package_name
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .and_then(|(scope, _)| self.scoped_registries.get(&format!("@{scope}")))
            .unwrap_or(&self.registry)
    }

    /// Token for the longest configured prefix of `registry_url`
    pub fn auth_token_for(&self, registry_url: &str) -> Option<&str> {
        let mut key = nerf_dart(registry_url);
        loop {
            if let Some(token) = self.auth_tokens.get(&key) {
                return Some(token.as_str());
            }
            let trimmed = key.trim_end_matches('/');
            let idx = trimmed.rfind('/')?;
            // "//host" is the shortest candidate
            if idx < 2 {
                return None;
            }
            key = format!("{}/", &trimmed[..idx]);
        }
    }

    /// Proxy to use for requests to `url`
    pub fn proxy_for(&self, url: &str) -> Option<&str> {
        if url.starts_with("https:") {
            self.https_proxy.as_deref().or(self.proxy.as_deref())
        } else {
            self.proxy.as_deref()
        }
    }
}

/// `$NPM_CONFIG_USERCONFIG`, falling back to `~/.npmrc`
fn user_config_path(env: &HashMap<String, String>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    env.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("npm_config_userconfig"))
        .map(|(_, v)| PathBuf::from(v))
        .or_else(|| home_dir.map(|home| home.join(".npmrc")))
}

/// `https://host/path` -> `//host/path/`
fn nerf_dart(url: &str) -> String {
    let without_scheme = match url.find("//") {
        Some(idx) => &url[idx..],
        None => return with_trailing_slash(&format!("//{url}")),
    };
    let without_query = without_scheme.split(['?', '#']).next().unwrap_or(without_scheme);
    with_trailing_slash(without_query)
}

fn with_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn expand_env(value: &str, env: &HashMap<String, String>) -> String {
    ENV_REFERENCE
        .replace_all(value, |caps: &regex::Captures| {
            env.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
