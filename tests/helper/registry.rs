//! Registry test utilities

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use await_release::version::error::RegistryError;
use await_release::version::registry::Registry;
use await_release::version::types::{Manifest, RegistryMetadata};

type Response = Result<RegistryMetadata, RegistryError>;

/// Publish time that falls inside the default grace window
pub fn fresh_time() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Publish time well before any cutoff a test would use
pub fn stale_time() -> String {
    "2000-01-01T00:00:00.000Z".to_string()
}

/// Scripted registry: each package answers with its queued responses in order,
/// repeating the last one once the queue runs dry
#[derive(Default)]
pub struct StubRegistry {
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    fetches: AtomicUsize,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response listing a single version
    pub fn then_version(self, package: &str, version: &str, time: &str) -> Self {
        let metadata = RegistryMetadata::new().with_release(version, time, Manifest::new());
        self.then(package, Ok(metadata))
    }

    /// Queue `count` responses whose only version is too old to match
    pub fn then_not_yet(mut self, package: &str, count: usize) -> Self {
        for _ in 0..count {
            self = self.then_version(package, "0.0.1", &stale_time());
        }
        self
    }

    pub fn then(self, package: &str, response: Response) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(package.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for StubRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<RegistryMetadata, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(package_name) else {
            return Err(RegistryError::NotFound(package_name.to_string()));
        };

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(clone_response)
        };

        response.unwrap_or_else(|| Err(RegistryError::NotFound(package_name.to_string())))
    }
}

fn clone_response(response: &Response) -> Response {
    match response {
        Ok(metadata) => Ok(metadata.clone()),
        Err(RegistryError::NotFound(name)) => Err(RegistryError::NotFound(name.clone())),
        Err(RegistryError::RateLimited { retry_after_secs }) => Err(RegistryError::RateLimited {
            retry_after_secs: *retry_after_secs,
        }),
        Err(e) => Err(RegistryError::InvalidResponse(e.to_string())),
    }
}
