//! Poll loop: fetch, match, wait, repeat until a release shows up or the timeout fires

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::try_join_all;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AwaitOptions;
use crate::error::AwaitError;
use crate::parser::spec::{PackageSpec, SpecError};
use crate::version::error::{RegistryError, ReleaseMatchError};
use crate::version::matcher::match_release;
use crate::version::registry::Registry;
use crate::version::types::{LatestRelease, Release};

/// Everything one session needs, fixed when the session starts
#[derive(Debug, Clone, PartialEq)]
pub struct PollParameters {
    pub spec: PackageSpec,
    /// `start - grace`, never earlier than the Unix epoch; does not move while polling
    pub released_after: DateTime<Utc>,
    pub delay: Duration,
    pub timeout: Option<Duration>,
    pub grace: Duration,
    pub private_field_prefixes: Vec<String>,
}

impl PollParameters {
    pub fn new(spec: PackageSpec, options: &AwaitOptions, now: DateTime<Utc>) -> Self {
        Self {
            spec,
            released_after: released_after(options.grace, now),
            delay: options.delay,
            timeout: options.timeout(),
            grace: options.grace,
            private_field_prefixes: options.private_field_prefixes.clone(),
        }
    }
}

/// Parse `package` and wait for a matching release
pub async fn await_release(
    registry: &dyn Registry,
    package: &str,
    options: &AwaitOptions,
) -> Result<Release, AwaitError> {
    let now = Utc::now();
    let spec = PackageSpec::parse(package).map_err(|e| spec_error(e, package, options, now))?;
    let params = PollParameters::new(spec, options, now);
    await_spec(registry, &params).await
}

/// Run one session per spec concurrently; the first failure fails them all
///
/// Releases are returned in the order of `specs`.
pub async fn await_releases(
    registry: &dyn Registry,
    specs: Vec<PackageSpec>,
    options: &AwaitOptions,
) -> Result<Vec<Release>, AwaitError> {
    let now = Utc::now();
    let sessions = specs.into_iter().map(|spec| {
        let params = PollParameters::new(spec, options, now);
        async move { await_spec(registry, &params).await }
    });

    try_join_all(sessions).await
}

/// Poll for a single spec, racing the loop against the timeout when one is set
///
/// When the timeout wins, the in-flight request is dropped along with the loop.
pub async fn await_spec(
    registry: &dyn Registry,
    params: &PollParameters,
) -> Result<Release, AwaitError> {
    info!(
        "Looking up package '{}' using version '{}'",
        params.spec.name(),
        params.spec.version_range()
    );

    let mut latest = None;
    let Some(timeout) = params.timeout else {
        return poll_until_match(registry, params, &mut latest).await;
    };

    let outcome = tokio::time::timeout(timeout, poll_until_match(registry, params, &mut latest)).await;

    match outcome {
        Ok(result) => result,
        Err(_) => Err(ReleaseMatchError::timeout(
            params.spec.name(),
            params.spec.version_range(),
            params.released_after,
            timeout.as_secs_f64(),
            latest,
        )
        .into()),
    }
}

/// Retry "not yet" outcomes forever; anything else ends the session
async fn poll_until_match(
    registry: &dyn Registry,
    params: &PollParameters,
    latest: &mut Option<LatestRelease>,
) -> Result<Release, AwaitError> {
    let name = params.spec.name();
    let mut retries: u64 = 0;

    loop {
        if retries == 0 {
            info!("Polling {}", name);
        } else {
            info!("Polling {} (retries={})", name, retries);
        }

        let wait = match fetch_and_match(registry, params).await {
            Ok(release) => return Ok(release),
            Err(AwaitError::Match(error)) if error.is_transient() => {
                info!("{}", error);
                if error.latest.is_some() {
                    *latest = error.latest;
                }
                params.delay
            }
            Err(AwaitError::Registry(RegistryError::RateLimited { retry_after_secs })) => {
                let retry_after = Duration::from_secs(retry_after_secs.unwrap_or_default());
                warn!("Rate limited while polling {}; waiting {:?}", name, retry_after);
                params.delay.max(retry_after)
            }
            Err(e) => return Err(e),
        };

        retries += 1;
        sleep(wait).await;
    }
}

async fn fetch_and_match(
    registry: &dyn Registry,
    params: &PollParameters,
) -> Result<Release, AwaitError> {
    let spec = &params.spec;

    let metadata = match registry.fetch_metadata(spec.name()).await {
        Ok(metadata) => metadata,
        Err(RegistryError::NotFound(_)) => {
            return Err(ReleaseMatchError::no_releases(
                spec.name(),
                spec.version_range(),
                params.released_after,
                true,
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(match_release(
        &metadata,
        spec,
        params.released_after,
        &params.private_field_prefixes,
    )?)
}

fn released_after(grace: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(grace)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .max(DateTime::UNIX_EPOCH)
}

fn spec_error(
    error: SpecError,
    package: &str,
    options: &AwaitOptions,
    now: DateTime<Utc>,
) -> AwaitError {
    let released_after = released_after(options.grace, now);

    match error {
        SpecError::InvalidSpec(_) => ReleaseMatchError::invalid_spec(package, released_after),
        SpecError::InvalidRange { name, range } => {
            ReleaseMatchError::invalid_range(&name, &range, released_after)
        }
    }
    .into()
}
