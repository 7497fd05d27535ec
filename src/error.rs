use std::path::PathBuf;

use thiserror::Error;

use crate::action::ActionError;
use crate::version::error::{RegistryError, ReleaseMatchError};

/// Every spec matched and every requested action succeeded
pub const EXIT_SUCCESS: u8 = 0;
/// A package identifier was rejected before polling started
pub const EXIT_INVALID_SPEC: u8 = 1;
/// A release could not be matched (timeout, malformed spec)
pub const EXIT_MATCH_ERROR: u8 = 3;
/// Anything else: registry failures, failed actions, broken configuration
pub const EXIT_UNEXPECTED: u8 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a poll session or of the invocation around it
#[derive(Debug, Error)]
pub enum AwaitError {
    #[error(transparent)]
    Match(#[from] ReleaseMatchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AwaitError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AwaitError::Match(_) => EXIT_MATCH_ERROR,
            AwaitError::Registry(_)
            | AwaitError::Action(_)
            | AwaitError::Config(_)
            | AwaitError::Output(_) => EXIT_UNEXPECTED,
        }
    }
}
