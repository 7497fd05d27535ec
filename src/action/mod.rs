//! Commands run once releases are found
//!
//! - [`exec`]: `--exec` templates (`%p`, `%s`, `%t`, `%v`, `%%`)
//! - [`install`]: `--install` through the npm CLI

pub mod exec;
pub mod install;

use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::version::types::Release;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Invalid command template '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' exited with {}", exit_status(.code))]
    Failed { command: String, code: Option<i32> },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// What to do with the matched releases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions {
    /// Install every matched release with a single `npm install`
    pub install: bool,
    /// Run this template once per release
    pub exec: Option<String>,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        !self.install && self.exec.is_none()
    }

    /// Install first, then run the exec template for each release in order.
    /// Stops at the first failing command.
    pub async fn run(&self, releases: &[Release]) -> Result<(), ActionError> {
        if self.install && !releases.is_empty() {
            run_command(&install::install_command(releases)).await?;
        }

        if let Some(template) = &self.exec {
            for release in releases {
                run_command(&exec::exec_command(template, release)?).await?;
            }
        }

        Ok(())
    }
}

/// Spawn `argv` with inherited stdio and wait for it
pub async fn run_command(argv: &[String]) -> Result<(), ActionError> {
    let (program, args) = argv.split_first().ok_or(ActionError::EmptyCommand)?;
    let command = argv.join(" ");
    info!("Running {}", command);

    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| ActionError::Spawn {
            command: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ActionError::Failed {
            command,
            code: status.code(),
        })
    }
}
