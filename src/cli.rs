//! Command line surface

use std::time::Duration;

use clap::Parser;

use crate::action::Actions;
use crate::config::{AwaitOptions, NpmConfig};
use crate::error::{AwaitError, EXIT_INVALID_SPEC, EXIT_MATCH_ERROR, EXIT_SUCCESS};
use crate::output::{OutputStyle, render};
use crate::parser::spec::PackageSpec;
use crate::poll::await_releases;
use crate::version::registries::NpmRegistry;
use crate::version::registry::Registry;

#[derive(Debug, Parser)]
#[command(name = "await-release")]
#[command(
    version,
    about = "Poll the npm registry until the requested package(s) has a new release",
    long_about = "Poll the npm registry until the requested package(s) has a new release.\n\n\
                  Package identifiers may optionally include:\n  \
                  * scope (@org/pkg)\n  \
                  * semver range (pkg@16, pkg@1.x, \"pkg@>=2.0.0 <3.0.0\", etc.)"
)]
pub struct Cli {
    /// Package identifiers: [@scope/]name[@range]
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputStyle::Default)]
    pub output: OutputStyle,

    /// Accept versions released up to X seconds before invocation
    #[arg(short, long, value_name = "SECONDS", default_value = "10", value_parser = parse_seconds)]
    pub grace: Duration,

    /// Exit if no release matches after X seconds (0 waits forever)
    #[arg(short, long, value_name = "SECONDS", default_value = "0", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Time between polling requests
    #[arg(short, long, value_name = "SECONDS", default_value = "2", value_parser = parse_seconds)]
    pub delay: Duration,

    /// Install the matched releases with npm
    #[arg(short, long)]
    pub install: bool,

    /// Run a command per release; %p name, %s spec, %t time, %v version, %% percent
    #[arg(short, long, value_name = "TEMPLATE")]
    pub exec: Option<String>,

    /// Manifest keys starting with this prefix are left out of reported releases
    #[arg(long = "private-prefix", value_name = "PREFIX", default_value = "_")]
    pub private_prefixes: Vec<String>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.output == OutputStyle::Verbose
    }

    pub fn await_options(&self) -> AwaitOptions {
        AwaitOptions {
            grace: self.grace,
            timeout: self.timeout,
            delay: self.delay,
            private_field_prefixes: self.private_prefixes.clone(),
        }
    }

    pub fn actions(&self) -> Actions {
        Actions {
            install: self.install,
            exec: self.exec.clone(),
        }
    }

    /// Run against the registry named by npm configuration; returns the process exit code
    pub async fn run(self) -> u8 {
        let registry = match NpmConfig::load()
            .map_err(AwaitError::from)
            .and_then(|config| NpmRegistry::from_config(config).map_err(AwaitError::from))
        {
            Ok(registry) => registry,
            Err(e) => return report_error(e),
        };

        self.run_with(&registry).await
    }

    /// Run against `registry`; returns the process exit code
    pub async fn run_with(&self, registry: &dyn Registry) -> u8 {
        let specs = match parse_specs(&self.packages) {
            Ok(specs) => specs,
            Err(message) => {
                eprintln!("{message}");
                return EXIT_INVALID_SPEC;
            }
        };

        match self.execute(registry, specs).await {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => report_error(e),
        }
    }

    async fn execute(&self, registry: &dyn Registry, specs: Vec<PackageSpec>) -> Result<(), AwaitError> {
        let releases = await_releases(registry, specs, &self.await_options()).await?;

        if let Some(report) = render(self.output, &releases)? {
            println!("{report}");
        }

        let actions = self.actions();
        if !actions.is_empty() {
            actions.run(&releases).await?;
        }
        Ok(())
    }
}

/// Validate every identifier before any polling starts
///
/// `%` is rejected outright: identifiers end up in `--exec` substitutions.
pub fn parse_specs(packages: &[String]) -> Result<Vec<PackageSpec>, String> {
    packages
        .iter()
        .map(|package| {
            if package.contains('%') {
                return Err(format!(
                    "Invalid package string: '{package}' (identifiers may not contain '%')"
                ));
            }
            PackageSpec::parse(package).map_err(|e| e.to_string())
        })
        .collect()
}

/// Match errors get their message; anything else its full error chain
fn report_error(error: AwaitError) -> u8 {
    let code = error.exit_code();
    match error {
        AwaitError::Match(e) => {
            eprintln!("{e}");
            EXIT_MATCH_ERROR
        }
        other => {
            eprintln!("{:?}", anyhow::Error::new(other));
            code
        }
    }
}

/// Non-negative, finite seconds; fractions allowed
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("'{value}' must be a finite, non-negative number of seconds"))
}
