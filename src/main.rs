use std::process::ExitCode;

use await_release::cli::Cli;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log filter:
/// 1. `--output verbose` logs every poll attempt
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = if verbose {
        EnvFilter::new("await_release=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("await_release=warn"))
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(writer))
        .with(filter)
        .init();

    guard
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.is_verbose());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{:?}", anyhow::Error::new(e).context("failed to start async runtime"));
            return ExitCode::from(4);
        }
    };

    ExitCode::from(runtime.block_on(cli.run()))
}
