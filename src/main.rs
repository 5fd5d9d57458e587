use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use credrotate::config::{default_config_path, Config};
use credrotate::error::RotationError;
use credrotate::request::read_envelope_line;
use credrotate::rotation::{
    Backend, DefaultAdapterFactory, RotationOrchestrator, RotationOutcome,
};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "credrotate")]
#[command(about = "Apply a rotated password to a remote system")]
#[command(version = VERSION)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to config file (default: ./credrotate.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend to rotate against. The rotation envelope is read from stdin.
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List supported backends and the record each one reads
    Backends,
}

fn init_tracing() {
    // stdout carries the status line only; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .init();
}

fn print_backends() -> io::Result<()> {
    let mut out = io::stdout().lock();
    for backend in Backend::ALL {
        let profile = backend.profile();
        writeln!(
            out,
            "{:<24} {:<32} fields: {} (matches {}, {})",
            profile.name,
            profile.record_title,
            profile.record_fields.join(", "),
            profile.identity_key,
            profile.password_mode.as_str()
        )?;
    }
    Ok(())
}

async fn rotate(config_path: Option<PathBuf>, backend: Backend) -> RotationOutcome {
    let config_path = config_path.unwrap_or_else(default_config_path);
    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Failed to load configuration");
            return RotationOutcome::failure(&RotationError::Unexpected(format!("{err:#}")));
        }
    };

    let line = match read_envelope_line(io::stdin().lock()) {
        Ok(line) => line,
        Err(err) => return RotationOutcome::failure(&err),
    };

    let factory = DefaultAdapterFactory::new(backend, config.transport_for(backend));
    Arc::new(RotationOrchestrator::new(Arc::new(factory)))
        .run_guarded(line)
        .await
}

/// Exit status for a command line clap refused. Help and version are not
/// failures; anything else is reported like any other failed run.
fn usage_status(err: &clap::Error) -> u8 {
    match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_status(&err));
        }
    };
    init_tracing();

    let backend = match (cli.command, cli.backend) {
        (Some(Command::Backends), _) => {
            return match print_backends() {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        (None, Some(backend)) => backend,
        (None, None) => {
            let _ = writeln!(
                io::stderr(),
                "credrotate: a backend is required; run `credrotate backends` to list them"
            );
            return ExitCode::FAILURE;
        }
    };

    let outcome = rotate(cli.config, backend).await;
    if let Err(err) = outcome.report(io::stdout().lock()) {
        error!(error = %err, "Failed to write status line");
        return ExitCode::FAILURE;
    }
    outcome.exit_code()
}
