// ssosync - keep static AWS credentials files fed from AWS SSO

mod auth;
mod aws_config;
mod aws_sdk;
mod cli;
mod config;
mod credentials;
mod env;
mod error;
mod expiry;
mod models;
mod resolver;
mod session;
mod sso_config;

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first to get verbose flag
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            if e.is_configuration() {
                eprintln!(
                    "Check your AWS config or select profiles with --profile, --starturl or --config"
                );
            }
            ExitCode::FAILURE
        }
    }
}
