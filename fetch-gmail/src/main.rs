use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fetch_gmail_lib::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info for this crate, warnings for the rest
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("fetch_gmail_lib=debug,info")
        } else {
            EnvFilter::new("fetch_gmail_lib=info,warn")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match fetch_gmail_lib::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
