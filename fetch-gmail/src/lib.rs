//! fetch-gmail - incremental Gmail message catalog
//!
//! Walks the paginated Gmail message listing into a local SQLite catalog,
//! then backfills per-message metadata the listing does not return. Both
//! phases derive their work from the catalog, so an interrupted run simply
//! resumes where it stopped.
//!
//! ## Module Organization
//!
//! - `adapters/`: SQLite catalog and Gmail REST transport
//! - `services/`: Discovery and hydration loops, remote service traits
//! - `types/`: Catalog records and the label list codec
//! - `oauth/`: Installed-app OAuth2 flow
//! - `credentials/`: Token file backed credential provider
//! - `config/`: TOML configuration
//! - `cli`: Command line surface

pub mod adapters;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod services;
pub mod types;

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::info;

use adapters::gmail::GmailClient;
use adapters::sqlite::{Catalog, CountFilter};
use cli::Cli;
use credentials::TokenFileProvider;
use error::FetchError;
use services::sync;

pub async fn run(cli: Cli) -> Result<(), FetchError> {
    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    let options = config.sync_options()?;

    let catalog = Catalog::open(&config.storage.database)?;

    if cli.export {
        let output = &config.storage.output;
        if output.exists() && !cli.yes && !confirm_overwrite(output)? {
            return Ok(());
        }
        catalog.export(output, true)?;
        return Ok(());
    }

    let credentials =
        TokenFileProvider::load_or_authenticate(&config.auth.client_secrets, &config.auth.token).await?;
    let gmail = GmailClient::new()?;

    let discovery = sync::run_discovery(&catalog, &gmail, &credentials, &options).await?;
    info!(
        "Discovery: {} new ids over {} pages ({:?})",
        discovery.inserted, discovery.pages, discovery.stop
    );

    let hydration = sync::run_hydration(&catalog, &gmail, &credentials, &options).await?;
    info!(
        "Hydration: {} messages updated, {} of {} still pending",
        hydration.hydrated,
        catalog.count(CountFilter::Unhydrated)?,
        catalog.count(CountFilter::All)?
    );

    Ok(())
}

fn confirm_overwrite(path: &Path) -> Result<bool, FetchError> {
    print!("{} exists, overwrite? (y/N) ", path.display());
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
