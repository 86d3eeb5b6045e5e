use std::path::PathBuf;

use clap::Parser;

/// Mirror the Gmail message list into a local SQLite catalog, then fetch
/// sender, recipient, subject, date and labels for every message.
#[derive(Debug, Clone, Parser)]
#[command(name = "fetch-gmail", version, about)]
pub struct Cli {
    /// Export data as csv
    #[arg(long)]
    pub export: bool,

    /// Seconds delay between each request. Default: 0.25 seconds
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<f64>,

    /// Force a full scan of all available messages. Default stops after no new messages are found.
    #[arg(long)]
    pub fullscan: bool,

    /// Overwrite default database file name (messages.sqlite3)
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Overwrite default export file name (messages.csv)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Read settings from this TOML file
    #[arg(long, value_name = "PATH", env = "FETCH_GMAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overwrite an existing export without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut crate::config::AppConfig) {
        if let Some(delay) = self.delay {
            config.sync.delay_secs = delay;
        }
        if self.fullscan {
            config.sync.fullscan = true;
        }
        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        if let Some(output) = &self.output {
            config.storage.output = output.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "fetch-gmail",
            "--delay",
            "1",
            "--fullscan",
            "--database",
            "other.sqlite3",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.sync.delay_secs, 1.0);
        assert!(config.sync.fullscan);
        assert_eq!(config.storage.database, PathBuf::from("other.sqlite3"));
        assert_eq!(config.storage.output, PathBuf::from("messages.csv"));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["fetch-gmail", "--export"]);
        let mut config = AppConfig::default();
        config.sync.fullscan = true;
        cli.apply(&mut config);

        assert!(cli.export);
        assert!(config.sync.fullscan);
        assert_eq!(config, {
            let mut expected = AppConfig::default();
            expected.sync.fullscan = true;
            expected
        });
    }
}
