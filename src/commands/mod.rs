//! One subcommand per provisioning step

use anyhow::Result;
use clap::Subcommand;
use kiroboard_config::AppConfig;
use std::process::ExitCode;

use crate::Services;

mod analyses;
mod dashboard;
mod deploy;
mod sync_users;
mod views;

pub use analyses::reconcile_analyses;
pub use views::load_statements;

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Create the Athena views from the configured SQL script
    Views,
    /// Create or update the data source, both datasets and the analyses
    Deploy,
    /// Create or update the analyses with their visual sheets
    Analyses,
    /// Create or update the comprehensive dashboard and publish it
    Dashboard,
    /// Rebuild the user id to display name mapping table
    SyncUsers,
}

impl Command {
    pub async fn run(self, config: &AppConfig) -> Result<ExitCode> {
        self.check_config(config)?;
        let services = Services::connect(config).await?;

        match self {
            Command::Views => views::run(config, &services).await,
            Command::Deploy => deploy::run(config, &services).await,
            Command::Analyses => analyses::run(config, &services).await,
            Command::Dashboard => dashboard::run(config, &services).await,
            Command::SyncUsers => sync_users::run(config, &services).await,
        }
    }
}

impl Command {
    /// Fail on missing command-specific settings before touching AWS
    pub fn check_config(self, config: &AppConfig) -> Result<()> {
        match self {
            Command::Views => {}
            Command::Deploy => {
                config.user_arn()?;
                config.database_name()?;
            }
            Command::Analyses | Command::Dashboard => {
                config.user_arn()?;
            }
            Command::SyncUsers => {
                config.identity_store_id()?;
                config.bucket_name()?;
                config.database_name()?;
            }
        }
        Ok(())
    }
}

/// Per-resource outcome tally; failures are logged where they happen
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn record<T, E>(&mut self, result: &std::result::Result<T, E>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn views_only_config() -> AppConfig {
        AppConfig::from_yaml(
            r#"
aws:
  region: us-east-1
  account_id: "123456789012"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_views_needs_no_quicksight_settings() {
        let config = views_only_config();
        assert!(config.validate().is_ok());
        assert!(Command::Views.check_config(&config).is_ok());
    }

    #[test]
    fn test_commands_check_their_own_settings() {
        let config = views_only_config();

        let err = Command::Deploy.check_config(&config).unwrap_err();
        assert!(err.to_string().contains("quicksight.user_arn"));
        assert!(Command::Dashboard.check_config(&config).is_err());

        let err = Command::SyncUsers.check_config(&config).unwrap_err();
        assert!(err.to_string().contains("identity_store_id"));
    }

    #[test]
    fn test_tally() {
        let mut tally = Tally::default();
        tally.record::<(), &str>(&Ok(()));
        tally.record::<(), &str>(&Err("boom"));
        tally.record::<(), &str>(&Ok(()));
        assert_eq!(tally, Tally { succeeded: 2, failed: 1 });
    }
}
