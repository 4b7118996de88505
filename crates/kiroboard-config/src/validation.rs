// Configuration validation
//
// Checks the fields every command relies on. Command-specific settings
// (user ARN, bucket, database, identity store id) are checked where they
// are used. Warnings are returned rather than logged because validation
// runs before the subscriber is installed.

use crate::*;
use anyhow::{bail, Result};

pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_aws_config(&config.aws)?;
    validate_athena_config(&config.athena)?;
    validate_quicksight_config(&config.quicksight)?;

    Ok(())
}

/// Settings that are valid but probably not what the user meant
pub fn collect_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.athena.query_timeout_secs == 0 {
        warnings.push(
            "athena.query_timeout_secs is 0; queries will be polled without a deadline".to_string(),
        );
    }
    if config.quicksight.dashboards.is_empty() {
        warnings.push("quicksight.dashboards is empty; no analyses will be provisioned".to_string());
    }

    warnings
}

fn validate_aws_config(config: &AwsConfig) -> Result<()> {
    if config.region.is_empty() {
        bail!("aws.region is required");
    }

    if config.account_id.is_empty() {
        bail!("aws.account_id is required");
    }

    if config.account_id.len() != 12 || !config.account_id.chars().all(|c| c.is_ascii_digit()) {
        bail!(
            "aws.account_id must be a 12-digit AWS account id, got '{}'",
            config.account_id
        );
    }

    Ok(())
}

fn validate_athena_config(config: &AthenaConfig) -> Result<()> {
    if config.workgroup.is_empty() {
        bail!("athena.workgroup must not be empty");
    }

    if config.poll_interval_secs == 0 {
        bail!("athena.poll_interval_secs must be greater than 0");
    }

    Ok(())
}

fn validate_quicksight_config(config: &QuickSightConfig) -> Result<()> {
    if !config.user_arn.is_empty() && !config.user_arn.starts_with("arn:") {
        bail!("quicksight.user_arn must be an ARN, got '{}'", config.user_arn);
    }

    let mut seen = std::collections::HashSet::new();
    for dashboard in &config.dashboards {
        if dashboard.id.is_empty() {
            bail!("quicksight.dashboards entries require an id");
        }
        if !seen.insert(dashboard.id.as_str()) {
            bail!("quicksight.dashboards contains duplicate id '{}'", dashboard.id);
        }
    }

    Ok(())
}
