use anyhow::Result;
use kiroboard_config::AppConfig;
use kiroboard_core::dashboard::{dashboard, deploy_dashboard, DASHBOARD_ID, PUBLISH_DELAY};
use std::process::ExitCode;
use tracing::{error, info};

use crate::Services;

pub(super) async fn run(config: &AppConfig, services: &Services) -> Result<ExitCode> {
    let principal = config.user_arn()?;
    if let Err(e) = dashboard(services.scope()).definition.validate() {
        error!(id = DASHBOARD_ID, error = %e, "Invalid dashboard definition");
        return Ok(ExitCode::SUCCESS);
    }

    let quicksight = services.quicksight();
    match deploy_dashboard(
        &quicksight,
        services.scope(),
        principal,
        PUBLISH_DELAY,
    )
    .await
    {
        Ok(outcome) => info!(
            id = DASHBOARD_ID,
            outcome = outcome.reconciled.as_str(),
            published_version = ?outcome.published_version,
            url = %format!(
                "https://{}.quicksight.aws.amazon.com/sn/dashboards/{}",
                config.aws.region, DASHBOARD_ID
            ),
            "Dashboard deployed"
        ),
        Err(e) => error!(id = DASHBOARD_ID, error = %e, "Dashboard deploy failed"),
    }

    Ok(ExitCode::SUCCESS)
}
