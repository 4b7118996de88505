use anyhow::Result;
use kiroboard_aws::{AwsSigV4HttpClient, QuickSightClient};
use kiroboard_config::AppConfig;
use kiroboard_core::analysis::{analysis, analysis_id, reconcile_analysis};
use std::process::ExitCode;
use tracing::{error, info, warn};

use super::Tally;
use crate::Services;

/// Reconcile one analysis per configured dashboard entry
pub async fn reconcile_analyses(
    config: &AppConfig,
    services: &Services,
    quicksight: &QuickSightClient<AwsSigV4HttpClient>,
) -> Result<Tally> {
    let principal = config.user_arn()?;
    let mut tally = Tally::default();

    for entry in &config.quicksight.dashboards {
        let id = analysis_id(&entry.id);
        let document = analysis(services.scope(), &entry.id, &entry.name);

        if let Err(e) = document.definition.validate() {
            error!(resource = "analysis", id = %id, error = %e, "Invalid definition");
            tally.failed += 1;
            continue;
        }
        if document.definition.visual_count() == 0 {
            warn!(id = %id, "No visuals defined for this dashboard id, creating a blank sheet");
        }

        let result = reconcile_analysis(quicksight, &id, document, principal).await;
        if let Err(e) = &result {
            error!(resource = "analysis", id = %id, name = %entry.name, error = %e, "Reconcile failed");
        }
        tally.record(&result);
    }

    Ok(tally)
}

pub(super) async fn run(config: &AppConfig, services: &Services) -> Result<ExitCode> {
    let quicksight = services.quicksight();
    let tally = reconcile_analyses(config, services, &quicksight).await?;

    info!(
        succeeded = tally.succeeded,
        failed = tally.failed,
        "Analyses finished"
    );
    Ok(ExitCode::SUCCESS)
}
