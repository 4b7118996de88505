use anyhow::Result;
use kiroboard_config::AppConfig;
use kiroboard_core::dataset::{
    activity_dataset, credits_dataset, reconcile_dataset, ACTIVITY_DATASET_ID, CREDITS_DATASET_ID,
};
use kiroboard_core::datasource::{data_source, reconcile_data_source, DATA_SOURCE_ID};
use std::process::ExitCode;
use tracing::{error, info};

use super::{reconcile_analyses, Tally};
use crate::Services;

pub(super) async fn run(config: &AppConfig, services: &Services) -> Result<ExitCode> {
    let quicksight = services.quicksight();
    let principal = config.user_arn()?;
    let database = config.database_name()?;
    let mut tally = Tally::default();

    let result = reconcile_data_source(
        &quicksight,
        data_source(&config.quicksight.data_source_name, &config.athena.workgroup),
        principal,
    )
    .await;
    if let Err(e) = &result {
        error!(resource = "data source", id = DATA_SOURCE_ID, error = %e, "Reconcile failed");
    }
    tally.record(&result);

    let datasets = [
        (
            ACTIVITY_DATASET_ID,
            activity_dataset(
                services.scope(),
                &config.quicksight.dataset_name,
                DATA_SOURCE_ID,
                database,
            ),
        ),
        (
            CREDITS_DATASET_ID,
            credits_dataset(services.scope(), DATA_SOURCE_ID, database),
        ),
    ];
    for (id, document) in datasets {
        let result = reconcile_dataset(&quicksight, id, document, principal).await;
        if let Err(e) = &result {
            error!(resource = "dataset", id, error = %e, "Reconcile failed");
        }
        tally.record(&result);
    }

    let analyses = reconcile_analyses(config, services, &quicksight).await?;
    tally.succeeded += analyses.succeeded;
    tally.failed += analyses.failed;

    info!(
        succeeded = tally.succeeded,
        failed = tally.failed,
        console = %format!("https://{}.quicksight.aws.amazon.com/", config.aws.region),
        "Deploy finished"
    );
    Ok(ExitCode::SUCCESS)
}
