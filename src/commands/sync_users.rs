use anyhow::{Context, Result};
use kiroboard_config::AppConfig;
use kiroboard_core::{IdentityStoreDirectory, UserMappingSync};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::{s3_operator, Services};

pub(super) async fn run(config: &AppConfig, services: &Services) -> Result<ExitCode> {
    let identity_store_id = config.identity_store_id()?;
    let bucket = config.bucket_name()?;
    let database = config.database_name()?;

    let runner = services.query_runner(config);
    let directory = IdentityStoreDirectory::new(services.identity_store(), identity_store_id);
    let catalog = services.glue();
    let store = s3_operator(bucket, &config.aws.region)?;

    let sync = UserMappingSync::new(
        &runner,
        &directory,
        &catalog,
        &store,
        database,
        bucket,
    );
    let report = sync.run().await.context("User mapping sync failed")?;

    for table in &report.skipped_tables {
        warn!(table = %table, "Source table was skipped");
    }
    info!(
        users = report.mappings.len(),
        location = %report.location,
        table = report.table.as_str(),
        "User mapping synchronized"
    );
    Ok(ExitCode::SUCCESS)
}
