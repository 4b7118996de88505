//! Comprehensive dashboard over both datasets, published after each deploy

use crate::dataset::{ACTIVITY_DATASET_ID, CREDITS_DATASET_ID};
use crate::definition::{dataset_arn, DataSetIdentifierDeclaration, Definition, Sheet};
use crate::permissions::{PermissionSet, ResourcePermission};
use crate::reconcile::{reconcile, Reconciled};
use crate::visual::{bar, kpi, line, table, Aggregation, Measure};
use crate::AccountScope;
use kiroboard_aws::{AwsError, DashboardVersionSummary, HttpClient, QuickSightClient};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const DASHBOARD_ID: &str = "kiro-comprehensive-dashboard";
pub const DASHBOARD_NAME: &str = "Kiro Comprehensive Dashboard";

/// Wait between reconciling and listing versions so the new version shows up
pub const PUBLISH_DELAY: Duration = Duration::from_secs(3);

const CREDITS: &str = "credits";
const ACTIVITY: &str = "activity";

/// Name plus definition; this is also the update body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DashboardDocument {
    pub name: String,
    pub definition: Definition,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateDashboardRequest<'a> {
    #[serde(flatten)]
    document: &'a DashboardDocument,
    permissions: &'a [ResourcePermission],
}

/// Result of [`deploy_dashboard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardOutcome {
    pub reconciled: Reconciled,
    /// Version made live, `None` when publishing was skipped
    pub published_version: Option<i64>,
}

pub fn dashboard(scope: &AccountScope) -> DashboardDocument {
    DashboardDocument {
        name: DASHBOARD_NAME.to_string(),
        definition: Definition {
            data_set_identifier_declarations: vec![
                DataSetIdentifierDeclaration::new(CREDITS, dataset_arn(scope, CREDITS_DATASET_ID)),
                DataSetIdentifierDeclaration::new(ACTIVITY, dataset_arn(scope, ACTIVITY_DATASET_ID)),
            ],
            sheets: vec![overview_sheet(), behavior_sheet(), cost_sheet()],
        },
    }
}

fn overview_sheet() -> Sheet {
    Sheet::new(
        "sheet-overview",
        "Overview",
        vec![
            kpi("d-kpi-users", "Active users", CREDITS, "userid", Aggregation::DistinctCount),
            kpi("d-kpi-credits", "Credits used", CREDITS, "credits_used", Aggregation::SUM),
            kpi("d-kpi-overage", "Overage credits", CREDITS, "overage_credits_used", Aggregation::SUM),
            kpi("d-kpi-messages", "Total messages", CREDITS, "total_messages", Aggregation::SUM),
            line(
                "d-line-credits",
                "Daily credit usage",
                CREDITS,
                "date",
                &[
                    Measure::new("cr_used", "credits_used", Aggregation::SUM),
                    Measure::new("cr_over", "overage_credits_used", Aggregation::SUM),
                ],
            ),
            bar(
                "d-bar-top-credits",
                "Top 10 users by credits",
                CREDITS,
                "username",
                &[Measure::new("cr_sum", "credits_used", Aggregation::SUM)],
                Some(10),
            ),
            bar(
                "d-bar-tier",
                "Users per subscription tier",
                CREDITS,
                "subscription_tier",
                &[Measure::new("tier_users", "userid", Aggregation::DistinctCount)],
                None,
            ),
        ],
    )
}

fn behavior_sheet() -> Sheet {
    Sheet::new(
        "sheet-behavior",
        "User behavior",
        vec![
            kpi("d-kpi-codelines", "AI code lines", ACTIVITY, "chat_aicodelines", Aggregation::SUM),
            kpi("d-kpi-inline", "Inline code lines", ACTIVITY, "inline_aicodelines", Aggregation::SUM),
            kpi("d-kpi-chat", "Chat messages", ACTIVITY, "chat_messagessent", Aggregation::SUM),
            line(
                "d-line-code",
                "Daily AI code generation",
                ACTIVITY,
                "date",
                &[
                    Measure::new("chat_cl", "chat_aicodelines", Aggregation::SUM),
                    Measure::new("inline_cl", "inline_aicodelines", Aggregation::SUM),
                ],
            ),
            line(
                "d-line-accept",
                "Inline suggestion acceptance",
                ACTIVITY,
                "date",
                &[
                    Measure::new("accepted", "inline_acceptancecount", Aggregation::SUM),
                    Measure::new("suggested", "inline_suggestionscount", Aggregation::SUM),
                ],
            ),
            bar(
                "d-bar-top-code",
                "Top 10 users by generated code",
                ACTIVITY,
                "username",
                &[
                    Measure::new("u_chat", "chat_aicodelines", Aggregation::SUM),
                    Measure::new("u_inline", "inline_aicodelines", Aggregation::SUM),
                ],
                Some(10),
            ),
        ],
    )
}

fn cost_sheet() -> Sheet {
    Sheet::new(
        "sheet-cost",
        "Cost analysis",
        vec![
            line(
                "d-line-overage",
                "Daily overage",
                CREDITS,
                "date",
                &[Measure::new("ov_sum", "overage_credits_used", Aggregation::SUM)],
            ),
            bar(
                "d-bar-tier-cost",
                "Average credits per tier",
                CREDITS,
                "subscription_tier",
                &[
                    Measure::new("avg_cr", "credits_used", Aggregation::AVERAGE),
                    Measure::new("avg_cap", "overage_cap", Aggregation::AVERAGE),
                ],
                None,
            ),
            table(
                "d-table-cost",
                "Credit usage by user",
                CREDITS,
                &["username", "subscription_tier", "client_type"],
                &[
                    Measure::new("t_credits", "credits_used", Aggregation::SUM),
                    Measure::new("t_overage", "overage_credits_used", Aggregation::SUM),
                    Measure::new("t_cap", "overage_cap", Aggregation::MAX),
                    Measure::new("t_msgs", "total_messages", Aggregation::SUM),
                ],
            ),
        ],
    )
}

pub async fn reconcile_dashboard<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    document: DashboardDocument,
    principal: &str,
) -> Result<Reconciled, AwsError> {
    let permissions = PermissionSet::Dashboard.grant(principal);

    reconcile(
        "dashboard",
        DASHBOARD_ID,
        document,
        |document| async move {
            quicksight
                .create_dashboard(
                    DASHBOARD_ID,
                    &CreateDashboardRequest {
                        document: &document,
                        permissions: &permissions,
                    },
                )
                .await
        },
        |document| async move { quicksight.update_dashboard(DASHBOARD_ID, &document).await },
        AwsError::is_already_exists,
    )
    .await
}

/// Highest version number, if any version exists
pub fn latest_version(versions: &[DashboardVersionSummary]) -> Option<i64> {
    versions.iter().map(|v| v.version_number).max()
}

/// Make the newest version of `dashboard_id` the published one
pub async fn publish_latest<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    dashboard_id: &str,
) -> Result<Option<i64>, AwsError> {
    let versions = quicksight.list_dashboard_versions(dashboard_id).await?;
    let Some(latest) = latest_version(&versions) else {
        return Ok(None);
    };

    quicksight
        .update_dashboard_published_version(dashboard_id, latest)
        .await?;
    Ok(Some(latest))
}

/// Reconcile the dashboard, wait `publish_delay`, then publish the latest version
///
/// Publishing is best effort: a failure is logged and reported as `None`.
pub async fn deploy_dashboard<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    scope: &AccountScope,
    principal: &str,
    publish_delay: Duration,
) -> Result<DashboardOutcome, AwsError> {
    let reconciled = reconcile_dashboard(quicksight, dashboard(scope), principal).await?;

    tokio::time::sleep(publish_delay).await;

    let published_version = match publish_latest(quicksight, DASHBOARD_ID).await {
        Ok(Some(version)) => {
            info!(id = DASHBOARD_ID, version, "Published dashboard version");
            Some(version)
        }
        Ok(None) => {
            warn!(id = DASHBOARD_ID, "No dashboard versions to publish");
            None
        }
        Err(e) => {
            warn!(id = DASHBOARD_ID, error = %e, "Skipping publish");
            None
        }
    };

    Ok(DashboardOutcome {
        reconciled,
        published_version,
    })
}
