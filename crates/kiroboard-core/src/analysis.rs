//! Analyses provisioned per configured dashboard entry

use crate::dataset::{ACTIVITY_DATASET_ID, CREDITS_DATASET_ID};
use crate::definition::{dataset_arn, DataSetIdentifierDeclaration, Definition, Sheet};
use crate::permissions::{PermissionSet, ResourcePermission};
use crate::reconcile::{reconcile, Reconciled};
use crate::visual::{bar, kpi, line, table, Aggregation, Measure};
use crate::AccountScope;
use kiroboard_aws::{AwsError, HttpClient, QuickSightClient};
use serde::Serialize;

pub const ADMIN_OVERVIEW: &str = "kiro-admin-overview";
pub const COST_OPTIMIZATION: &str = "kiro-cost-optimization";
pub const USER_BEHAVIOR: &str = "kiro-user-behavior";
pub const FEATURE_ADOPTION: &str = "kiro-feature-adoption";

/// Local identifier of the single dataset an analysis binds
const DATASET: &str = "dataset1";

/// Name plus definition; this is also the update body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisDocument {
    pub name: String,
    pub definition: Definition,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAnalysisRequest<'a> {
    #[serde(flatten)]
    document: &'a AnalysisDocument,
    permissions: &'a [ResourcePermission],
}

pub fn analysis_id(dashboard_id: &str) -> String {
    format!("{}-analysis", dashboard_id)
}

/// Admin overview and cost optimization read credits; everything else reads activity
pub fn dataset_for(dashboard_id: &str) -> &'static str {
    match dashboard_id {
        ADMIN_OVERVIEW | COST_OPTIMIZATION => CREDITS_DATASET_ID,
        _ => ACTIVITY_DATASET_ID,
    }
}

/// Visual sheet for a known dashboard id, a blank sheet otherwise
pub fn sheet_for(dashboard_id: &str) -> Sheet {
    match dashboard_id {
        ADMIN_OVERVIEW => admin_overview_sheet(),
        COST_OPTIMIZATION => cost_optimization_sheet(),
        USER_BEHAVIOR => user_behavior_sheet(),
        FEATURE_ADOPTION => feature_adoption_sheet(),
        _ => Sheet::new("sheet1", "Sheet 1", Vec::new()),
    }
}

pub fn analysis(scope: &AccountScope, dashboard_id: &str, name: &str) -> AnalysisDocument {
    AnalysisDocument {
        name: name.to_string(),
        definition: Definition {
            data_set_identifier_declarations: vec![DataSetIdentifierDeclaration::new(
                DATASET,
                dataset_arn(scope, dataset_for(dashboard_id)),
            )],
            sheets: vec![sheet_for(dashboard_id)],
        },
    }
}

pub async fn reconcile_analysis<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    analysis_id: &str,
    document: AnalysisDocument,
    principal: &str,
) -> Result<Reconciled, AwsError> {
    let permissions = PermissionSet::Analysis.grant(principal);

    reconcile(
        "analysis",
        analysis_id,
        document,
        |document| async move {
            quicksight
                .create_analysis(
                    analysis_id,
                    &CreateAnalysisRequest {
                        document: &document,
                        permissions: &permissions,
                    },
                )
                .await
        },
        |document| async move { quicksight.update_analysis(analysis_id, &document).await },
        AwsError::is_already_exists,
    )
    .await
}

fn admin_overview_sheet() -> Sheet {
    let ds = DATASET;
    Sheet::new(
        "sheet1",
        "Overview",
        vec![
            kpi("kpi-users", "Active users", ds, "userid", Aggregation::DistinctCount),
            kpi("kpi-credits", "Credits used", ds, "credits_used", Aggregation::SUM),
            kpi("kpi-overage", "Overage credits", ds, "overage_credits_used", Aggregation::SUM),
            kpi("kpi-messages", "Total messages", ds, "total_messages", Aggregation::SUM),
            line(
                "line-credits",
                "Daily credit usage",
                ds,
                "date",
                &[
                    Measure::new("credits", "credits_used", Aggregation::SUM),
                    Measure::new("overage", "overage_credits_used", Aggregation::SUM),
                ],
            ),
            bar(
                "bar-top-credits",
                "Top 10 users by credits",
                ds,
                "username",
                &[Measure::new("credits", "credits_used", Aggregation::SUM)],
                Some(10),
            ),
            bar(
                "bar-tier",
                "Users per subscription tier",
                ds,
                "subscription_tier",
                &[Measure::new("users", "userid", Aggregation::DistinctCount)],
                None,
            ),
            bar(
                "bar-client",
                "Users per client type",
                ds,
                "client_type",
                &[Measure::new("users", "userid", Aggregation::DistinctCount)],
                None,
            ),
        ],
    )
}

fn cost_optimization_sheet() -> Sheet {
    let ds = DATASET;
    Sheet::new(
        "sheet1",
        "Cost analysis",
        vec![
            kpi("kpi-overage-users", "Users with overage", ds, "userid", Aggregation::DistinctCount),
            kpi("kpi-total-overage", "Total overage credits", ds, "overage_credits_used", Aggregation::SUM),
            kpi("kpi-avg-credits", "Average credits per user", ds, "credits_used", Aggregation::AVERAGE),
            line(
                "line-overage",
                "Daily overage",
                ds,
                "date",
                &[Measure::new("overage", "overage_credits_used", Aggregation::SUM)],
            ),
            bar(
                "bar-tier-credits",
                "Average credits per tier",
                ds,
                "subscription_tier",
                &[
                    Measure::new("avg_credits", "credits_used", Aggregation::AVERAGE),
                    Measure::new("avg_cap", "overage_cap", Aggregation::AVERAGE),
                ],
                None,
            ),
            table(
                "table-cost",
                "Credit usage by user",
                ds,
                &["username", "subscription_tier", "client_type"],
                &[
                    Measure::new("credits", "credits_used", Aggregation::SUM),
                    Measure::new("overage", "overage_credits_used", Aggregation::SUM),
                    Measure::new("cap", "overage_cap", Aggregation::MAX),
                    Measure::new("msgs", "total_messages", Aggregation::SUM),
                ],
            ),
        ],
    )
}

fn user_behavior_sheet() -> Sheet {
    let ds = DATASET;
    Sheet::new(
        "sheet1",
        "Behavior",
        vec![
            kpi("kpi-codelines", "AI code lines", ds, "chat_aicodelines", Aggregation::SUM),
            kpi("kpi-inline-code", "Inline code lines", ds, "inline_aicodelines", Aggregation::SUM),
            kpi("kpi-chat-msgs", "Chat messages", ds, "chat_messagessent", Aggregation::SUM),
            line(
                "line-code",
                "Daily AI code generation",
                ds,
                "date",
                &[
                    Measure::new("chat_code", "chat_aicodelines", Aggregation::SUM),
                    Measure::new("inline_code", "inline_aicodelines", Aggregation::SUM),
                ],
            ),
            line(
                "line-acceptance",
                "Inline suggestion acceptance",
                ds,
                "date",
                &[
                    Measure::new("accepted", "inline_acceptancecount", Aggregation::SUM),
                    Measure::new("suggested", "inline_suggestionscount", Aggregation::SUM),
                ],
            ),
            bar(
                "bar-top-code",
                "Top 10 users by generated code",
                ds,
                "username",
                &[
                    Measure::new("chat_code", "chat_aicodelines", Aggregation::SUM),
                    Measure::new("inline_code", "inline_aicodelines", Aggregation::SUM),
                ],
                Some(10),
            ),
            table(
                "table-behavior",
                "Activity by user",
                ds,
                &["username"],
                &[
                    Measure::new("chat_msgs", "chat_messagessent", Aggregation::SUM),
                    Measure::new("chat_code", "chat_aicodelines", Aggregation::SUM),
                    Measure::new("inline_code", "inline_aicodelines", Aggregation::SUM),
                    Measure::new("inline_accept", "inline_acceptancecount", Aggregation::SUM),
                    Measure::new("inline_suggest", "inline_suggestionscount", Aggregation::SUM),
                ],
            ),
        ],
    )
}

/// One trend line pair per feature
const FEATURE_TRENDS: &[(&str, &str, [(&str, &str); 2])] = &[
    ("line-dev", "Dev agent usage", [
        ("dev_gen", "dev_generationeventcount"),
        ("dev_accept", "dev_acceptanceeventcount"),
    ]),
    ("line-test", "Test generation", [
        ("test_events", "testgeneration_eventcount"),
        ("test_accepted", "testgeneration_acceptedtests"),
    ]),
    ("line-review", "Code review", [
        ("review_ok", "codereview_succeededeventcount"),
        ("review_findings", "codereview_findingscount"),
    ]),
    ("line-codefix", "Code fix", [
        ("fix_gen", "codefix_generationeventcount"),
        ("fix_accept", "codefix_acceptanceeventcount"),
    ]),
    ("line-inlinechat", "Inline chat usage", [
        ("ic_total", "inlinechat_totaleventcount"),
        ("ic_accept", "inlinechat_acceptanceeventcount"),
    ]),
    ("line-docgen", "Documentation generation", [
        ("doc_events", "docgeneration_eventcount"),
        ("doc_created", "docgeneration_acceptedfilescreations"),
    ]),
    ("line-transform", "Code transformation", [
        ("transform_events", "transformation_eventcount"),
        ("transform_lines", "transformation_linesgenerated"),
    ]),
];

fn feature_adoption_sheet() -> Sheet {
    let visuals = FEATURE_TRENDS
        .iter()
        .map(|(id, title, series)| {
            let measures: Vec<Measure> = series
                .iter()
                .map(|(field_id, column)| Measure::new(*field_id, *column, Aggregation::SUM))
                .collect();
            line(id, title, DATASET, "date", &measures)
        })
        .collect();

    Sheet::new("sheet1", "Feature usage", visuals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiroboard_aws::http::mock::{error_response, json_response, MockHttpClient};
    use serde_json::json;

    fn scope() -> AccountScope {
        AccountScope::new("us-east-1", "123456789012")
    }

    #[test]
    fn test_known_definitions_are_valid() {
        for id in [ADMIN_OVERVIEW, COST_OPTIMIZATION, USER_BEHAVIOR, FEATURE_ADOPTION] {
            let doc = analysis(&scope(), id, id);
            doc.definition.validate().unwrap();
            assert!(doc.definition.visual_count() > 0, "{} has no visuals", id);
        }
    }

    #[test]
    fn test_dataset_binding() {
        let overview = analysis(&scope(), ADMIN_OVERVIEW, "Admin overview");
        assert_eq!(
            overview.definition.data_set_identifier_declarations[0].data_set_arn,
            "arn:aws:quicksight:us-east-1:123456789012:dataset/kiro-user-credits-dataset"
        );

        let behavior = analysis(&scope(), USER_BEHAVIOR, "User behavior");
        assert!(behavior.definition.data_set_identifier_declarations[0]
            .data_set_arn
            .ends_with("dataset/kiro-user-activity-dataset"));
    }

    #[test]
    fn test_unknown_id_gets_blank_sheet() {
        let doc = analysis(&scope(), "kiro-custom", "Custom");
        assert_eq!(analysis_id("kiro-custom"), "kiro-custom-analysis");
        assert_eq!(doc.definition.sheets.len(), 1);
        assert_eq!(doc.definition.sheets[0].name, "Sheet 1");
        assert!(doc.definition.sheets[0].visuals.is_empty());
        assert!(doc.definition.validate().is_ok());
    }

    #[test]
    fn test_feature_adoption_has_one_line_per_feature() {
        let sheet = sheet_for(FEATURE_ADOPTION);
        assert_eq!(sheet.visuals.len(), FEATURE_TRENDS.len());
        assert_eq!(sheet.visuals[0].field_ids(), vec!["date", "dev_gen", "dev_accept"]);
    }

    #[tokio::test]
    async fn test_reconcile_analysis_update_strips_permissions() {
        let qs = QuickSightClient::new(
            MockHttpClient::new(vec![
                error_response(409, "ResourceExistsException", "exists"),
                json_response(200, json!({})),
            ]),
            "https://quicksight.us-east-1.amazonaws.com".to_string(),
            "123456789012".to_string(),
        );
        let id = analysis_id(COST_OPTIMIZATION);
        let doc = analysis(&scope(), COST_OPTIMIZATION, "Cost optimization");

        let outcome = reconcile_analysis(&qs, &id, doc, "arn:aws:quicksight:::user/admin")
            .await
            .unwrap();
        assert_eq!(outcome, Reconciled::Updated);

        let requests = qs.http_client().recorded();
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].url.ends_with("/analyses/kiro-cost-optimization-analysis"));
        assert!(requests[0].json().get("Permissions").is_some());

        assert_eq!(requests[1].method, "PUT");
        let update = requests[1].json();
        assert!(update.get("Permissions").is_none());
        assert_eq!(update["Name"], "Cost optimization");
        assert_eq!(update["Definition"]["Sheets"][0]["Name"], "Cost analysis");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_analysis_retries_throttled_create() {
        let qs = QuickSightClient::new(
            MockHttpClient::new(vec![
                error_response(429, "ThrottlingException", "Rate exceeded"),
                json_response(202, json!({"Arn": "arn:aws:quicksight:us-east-1:123456789012:analysis/x"})),
            ]),
            "https://quicksight.us-east-1.amazonaws.com".to_string(),
            "123456789012".to_string(),
        );
        let id = analysis_id(ADMIN_OVERVIEW);
        let doc = analysis(&scope(), ADMIN_OVERVIEW, "Admin overview");

        let outcome = reconcile_analysis(&qs, &id, doc, "arn:aws:quicksight:::user/admin")
            .await
            .unwrap();
        assert_eq!(outcome, Reconciled::Created);

        let requests = qs.http_client().recorded();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method == "POST"));
    }
}
