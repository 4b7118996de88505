//! Athena data source backing every dataset

use crate::permissions::{PermissionSet, ResourcePermission};
use crate::reconcile::{reconcile, Reconciled};
use kiroboard_aws::{AwsError, HttpClient, QuickSightClient};
use serde::Serialize;

pub const DATA_SOURCE_ID: &str = "kiro-athena-datasource";

/// Mutable part of the data source; this is also the update body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSourceDocument {
    pub name: String,
    pub data_source_parameters: DataSourceParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSourceParameters {
    pub athena_parameters: AthenaParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AthenaParameters {
    pub work_group: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateDataSourceRequest<'a> {
    data_source_id: &'a str,
    #[serde(rename = "Type")]
    source_type: &'static str,
    #[serde(flatten)]
    document: &'a DataSourceDocument,
    permissions: &'a [ResourcePermission],
}

pub fn data_source(name: &str, workgroup: &str) -> DataSourceDocument {
    DataSourceDocument {
        name: name.to_string(),
        data_source_parameters: DataSourceParameters {
            athena_parameters: AthenaParameters {
                work_group: workgroup.to_string(),
            },
        },
    }
}

pub async fn reconcile_data_source<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    document: DataSourceDocument,
    principal: &str,
) -> Result<Reconciled, AwsError> {
    let permissions = PermissionSet::DataSource.grant(principal);

    reconcile(
        "data source",
        DATA_SOURCE_ID,
        document,
        |document| async move {
            quicksight
                .create_data_source(&CreateDataSourceRequest {
                    data_source_id: DATA_SOURCE_ID,
                    source_type: "ATHENA",
                    document: &document,
                    permissions: &permissions,
                })
                .await
        },
        |document| async move {
            quicksight
                .update_data_source(DATA_SOURCE_ID, &document)
                .await
        },
        AwsError::is_already_exists,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiroboard_aws::http::mock::{error_response, json_response, MockHttpClient};
    use serde_json::json;

    const PRINCIPAL: &str = "arn:aws:quicksight:us-east-1:123456789012:user/default/admin";

    fn client(responses: Vec<kiroboard_aws::HttpResponse>) -> QuickSightClient<MockHttpClient> {
        QuickSightClient::new(
            MockHttpClient::new(responses),
            "https://quicksight.us-east-1.amazonaws.com".to_string(),
            "123456789012".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_carries_type_and_permissions() {
        let qs = client(vec![json_response(202, json!({"Arn": "arn"}))]);

        let outcome = reconcile_data_source(
            &qs,
            data_source("Kiro Athena", "kiro-analytics-workgroup"),
            PRINCIPAL,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Reconciled::Created);

        let requests = qs.http_client().recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        let body = requests[0].json();
        assert_eq!(body["Type"], "ATHENA");
        assert_eq!(body["Permissions"][0]["Principal"], PRINCIPAL);
    }

    #[tokio::test]
    async fn test_existing_source_is_updated_without_permissions() {
        let qs = client(vec![
            error_response(409, "ResourceExistsException", "exists"),
            json_response(200, json!({})),
        ]);

        let outcome = reconcile_data_source(
            &qs,
            data_source("Kiro Athena", "primary"),
            PRINCIPAL,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Reconciled::Updated);

        let requests = qs.http_client().recorded();
        assert_eq!(requests[1].method, "PUT");
        assert!(requests[1].url.ends_with("/data-sources/kiro-athena-datasource"));
        let body = requests[1].json();
        assert!(body.get("Permissions").is_none());
        assert_eq!(body["DataSourceParameters"]["AthenaParameters"]["WorkGroup"], "primary");
    }

    #[test]
    fn test_create_request_shape() {
        let document = data_source("Kiro Athena", "kiro-analytics-workgroup");
        let permissions = PermissionSet::DataSource.grant(PRINCIPAL);
        let value = serde_json::to_value(CreateDataSourceRequest {
            data_source_id: DATA_SOURCE_ID,
            source_type: "ATHENA",
            document: &document,
            permissions: &permissions,
        })
        .unwrap();

        assert_eq!(value["DataSourceId"], "kiro-athena-datasource");
        assert_eq!(value["Type"], "ATHENA");
        assert_eq!(value["Name"], "Kiro Athena");
        assert_eq!(
            value["DataSourceParameters"]["AthenaParameters"]["WorkGroup"],
            "kiro-analytics-workgroup"
        );
        assert_eq!(value["Permissions"][0]["Principal"], PRINCIPAL);

        let update = serde_json::to_value(&document).unwrap();
        assert!(update.get("Permissions").is_none());
        assert!(update.get("Type").is_none());
    }
}
