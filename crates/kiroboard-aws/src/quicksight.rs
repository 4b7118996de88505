//! QuickSight REST-JSON API
//!
//! Only the operations kiroboard provisions with. Request documents are
//! built by the caller; this client owns paths, methods and error mapping.

use crate::error::{AwsError, Result};
use crate::http::HttpClient;
use crate::retry::{send_with_retry, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use urlencoding::encode;

const SERVICE: &str = "quicksight";

/// Common fields of create/update responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceResponse {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub version_arn: Option<String>,
    #[serde(default)]
    pub creation_status: Option<String>,
    #[serde(default)]
    pub update_status: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DashboardVersionSummary {
    pub version_number: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListDashboardVersionsResponse {
    #[serde(default)]
    dashboard_version_summary_list: Vec<DashboardVersionSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

/// QuickSight client bound to one AWS account
pub struct QuickSightClient<H: HttpClient> {
    http: H,
    endpoint: String,
    account_id: String,
    retry: RetryPolicy,
}

impl<H: HttpClient> QuickSightClient<H> {
    pub fn new(http: H, endpoint: String, account_id: String) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_id,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn http_client(&self) -> &H {
        &self.http
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = format!("{}/accounts/{}", self.endpoint, encode(&self.account_id));
        for segment in segments {
            url.push('/');
            url.push_str(&encode(segment));
        }
        url
    }

    async fn send<Resp: DeserializeOwned>(
        &self,
        operation: &str,
        method: &str,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Resp> {
        debug!(operation, method, url, "QuickSight request");

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let response =
            send_with_retry(&self.http, &self.retry, SERVICE, operation, method, url, headers, body)
                .await?;

        response
            .json()
            .map_err(|e| AwsError::decode(SERVICE, operation, e))
    }

    async fn send_json<B, Resp>(
        &self,
        operation: &str,
        method: &str,
        url: &str,
        body: &B,
    ) -> Result<Resp>
    where
        B: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| AwsError::decode(SERVICE, operation, e))?;
        self.send(operation, method, url, Some(bytes)).await
    }

    /// `POST /accounts/{account}/data-sources`; the id travels in the body
    #[instrument(skip(self, body))]
    pub async fn create_data_source<B>(&self, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["data-sources"]);
        self.send_json("CreateDataSource", "POST", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn update_data_source<B>(&self, data_source_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["data-sources", data_source_id]);
        self.send_json("UpdateDataSource", "PUT", &url, body).await
    }

    /// `POST /accounts/{account}/data-sets`; the id travels in the body
    #[instrument(skip(self, body))]
    pub async fn create_data_set<B>(&self, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["data-sets"]);
        self.send_json("CreateDataSet", "POST", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn update_data_set<B>(&self, data_set_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["data-sets", data_set_id]);
        self.send_json("UpdateDataSet", "PUT", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn create_analysis<B>(&self, analysis_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["analyses", analysis_id]);
        self.send_json("CreateAnalysis", "POST", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn update_analysis<B>(&self, analysis_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["analyses", analysis_id]);
        self.send_json("UpdateAnalysis", "PUT", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn create_dashboard<B>(&self, dashboard_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["dashboards", dashboard_id]);
        self.send_json("CreateDashboard", "POST", &url, body).await
    }

    #[instrument(skip(self, body))]
    pub async fn update_dashboard<B>(&self, dashboard_id: &str, body: &B) -> Result<ResourceResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(&["dashboards", dashboard_id]);
        self.send_json("UpdateDashboard", "PUT", &url, body).await
    }

    /// All versions of a dashboard, following pagination
    #[instrument(skip(self))]
    pub async fn list_dashboard_versions(
        &self,
        dashboard_id: &str,
    ) -> Result<Vec<DashboardVersionSummary>> {
        let base = self.url(&["dashboards", dashboard_id, "versions"]);
        let mut versions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let url = match &next_token {
                Some(token) => format!("{}?next-token={}", base, encode(token)),
                None => base.clone(),
            };
            let page: ListDashboardVersionsResponse = self
                .send("ListDashboardVersions", "GET", &url, None)
                .await?;
            versions.extend(page.dashboard_version_summary_list);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(versions)
    }

    #[instrument(skip(self))]
    pub async fn update_dashboard_published_version(
        &self,
        dashboard_id: &str,
        version_number: i64,
    ) -> Result<ResourceResponse> {
        let version = version_number.to_string();
        let url = self.url(&["dashboards", dashboard_id, "versions", &version]);
        self.send("UpdateDashboardPublishedVersion", "PUT", &url, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{json_response, MockHttpClient};
    use crate::http::HttpResponse;
    use serde_json::json;

    const ENDPOINT: &str = "https://quicksight.us-east-1.amazonaws.com";

    fn client(responses: Vec<HttpResponse>) -> QuickSightClient<MockHttpClient> {
        QuickSightClient::new(
            MockHttpClient::new(responses),
            ENDPOINT.to_string(),
            "123456789012".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_update_paths() {
        let qs = client(vec![
            json_response(202, json!({"Arn": "arn:ds", "CreationStatus": "CREATION_IN_PROGRESS"})),
            json_response(200, json!({"Arn": "arn:ds"})),
            json_response(202, json!({"Arn": "arn:analysis"})),
        ]);
        let body = json!({"Name": "n"});

        let created = qs.create_data_source(&body).await.unwrap();
        assert_eq!(created.arn.as_deref(), Some("arn:ds"));
        qs.update_data_set("kiro-user-activity-dataset", &body)
            .await
            .unwrap();
        qs.create_analysis("kiro-admin-overview-analysis", &body)
            .await
            .unwrap();

        let requests = qs.http.recorded();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].url,
            format!("{}/accounts/123456789012/data-sources", ENDPOINT)
        );
        assert_eq!(requests[1].method, "PUT");
        assert_eq!(
            requests[1].url,
            format!(
                "{}/accounts/123456789012/data-sets/kiro-user-activity-dataset",
                ENDPOINT
            )
        );
        assert_eq!(
            requests[2].url,
            format!(
                "{}/accounts/123456789012/analyses/kiro-admin-overview-analysis",
                ENDPOINT
            )
        );
        assert_eq!(requests[2].json(), json!({"Name": "n"}));
    }

    #[tokio::test]
    async fn test_resource_exists_is_classified() {
        let qs = client(vec![HttpResponse {
            status: 409,
            headers: vec![(
                "x-amzn-ErrorType".to_string(),
                "ResourceExistsException:".to_string(),
            )],
            body: br#"{"Message":"exists"}"#.to_vec(),
        }]);

        let err = qs
            .create_dashboard("kiro-comprehensive-dashboard", &json!({}))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_list_dashboard_versions_follows_pages() {
        let qs = client(vec![
            json_response(
                200,
                json!({"DashboardVersionSummaryList": [{"VersionNumber": 1}], "NextToken": "t/2"}),
            ),
            json_response(
                200,
                json!({"DashboardVersionSummaryList": [{"VersionNumber": 2, "Status": "CREATION_SUCCESSFUL"}]}),
            ),
        ]);

        let versions = qs
            .list_dashboard_versions("kiro-comprehensive-dashboard")
            .await
            .unwrap();
        assert_eq!(
            versions.iter().map(|v| v.version_number).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let requests = qs.http.recorded();
        assert_eq!(requests[0].method, "GET");
        assert!(requests[1].url.ends_with("/versions?next-token=t%2F2"));
    }

    #[tokio::test]
    async fn test_publish_version_has_no_body() {
        let qs = client(vec![json_response(200, json!({}))]);
        qs.update_dashboard_published_version("kiro-comprehensive-dashboard", 7)
            .await
            .unwrap();

        let requests = qs.http.recorded();
        assert_eq!(requests[0].method, "PUT");
        assert!(requests[0].url.ends_with("/dashboards/kiro-comprehensive-dashboard/versions/7"));
        assert!(requests[0].body.is_none());
    }
}
