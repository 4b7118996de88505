//! Glue Data Catalog table API

use crate::error::Result;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::protocol::{Empty, JsonRpcClient};
use serde::Serialize;
use tracing::instrument;

const SERVICE: &str = "glue";
const TARGET_PREFIX: &str = "AWSGlue";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TableRequest<'a, T: Serialize + ?Sized> {
    database_name: &'a str,
    table_input: &'a T,
}

/// Glue client; the `TableInput` document is supplied by the caller
pub struct GlueClient<H: HttpClient> {
    rpc: JsonRpcClient<H>,
}

impl<H: HttpClient> GlueClient<H> {
    pub fn new(http: H, endpoint: String) -> Self {
        Self {
            rpc: JsonRpcClient::new(http, endpoint, SERVICE, TARGET_PREFIX),
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self {
            rpc: self.rpc.with_retry_policy(retry),
        }
    }

    #[instrument(skip(self, table_input))]
    pub async fn create_table<T>(&self, database: &str, table_input: &T) -> Result<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let _: Empty = self
            .rpc
            .call(
                "CreateTable",
                &TableRequest {
                    database_name: database,
                    table_input,
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, table_input))]
    pub async fn update_table<T>(&self, database: &str, table_input: &T) -> Result<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let _: Empty = self
            .rpc
            .call(
                "UpdateTable",
                &TableRequest {
                    database_name: database,
                    table_input,
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{json_response, MockHttpClient};
    use crate::http::HttpResponse;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_update_table() {
        let mock = MockHttpClient::new(vec![
            HttpResponse {
                status: 400,
                headers: vec![],
                body: br#"{"__type":"AlreadyExistsException","Message":"Table already exists."}"#
                    .to_vec(),
            },
            json_response(200, json!({})),
        ]);
        let client = GlueClient::new(mock, "https://glue.us-east-1.amazonaws.com".to_string());
        let input = json!({"Name": "user_mapping"});

        let err = client.create_table("kiro", &input).await.unwrap_err();
        assert!(err.is_already_exists());

        client.update_table("kiro", &input).await.unwrap();

        let requests = client.rpc.http().recorded();
        assert_eq!(requests[0].header("X-Amz-Target"), Some("AWSGlue.CreateTable"));
        assert_eq!(requests[1].header("X-Amz-Target"), Some("AWSGlue.UpdateTable"));
        assert_eq!(
            requests[1].json(),
            json!({"DatabaseName": "kiro", "TableInput": {"Name": "user_mapping"}})
        );
    }
}
