//! IAM Identity Center identity store API

use crate::error::Result;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::protocol::JsonRpcClient;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "identitystore";
const TARGET_PREFIX: &str = "AWSIdentityStore";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeUserRequest<'a> {
    identity_store_id: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeUserResponse {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DescribeUserResponse {
    /// `DisplayName`, else `UserName`, skipping blanks
    pub fn preferred_name(&self) -> Option<&str> {
        [self.display_name.as_deref(), self.user_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
    }
}

pub struct IdentityStoreClient<H: HttpClient> {
    rpc: JsonRpcClient<H>,
}

impl<H: HttpClient> IdentityStoreClient<H> {
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

    pub async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<DescribeUserResponse> {
        self.rpc
            .call(
                "DescribeUser",
                &DescribeUserRequest {
                    identity_store_id,
                    user_id,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{json_response, MockHttpClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_describe_user() {
        let mock = MockHttpClient::new(vec![json_response(
            200,
            json!({"UserId": "u-1", "UserName": "jdoe", "DisplayName": "Jane Doe", "IdentityStoreId": "d-1"}),
        )]);
        let client = IdentityStoreClient::new(
            mock,
            "https://identitystore.us-east-1.amazonaws.com".to_string(),
        );

        let user = client.describe_user("d-1", "u-1").await.unwrap();
        assert_eq!(user.preferred_name(), Some("Jane Doe"));

        let requests = client.rpc.http().recorded();
        assert_eq!(
            requests[0].header("X-Amz-Target"),
            Some("AWSIdentityStore.DescribeUser")
        );
        assert_eq!(
            requests[0].json(),
            json!({"IdentityStoreId": "d-1", "UserId": "u-1"})
        );
    }

    #[test]
    fn test_preferred_name_skips_blank_display_name() {
        let user = DescribeUserResponse {
            user_id: "u-2".to_string(),
            user_name: Some("jroe".to_string()),
            display_name: Some(String::new()),
        };
        assert_eq!(user.preferred_name(), Some("jroe"));

        let anonymous = DescribeUserResponse::default();
        assert_eq!(anonymous.preferred_name(), None);
    }
}
