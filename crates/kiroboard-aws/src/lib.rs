//! Thin, SigV4-signed clients for the AWS APIs kiroboard drives
//!
//! Athena, Glue and Identity Store speak the JSON 1.1 `X-Amz-Target`
//! protocol; QuickSight is REST-JSON. Every client is generic over
//! [`HttpClient`] so request shapes can be tested without the network.
//! Throttled and transient failures are retried per [`RetryPolicy`].

pub use athena::{AthenaClient, QueryExecutionState, QueryExecutionStatus, ResultPage};
pub use error::{AwsError, Result};
pub use glue::GlueClient;
pub use http::{HttpClient, HttpResponse};
pub use identitystore::{DescribeUserResponse, IdentityStoreClient};
pub use quicksight::{DashboardVersionSummary, QuickSightClient, ResourceResponse};
pub use retry::RetryPolicy;
pub use sigv4::{load_sdk_config, AwsSigV4HttpClient};

pub mod athena;
pub mod error;
pub mod glue;
pub mod http;
pub mod identitystore;
mod protocol;
pub mod quicksight;
pub mod retry;
pub mod sigv4;

/// Regional endpoint for an AWS service, e.g. `https://athena.us-east-1.amazonaws.com`
pub fn regional_endpoint(service: &str, region: &str) -> String {
    format!("https://{}.{}.amazonaws.com", service, region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regional_endpoint() {
        assert_eq!(
            regional_endpoint("quicksight", "eu-west-1"),
            "https://quicksight.eu-west-1.amazonaws.com"
        );
    }
}
