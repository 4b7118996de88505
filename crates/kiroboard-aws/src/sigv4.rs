//! AWS SigV4-authenticated HTTP client

use crate::error::AwsError;
use crate::http::{HttpClient, HttpResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use std::time::Duration;

const USER_AGENT: &str = concat!("kiroboard/", env!("CARGO_PKG_VERSION"));

/// Resolve region, credentials and the rest of the SDK chain for `region`
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// HTTP client that signs requests with AWS SigV4 for one service
#[derive(Clone)]
pub struct AwsSigV4HttpClient {
    client: reqwest::Client,
    credentials_provider: SharedCredentialsProvider,
    region: String,
    /// Signing name, e.g. "athena" or "quicksight"
    service: &'static str,
}

impl AwsSigV4HttpClient {
    /// Create a signer for `service` using credentials from `sdk_config`
    ///
    /// Credentials come from the standard chain (env vars, profile, SSO,
    /// instance role, ...).
    pub fn new(sdk_config: &SdkConfig, service: &'static str) -> std::result::Result<Self, AwsError> {
        let credentials_provider = sdk_config.credentials_provider().ok_or_else(|| {
            AwsError::Credentials("no credentials provider configured".to_string())
        })?;
        let region = sdk_config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| AwsError::Credentials("no region configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AwsError::transport(service, "client", e.into()))?;

        Ok(Self {
            client,
            credentials_provider,
            region,
            service,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Reuse the underlying connection pool and credentials for another service
    pub fn for_service(&self, service: &'static str) -> Self {
        Self {
            service,
            ..self.clone()
        }
    }
}

#[async_trait]
impl HttpClient for AwsSigV4HttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        mut headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        if !headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
        {
            headers.push(("User-Agent".to_string(), USER_AGENT.to_string()));
        }

        let credentials = self
            .credentials_provider
            .provide_credentials()
            .await
            .map_err(|e| AwsError::Credentials(e.to_string()))?;

        let parsed_url = url.parse::<url::Url>().context("Failed to parse URL")?;

        let signable_headers: Vec<(&str, &str)> = headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let signable_body = match body {
            Some(ref body_bytes) => SignableBody::Bytes(body_bytes),
            None => SignableBody::Bytes(&[]),
        };

        let signable_request = SignableRequest::new(
            method,
            parsed_url.as_str(),
            signable_headers.into_iter(),
            signable_body,
        )
        .map_err(|e| AwsError::Signing {
            service: self.service,
            reason: e.to_string(),
        })?;

        let identity = credentials.into();

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(self.service)
            .time(std::time::SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| AwsError::Signing {
                service: self.service,
                reason: e.to_string(),
            })?
            .into();

        let (signing_instructions, _signature) = sign(signable_request, &signing_params)
            .map_err(|e| AwsError::Signing {
                service: self.service,
                reason: e.to_string(),
            })?
            .into_parts();

        for (name, value) in signing_instructions.headers() {
            headers.push((name.to_string(), value.to_string()));
        }

        let mut request_builder = self
            .client
            .request(method.parse().context("Invalid HTTP method")?, url);

        for (name, value) in &headers {
            request_builder = request_builder.header(name, value);
        }

        if let Some(body_bytes) = body {
            request_builder = request_builder.body(body_bytes);
        }

        let response = request_builder
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::Credentials;

    fn static_config() -> SdkConfig {
        SdkConfig::builder()
            .region(Region::new("us-east-1"))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                "AKIDEXAMPLE",
                "secret",
                None,
                None,
                "test",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build()
    }

    #[test]
    fn test_new_uses_sdk_region() {
        let client = AwsSigV4HttpClient::new(&static_config(), "athena").unwrap();
        assert_eq!(client.region(), "us-east-1");
        assert_eq!(client.service, "athena");
        assert_eq!(client.for_service("glue").service, "glue");
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let config = SdkConfig::builder()
            .region(Region::new("us-east-1"))
            .behavior_version(BehaviorVersion::latest())
            .build();
        assert!(matches!(
            AwsSigV4HttpClient::new(&config, "glue"),
            Err(AwsError::Credentials(_))
        ));
    }
}
