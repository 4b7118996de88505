//! Wire helpers shared by the service clients

use crate::error::AwsError;
use crate::http::{HttpClient, HttpResponse};
use crate::retry::{send_with_retry, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const JSON_1_1: &str = "application/x-amz-json-1.1";

/// Error document shapes used across JSON 1.1 and REST-JSON services
#[derive(Debug, Default, Deserialize)]
struct ErrorDocument {
    #[serde(rename = "__type")]
    type_: Option<String>,
    #[serde(alias = "Code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Build an [`AwsError::Service`] from a non-2xx response
///
/// The code comes from `x-amzn-ErrorType` when present, otherwise from the
/// body's `__type`/`code`. Both may carry a namespace (`ns#Code`) or a
/// trailing URI (`Code:http://...`) which are stripped.
pub(crate) fn service_error(
    service: &'static str,
    operation: &str,
    response: &HttpResponse,
) -> AwsError {
    let document: ErrorDocument = serde_json::from_slice(&response.body).unwrap_or_default();

    let raw_code = response
        .header("x-amzn-ErrorType")
        .map(str::to_string)
        .or(document.type_)
        .or(document.code)
        .unwrap_or_else(|| format!("Http{}", response.status));

    let message = document
        .message
        .or_else(|| response.body_string().ok().filter(|b| !b.is_empty()))
        .unwrap_or_default();

    AwsError::service(
        service,
        operation,
        response.status,
        normalize_code(&raw_code),
        message,
    )
}

fn normalize_code(raw: &str) -> String {
    let without_uri = raw.split(':').next().unwrap_or(raw);
    without_uri
        .rsplit('#')
        .next()
        .unwrap_or(without_uri)
        .trim()
        .to_string()
}

/// Client for services speaking the JSON 1.1 `X-Amz-Target` protocol
pub(crate) struct JsonRpcClient<H: HttpClient> {
    http: H,
    endpoint: String,
    service: &'static str,
    target_prefix: &'static str,
    retry: RetryPolicy,
}

impl<H: HttpClient> JsonRpcClient<H> {
    pub(crate) fn new(
        http: H,
        endpoint: String,
        service: &'static str,
        target_prefix: &'static str,
    ) -> Self {
        Self {
            http,
            endpoint,
            service,
            target_prefix,
            retry: RetryPolicy::default(),
        }
    }

    pub(crate) fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg(test)]
    pub(crate) fn http(&self) -> &H {
        &self.http
    }

    /// POST `request` as `{target_prefix}.{operation}` and decode the reply
    pub(crate) async fn call<Req, Resp>(
        &self,
        operation: &str,
        request: &Req,
    ) -> Result<Resp, AwsError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| AwsError::decode(self.service, operation, e))?;

        debug!(
            service = self.service,
            operation, "Calling {}.{}", self.target_prefix, operation
        );

        let url = format!("{}/", self.endpoint.trim_end_matches('/'));
        let headers = vec![
            ("Content-Type".to_string(), JSON_1_1.to_string()),
            (
                "X-Amz-Target".to_string(),
                format!("{}.{}", self.target_prefix, operation),
            ),
        ];
        let response = send_with_retry(
            &self.http,
            &self.retry,
            self.service,
            operation,
            "POST",
            &url,
            headers,
            Some(body),
        )
        .await?;

        response
            .json()
            .map_err(|e| AwsError::decode(self.service, operation, e))
    }
}

/// Successful responses whose content is irrelevant
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Empty {}
