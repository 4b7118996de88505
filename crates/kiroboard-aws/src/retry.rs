//! Bounded retry with exponential backoff
//!
//! Throttling replies, HTTP 429/5xx and transport failures are retried;
//! everything else is returned on the first attempt.

use crate::error::AwsError;
use crate::http::{HttpClient, HttpResponse};
use crate::protocol::service_error;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (0-based), capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry as i32);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Send one request, retrying per `policy`
///
/// Non-2xx replies come back as [`AwsError::Service`] once retries are
/// exhausted or the error is not retryable.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn send_with_retry<H: HttpClient>(
    http: &H,
    policy: &RetryPolicy,
    service: &'static str,
    operation: &str,
    method: &str,
    url: &str,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
) -> Result<HttpResponse, AwsError> {
    let mut retry = 0;

    loop {
        let error = match http.request(method, url, headers.clone(), body.clone()).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => service_error(service, operation, &response),
            Err(e) => AwsError::transport(service, operation, e),
        };

        if retry >= policy.max_retries || !error.is_retryable() {
            return Err(error);
        }

        let delay = policy.delay_for(retry);
        warn!(
            service,
            operation,
            attempt = retry + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying AWS call"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
