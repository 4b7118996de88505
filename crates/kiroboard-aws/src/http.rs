//! HTTP client abstraction

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn body_string(&self) -> Result<String> {
        String::from_utf8(self.body.clone()).map_err(|e| anyhow::anyhow!("Invalid UTF-8: {}", e))
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        // Several AWS operations answer with an empty body on success
        let body: &[u8] = if self.body.iter().all(|b| b.is_ascii_whitespace()) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| anyhow::anyhow!("Failed to parse JSON: {}", e))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse>;

    async fn get(&self, url: &str, headers: Vec<(String, String)>) -> Result<HttpResponse> {
        self.request("GET", url, headers, None).await
    }

    async fn post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        self.request("POST", url, headers, Some(body)).await
    }

    async fn put(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        self.request("PUT", url, headers, body).await
    }
}

/// Recording client for request-shape tests, here and in dependent crates
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// A request captured by [`MockHttpClient`]
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: String,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Vec<u8>>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(self.body.as_deref().unwrap_or(b"null")).unwrap()
        }
    }

    /// Replays queued responses and records every request
    pub struct MockHttpClient {
        responses: Mutex<Vec<HttpResponse>>,
        pub requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        pub fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn recorded(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    /// Error reply in the REST-JSON shape QuickSight uses
    pub fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("x-amzn-ErrorType".to_string(), format!("{}:", code))],
            body: serde_json::to_vec(&serde_json::json!({ "Message": message })).unwrap(),
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            method: &str,
            url: &str,
            headers: Vec<(String, String)>,
            body: Option<Vec<u8>>,
        ) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                method: method.to_string(),
                url: url.to_string(),
                headers,
                body,
            });
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow::anyhow!("No more mock responses"));
            }
            Ok(responses.remove(0))
        }
    }
}
