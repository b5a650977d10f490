//! Resilient request layer shared by every fetcher.
//!
//! Each call gets a fresh retry budget. Connection errors, timeouts, 5xx,
//! 408 and 429 are retried with linear backoff; everything else is returned
//! on the first failure. When the budget runs out the last underlying error
//! is surfaced unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ExporterConfig;
use crate::document::Document;
use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::source::{Endpoint, DEFAULT_BASE_URL, DEFAULT_HOST, FORM_CONTENT_TYPE};
use crate::throttle::RequestThrottle;

#[derive(Clone)]
pub struct Requester {
    client: Arc<dyn HttpClient>,
    base_url: String,
    base_headers: BTreeMap<String, String>,
    retry: RetryConfig,
    timeout_ms: u64,
    throttle: Option<RequestThrottle>,
}

impl Requester {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            base_url: String::from(DEFAULT_BASE_URL),
            base_headers: base_headers(DEFAULT_HOST),
            retry: RetryConfig::default(),
            timeout_ms: 10_000,
            throttle: None,
        }
    }

    pub fn from_config(client: Arc<dyn HttpClient>, config: &ExporterConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            base_headers: base_headers(&config.host),
            retry: config.retry_config(),
            timeout_ms: config.request_timeout_ms,
            throttle: config
                .requests_per_second
                .and_then(RequestThrottle::per_second),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_throttle(mut self, throttle: Option<RequestThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Sends one logical request, retrying transient failures.
    pub async fn request(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<HttpResponse, FetchError> {
        let mut request = HttpRequest::new(method, endpoint.url(&self.base_url))
            .with_headers(self.base_headers.clone())
            .with_headers(headers.iter().copied())
            .with_timeout_ms(self.timeout_ms);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(throttle) = &self.throttle {
                throttle.until_ready().await;
            }
            debug!(%method, %endpoint, attempt, "sending request");

            let reason = match self.client.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    if attempt >= max_attempts || !self.retry.should_retry_status(response.status)
                    {
                        return Err(FetchError::Status {
                            endpoint: endpoint.to_string(),
                            status: response.status,
                            attempts: attempt,
                        });
                    }
                    format!("status {}", response.status)
                }
                Err(error) => {
                    if attempt >= max_attempts || !error.retryable() {
                        return Err(FetchError::Transport {
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                            source: error,
                        });
                    }
                    error.to_string()
                }
            };

            let delay = self.retry.delay_after(attempt);
            warn!(
                %endpoint,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn get(&self, endpoint: &Endpoint) -> Result<HttpResponse, FetchError> {
        self.request(HttpMethod::Get, endpoint, &[], None).await
    }

    /// POSTs url-encoded `fields` with a matching `content-length` header.
    pub async fn post_form(
        &self,
        endpoint: &Endpoint,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, FetchError> {
        let body = encode_form(fields);
        let length = body.len().to_string();
        self.request(
            HttpMethod::Post,
            endpoint,
            &[("content-length", length.as_str())],
            Some(body),
        )
        .await
    }

    pub async fn get_document(&self, endpoint: &Endpoint) -> Result<Document, FetchError> {
        let response = self.get(endpoint).await?;
        Ok(Document::parse(response.body))
    }

    pub async fn post_json<T>(
        &self,
        endpoint: &Endpoint,
        fields: &[(&str, &str)],
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = self.post_form(endpoint, fields).await?;
        serde_json::from_str(&response.body).map_err(|error| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        })
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("timeout_ms", &self.timeout_ms)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

fn base_headers(host: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (String::from("host"), host.to_owned()),
        (String::from("content-type"), String::from(FORM_CONTENT_TYPE)),
    ])
}

/// `application/x-www-form-urlencoded` body for `fields`, in the given order.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
