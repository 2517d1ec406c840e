//! Client for the federated catalog routing service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bulk::QueryParams;
use crate::fdsn::endpoint_url;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::FederationError;

/// Default routing service base URL.
pub const DEFAULT_ROUTING_URL: &str = "https://service.iris.edu/irisws/fedcatalog/1/";

type RoutingFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FederationError>> + Send + 'a>>;

/// Remote routing service returning raw response text.
pub trait RoutingService: Send + Sync {
    /// `GET <base>/query?<params>`.
    fn query<'a>(&'a self, params: &'a QueryParams) -> RoutingFuture<'a>;

    /// `POST <base>/query` with a bulk body.
    fn query_bulk<'a>(&'a self, body: String) -> RoutingFuture<'a>;

    /// `GET <base>/datacenters`, a JSON list of provider descriptions.
    fn datacenters(&self) -> RoutingFuture<'_>;
}

/// HTTP implementation of [`RoutingService`] with retry on transient failures.
pub struct FedcatalogClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    retry: RetryConfig,
    timeout_ms: u64,
}

impl FedcatalogClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            retry: RetryConfig::default(),
            timeout_ms: 60_000,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: HttpRequest) -> Result<String, FederationError> {
        let request = request.with_timeout_ms(self.timeout_ms);
        let mut attempt = 0;

        loop {
            match self.http.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response.text()),
                Ok(response) => {
                    if self.retry.should_retry_status(response.status)
                        && self.retry.has_attempts_left(attempt)
                    {
                        warn!(url = %request.url, status = response.status, attempt, "routing service answered with a transient status");
                    } else {
                        return Err(status_error(&response));
                    }
                }
                Err(error) => {
                    if self.retry.should_retry_error(&error) && self.retry.has_attempts_left(attempt) {
                        warn!(url = %request.url, %error, attempt, "routing service transport failed");
                    } else {
                        return Err(FederationError::Transport(error));
                    }
                }
            }

            tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }
}

impl RoutingService for FedcatalogClient {
    fn query<'a>(&'a self, params: &'a QueryParams) -> RoutingFuture<'a> {
        Box::pin(async move {
            let mut url = endpoint_url(&self.base_url, "query");
            let query = params.to_query_string();
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
            debug!(%url, "querying routing service");
            self.send(HttpRequest::get(url)).await
        })
    }

    fn query_bulk<'a>(&'a self, body: String) -> RoutingFuture<'a> {
        Box::pin(async move {
            let url = endpoint_url(&self.base_url, "query");
            debug!(%url, bytes = body.len(), "posting bulk request to routing service");
            self.send(
                HttpRequest::post(url)
                    .with_header("content-type", "text/plain")
                    .with_body(body),
            )
            .await
        })
    }

    fn datacenters(&self) -> RoutingFuture<'_> {
        Box::pin(async move {
            let url = endpoint_url(&self.base_url, "datacenters");
            self.send(HttpRequest::get(url).with_header("accept", "application/json"))
                .await
        })
    }
}

fn status_error(response: &HttpResponse) -> FederationError {
    let text = response.text();
    let message = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no details")
        .to_owned();
    FederationError::RoutingStatus {
        status: response.status,
        message,
    }
}
