//! FDSN web-service backend: posts bulk bodies to `<service-url>query`.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreakerConfig, ProviderBreakers};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::service::{BulkDispatch, ProviderService, ServiceError, ServiceResponse};

/// Bulk client for FDSN station and dataselect services.
///
/// Reads `user` and `password` from the forwarded keywords. `attach_response`
/// is a post-processing request this backend does not honour: it returns raw
/// service bytes and never fetches instrument responses.
pub struct FdsnServiceClient {
    http: Arc<dyn HttpClient>,
    timeout_ms: u64,
    breakers: ProviderBreakers,
}

impl FdsnServiceClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            timeout_ms: 120_000,
            breakers: ProviderBreakers::default(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breakers = ProviderBreakers::new(config);
        self
    }

    fn build_request(&self, dispatch: &BulkDispatch) -> HttpRequest {
        let credentials = dispatch
            .params
            .get("user")
            .zip(dispatch.params.get("password"))
            .map(|(user, password)| HttpAuth::Basic {
                username: user.to_string(),
                password: password.to_string(),
            });
        let endpoint = if credentials.is_some() { "queryauth" } else { "query" };

        HttpRequest::post(endpoint_url(&dispatch.url, endpoint))
            .with_header("content-type", "text/plain")
            .with_body(dispatch.body.clone())
            .with_auth(&credentials.unwrap_or(HttpAuth::None))
            .with_timeout_ms(self.timeout_ms)
    }
}

impl ProviderService for FdsnServiceClient {
    fn fetch_bulk<'a>(
        &'a self,
        dispatch: BulkDispatch,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, ServiceError>> + Send + 'a>> {
        Box::pin(async move {
            self.breakers.admit(&dispatch.provider)?;
            if dispatch.params.contains_key("attach_response") {
                debug!(provider = %dispatch.provider, "attach_response is not supported by the FDSN backend, ignoring");
            }

            let request = self.build_request(&dispatch);
            debug!(provider = %dispatch.provider, url = %request.url, "posting bulk request");
            let response = match self.http.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    let error = ServiceError::unavailable(format!(
                        "{} {}: {error}",
                        dispatch.provider, dispatch.service
                    ));
                    self.breakers.record(&dispatch.provider, Err(&error));
                    return Err(error);
                }
            };

            let status = classify_status(&response);
            self.breakers.record(&dispatch.provider, status.as_ref().copied());
            if let Err(error) = status {
                if !error.is_no_data() {
                    warn!(provider = %dispatch.provider, status = response.status, "provider service failed");
                }
                return Err(error);
            }

            match dispatch.target {
                Some(path) => write_target(path, &response.body).await,
                None => Ok(ServiceResponse::Payload(response.body)),
            }
        })
    }
}

fn classify_status(response: &HttpResponse) -> Result<(), ServiceError> {
    match response.status {
        204 | 404 => Err(ServiceError::no_data(format!(
            "no data available (HTTP {})",
            response.status
        ))),
        200..=299 if response.body.is_empty() => Err(ServiceError::no_data("empty response body")),
        200..=299 => Ok(()),
        401 | 403 => Err(ServiceError::rejected(format!(
            "authentication rejected (HTTP {})",
            response.status
        ))),
        400 | 413 | 414 => Err(ServiceError::rejected(format!(
            "request rejected (HTTP {}): {}",
            response.status,
            first_line(&response.text())
        ))),
        status => Err(ServiceError::unavailable(format!(
            "service answered HTTP {status}"
        ))),
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_owned()
}

/// Joins a declared service URL with a method name, tolerating a missing `/`.
pub fn endpoint_url(base: &str, method: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{method}")
    } else {
        format!("{base}/{method}")
    }
}

async fn write_target(path: PathBuf, body: &[u8]) -> Result<ServiceResponse, ServiceError> {
    tokio::fs::write(&path, body).await.map_err(|error| {
        ServiceError::internal(format!("failed to write '{}': {error}", path.display()))
    })?;
    Ok(ServiceResponse::Written(path))
}
