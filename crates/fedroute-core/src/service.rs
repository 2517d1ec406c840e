//! Contract for the per-provider bulk services that receive routed requests.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::Serialize;

use crate::bulk::QueryParams;
use crate::domain::ServiceName;
use crate::source::ProviderId;

/// Coarse failure category reported by a provider service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// The provider holds nothing for the request; not a fault.
    NoData,
    Unavailable,
    Rejected,
    MissingService,
    Internal,
}

/// Error returned by a provider service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    kind: ServiceErrorKind,
    message: String,
    retryable: bool,
}

impl ServiceError {
    pub fn no_data(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::NoData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Rejected,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn missing_service(provider: &ProviderId, service: &ServiceName) -> Self {
        Self {
            kind: ServiceErrorKind::MissingService,
            message: format!("provider '{provider}' declares no {service}"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn is_no_data(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::NoData)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ServiceErrorKind::NoData => "service.no_data",
            ServiceErrorKind::Unavailable => "service.unavailable",
            ServiceErrorKind::Rejected => "service.rejected",
            ServiceErrorKind::MissingService => "service.missing",
            ServiceErrorKind::Internal => "service.internal",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ServiceError {}

/// A provider error attributed to the route that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: ServiceError,
    pub lines: usize,
}

impl Display for ProviderFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "provider '{}' failed for {} request line(s): {}",
            self.provider, self.lines, self.error
        )
    }
}

/// One bulk request addressed to a provider service.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDispatch {
    pub provider: ProviderId,
    pub service: ServiceName,
    /// Service base URL as declared in the routing response.
    pub url: String,
    pub body: String,
    /// Caller keywords forwarded to the service (credentials, file target).
    pub params: QueryParams,
    /// Stream the response into this file instead of returning it.
    pub target: Option<PathBuf>,
}

/// Successful service answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceResponse {
    Payload(Vec<u8>),
    Written(PathBuf),
}

/// Backend that executes bulk requests for one or more providers.
pub trait ProviderService: Send + Sync {
    fn fetch_bulk<'a>(
        &'a self,
        dispatch: BulkDispatch,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, ServiceError>> + Send + 'a>>;
}
