use thiserror::Error;

use crate::domain::RequestLine;
use crate::http_client::HttpError;
use crate::parser::{LineKind, ParserState};
use crate::service::ProviderFailure;

/// Validation errors for user-supplied identifiers and request lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("provider id cannot be empty")]
    EmptyProviderId,

    #[error("request line must have 6 fields, found {found}: '{line}'")]
    RequestLineArity { line: String, found: usize },

    #[error("invalid granularity '{value}', expected one of network, station, channel, response")]
    InvalidGranularity { value: String },

    #[error("parameter must be written as key=value: '{value}'")]
    InvalidParameter { value: String },
}

/// Routing response text that does not follow the line grammar.
///
/// Parsing stops at the first offending line; no partial table is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed routing response at line {line_number}: {detail} ('{line}')")]
pub struct MalformedResponse {
    pub line_number: usize,
    pub line: String,
    pub state: ParserState,
    pub kind: LineKind,
    pub detail: String,
}

/// Bulk request payloads that cannot be turned into request text.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("unsupported bulk payload type '{kind}': serialize records to request text first")]
    UnsupportedBulkType { kind: &'static str },

    #[error("failed to read bulk payload: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for federated routing operations.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),

    #[error(transparent)]
    Bulk(#[from] BulkError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("routing service transport failed: {0}")]
    Transport(#[from] HttpError),

    #[error("routing service answered HTTP {status}: {message}")]
    RoutingStatus { status: u16, message: String },

    #[error("provider metadata could not be decoded: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(
        "all providers failed: {} provider error(s), {} request line(s) unsatisfied",
        failures.len(),
        failed.len()
    )]
    AllProvidersFailed {
        failures: Vec<ProviderFailure>,
        failed: Vec<RequestLine>,
    },
}

impl FederationError {
    /// Whether the failure happened while talking to the routing service itself.
    pub const fn is_routing_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RoutingStatus { .. } | Self::Malformed(_)
        )
    }
}
