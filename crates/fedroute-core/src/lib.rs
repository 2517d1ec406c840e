//! # Fedroute Core
//!
//! Routing and distribution engine for federated FDSN data requests.
//!
//! ## Overview
//!
//! A central routing service (the federated catalog) answers a selection
//! query with a line-oriented text response that names, per data center, the
//! service endpoints to use and the request lines that center can satisfy.
//! This crate:
//!
//! - **Parses** that response with a line classifier and a grammar-enforcing
//!   state machine into a [`RoutingTable`]
//! - **Distributes** each route's bulk request to the provider's backend,
//!   sorting request lines into succeeded and failed
//! - **Reroutes** unsatisfied lines through a second routing round
//! - **Builds** bulk request text from parameters and request lines
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`arguments`] | Routing vs backend keyword partitioning |
//! | [`bulk`] | Query parameters and bulk request text |
//! | [`circuit_breaker`] | Per-provider circuit breakers |
//! | [`client`] | Federated client facade |
//! | [`config`] | Client configuration from defaults and environment |
//! | [`directory`] | Provider metadata cache |
//! | [`distributor`] | Per-route fan-out and outcome collection |
//! | [`domain`] | Request lines, granularities and service names |
//! | [`error`] | Error types |
//! | [`fdsn`] | FDSN web-service backend |
//! | [`http_client`] | HTTP client abstraction |
//! | [`inspect`] | Identifying-key extraction from payloads |
//! | [`parser`] | Routing response grammar |
//! | [`retry`] | Backoff and retry policy |
//! | [`route`] | Route and routing table model |
//! | [`routing_service`] | Routing service client |
//! | [`service`] | Provider backend contract |
//! | [`source`] | Provider identifiers and aliases |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fedroute_core::{FederatedClient, FederatedRequest, FederatorConfigBuilder, QueryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FederatorConfigBuilder::from_env().build();
//!     let client = FederatedClient::from_config(&config);
//!
//!     let params = QueryParams::new()
//!         .with("network", "IU")
//!         .with("station", "ANMO")
//!         .with("level", "station")
//!         .with("format", "text");
//!     let outcome = client.get_stations(FederatedRequest::new(params)).await?;
//!
//!     println!("{} line(s) satisfied", outcome.succeeded.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │ FederatedClient │────▶│ RoutingService   │──▶ fedcatalog /query
//! └────────┬────────┘     └──────────────────┘
//!          │ RoutingTable
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Distributor    │────▶│ ProviderService  │──▶ <service-url>query
//! │ (worker pool)   │     │ + circuit breaker│
//! └────────┬────────┘     └──────────────────┘
//!          │ payloads
//!          ▼
//! ┌─────────────────┐
//! │ PayloadInspector│──▶ succeeded / failed lines
//! └─────────────────┘
//! ```

pub mod arguments;
pub mod bulk;
pub mod circuit_breaker;
pub mod client;
pub mod config;
pub mod directory;
pub mod distributor;
pub mod domain;
pub mod error;
pub mod fdsn;
pub mod http_client;
pub mod inspect;
pub mod parser;
pub mod retry;
pub mod route;
pub mod routing_service;
pub mod service;
pub mod source;

// Argument handling and bulk text
pub use arguments::partition_arguments;
pub use bulk::{build_bulk_string, split_bulk, BulkPayload, ParamValue, QueryParams};

// Circuit breaker
pub use circuit_breaker::{CircuitBreakerConfig, CircuitState, ProviderBreakers};

// Client and configuration
pub use client::{FederatedClient, FederatedRequest};
pub use config::{FederatorConfig, FederatorConfigBuilder};

// Provider metadata
pub use directory::{ProviderDirectory, ProviderMetadata, RefreshStatus};

// Distribution
pub use distributor::{DispatchOptions, Distributor, ExecutionMode, ProviderPayload, RoundOutcome};

// Domain models
pub use domain::{Granularity, RequestLine, ServiceName, EMPTY_LOCATION};

// Error types
pub use error::{BulkError, FederationError, MalformedResponse, ValidationError};

// Backends
pub use fdsn::FdsnServiceClient;
pub use service::{BulkDispatch, ProviderFailure, ProviderService, ServiceError, ServiceErrorKind, ServiceResponse};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Payload inspection
pub use inspect::{MiniSeedInspector, PayloadInspector, PayloadKeys, StationTextInspector, TrustingInspector};

// Parsing
pub use parser::{classify, parse_routing, LineKind, ParserState, ResponseLine};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Routing model and service
pub use route::{Route, RoutingTable};
pub use routing_service::{FedcatalogClient, RoutingService, DEFAULT_ROUTING_URL};

// Provider identifiers
pub use source::{ProviderId, PROVIDER_ALIASES};
