//! User-facing federated client.
//!
//! Ties the routing service, the distributor and the provider directory
//! together: fetch (or reuse) a routing table, run a round against the target
//! service, optionally reroute what failed, and report the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::arguments::partition_arguments;
use crate::bulk::{build_bulk_string, BulkPayload, ParamValue, QueryParams};
use crate::config::FederatorConfig;
use crate::directory::ProviderDirectory;
use crate::distributor::{DispatchOptions, Distributor, ExecutionMode, RoundOutcome};
use crate::domain::{ServiceName, EMPTY_LOCATION};
use crate::fdsn::FdsnServiceClient;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::route::RoutingTable;
use crate::routing_service::{FedcatalogClient, RoutingService};
use crate::service::ProviderService;
use crate::source::ProviderId;
use crate::FederationError;

/// Options for one federated station or waveform request.
#[derive(Debug, Clone, Default)]
pub struct FederatedRequest {
    /// Selection criteria plus backend keywords (`user`, `password`, `filename`).
    pub params: QueryParams,
    /// Ask the routing service for every provider holding the data.
    pub include_overlaps: bool,
    /// Route unsatisfied lines once more, to any provider.
    pub reroute: bool,
    /// Skip the first routing query and use this table instead.
    pub existing_routes: Option<Arc<RoutingTable>>,
    pub include: Vec<ProviderId>,
    pub exclude: Vec<ProviderId>,
    /// File template for streaming responses to disk.
    pub output: Option<PathBuf>,
}

impl FederatedRequest {
    pub fn new(params: QueryParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_include_overlaps(mut self, include_overlaps: bool) -> Self {
        self.include_overlaps = include_overlaps;
        self
    }

    pub fn with_reroute(mut self, reroute: bool) -> Self {
        self.reroute = reroute;
        self
    }

    pub fn with_existing_routes(mut self, table: Arc<RoutingTable>) -> Self {
        self.existing_routes = Some(table);
        self
    }

    pub fn include_providers(mut self, providers: impl IntoIterator<Item = ProviderId>) -> Self {
        self.include.extend(providers);
        self
    }

    pub fn exclude_providers(mut self, providers: impl IntoIterator<Item = ProviderId>) -> Self {
        self.exclude.extend(providers);
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Federated station/dataselect client.
pub struct FederatedClient {
    routing: Arc<dyn RoutingService>,
    distributor: Distributor,
    directory: Arc<ProviderDirectory>,
}

impl FederatedClient {
    /// Client over injected routing and backend services.
    pub fn new(routing: Arc<dyn RoutingService>, backend: Arc<dyn ProviderService>) -> Self {
        let directory = Arc::new(ProviderDirectory::new(Arc::clone(&routing)));
        let distributor = Distributor::new(backend).with_directory(Arc::clone(&directory));
        Self {
            routing,
            distributor,
            directory,
        }
    }

    /// Client talking HTTP to the configured routing service and providers.
    pub fn from_config(config: &FederatorConfig) -> Self {
        let http: Arc<dyn HttpClient> = Arc::new(match &config.user_agent {
            Some(user_agent) => ReqwestHttpClient::with_user_agent(user_agent),
            None => ReqwestHttpClient::new(),
        });
        let routing = FedcatalogClient::new(Arc::clone(&http), config.routing_url.clone())
            .with_retry(config.retry.clone());
        let backend = FdsnServiceClient::new(http)
            .with_timeout_ms(config.timeout_ms)
            .with_breaker_config(config.breaker);

        Self::new(Arc::new(routing), Arc::new(backend)).with_execution_mode(config.execution_mode())
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.distributor = self.distributor.with_mode(mode);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.distributor = self.distributor.with_cancellation(cancel);
        self
    }

    pub fn with_distributor(mut self, configure: impl FnOnce(Distributor) -> Distributor) -> Self {
        self.distributor = configure(self.distributor);
        self
    }

    pub fn directory(&self) -> &Arc<ProviderDirectory> {
        &self.directory
    }

    pub fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    /// Raw routing response for a GET query.
    pub async fn routing_text(&self, params: &QueryParams) -> Result<String, FederationError> {
        self.routing.query(params).await
    }

    /// Raw routing response for a bulk POST query.
    pub async fn routing_text_bulk(
        &self,
        bulk: BulkPayload,
        params: &QueryParams,
    ) -> Result<String, FederationError> {
        let body = build_bulk_string(bulk, params)?;
        self.routing.query_bulk(body).await
    }

    pub async fn get_routing(&self, params: &QueryParams) -> Result<RoutingTable, FederationError> {
        let text = self.routing_text(params).await?;
        Ok(RoutingTable::parse(&text)?)
    }

    pub async fn get_routing_bulk(
        &self,
        bulk: BulkPayload,
        params: &QueryParams,
    ) -> Result<RoutingTable, FederationError> {
        let text = self.routing_text_bulk(bulk, params).await?;
        Ok(RoutingTable::parse(&text)?)
    }

    pub async fn get_stations(&self, request: FederatedRequest) -> Result<RoundOutcome, FederationError> {
        self.federate(ServiceName::Station, None, request).await
    }

    pub async fn get_stations_bulk(
        &self,
        bulk: BulkPayload,
        request: FederatedRequest,
    ) -> Result<RoundOutcome, FederationError> {
        self.federate(ServiceName::Station, Some(bulk), request).await
    }

    /// Waveforms for a GET-style selection; an empty location means `--`.
    pub async fn get_waveforms(&self, mut request: FederatedRequest) -> Result<RoundOutcome, FederationError> {
        for key in ["location", "loc"] {
            let blank = matches!(request.params.get(key), Some(ParamValue::Text(value)) if value.trim().is_empty());
            if blank {
                request.params.set(key, EMPTY_LOCATION);
            }
        }
        self.federate(ServiceName::Dataselect, None, request).await
    }

    pub async fn get_waveforms_bulk(
        &self,
        bulk: BulkPayload,
        request: FederatedRequest,
    ) -> Result<RoundOutcome, FederationError> {
        self.federate(ServiceName::Dataselect, Some(bulk), request).await
    }

    async fn federate(
        &self,
        service: ServiceName,
        bulk: Option<BulkPayload>,
        request: FederatedRequest,
    ) -> Result<RoundOutcome, FederationError> {
        let (mut routing_params, mut service_params) = partition_arguments(&request.params);
        routing_params.set("includeoverlaps", request.include_overlaps);
        if let Some(target) = target_service(&service) {
            routing_params.set("targetservice", target);
        }

        let filename = service_params.remove("filename").flatten();
        let output = request
            .output
            .clone()
            .or_else(|| filename.map(|value| PathBuf::from(value.to_string())));
        let options = DispatchOptions {
            include: request.include.clone(),
            exclude: request.exclude.clone(),
            params: service_params,
            output,
            keep_unique: false,
        };

        let table = match (&request.existing_routes, bulk) {
            (Some(table), _) => Arc::clone(table),
            (None, Some(bulk)) => Arc::new(self.get_routing_bulk(bulk, &routing_params).await?),
            (None, None) => Arc::new(self.get_routing(&routing_params).await?),
        };
        let mut outcome = self.distributor.run(table, &service, &options).await;

        if request.reroute && !outcome.failed.is_empty() && !outcome.cancelled {
            info!(
                lines = outcome.failed.len(),
                "request lines were not retrieved, rerouting to any provider"
            );
            routing_params.set("includeoverlaps", true);
            let rerouted = self
                .get_routing_bulk(BulkPayload::from_lines(&outcome.failed), &routing_params)
                .await?;
            let second = self
                .distributor
                .run(
                    Arc::new(rerouted),
                    &service,
                    &DispatchOptions {
                        keep_unique: true,
                        ..options
                    },
                )
                .await;
            info!(
                payloads = second.payloads.len(),
                succeeded = second.succeeded.len(),
                "reroute round finished"
            );
            outcome = outcome.merge_reroute(second);
        }

        if !outcome.failed.is_empty() {
            warn!(lines = outcome.failed.len(), "unable to retrieve every requested line");
        }
        if outcome.all_providers_failed() {
            return Err(FederationError::AllProvidersFailed {
                failures: outcome.failures,
                failed: outcome.failed,
            });
        }
        Ok(outcome)
    }
}

fn target_service(service: &ServiceName) -> Option<&'static str> {
    match service {
        ServiceName::Station => Some("station"),
        ServiceName::Dataselect => Some("dataselect"),
        _ => None,
    }
}
