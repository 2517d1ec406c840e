//! Per-route fan-out of bulk requests and fan-in of their outcomes.
//!
//! A round dispatches every route of a [`RoutingTable`] to its provider's
//! backend, inspects what came back, and sorts each request line into
//! succeeded or failed. Workers report through an unbounded channel that the
//! round owner drains once every scheduled route finished.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bulk::QueryParams;
use crate::directory::ProviderDirectory;
use crate::domain::{RequestLine, ServiceName};
use crate::inspect::{MiniSeedInspector, PayloadInspector, StationTextInspector, TrustingInspector};
use crate::route::{Route, RoutingTable};
use crate::service::{BulkDispatch, ProviderFailure, ProviderService, ServiceError, ServiceResponse};
use crate::source::ProviderId;

pub const DEFAULT_MAX_WORKERS: usize = 5;

/// How routes of one round are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One route at a time, in table order.
    Sequential,
    Parallel { max_workers: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Parallel {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Caller choices for one distribution round.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub include: Vec<ProviderId>,
    pub exclude: Vec<ProviderId>,
    /// Keywords forwarded to every backend call.
    pub params: QueryParams,
    /// File template; each provider writes `<dir>/<provider>-<basename>`.
    pub output: Option<PathBuf>,
    /// Drop repeated request lines from the succeeded and failed lists.
    pub keep_unique: bool,
}

/// Raw bytes returned by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayload {
    pub provider: ProviderId,
    pub body: Vec<u8>,
}

/// Result of one or two distribution rounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundOutcome {
    pub payloads: Vec<ProviderPayload>,
    pub succeeded: Vec<RequestLine>,
    pub failed: Vec<RequestLine>,
    pub failures: Vec<ProviderFailure>,
    pub written: Vec<PathBuf>,
    /// Scheduling stopped early; unscheduled lines are in `failed`.
    pub cancelled: bool,
    /// Routes handed to a backend, or rejected for lacking the service.
    pub dispatched: usize,
}

impl RoundOutcome {
    /// Nothing was delivered and every dispatched route failed with an error.
    pub fn all_providers_failed(&self) -> bool {
        self.dispatched > 0
            && self.payloads.is_empty()
            && self.written.is_empty()
            && self.failures.len() == self.dispatched
    }

    /// Folds a reroute round into this one.
    ///
    /// Succeeded lines are the union of both rounds. Failed lines are every
    /// failure of either round that neither round satisfied, so a line the
    /// reroute never routed stays failed.
    pub fn merge_reroute(mut self, second: RoundOutcome) -> Self {
        self.payloads.extend(second.payloads);
        self.succeeded.extend(second.succeeded);
        dedup_lines(&mut self.succeeded);

        let satisfied: HashSet<&RequestLine> = self.succeeded.iter().collect();
        let mut failed: Vec<RequestLine> = std::mem::take(&mut self.failed)
            .into_iter()
            .chain(second.failed)
            .filter(|line| !satisfied.contains(line))
            .collect();
        dedup_lines(&mut failed);
        self.failed = failed;

        self.failures.extend(second.failures);
        self.written.extend(second.written);
        self.cancelled |= second.cancelled;
        self.dispatched += second.dispatched;
        self
    }

    pub fn warnings(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    /// Every payload concatenated in route order.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payloads
            .iter()
            .flat_map(|payload| payload.body.iter().copied())
            .collect()
    }

    fn record(&mut self, event: DispatchEvent) {
        match event.result {
            RouteResult::Delivered {
                body,
                succeeded,
                failed,
            } => {
                info!(
                    provider = %event.provider,
                    bytes = body.len(),
                    succeeded = succeeded.len(),
                    failed = failed.len(),
                    "provider delivered data"
                );
                self.payloads.push(ProviderPayload {
                    provider: event.provider,
                    body,
                });
                self.succeeded.extend(succeeded);
                self.failed.extend(failed);
            }
            RouteResult::Written { path, lines } => {
                info!(provider = %event.provider, path = %path.display(), "provider response written");
                self.written.push(path);
                self.succeeded.extend(lines);
            }
            RouteResult::NoData { lines } => {
                debug!(provider = %event.provider, lines = lines.len(), "provider has no data");
                self.failed.extend(lines);
            }
            RouteResult::Failed { error, lines } => {
                warn!(provider = %event.provider, %error, lines = lines.len(), "provider request failed");
                self.failures.push(ProviderFailure {
                    provider: event.provider,
                    error,
                    lines: lines.len(),
                });
                self.failed.extend(lines);
            }
        }
    }

    fn finish(&mut self, keep_unique: bool) {
        if keep_unique {
            dedup_lines(&mut self.succeeded);
            dedup_lines(&mut self.failed);
        }
        let satisfied: HashSet<&RequestLine> = self.succeeded.iter().collect();
        let failed = std::mem::take(&mut self.failed);
        self.failed = failed
            .into_iter()
            .filter(|line| !satisfied.contains(line))
            .collect();
    }
}

fn dedup_lines(lines: &mut Vec<RequestLine>) {
    let mut seen = HashSet::new();
    lines.retain(|line| seen.insert(line.clone()));
}

struct DispatchEvent {
    order: usize,
    provider: ProviderId,
    result: RouteResult,
}

enum RouteResult {
    Delivered {
        body: Vec<u8>,
        succeeded: Vec<RequestLine>,
        failed: Vec<RequestLine>,
    },
    Written {
        path: PathBuf,
        lines: Vec<RequestLine>,
    },
    NoData {
        lines: Vec<RequestLine>,
    },
    Failed {
        error: ServiceError,
        lines: Vec<RequestLine>,
    },
}

// Everything a worker needs, shared read-only across the round.
struct RoundPlan {
    table: Arc<RoutingTable>,
    service: ServiceName,
    params: QueryParams,
    output: Option<PathBuf>,
    backend: Arc<dyn ProviderService>,
    inspector: Arc<dyn PayloadInspector>,
}

impl RoundPlan {
    async fn dispatch(&self, order: usize) -> DispatchEvent {
        let route = &self.table.routes()[order];
        let provider = route.provider_id().clone();
        let lines = route.request_lines().to_vec();

        let Some(url) = route.service_url(&self.service) else {
            return DispatchEvent {
                order,
                result: RouteResult::Failed {
                    error: ServiceError::missing_service(&provider, &self.service),
                    lines,
                },
                provider,
            };
        };

        let dispatch = BulkDispatch {
            provider: provider.clone(),
            service: self.service.clone(),
            url: url.to_owned(),
            body: route.serialize_for(&self.service),
            params: self.params.clone(),
            target: self
                .output
                .as_deref()
                .map(|output| target_path(output, &provider, &self.service)),
        };

        let result = match self.backend.fetch_bulk(dispatch).await {
            Ok(ServiceResponse::Payload(body)) => {
                let (succeeded, failed) = match self.inspector.identifying_keys(&body) {
                    Some(found) => route.partition_by_keys(&found.keys, found.granularity),
                    None => (lines, Vec::new()),
                };
                RouteResult::Delivered {
                    body,
                    succeeded,
                    failed,
                }
            }
            Ok(ServiceResponse::Written(path)) => RouteResult::Written { path, lines },
            Err(error) if error.is_no_data() => RouteResult::NoData { lines },
            Err(error) => RouteResult::Failed { error, lines },
        };

        DispatchEvent {
            order,
            provider,
            result,
        }
    }
}

/// `<dir>/<provider>-<basename>` for a file template.
pub fn target_path(output: &Path, provider: &ProviderId, service: &ServiceName) -> PathBuf {
    let basename = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| service.as_str().to_ascii_lowercase());
    let file_name = format!("{provider}-{basename}");
    match output.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Dispatches routing tables to provider backends.
pub struct Distributor {
    backend: Arc<dyn ProviderService>,
    mode: ExecutionMode,
    directory: Option<Arc<ProviderDirectory>>,
    inspectors: HashMap<ServiceName, Arc<dyn PayloadInspector>>,
    cancel: CancellationToken,
}

impl Distributor {
    pub fn new(backend: Arc<dyn ProviderService>) -> Self {
        let mut inspectors: HashMap<ServiceName, Arc<dyn PayloadInspector>> = HashMap::new();
        inspectors.insert(ServiceName::Station, Arc::new(StationTextInspector));
        inspectors.insert(ServiceName::Dataselect, Arc::new(MiniSeedInspector));

        Self {
            backend,
            mode: ExecutionMode::default(),
            directory: None,
            inspectors,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_directory(mut self, directory: Arc<ProviderDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_inspector(mut self, service: ServiceName, inspector: Arc<dyn PayloadInspector>) -> Self {
        self.inspectors.insert(service, inspector);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    fn inspector_for(&self, service: &ServiceName) -> Arc<dyn PayloadInspector> {
        self.inspectors
            .get(service)
            .cloned()
            .unwrap_or_else(|| Arc::new(TrustingInspector))
    }

    /// Runs one round against `service`.
    ///
    /// Provider errors never abort the round; they land in the outcome.
    pub async fn run(
        &self,
        table: Arc<RoutingTable>,
        service: &ServiceName,
        options: &DispatchOptions,
    ) -> RoundOutcome {
        let table = if options.include.is_empty() && options.exclude.is_empty() {
            table
        } else {
            Arc::new(table.filter_providers(&options.include, &options.exclude))
        };
        let plan = Arc::new(RoundPlan {
            table,
            service: service.clone(),
            params: options.params.clone(),
            output: options.output.clone(),
            backend: Arc::clone(&self.backend),
            inspector: self.inspector_for(service),
        });

        info!(
            service = %service,
            routes = plan.table.len(),
            mode = ?self.mode,
            "starting distribution round"
        );

        if let Some(directory) = &self.directory {
            let directory = Arc::clone(directory);
            tokio::spawn(async move {
                directory.refresh(false).await;
            });
        }

        let (events, mut inbox) = mpsc::unbounded_channel();
        let scheduled = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(&plan, &events).await,
            ExecutionMode::Parallel { max_workers } => {
                self.run_parallel(&plan, max_workers, &events).await
            }
        };
        drop(events);

        let mut received = Vec::with_capacity(scheduled);
        while let Some(event) = inbox.recv().await {
            received.push(event);
        }
        received.sort_by_key(|event| event.order);

        let mut outcome = RoundOutcome {
            dispatched: received.len(),
            ..RoundOutcome::default()
        };
        for event in received {
            outcome.record(event);
        }

        let unscheduled = &plan.table.routes()[scheduled..];
        if !unscheduled.is_empty() {
            warn!(routes = unscheduled.len(), "round cancelled before every route was scheduled");
            outcome.cancelled = true;
            for route in unscheduled {
                outcome.failed.extend(route.request_lines().iter().cloned());
            }
        }

        outcome.finish(options.keep_unique);
        outcome
    }

    async fn run_sequential(
        &self,
        plan: &Arc<RoundPlan>,
        events: &mpsc::UnboundedSender<DispatchEvent>,
    ) -> usize {
        for (order, route) in plan.table.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return order;
            }
            self.announce(route, &plan.service).await;
            let _ = events.send(plan.dispatch(order).await);
        }
        plan.table.len()
    }

    async fn run_parallel(
        &self,
        plan: &Arc<RoundPlan>,
        max_workers: usize,
        events: &mpsc::UnboundedSender<DispatchEvent>,
    ) -> usize {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut workers = JoinSet::new();
        let mut scheduled = plan.table.len();

        for (order, route) in plan.table.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                scheduled = order;
                break;
            };

            self.announce(route, &plan.service).await;
            let plan = Arc::clone(plan);
            let events = events.clone();
            workers.spawn(async move {
                let _permit = permit;
                let _ = events.send(plan.dispatch(order).await);
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                warn!(%error, "dispatch worker stopped unexpectedly");
            }
        }
        scheduled
    }

    async fn announce(&self, route: &Route, service: &ServiceName) {
        let description = match &self.directory {
            Some(directory) => directory.cached_description(route.provider_id()).await,
            None => None,
        };
        info!(
            provider = %route.provider_id(),
            service = %service,
            lines = route.request_lines().len(),
            description = description.as_deref().unwrap_or("-"),
            "dispatching route"
        );
    }
}
