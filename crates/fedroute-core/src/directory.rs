//! Cached provider descriptions from the routing service `datacenters` list.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::retry::Backoff;
use crate::routing_service::RoutingService;
use crate::source::{ProviderId, PROVIDER_ALIASES};
use crate::FederationError;

/// Refreshing stops once this many consecutive attempts failed, unless forced.
pub const MAX_FAILED_REFRESHES: u32 = 3;

/// Description of one data center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default, rename = "serviceURLs")]
    pub service_urls: BTreeMap<String, String>,
}

impl ProviderMetadata {
    /// `<name>:<description>, <location> WEB:<website> LastUpdate:<lastUpdate>`
    pub fn summary(&self) -> String {
        format!(
            "{}:{}, {} WEB:{} LastUpdate:{}",
            self.name, self.description, self.location, self.website, self.last_update
        )
    }
}

/// Outcome of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Refreshed,
    /// Metadata is already loaded and the refresh was not forced.
    AlreadyLoaded,
    /// Another caller is refreshing right now.
    InFlight,
    /// Waiting out the backoff after a failure.
    BackingOff,
    /// Too many consecutive failures; only a forced refresh retries.
    GaveUp,
    Failed,
}

#[derive(Debug, Default)]
struct RefreshState {
    failures: u32,
    last_failure: Option<Instant>,
}

/// Lazily loaded, single-flight provider metadata cache.
///
/// Lookups never fail: while metadata is unavailable they read as unknown.
pub struct ProviderDirectory {
    source: Arc<dyn RoutingService>,
    providers: RwLock<BTreeMap<String, ProviderMetadata>>,
    loaded: AtomicBool,
    refresh: Mutex<RefreshState>,
    backoff: Backoff,
}

impl ProviderDirectory {
    pub fn new(source: Arc<dyn RoutingService>) -> Self {
        Self {
            source,
            providers: RwLock::new(BTreeMap::new()),
            loaded: AtomicBool::new(false),
            refresh: Mutex::new(RefreshState::default()),
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Reloads the provider list.
    ///
    /// Without `force`, a loaded cache, a refresh already in flight, a pending
    /// backoff, or more than [`MAX_FAILED_REFRESHES`] failures all skip the call.
    pub async fn refresh(&self, force: bool) -> RefreshStatus {
        if !force && self.loaded.load(Ordering::Acquire) {
            return RefreshStatus::AlreadyLoaded;
        }
        let Ok(mut state) = self.refresh.try_lock() else {
            return RefreshStatus::InFlight;
        };

        if !force {
            if state.failures > MAX_FAILED_REFRESHES {
                return RefreshStatus::GaveUp;
            }
            let waiting = state.last_failure.is_some_and(|at| {
                at.elapsed() < self.backoff.delay(state.failures.saturating_sub(1))
            });
            if waiting {
                return RefreshStatus::BackingOff;
            }
        }

        debug!("refreshing provider list");
        match self.fetch().await {
            Ok(providers) => {
                info!(providers = providers.len(), "provider list refreshed");
                *self.providers.write().await = providers;
                self.loaded.store(true, Ordering::Release);
                *state = RefreshState::default();
                RefreshStatus::Refreshed
            }
            Err(failure) => {
                state.failures += 1;
                state.last_failure = Some(Instant::now());
                error!(%failure, failures = state.failures, "unable to refresh provider list");
                RefreshStatus::Failed
            }
        }
    }

    async fn fetch(&self) -> Result<BTreeMap<String, ProviderMetadata>, FederationError> {
        let text = self.source.datacenters().await?;
        let listed: Vec<ProviderMetadata> = serde_json::from_str(&text)?;
        let mut providers: BTreeMap<String, ProviderMetadata> = listed
            .into_iter()
            .map(|provider| (provider.name.clone(), provider))
            .collect();

        for (upstream, local) in PROVIDER_ALIASES {
            if let Some(metadata) = providers.get(upstream).cloned() {
                providers.entry(local.to_owned()).or_insert(metadata);
            }
        }
        Ok(providers)
    }

    /// Metadata for `provider`, refreshing lazily on first use.
    pub async fn get(&self, provider: &ProviderId) -> Option<ProviderMetadata> {
        self.refresh(false).await;
        self.providers.read().await.get(provider.as_str()).cloned()
    }

    /// Known provider names, aliases included.
    pub async fn names(&self) -> Vec<String> {
        self.refresh(false).await;
        self.providers.read().await.keys().cloned().collect()
    }

    /// One-line summary, or `None` while the provider is unknown.
    pub async fn describe(&self, provider: &ProviderId) -> Option<String> {
        self.get(provider).await.as_ref().map(ProviderMetadata::summary)
    }

    /// Summary from whatever is loaded already; never triggers a refresh.
    pub async fn cached_description(&self, provider: &ProviderId) -> Option<String> {
        self.providers
            .read()
            .await
            .get(provider.as_str())
            .map(ProviderMetadata::summary)
    }

    pub async fn failed_refreshes(&self) -> u32 {
        self.refresh.lock().await.failures
    }
}
