//! Provider registry and resolution orchestrator
//!
//! Owns the provider set, the result cache and the circuit breakers.
//! [`ProviderRegistry::resolve_stream`] is the single entry point: cache
//! lookup, then providers in ascending priority, skipping open breakers,
//! until one returns a stream matching the language preference.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::{CacheKey, StreamCache};
use crate::error::ValidationError;
use crate::health::{BreakerSnapshot, ProviderHealthTracker};
use crate::models::{ProviderHealth, Stream, StreamOptions, StreamRequest};
use crate::providers::{EndpointTemplates, StreamProvider};

/// Interval between background health probes
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Slack on top of a provider's per-source timeouts
const ATTEMPT_GRACE: Duration = Duration::from_millis(500);

/// Time allowed for one provider attempt: the per-request timeout for each
/// of its sources, tried in sequence
fn attempt_budget(timeout: Duration, sources: u32) -> Duration {
    timeout
        .saturating_mul(sources.max(1))
        .saturating_add(ATTEMPT_GRACE)
}

/// Status line for one provider, for dashboards and the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub priority: i32,
    pub health: ProviderHealth,
    pub circuit_breaker: BreakerSnapshot,
}

/// Registry of stream providers.
///
/// Construct once and share behind an `Arc`; every method takes `&self`.
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn StreamProvider>>>,
    cache: StreamCache,
    breakers: ProviderHealthTracker,
    health: Mutex<HashMap<String, ProviderHealth>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::with_parts(StreamCache::new(), ProviderHealthTracker::new())
    }

    /// An empty registry with a custom cache and breaker policy
    pub fn with_parts(cache: StreamCache, breakers: ProviderHealthTracker) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            cache,
            breakers,
            health: Mutex::new(HashMap::new()),
        }
    }

    /// Register `provider`, replacing any provider with the same name
    pub fn register_provider(&self, provider: Arc<dyn StreamProvider>) {
        let name = provider.name().to_string();
        tracing::info!(provider = %name, priority = provider.priority(), "provider registered");

        {
            let mut providers = self.write_providers();
            providers.retain(|p| p.name() != name);
            providers.push(provider);
        }

        self.lock_health()
            .insert(name.clone(), ProviderHealth::initial(name));
    }

    /// Remove a provider by name; returns whether one was removed
    pub fn unregister_provider(&self, name: &str) -> bool {
        let removed = {
            let mut providers = self.write_providers();
            let before = providers.len();
            providers.retain(|p| p.name() != name);
            providers.len() != before
        };

        if removed {
            self.lock_health().remove(name);
            self.breakers.forget(name);
            tracing::info!(provider = name, "provider removed");
        }
        removed
    }

    /// Registered provider names in attempt order
    pub fn provider_names(&self) -> Vec<String> {
        self.ordered_providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Pass endpoint templates to a named provider.
    ///
    /// Returns false if no such provider exists or it takes no configuration.
    pub fn configure_provider(&self, name: &str, endpoints: &EndpointTemplates) -> bool {
        let provider = self
            .read_providers()
            .iter()
            .find(|p| p.name() == name)
            .cloned();

        match provider {
            Some(provider) => provider.configure(endpoints),
            None => {
                tracing::error!(provider = name, "cannot configure unknown provider");
                false
            }
        }
    }

    /// Resolve a request to a stream.
    ///
    /// Only an invalid request is an error. `Ok(None)` means every eligible
    /// provider was tried and none produced a stream matching the language
    /// preference.
    pub async fn resolve_stream(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
    ) -> Result<Option<Stream>, ValidationError> {
        request.validate()?;

        let key = CacheKey::new(request, options.language_preference);
        if options.enable_cache {
            if let Some(stream) = self.cache.get(&key) {
                tracing::debug!(key = %key, "cache hit");
                return Ok(Some(stream));
            }
        }

        let candidates: Vec<_> = self
            .ordered_providers()
            .into_iter()
            .filter(|p| p.supports(request))
            .collect();

        tracing::debug!(
            key = %key,
            providers = ?candidates.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "resolving"
        );

        for provider in candidates {
            let name = provider.name();

            if self.breakers.is_open(name) {
                tracing::warn!(provider = name, "circuit breaker open, skipping");
                continue;
            }

            let budget = attempt_budget(options.timeout(), provider.source_count(request));
            let attempt = tokio::time::timeout(budget, provider.get_stream(request, options)).await;

            match attempt {
                Err(_) => {
                    tracing::warn!(provider = name, budget = ?budget, "provider timed out");
                    self.breakers.record_failure(name);
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = name, error = %e, "provider failed");
                    self.breakers.record_failure(name);
                }
                Ok(Ok(None)) => {
                    tracing::debug!(provider = name, "provider has no stream");
                }
                Ok(Ok(Some(stream))) => {
                    if options.language_preference.accepts(&stream) {
                        self.breakers.record_success(name);
                        self.cache.insert(key, stream.clone());
                        tracing::info!(provider = name, url = %stream.url, "stream resolved");
                        return Ok(Some(stream));
                    }
                    tracing::debug!(
                        provider = name,
                        preference = %options.language_preference,
                        "stream does not match language preference"
                    );
                }
            }
        }

        tracing::info!(key = %key, "no provider produced a stream");
        Ok(None)
    }

    /// Priority, last health snapshot and breaker state for every provider
    pub fn providers_status(&self) -> Vec<ProviderStatus> {
        let providers = self.ordered_providers();
        let health = self.lock_health();

        providers
            .iter()
            .map(|p| {
                let name = p.name().to_string();
                ProviderStatus {
                    priority: p.priority(),
                    health: health
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| ProviderHealth::initial(name.clone())),
                    circuit_breaker: self.breakers.snapshot(&name),
                    name,
                }
            })
            .collect()
    }

    /// Drop cached streams, all of them or those whose key contains `pattern`
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.clear(pattern);
        tracing::info!(removed, pattern = pattern.unwrap_or("*"), "cache cleared");
        removed
    }

    /// Probe every provider once and store the snapshots.
    ///
    /// Providers unregistered while the pass was running are left out.
    pub async fn run_health_checks(&self) -> Vec<ProviderHealth> {
        let providers = self.ordered_providers();
        let mut results =
            futures::future::join_all(providers.iter().map(|p| p.check_health())).await;

        // unregister drops the provider before its snapshot, so checking
        // membership under the health lock cannot resurrect a removed entry
        let mut health = self.lock_health();
        let registered = self.provider_names();
        results.retain(|snapshot| registered.contains(&snapshot.name));
        for snapshot in &results {
            health.insert(snapshot.name.clone(), snapshot.clone());
        }
        results
    }

    /// Start the recurring health probe.
    ///
    /// The first pass runs one `period` after the call. The task ends on
    /// its own once the registry is dropped; abort the handle to stop it
    /// sooner.
    pub fn spawn_health_checks(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(live) = registry.upgrade() else {
                    break;
                };

                let results = live.run_health_checks().await;
                let online = results.iter().filter(|h| h.is_online).count();
                tracing::debug!(online, total = results.len(), "health check pass complete");
            }
        })
    }

    /// Providers sorted by ascending priority; equal priorities keep
    /// registration order
    fn ordered_providers(&self) -> Vec<Arc<dyn StreamProvider>> {
        let mut providers = self.read_providers().clone();
        providers.sort_by_key(|p| p.priority());
        providers
    }

    fn read_providers(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn StreamProvider>>> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_providers(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn StreamProvider>>> {
        self.providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_health(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProviderHealth>> {
        self.health
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
