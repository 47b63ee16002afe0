//! Multi-region query coordination.
//!
//! One run goes through three phases:
//! 1. discover the Global Datastore topology from the requested region
//! 2. derive the region set (requested region plus every region holding a member)
//! 3. query every region concurrently and merge the records as tasks finish
//!
//! A failing or panicking region task drops that region's records only. The merged
//! output is sorted by region with each region's internal order preserved.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::cache::{ParameterCache, ParameterCacheStats};
use super::credentials::ElastiCacheClientFactory;
use super::filters::NamePattern;
use super::region_worker::RegionQueryWorker;
use super::retry::RetryPolicy;
use super::sdk_errors::categorize_error;
use super::state::{CacheClusterRecord, EngineFilter};
use super::status::ProgressSink;
use super::topology::{derive_region_set, TopologyDiscoverer, TopologyIndex};
use crate::app::error::EcInfoError;

/// Concurrency and retry settings for one run
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub max_concurrent_regions: usize,
    pub retry_policy: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_regions: 16,
            retry_policy: RetryPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct RegionFailure {
    pub region: String,
    pub error: String,
}

/// Everything a run produced, for callers that want more than the records
#[derive(Debug)]
pub struct QueryReport {
    pub records: Vec<CacheClusterRecord>,
    pub regions: Vec<String>,
    pub failures: Vec<RegionFailure>,
    pub topology: Arc<TopologyIndex>,
    pub parameter_cache: ParameterCacheStats,
}

enum RegionError {
    Query(String),
    Aborted(String),
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::Query(message) => f.write_str(message),
            RegionError::Aborted(message) => write!(f, "task aborted: {}", message),
        }
    }
}

struct RegionOutcome {
    region: String,
    result: Result<Vec<CacheClusterRecord>, RegionError>,
}

pub struct QueryCoordinator {
    client_factory: Arc<dyn ElastiCacheClientFactory>,
    parameter_cache: Arc<ParameterCache>,
    progress: Arc<dyn ProgressSink>,
    config: CoordinatorConfig,
}

impl QueryCoordinator {
    pub fn new(
        client_factory: Arc<dyn ElastiCacheClientFactory>,
        progress: Arc<dyn ProgressSink>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            client_factory,
            parameter_cache: Arc::new(ParameterCache::new()),
            progress,
            config,
        }
    }

    /// Share an existing parameter cache instead of a fresh one
    pub fn with_parameter_cache(mut self, parameter_cache: Arc<ParameterCache>) -> Self {
        self.parameter_cache = parameter_cache;
        self
    }

    /// Records from every region, sorted by region
    pub async fn run(
        &self,
        requested_region: &str,
        engine_filter: &EngineFilter,
        name_filter: Option<&NamePattern>,
    ) -> Result<Vec<CacheClusterRecord>, EcInfoError> {
        Ok(self
            .run_with_report(requested_region, engine_filter, name_filter)
            .await?
            .records)
    }

    pub async fn run_with_report(
        &self,
        requested_region: &str,
        engine_filter: &EngineFilter,
        name_filter: Option<&NamePattern>,
    ) -> Result<QueryReport, EcInfoError> {
        let requested_region = requested_region.trim();
        if requested_region.is_empty() {
            return Err(EcInfoError::MissingRegion);
        }

        info!(
            "Starting ElastiCache query from {} (engines: {}, filter: {})",
            requested_region,
            engine_filter,
            name_filter.map_or("none", NamePattern::as_str)
        );
        let start_time = Instant::now();

        let topology = Arc::new(self.discover_topology(requested_region).await);
        let regions = derive_region_set(requested_region, &topology)?;
        info!(
            "Querying {} regions: {}",
            regions.len(),
            regions.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_regions.max(1)));
        let engine_filter = Arc::new(engine_filter.clone());
        let name_filter = Arc::new(name_filter.cloned());

        let mut futures: FuturesUnordered<BoxFuture<'static, RegionOutcome>> =
            FuturesUnordered::new();

        for region in &regions {
            let task = tokio::spawn(query_one_region(
                region.clone(),
                Arc::clone(&semaphore),
                Arc::clone(&self.client_factory),
                Arc::clone(&self.parameter_cache),
                Arc::clone(&self.progress),
                self.config.retry_policy.clone(),
                Arc::clone(&engine_filter),
                Arc::clone(&name_filter),
                Arc::clone(&topology),
            ));

            let region = region.clone();
            futures.push(
                async move {
                    let result = match task.await {
                        Ok(result) => result,
                        Err(join_error) => Err(RegionError::Aborted(join_error.to_string())),
                    };
                    RegionOutcome { region, result }
                }
                .boxed(),
            );
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();

        while let Some(outcome) = futures.next().await {
            match outcome.result {
                Ok(region_records) => {
                    records.extend(region_records);
                }
                Err(error) => {
                    if let RegionError::Aborted(_) = error {
                        // An aborted task never reported its own progress
                        let handle = self.progress.begin(&region_label(&outcome.region));
                        self.progress.fail(handle, &failed_label(&outcome.region));
                    }
                    let error = error.to_string();
                    warn!("[{}] Region query failed: {}", outcome.region, error);
                    failures.push(RegionFailure {
                        region: outcome.region,
                        error,
                    });
                }
            }
        }

        // Stable: each region keeps its own listing order
        records.sort_by(|a, b| a.region.cmp(&b.region));
        failures.sort_by(|a, b| a.region.cmp(&b.region));

        let parameter_cache = self.parameter_cache.stats();
        info!(
            "ElastiCache query finished in {:?}: {} clusters, {} failed regions",
            start_time.elapsed(),
            records.len(),
            failures.len()
        );
        debug!(
            "Parameter cache: {} groups, {} hits, {} loads",
            parameter_cache.entries, parameter_cache.hits, parameter_cache.loads
        );

        Ok(QueryReport {
            records,
            regions: regions.into_iter().collect(),
            failures,
            topology,
            parameter_cache,
        })
    }

    async fn discover_topology(&self, region: &str) -> TopologyIndex {
        match self.client_factory.client_for_region(region).await {
            Ok(client) => {
                TopologyDiscoverer::new(client, self.config.retry_policy.clone())
                    .discover()
                    .await
            }
            Err(e) => {
                warn!("Failed to create ElastiCache client for {}: {:#}", region, e);
                TopologyIndex::empty()
            }
        }
    }
}

fn region_label(region: &str) -> String {
    format!("Querying ElastiCache in {}", region)
}

fn failed_label(region: &str) -> String {
    format!("{} (failed)", region)
}

/// Query one region once a permit is free. Progress is reported while the permit
/// is held, so queued regions never show as active.
#[allow(clippy::too_many_arguments)]
async fn query_one_region(
    region: String,
    semaphore: Arc<Semaphore>,
    client_factory: Arc<dyn ElastiCacheClientFactory>,
    parameter_cache: Arc<ParameterCache>,
    progress: Arc<dyn ProgressSink>,
    retry_policy: RetryPolicy,
    engine_filter: Arc<EngineFilter>,
    name_filter: Arc<Option<NamePattern>>,
    topology: Arc<TopologyIndex>,
) -> Result<Vec<CacheClusterRecord>, RegionError> {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => Some(permit),
        Err(_) => {
            warn!("[{}] Semaphore closed, querying without a permit", region);
            None
        }
    };

    let handle = progress.begin(&region_label(&region));
    info!("[{}] Region query started", region);

    let result = match client_factory.client_for_region(&region).await {
        Ok(client) => {
            let worker =
                RegionQueryWorker::new(region.clone(), client, parameter_cache, retry_policy);
            let query = worker.query_region(&engine_filter, (*name_filter).as_ref(), &topology);
            match AssertUnwindSafe(query).catch_unwind().await {
                Ok(result) => result.map_err(|e| RegionError::Query(e.to_string())),
                Err(panic) => Err(RegionError::Query(format!(
                    "task panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            }
        }
        Err(e) => {
            let error = EcInfoError::from_category(
                categorize_error(&e, "CreateClient"),
                "CreateClient",
                &region,
                1,
            );
            Err(RegionError::Query(error.to_string()))
        }
    };

    match &result {
        Ok(records) => {
            info!(
                "[{}] Region query completed with {} clusters",
                region,
                records.len()
            );
            progress.complete(handle);
        }
        Err(_) => progress.fail(handle, &failed_label(&region)),
    }
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
