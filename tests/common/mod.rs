//! In-memory ElastiCache fakes shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::fmt;
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use aws_ec_info::app::cache_explorer::{
    ElastiCacheApi, ElastiCacheClientFactory, ProgressHandle, ProgressSink,
};

#[derive(Default)]
pub struct CallCounters {
    pub discovery: AtomicU32,
    pub replication_group_lists: AtomicU32,
    pub cache_cluster_lists: AtomicU32,
    pub parameter_lists: AtomicU32,
}

/// Tracks how many region listings run at the same time
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    pub max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeRegion {
    pub region: String,
    pub global_groups: Vec<Value>,
    pub replication_groups: Vec<Value>,
    pub cache_clusters: Vec<Value>,
    pub parameters: HashMap<String, Vec<Value>>,
    pub fail_discovery: bool,
    pub listing_error: Option<String>,
    pub panic_on_listing: bool,
    pub delay: Duration,
    pub in_flight: Option<Arc<InFlight>>,
    pub calls: CallCounters,
}

impl FakeRegion {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..Default::default()
        }
    }

    pub fn with_global_groups(mut self, groups: Vec<Value>) -> Self {
        self.global_groups = groups;
        self
    }

    pub fn with_replication_group(mut self, group: Value) -> Self {
        self.replication_groups.push(group);
        self
    }

    pub fn with_cache_cluster(mut self, cluster: Value) -> Self {
        self.cache_clusters.push(cluster);
        self
    }

    pub fn with_parameters(mut self, group_name: &str, parameters: Vec<Value>) -> Self {
        self.parameters.insert(group_name.to_string(), parameters);
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub fn failing_listing(mut self, error: &str) -> Self {
        self.listing_error = Some(error.to_string());
        self
    }

    pub fn panicking_listing(mut self) -> Self {
        self.panic_on_listing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_in_flight(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = Some(in_flight);
        self
    }

    async fn listing_guard(&self) -> Result<()> {
        if let Some(in_flight) = &self.in_flight {
            in_flight.enter();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(in_flight) = &self.in_flight {
            in_flight.exit();
        }
        if self.panic_on_listing {
            panic!("simulated crash listing {}", self.region);
        }
        match &self.listing_error {
            Some(error) => Err(anyhow!("{}", error)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ElastiCacheApi for FakeRegion {
    fn region(&self) -> &str {
        &self.region
    }

    async fn list_global_replication_groups(&self) -> Result<Vec<Value>> {
        self.calls.discovery.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery {
            return Err(anyhow!(
                "service error: AccessDenied: not authorized to perform DescribeGlobalReplicationGroups"
            ));
        }
        Ok(self.global_groups.clone())
    }

    async fn list_replication_groups(&self) -> Result<Vec<Value>> {
        self.calls.replication_group_lists.fetch_add(1, Ordering::SeqCst);
        self.listing_guard().await?;
        Ok(self.replication_groups.clone())
    }

    async fn list_cache_clusters(&self) -> Result<Vec<Value>> {
        self.calls.cache_cluster_lists.fetch_add(1, Ordering::SeqCst);
        self.listing_guard().await?;
        Ok(self.cache_clusters.clone())
    }

    async fn describe_cache_cluster(&self, cluster_id: &str) -> Result<Option<Value>> {
        Ok(self
            .cache_clusters
            .iter()
            .find(|c| c["CacheClusterId"] == cluster_id)
            .cloned())
    }

    async fn list_cache_parameters(&self, parameter_group_name: &str) -> Result<Vec<Value>> {
        self.calls.parameter_lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .parameters
            .get(parameter_group_name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hands out the fake for each region and records every request
#[derive(Default)]
pub struct FakeFactory {
    regions: HashMap<String, Arc<FakeRegion>>,
    requested: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn new(regions: Vec<FakeRegion>) -> Self {
        Self {
            regions: regions
                .into_iter()
                .map(|r| (r.region.clone(), Arc::new(r)))
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn region(&self, region: &str) -> &FakeRegion {
        &self.regions[region]
    }

    pub fn requested_regions(&self) -> Vec<String> {
        let mut regions = self.requested.lock().unwrap().clone();
        regions.sort();
        regions
    }
}

#[async_trait]
impl ElastiCacheClientFactory for FakeFactory {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn ElastiCacheApi>> {
        self.requested.lock().unwrap().push(region.to_string());
        match self.regions.get(region) {
            Some(fake) => Ok(Arc::clone(fake) as Arc<dyn ElastiCacheApi>),
            None => Err(anyhow!("dispatch failure: no endpoint for region {}", region)),
        }
    }
}

/// Progress sink that tracks how many regions are reported active at once
#[derive(Default)]
pub struct ActiveProgress {
    next: AtomicU64,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub begun: AtomicUsize,
}

impl ProgressSink for ActiveProgress {
    fn begin(&self, _label: &str) -> ProgressHandle {
        self.begun.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        ProgressHandle(self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn complete(&self, _handle: ProgressHandle) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn fail(&self, _handle: ProgressHandle, _label: &str) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Tracing layer that keeps every event message for later assertions
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    /// Capture events on the current thread until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn global_group(global_id: &str, members: &[(&str, &str, &str)]) -> Value {
    let members: Vec<Value> = members
        .iter()
        .map(|(id, region, role)| {
            json!({"ReplicationGroupId": id, "ReplicationGroupRegion": region, "Role": role})
        })
        .collect();
    json!({"GlobalReplicationGroupId": global_id, "Status": "available", "Members": members})
}

/// Redis replication group with one shard of two nodes and slow-log delivery
pub fn redis_group(id: &str) -> Value {
    json!({
        "ReplicationGroupId": id,
        "Status": "available",
        "CacheNodeType": "cache.r6g.large",
        "ClusterEnabled": false,
        "MultiAZ": "enabled",
        "AutomaticFailover": "enabled",
        "TransitEncryptionEnabled": true,
        "AtRestEncryptionEnabled": true,
        "AutoMinorVersionUpgrade": true,
        "SnapshotRetentionLimit": 1,
        "SnapshotWindow": "05:00-06:00",
        "MemberClusters": [format!("{}-001", id), format!("{}-002", id)],
        "NodeGroups": [{
            "NodeGroupId": "0001",
            "NodeGroupMembers": [
                {"CacheClusterId": format!("{}-001", id), "CurrentRole": "primary"},
                {"CacheClusterId": format!("{}-002", id), "CurrentRole": "replica"}
            ]
        }],
        "LogDeliveryConfigurations": [
            {"LogType": "slow-log", "Status": "active", "DestinationDetails": {"CloudWatchLogsLogGroup": "/elasticache/slow"}}
        ]
    })
}

pub fn member_cluster(id: &str, group_id: &str, parameter_group: &str) -> Value {
    json!({
        "CacheClusterId": id,
        "ReplicationGroupId": group_id,
        "Engine": "redis",
        "EngineVersion": "7.1.0",
        "CacheNodeType": "cache.r6g.large",
        "NumCacheNodes": 1,
        "PreferredMaintenanceWindow": "sun:23:00-mon:01:30",
        "CacheParameterGroup": {"CacheParameterGroupName": parameter_group, "ParameterApplyStatus": "in-sync"}
    })
}

pub fn memcached_cluster(id: &str) -> Value {
    json!({
        "CacheClusterId": id,
        "Engine": "memcached",
        "EngineVersion": "1.6.22",
        "CacheNodeType": "cache.t3.micro",
        "NumCacheNodes": 2,
        "PreferredAvailabilityZone": "Multiple",
        "AutoMinorVersionUpgrade": true
    })
}

/// Region with one Redis group (members included) and one Memcached cluster
pub fn populated_region(region: &str, group_id: &str, memcached_id: &str) -> FakeRegion {
    FakeRegion::new(region)
        .with_replication_group(redis_group(group_id))
        .with_cache_cluster(member_cluster(&format!("{}-001", group_id), group_id, "default.redis7"))
        .with_cache_cluster(member_cluster(&format!("{}-002", group_id), group_id, "default.redis7"))
        .with_cache_cluster(memcached_cluster(memcached_id))
}
