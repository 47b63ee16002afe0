//! Per-region query: list replication groups and cache clusters in one region and turn
//! them into records, tagged with Global Datastore membership from the topology.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aws_services::ElastiCacheApi;
use super::cache::{ParameterCache, ParameterValues};
use super::filters::NamePattern;
use super::normalizers::elasticache::{
    cache_cluster_id, default_slow_log_settings, first_member_cluster,
    is_replication_group_member, log_delivery_enabled, normalize_cache_cluster,
    normalize_replication_group, parameter_group_name, parse_slow_log_parameters,
    replication_group_id, resolve_group_engine, slow_log_settings_from,
};
use super::retry::{with_retry, RetryPolicy};
use super::state::{Attribute, CacheClusterRecord, Engine, EngineFilter, GlobalMembership, SlowLogSettings};
use super::topology::TopologyIndex;
use crate::app::error::EcInfoError;

pub struct RegionQueryWorker {
    region: String,
    client: Arc<dyn ElastiCacheApi>,
    parameter_cache: Arc<ParameterCache>,
    retry_policy: RetryPolicy,
}

impl RegionQueryWorker {
    pub fn new(
        region: impl Into<String>,
        client: Arc<dyn ElastiCacheApi>,
        parameter_cache: Arc<ParameterCache>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            region: region.into(),
            client,
            parameter_cache,
            retry_policy,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Query every matching resource in this worker's region.
    ///
    /// Fails only when a listing call fails; per-resource lookups (member detail,
    /// parameter groups) degrade that record instead.
    pub async fn query_region(
        &self,
        engine_filter: &EngineFilter,
        name_filter: Option<&NamePattern>,
        topology: &TopologyIndex,
    ) -> Result<Vec<CacheClusterRecord>, EcInfoError> {
        let mut records = Vec::new();

        if engine_filter.wants_replication_groups() {
            let groups = with_retry(
                &self.retry_policy,
                "DescribeReplicationGroups",
                &self.region,
                || self.client.list_replication_groups(),
            )
            .await?;
            debug!("[{}] Found {} replication groups", self.region, groups.len());

            for group in &groups {
                if let Some(record) = self
                    .replication_group_record(group, engine_filter, name_filter, topology)
                    .await
                {
                    records.push(record);
                }
            }
        }

        let clusters = with_retry(
            &self.retry_policy,
            "DescribeCacheClusters",
            &self.region,
            || self.client.list_cache_clusters(),
        )
        .await?;
        debug!("[{}] Found {} cache clusters", self.region, clusters.len());

        for cluster in &clusters {
            if is_replication_group_member(cluster) {
                continue;
            }
            let engine = cluster.get("Engine").and_then(|v| v.as_str()).unwrap_or_default();
            if !engine_selected(engine_filter, engine) {
                continue;
            }
            if !name_selected(name_filter, cache_cluster_id(cluster)) {
                continue;
            }
            let slow_logs = if Engine::from_service(engine) == Some(Engine::Memcached) {
                Attribute::NotApplicable
            } else {
                self.slow_log_settings(cache_cluster_id(cluster), cluster, Some(cluster))
                    .await
            };
            records.push(normalize_cache_cluster(cluster, &self.region, slow_logs));
        }

        self.log_unlisted_members(topology, &records);
        info!("[{}] Collected {} clusters", self.region, records.len());
        Ok(records)
    }

    async fn replication_group_record(
        &self,
        group: &Value,
        engine_filter: &EngineFilter,
        name_filter: Option<&NamePattern>,
        topology: &TopologyIndex,
    ) -> Option<CacheClusterRecord> {
        let rg_id = replication_group_id(group);
        if !name_selected(name_filter, rg_id) {
            return None;
        }

        let member_detail = self.member_cluster_detail(rg_id, group).await;

        let engine = resolve_group_engine(group, member_detail.as_ref());
        if !engine_selected(engine_filter, &engine) {
            debug!("[{}] Skipping {} ({} not selected)", self.region, rg_id, engine);
            return None;
        }

        let global = topology
            .lookup(&self.region, rg_id)
            .map(|membership| GlobalMembership {
                global_datastore_id: membership.group_global_id.clone(),
                role: membership.role.clone(),
            });

        let slow_logs = self
            .slow_log_settings(rg_id, group, member_detail.as_ref())
            .await;

        Some(normalize_replication_group(
            group,
            member_detail.as_ref(),
            &self.region,
            global,
            slow_logs,
        ))
    }

    /// Detail of the group's first member cluster; `None` falls back to group-level fields
    async fn member_cluster_detail(&self, rg_id: &str, group: &Value) -> Option<Value> {
        let member_id = first_member_cluster(group)?;

        match with_retry(
            &self.retry_policy,
            "DescribeCacheClusters",
            &self.region,
            || self.client.describe_cache_cluster(member_id),
        )
        .await
        {
            Ok(detail) => detail,
            Err(e) => {
                warn!(
                    "[{}] Failed to get member cluster {} of {}: {}",
                    self.region, member_id, rg_id, e
                );
                None
            }
        }
    }

    /// Slow-log settings of a resource. `resource` carries the log delivery
    /// configuration and `detail` the parameter group.
    async fn slow_log_settings(
        &self,
        resource_id: &str,
        resource: &Value,
        detail: Option<&Value>,
    ) -> Attribute<SlowLogSettings> {
        if !log_delivery_enabled(resource, "slow-log") {
            return Attribute::Present(SlowLogSettings::Disabled);
        }

        let Some(parameter_group) = detail.and_then(parameter_group_name) else {
            debug!("[{}] {} has no parameter group, using defaults", self.region, resource_id);
            return Attribute::Present(default_slow_log_settings());
        };

        match self
            .parameter_cache
            .get(parameter_group, || self.load_parameters(parameter_group))
            .await
        {
            Ok(values) => Attribute::Present(slow_log_settings_from(&values)),
            Err(e) => {
                warn!(
                    "[{}] Failed to read parameter group {} for {}: {}",
                    self.region, parameter_group, resource_id, e
                );
                Attribute::Unavailable
            }
        }
    }

    async fn load_parameters(&self, parameter_group: &str) -> Result<ParameterValues, EcInfoError> {
        let parameters = with_retry(
            &self.retry_policy,
            "DescribeCacheParameters",
            &self.region,
            || self.client.list_cache_parameters(parameter_group),
        )
        .await?;
        Ok(parse_slow_log_parameters(&parameters))
    }

    fn log_unlisted_members(&self, topology: &TopologyIndex, records: &[CacheClusterRecord]) {
        for (member_id, membership) in topology.members_in(&self.region) {
            if !records.iter().any(|r| r.cluster_id == member_id) {
                debug!(
                    "[{}] Global Datastore member {} of {} was not listed in this region",
                    self.region, member_id, membership.group_global_id
                );
            }
        }
    }
}

/// Unknown engine names never match a filter
fn engine_selected(filter: &EngineFilter, engine: &str) -> bool {
    Engine::from_service(engine).is_some_and(|e| filter.contains(e))
}

fn name_selected(filter: Option<&NamePattern>, name: &str) -> bool {
    filter.map_or(true, |pattern| pattern.matches(name))
}
