//! Conversion of ElastiCache API documents into [`CacheClusterRecord`]s.
//!
//! Lookups that need extra API calls (member cluster detail, parameter groups) are done
//! by the region worker; the functions here are pure.

use serde_json::Value;
use tracing::debug;

use crate::app::cache_explorer::cache::ParameterValues;
use crate::app::cache_explorer::state::*;

pub const SLOWLOG_SLOWER_THAN: &str = "slowlog-log-slower-than";
pub const SLOWLOG_MAX_LEN: &str = "slowlog-max-len";

/// Redis defaults applied when a parameter group leaves the value unset
pub const DEFAULT_SLOWLOG_SLOWER_THAN_US: i64 = 10_000;
pub const DEFAULT_SLOWLOG_MAX_LEN: i64 = 128;

fn str_field<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn bool_field(json: &Value, key: &str) -> Option<bool> {
    json.get(key).and_then(|v| v.as_bool())
}

/// `"enabled"` -> true, any other reported status -> false, missing -> `NotApplicable`
fn status_field(json: &Value, key: &str) -> Attribute<bool> {
    Attribute::from_option(str_field(json, key).map(|s| s.eq_ignore_ascii_case("enabled")))
}

pub fn replication_group_id(group: &Value) -> &str {
    str_field(group, "ReplicationGroupId").unwrap_or_default()
}

pub fn cache_cluster_id(cluster: &Value) -> &str {
    str_field(cluster, "CacheClusterId").unwrap_or_default()
}

/// First member cluster, whose detail carries engine, version and parameter group
pub fn first_member_cluster(group: &Value) -> Option<&str> {
    group
        .get("MemberClusters")
        .and_then(|v| v.as_array())
        .and_then(|members| members.first())
        .and_then(|v| v.as_str())
}

/// Cache clusters that belong to a replication group are reported through the group
pub fn is_replication_group_member(cluster: &Value) -> bool {
    str_field(cluster, "ReplicationGroupId").is_some()
}

pub fn parameter_group_name(cluster_detail: &Value) -> Option<&str> {
    cluster_detail
        .get("CacheParameterGroup")
        .and_then(|g| str_field(g, "CacheParameterGroupName"))
}

/// Whether a log delivery of `log_type` with a destination is configured
pub fn log_delivery_enabled(group: &Value, log_type: &str) -> bool {
    group
        .get("LogDeliveryConfigurations")
        .and_then(|v| v.as_array())
        .map(|configs| {
            configs.iter().any(|config| {
                str_field(config, "LogType") == Some(log_type)
                    && config
                        .get("DestinationDetails")
                        .and_then(|d| d.as_object())
                        .is_some_and(|d| !d.is_empty())
            })
        })
        .unwrap_or(false)
}

/// Engine of a replication group: the group's own field, then the member detail, then Redis
pub fn resolve_group_engine(group: &Value, member_detail: Option<&Value>) -> String {
    str_field(group, "Engine")
        .or_else(|| member_detail.and_then(|d| str_field(d, "Engine")))
        .unwrap_or("redis")
        .to_lowercase()
}

/// Reduce `DescribeCacheParameters` output to the slow-log thresholds.
///
/// Starts from the Redis defaults; only non-empty integer values override them. `"0"` is
/// a real value (slow log disabled).
pub fn parse_slow_log_parameters(parameters: &[Value]) -> ParameterValues {
    let mut values = ParameterValues::new();
    values.insert(
        SLOWLOG_SLOWER_THAN.to_string(),
        Some(DEFAULT_SLOWLOG_SLOWER_THAN_US),
    );
    values.insert(SLOWLOG_MAX_LEN.to_string(), Some(DEFAULT_SLOWLOG_MAX_LEN));

    for parameter in parameters {
        let Some(name) = str_field(parameter, "ParameterName") else {
            continue;
        };
        if name != SLOWLOG_SLOWER_THAN && name != SLOWLOG_MAX_LEN {
            continue;
        }
        let Some(raw) = str_field(parameter, "ParameterValue") else {
            continue;
        };
        match raw.trim().parse::<i64>() {
            Ok(value) => {
                debug!("Updated {} to {}", name, value);
                values.insert(name.to_string(), Some(value));
            }
            Err(e) => debug!("Failed to parse {} value '{}': {}", name, raw, e),
        }
    }

    values
}

pub fn slow_log_settings_from(values: &ParameterValues) -> SlowLogSettings {
    SlowLogSettings::Delivered {
        slower_than_us: values.get(SLOWLOG_SLOWER_THAN).copied().flatten(),
        max_len: values.get(SLOWLOG_MAX_LEN).copied().flatten(),
    }
}

pub fn default_slow_log_settings() -> SlowLogSettings {
    SlowLogSettings::Delivered {
        slower_than_us: Some(DEFAULT_SLOWLOG_SLOWER_THAN_US),
        max_len: Some(DEFAULT_SLOWLOG_MAX_LEN),
    }
}

/// Build the record for a replication group (Redis/Valkey).
///
/// `member_detail` is the first member cluster's detail when it could be fetched; the
/// group-level fields are used otherwise.
pub fn normalize_replication_group(
    group: &Value,
    member_detail: Option<&Value>,
    region: &str,
    global: Option<GlobalMembership>,
    slow_logs: Attribute<SlowLogSettings>,
) -> CacheClusterRecord {
    let rg_id = replication_group_id(group);

    let node_groups = group
        .get("NodeGroups")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    let nodes: usize = node_groups
        .iter()
        .map(|ng| {
            ng.get("NodeGroupMembers")
                .and_then(|v| v.as_array())
                .map_or(0, Vec::len)
        })
        .sum();

    let engine_version = member_detail
        .and_then(|d| str_field(d, "EngineVersion"))
        .or_else(|| str_field(group, "EngineVersion"))
        .unwrap_or_default()
        .to_string();
    debug!("RG {}: EngineVersion = '{}'", rg_id, engine_version);

    let maintenance_window = member_detail
        .and_then(|d| str_field(d, "PreferredMaintenanceWindow"))
        .or_else(|| str_field(group, "PreferredMaintenanceWindow"))
        .map(str::to_string);

    CacheClusterRecord {
        region: region.to_string(),
        kind: ResourceKind::ReplicationGroup,
        engine: capitalize(&resolve_group_engine(group, member_detail)),
        cluster_id: rg_id.to_string(),
        global,
        node_type: str_field(group, "CacheNodeType").unwrap_or_default().to_string(),
        engine_version,
        cluster_mode: Attribute::Present(bool_field(group, "ClusterEnabled").unwrap_or(false)),
        shards: node_groups.len() as u32,
        nodes: nodes as u32,
        multi_az: status_field(group, "MultiAZ"),
        auto_failover: status_field(group, "AutomaticFailover"),
        encryption_transit: Attribute::from_option(bool_field(group, "TransitEncryptionEnabled")),
        encryption_rest: Attribute::from_option(bool_field(group, "AtRestEncryptionEnabled")),
        slow_logs,
        engine_logs: Attribute::Present(log_delivery_enabled(group, "engine-log")),
        maintenance_window,
        auto_upgrade: Attribute::from_option(bool_field(group, "AutoMinorVersionUpgrade")),
        backup: Attribute::Present(BackupSettings {
            window: str_field(group, "SnapshotWindow").map(str::to_string),
            retention_days: group
                .get("SnapshotRetentionLimit")
                .and_then(|v| v.as_i64())
                .map(|v| v as i32),
        }),
    }
}

/// Build the record for a standalone cache cluster (Memcached, or Redis outside a group).
///
/// `slow_logs` is ignored for Memcached, which has no slow or engine log.
pub fn normalize_cache_cluster(
    cluster: &Value,
    region: &str,
    slow_logs: Attribute<SlowLogSettings>,
) -> CacheClusterRecord {
    let engine = str_field(cluster, "Engine").unwrap_or_default().to_lowercase();
    let is_memcached = engine == Engine::Memcached.as_str();

    let multi_az = if str_field(cluster, "PreferredAvailabilityZone").is_some() {
        Attribute::Present(false)
    } else {
        Attribute::NotApplicable
    };

    let (encryption_transit, encryption_rest, backup, slow_logs, engine_logs) = if is_memcached {
        (
            Attribute::NotApplicable,
            Attribute::NotApplicable,
            Attribute::NotApplicable,
            Attribute::NotApplicable,
            Attribute::NotApplicable,
        )
    } else {
        (
            Attribute::from_option(bool_field(cluster, "TransitEncryptionEnabled")),
            Attribute::from_option(bool_field(cluster, "AtRestEncryptionEnabled")),
            Attribute::Present(BackupSettings {
                window: str_field(cluster, "SnapshotWindow").map(str::to_string),
                retention_days: cluster
                    .get("SnapshotRetentionLimit")
                    .and_then(|v| v.as_i64())
                    .map(|v| v as i32),
            }),
            slow_logs,
            Attribute::Present(log_delivery_enabled(cluster, "engine-log")),
        )
    };

    CacheClusterRecord {
        region: region.to_string(),
        kind: ResourceKind::CacheCluster,
        engine: capitalize(&engine),
        cluster_id: cache_cluster_id(cluster).to_string(),
        global: None,
        node_type: str_field(cluster, "CacheNodeType").unwrap_or_default().to_string(),
        engine_version: str_field(cluster, "EngineVersion").unwrap_or_default().to_string(),
        cluster_mode: Attribute::NotApplicable,
        shards: 0,
        nodes: cluster
            .get("NumCacheNodes")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        multi_az,
        auto_failover: Attribute::NotApplicable,
        encryption_transit,
        encryption_rest,
        slow_logs,
        engine_logs,
        maintenance_window: str_field(cluster, "PreferredMaintenanceWindow").map(str::to_string),
        auto_upgrade: Attribute::from_option(bool_field(cluster, "AutoMinorVersionUpgrade")),
        backup,
    }
}
