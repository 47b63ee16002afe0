use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_elasticache as elasticache;
use serde_json::{Map, Value};

/// Read-only ElastiCache control-plane calls used by the query core.
///
/// Every `list_*` call follows `Marker` pagination until the last page. Documents use
/// the service's PascalCase member names so fixtures can mirror real responses.
#[async_trait]
pub trait ElastiCacheApi: Send + Sync {
    /// Region this client is bound to
    fn region(&self) -> &str;

    /// Global Datastores with their member detail (`ShowMemberInfo=true`)
    async fn list_global_replication_groups(&self) -> Result<Vec<Value>>;

    async fn list_replication_groups(&self) -> Result<Vec<Value>>;

    /// Cache clusters including node detail (`ShowCacheNodeInfo=true`)
    async fn list_cache_clusters(&self) -> Result<Vec<Value>>;

    async fn describe_cache_cluster(&self, cluster_id: &str) -> Result<Option<Value>>;

    async fn list_cache_parameters(&self, parameter_group_name: &str) -> Result<Vec<Value>>;
}

/// [`ElastiCacheApi`] backed by `aws-sdk-elasticache`
pub struct ElastiCacheService {
    client: elasticache::Client,
    region: String,
}

impl ElastiCacheService {
    pub fn new(aws_config: &aws_config::SdkConfig, region: &str) -> Self {
        Self {
            client: elasticache::Client::new(aws_config),
            region: region.to_string(),
        }
    }
}

#[async_trait]
impl ElastiCacheApi for ElastiCacheService {
    fn region(&self) -> &str {
        &self.region
    }

    async fn list_global_replication_groups(&self) -> Result<Vec<Value>> {
        let mut groups = Vec::new();
        let mut marker = None;

        loop {
            // Without ShowMemberInfo the service returns an empty Members array
            let mut request = self
                .client
                .describe_global_replication_groups()
                .show_member_info(true);
            if let Some(ref marker_value) = marker {
                request = request.marker(marker_value);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("DescribeGlobalReplicationGroups in {}", self.region))?;

            for group in response.global_replication_groups.unwrap_or_default() {
                groups.push(global_replication_group_to_json(&group));
            }

            match response.marker {
                Some(next_marker) => marker = Some(next_marker),
                None => break,
            }
        }

        Ok(groups)
    }

    async fn list_replication_groups(&self) -> Result<Vec<Value>> {
        let mut groups = Vec::new();
        let mut marker = None;

        loop {
            let mut request = self.client.describe_replication_groups();
            if let Some(ref marker_value) = marker {
                request = request.marker(marker_value);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("DescribeReplicationGroups in {}", self.region))?;

            for group in response.replication_groups.unwrap_or_default() {
                groups.push(replication_group_to_json(&group));
            }

            match response.marker {
                Some(next_marker) => marker = Some(next_marker),
                None => break,
            }
        }

        Ok(groups)
    }

    async fn list_cache_clusters(&self) -> Result<Vec<Value>> {
        let mut clusters = Vec::new();
        let mut marker = None;

        loop {
            let mut request = self
                .client
                .describe_cache_clusters()
                .show_cache_node_info(true);
            if let Some(ref marker_value) = marker {
                request = request.marker(marker_value);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("DescribeCacheClusters in {}", self.region))?;

            for cluster in response.cache_clusters.unwrap_or_default() {
                clusters.push(cache_cluster_to_json(&cluster));
            }

            match response.marker {
                Some(next_marker) => marker = Some(next_marker),
                None => break,
            }
        }

        Ok(clusters)
    }

    async fn describe_cache_cluster(&self, cluster_id: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .describe_cache_clusters()
            .cache_cluster_id(cluster_id)
            .send()
            .await
            .with_context(|| format!("DescribeCacheClusters {} in {}", cluster_id, self.region))?;

        Ok(response
            .cache_clusters
            .unwrap_or_default()
            .first()
            .map(cache_cluster_to_json))
    }

    async fn list_cache_parameters(&self, parameter_group_name: &str) -> Result<Vec<Value>> {
        let mut parameters = Vec::new();
        let mut marker = None;

        loop {
            let mut request = self
                .client
                .describe_cache_parameters()
                .cache_parameter_group_name(parameter_group_name);
            if let Some(ref marker_value) = marker {
                request = request.marker(marker_value);
            }

            let response = request.send().await.with_context(|| {
                format!(
                    "DescribeCacheParameters {} in {}",
                    parameter_group_name, self.region
                )
            })?;

            for parameter in response.parameters.unwrap_or_default() {
                let mut json = Map::new();
                insert_string(&mut json, "ParameterName", parameter.parameter_name.as_deref());
                insert_string(&mut json, "ParameterValue", parameter.parameter_value.as_deref());
                parameters.push(Value::Object(json));
            }

            match response.marker {
                Some(next_marker) => marker = Some(next_marker),
                None => break,
            }
        }

        Ok(parameters)
    }
}

fn insert_string(json: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        json.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_bool(json: &mut Map<String, Value>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        json.insert(key.to_string(), Value::Bool(value));
    }
}

fn insert_number(json: &mut Map<String, Value>, key: &str, value: Option<i32>) {
    if let Some(value) = value {
        json.insert(key.to_string(), Value::Number(value.into()));
    }
}

fn global_replication_group_to_json(group: &elasticache::types::GlobalReplicationGroup) -> Value {
    let mut json = Map::new();
    insert_string(
        &mut json,
        "GlobalReplicationGroupId",
        group.global_replication_group_id.as_deref(),
    );
    insert_string(&mut json, "Status", group.status.as_deref());

    let members: Vec<Value> = group
        .members
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|member| {
            let mut member_json = Map::new();
            insert_string(
                &mut member_json,
                "ReplicationGroupId",
                member.replication_group_id.as_deref(),
            );
            insert_string(
                &mut member_json,
                "ReplicationGroupRegion",
                member.replication_group_region.as_deref(),
            );
            insert_string(&mut member_json, "Role", member.role.as_deref());
            Value::Object(member_json)
        })
        .collect();
    json.insert("Members".to_string(), Value::Array(members));

    Value::Object(json)
}

fn replication_group_to_json(group: &elasticache::types::ReplicationGroup) -> Value {
    let mut json = Map::new();

    insert_string(&mut json, "ReplicationGroupId", group.replication_group_id.as_deref());
    insert_string(&mut json, "Status", group.status.as_deref());
    insert_string(&mut json, "Engine", group.engine.as_deref());
    insert_string(&mut json, "CacheNodeType", group.cache_node_type.as_deref());
    insert_bool(&mut json, "ClusterEnabled", group.cluster_enabled);
    insert_bool(
        &mut json,
        "TransitEncryptionEnabled",
        group.transit_encryption_enabled,
    );
    insert_bool(
        &mut json,
        "AtRestEncryptionEnabled",
        group.at_rest_encryption_enabled,
    );
    insert_bool(
        &mut json,
        "AutoMinorVersionUpgrade",
        group.auto_minor_version_upgrade,
    );
    insert_number(
        &mut json,
        "SnapshotRetentionLimit",
        group.snapshot_retention_limit,
    );
    insert_string(&mut json, "SnapshotWindow", group.snapshot_window.as_deref());
    insert_string(
        &mut json,
        "AutomaticFailover",
        group.automatic_failover.as_ref().map(|s| s.as_str()),
    );
    insert_string(
        &mut json,
        "MultiAZ",
        group.multi_az.as_ref().map(|s| s.as_str()),
    );

    if let Some(member_clusters) = &group.member_clusters {
        json.insert(
            "MemberClusters".to_string(),
            Value::Array(
                member_clusters
                    .iter()
                    .map(|cluster| Value::String(cluster.clone()))
                    .collect(),
            ),
        );
    }

    if let Some(node_groups) = &group.node_groups {
        let node_groups_array: Vec<Value> = node_groups
            .iter()
            .map(|ng| {
                let mut ng_json = Map::new();
                insert_string(&mut ng_json, "NodeGroupId", ng.node_group_id.as_deref());
                let members: Vec<Value> = ng
                    .node_group_members
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|member| {
                        let mut member_json = Map::new();
                        insert_string(
                            &mut member_json,
                            "CacheClusterId",
                            member.cache_cluster_id.as_deref(),
                        );
                        insert_string(
                            &mut member_json,
                            "CurrentRole",
                            member.current_role.as_deref(),
                        );
                        Value::Object(member_json)
                    })
                    .collect();
                ng_json.insert("NodeGroupMembers".to_string(), Value::Array(members));
                Value::Object(ng_json)
            })
            .collect();
        json.insert("NodeGroups".to_string(), Value::Array(node_groups_array));
    }

    if let Some(configs) = &group.log_delivery_configurations {
        json.insert(
            "LogDeliveryConfigurations".to_string(),
            log_delivery_configurations_to_json(configs),
        );
    }

    Value::Object(json)
}

fn log_delivery_configurations_to_json(
    configs: &[elasticache::types::LogDeliveryConfiguration],
) -> Value {
    let configs_array: Vec<Value> = configs
        .iter()
        .map(|config| {
            let mut config_json = Map::new();
            insert_string(
                &mut config_json,
                "LogType",
                config.log_type.as_ref().map(|t| t.as_str()),
            );
            insert_string(
                &mut config_json,
                "Status",
                config.status.as_ref().map(|s| s.as_str()),
            );
            if let Some(details) = &config.destination_details {
                let mut details_json = Map::new();
                if let Some(cw) = &details.cloud_watch_logs_details {
                    insert_string(
                        &mut details_json,
                        "CloudWatchLogsLogGroup",
                        cw.log_group.as_deref(),
                    );
                }
                if let Some(firehose) = &details.kinesis_firehose_details {
                    insert_string(
                        &mut details_json,
                        "KinesisFirehoseDeliveryStream",
                        firehose.delivery_stream.as_deref(),
                    );
                }
                config_json.insert("DestinationDetails".to_string(), Value::Object(details_json));
            }
            Value::Object(config_json)
        })
        .collect();
    Value::Array(configs_array)
}

fn cache_cluster_to_json(cluster: &elasticache::types::CacheCluster) -> Value {
    let mut json = Map::new();

    insert_string(&mut json, "CacheClusterId", cluster.cache_cluster_id.as_deref());
    insert_string(&mut json, "Status", cluster.cache_cluster_status.as_deref());
    insert_string(&mut json, "Engine", cluster.engine.as_deref());
    insert_string(&mut json, "EngineVersion", cluster.engine_version.as_deref());
    insert_string(&mut json, "CacheNodeType", cluster.cache_node_type.as_deref());
    insert_number(&mut json, "NumCacheNodes", cluster.num_cache_nodes);
    insert_string(
        &mut json,
        "PreferredAvailabilityZone",
        cluster.preferred_availability_zone.as_deref(),
    );
    insert_string(
        &mut json,
        "PreferredMaintenanceWindow",
        cluster.preferred_maintenance_window.as_deref(),
    );
    insert_bool(
        &mut json,
        "AutoMinorVersionUpgrade",
        cluster.auto_minor_version_upgrade,
    );
    insert_string(&mut json, "ReplicationGroupId", cluster.replication_group_id.as_deref());
    insert_bool(
        &mut json,
        "TransitEncryptionEnabled",
        cluster.transit_encryption_enabled,
    );
    insert_bool(
        &mut json,
        "AtRestEncryptionEnabled",
        cluster.at_rest_encryption_enabled,
    );
    insert_number(
        &mut json,
        "SnapshotRetentionLimit",
        cluster.snapshot_retention_limit,
    );
    insert_string(&mut json, "SnapshotWindow", cluster.snapshot_window.as_deref());

    if let Some(configs) = &cluster.log_delivery_configurations {
        json.insert(
            "LogDeliveryConfigurations".to_string(),
            log_delivery_configurations_to_json(configs),
        );
    }

    if let Some(parameter_group) = &cluster.cache_parameter_group {
        let mut group_json = Map::new();
        insert_string(
            &mut group_json,
            "CacheParameterGroupName",
            parameter_group.cache_parameter_group_name.as_deref(),
        );
        insert_string(
            &mut group_json,
            "ParameterApplyStatus",
            parameter_group.parameter_apply_status.as_deref(),
        );
        json.insert("CacheParameterGroup".to_string(), Value::Object(group_json));
    }

    Value::Object(json)
}
