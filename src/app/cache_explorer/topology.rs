//! Global Datastore topology: which replication groups live in which regions.
//!
//! The topology is read once per run, before any region task starts, and is shared
//! read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aws_services::ElastiCacheApi;
use super::retry::{with_retry, RetryPolicy};
use super::state::MemberRole;
use crate::app::error::EcInfoError;

/// One replication group's membership in a Global Datastore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEntry {
    pub group_global_id: String,
    pub member_id: String,
    pub region: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyMembership {
    pub group_global_id: String,
    pub role: MemberRole,
}

/// `region -> member id -> membership`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyIndex {
    regions: BTreeMap<String, HashMap<String, TopologyMembership>>,
}

impl TopologyIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TopologyEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    fn insert(&mut self, entry: TopologyEntry) {
        self.regions.entry(entry.region).or_default().insert(
            entry.member_id,
            TopologyMembership {
                group_global_id: entry.group_global_id,
                role: entry.role,
            },
        );
    }

    /// Membership of `member_id` in `region`; `None` means not part of any Global Datastore
    pub fn lookup(&self, region: &str, member_id: &str) -> Option<&TopologyMembership> {
        self.regions.get(region)?.get(member_id)
    }

    /// Regions holding at least one member, sorted
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn members_in(&self, region: &str) -> impl Iterator<Item = (&str, &TopologyMembership)> {
        self.regions
            .get(region)
            .into_iter()
            .flat_map(|members| members.iter().map(|(id, m)| (id.as_str(), m)))
    }

    pub fn member_count(&self) -> usize {
        self.regions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Flat entry list sorted by region then member id
    #[cfg(test)]
    pub fn entries(&self) -> Vec<TopologyEntry> {
        let mut entries: Vec<TopologyEntry> = self
            .regions
            .iter()
            .flat_map(|(region, members)| {
                members.iter().map(move |(member_id, m)| TopologyEntry {
                    group_global_id: m.group_global_id.clone(),
                    member_id: member_id.clone(),
                    region: region.clone(),
                    role: m.role.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| (&a.region, &a.member_id).cmp(&(&b.region, &b.member_id)));
        entries
    }
}

/// `{requested} ∪ regions(topology)`, sorted.
///
/// A blank requested region is a caller error.
pub fn derive_region_set(
    requested_region: &str,
    topology: &TopologyIndex,
) -> Result<BTreeSet<String>, EcInfoError> {
    let requested = requested_region.trim();
    if requested.is_empty() {
        return Err(EcInfoError::MissingRegion);
    }

    let mut regions: BTreeSet<String> = topology.regions().map(str::to_string).collect();
    regions.insert(requested.to_string());
    Ok(regions)
}

pub struct TopologyDiscoverer {
    client: Arc<dyn ElastiCacheApi>,
    retry_policy: RetryPolicy,
}

impl TopologyDiscoverer {
    pub fn new(client: Arc<dyn ElastiCacheApi>, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// Read the Global Datastore topology.
    ///
    /// Never fails: when the listing cannot be read the topology is empty and only the
    /// client's own region gets queried.
    pub async fn discover(&self) -> TopologyIndex {
        info!("Discovering Global Datastores");
        let region = self.client.region().to_string();

        let groups = match with_retry(
            &self.retry_policy,
            "DescribeGlobalReplicationGroups",
            &region,
            || self.client.list_global_replication_groups(),
        )
        .await
        {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Failed to query Global Datastores: {}", e);
                return TopologyIndex::empty();
            }
        };

        let index = TopologyIndex::from_entries(parse_global_replication_groups(&groups));
        info!(
            "Found {} clusters in Global Datastores across {} regions",
            index.member_count(),
            index.regions.len()
        );
        index
    }
}

/// Flatten `DescribeGlobalReplicationGroups` documents into entries
pub fn parse_global_replication_groups(groups: &[serde_json::Value]) -> Vec<TopologyEntry> {
    let mut entries = Vec::new();

    for group in groups {
        let group_global_id = group
            .get("GlobalReplicationGroupId")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        debug!("Found Global Datastore: {}", group_global_id);

        let members = group
            .get("Members")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for member in members {
            let member_id = member
                .get("ReplicationGroupId")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let region = member
                .get("ReplicationGroupRegion")
                .and_then(|v| v.as_str())
                .unwrap_or_default();

            if member_id.is_empty() || region.is_empty() {
                debug!(
                    "Skipping Global Datastore member without id or region in {}",
                    group_global_id
                );
                continue;
            }

            let role = MemberRole::normalize(
                member.get("Role").and_then(|v| v.as_str()).unwrap_or_default(),
            );
            debug!(
                "Found Global Datastore member: {} ({}) in {}",
                member_id,
                role.as_canonical(),
                region
            );

            entries.push(TopologyEntry {
                group_global_id: group_global_id.to_string(),
                member_id: member_id.to_string(),
                region: region.to_string(),
                role,
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(group: &str, member: &str, region: &str, role: MemberRole) -> TopologyEntry {
        TopologyEntry {
            group_global_id: group.to_string(),
            member_id: member.to_string(),
            region: region.to_string(),
            role,
        }
    }

    #[test]
    fn test_parse_members_across_regions() {
        let groups = vec![json!({
            "GlobalReplicationGroupId": "ldgnf-global-ds-001",
            "Members": [
                {"ReplicationGroupId": "cluster-primary", "ReplicationGroupRegion": "us-east-1", "Role": "PRIMARY"},
                {"ReplicationGroupId": "cluster-secondary-1", "ReplicationGroupRegion": "ap-northeast-1", "Role": "secondary"},
                {"ReplicationGroupId": "cluster-secondary-2", "ReplicationGroupRegion": "eu-west-1", "Role": "Secondary"}
            ]
        })];

        let index = TopologyIndex::from_entries(parse_global_replication_groups(&groups));

        let regions: Vec<&str> = index.regions().collect();
        assert_eq!(regions, vec!["ap-northeast-1", "eu-west-1", "us-east-1"]);

        let primary = index.lookup("us-east-1", "cluster-primary").unwrap();
        assert_eq!(primary.group_global_id, "ldgnf-global-ds-001");
        assert_eq!(primary.role, MemberRole::Primary);
        assert_eq!(
            index.lookup("ap-northeast-1", "cluster-secondary-1").unwrap().role,
            MemberRole::Secondary
        );
        assert!(index.lookup("us-east-1", "cluster-secondary-1").is_none());
    }

    #[test]
    fn test_unknown_roles_are_kept() {
        let groups = vec![json!({
            "GlobalReplicationGroupId": "g",
            "Members": [
                {"ReplicationGroupId": "a", "ReplicationGroupRegion": "us-west-2"},
                {"ReplicationGroupId": "b", "ReplicationGroupRegion": "us-west-2", "Role": "promoting"},
                {"ReplicationGroupRegion": "us-west-2", "Role": "PRIMARY"}
            ]
        })];

        let entries = parse_global_replication_groups(&groups);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, MemberRole::Other("UNKNOWN".to_string()));
        assert_eq!(entries[1].role, MemberRole::Other("PROMOTING".to_string()));
    }

    #[test]
    fn test_two_primaries_are_reported_as_is() {
        let index = TopologyIndex::from_entries([
            entry("g", "a", "us-east-1", MemberRole::Primary),
            entry("g", "b", "eu-west-1", MemberRole::Primary),
        ]);
        assert_eq!(index.member_count(), 2);
        assert_eq!(index.lookup("eu-west-1", "b").unwrap().role, MemberRole::Primary);
    }

    #[test]
    fn test_region_set_includes_requested_region() {
        let index = TopologyIndex::from_entries([
            entry("G1", "m1", "us-east-1", MemberRole::Primary),
            entry("G1", "m2", "eu-west-1", MemberRole::Secondary),
        ]);

        let regions = derive_region_set("ap-south-1", &index).unwrap();
        let regions: Vec<&str> = regions.iter().map(String::as_str).collect();
        assert_eq!(regions, vec!["ap-south-1", "eu-west-1", "us-east-1"]);

        let regions = derive_region_set("us-east-1", &TopologyIndex::empty()).unwrap();
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn test_blank_region_is_rejected() {
        assert!(matches!(
            derive_region_set("  ", &TopologyIndex::empty()),
            Err(EcInfoError::MissingRegion)
        ));
    }

    #[test]
    fn test_entries_round_trip_through_index() {
        let original = vec![
            entry("G1", "m2", "eu-west-1", MemberRole::Secondary),
            entry("G1", "m1", "us-east-1", MemberRole::Primary),
        ];
        let index = TopologyIndex::from_entries(original.clone());
        assert_eq!(index.entries(), original);
    }

    struct FixedTopology {
        groups: Option<Vec<serde_json::Value>>,
    }

    #[async_trait::async_trait]
    impl ElastiCacheApi for FixedTopology {
        fn region(&self) -> &str {
            "us-east-1"
        }

        async fn list_global_replication_groups(&self) -> anyhow::Result<Vec<serde_json::Value>> {
            match &self.groups {
                Some(groups) => Ok(groups.clone()),
                None => Err(anyhow::anyhow!("AccessDeniedException: not authorized")),
            }
        }

        async fn list_replication_groups(&self) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }

        async fn list_cache_clusters(&self) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }

        async fn describe_cache_cluster(
            &self,
            _cluster_id: &str,
        ) -> anyhow::Result<Option<serde_json::Value>> {
            Ok(None)
        }

        async fn list_cache_parameters(
            &self,
            _parameter_group_name: &str,
        ) -> anyhow::Result<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let client = Arc::new(FixedTopology {
            groups: Some(vec![json!({
                "GlobalReplicationGroupId": "G1",
                "Members": [
                    {"ReplicationGroupId": "m1", "ReplicationGroupRegion": "us-east-1", "Role": "PRIMARY"},
                    {"ReplicationGroupId": "m2", "ReplicationGroupRegion": "eu-west-1", "Role": "SECONDARY"}
                ]
            })]),
        });
        let discoverer = TopologyDiscoverer::new(client, RetryPolicy::immediate(1));

        let first = discoverer.discover().await;
        let second = discoverer.discover().await;
        assert_eq!(first, second);
        assert_eq!(first.member_count(), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure_yields_empty_index() {
        let discoverer = TopologyDiscoverer::new(
            Arc::new(FixedTopology { groups: None }),
            RetryPolicy::immediate(2),
        );
        assert!(discoverer.discover().await.is_empty());
    }
}
