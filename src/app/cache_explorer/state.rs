use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::app::error::EcInfoError;

/// Cache engines the tool knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Redis,
    Valkey,
    Memcached,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Redis, Engine::Valkey, Engine::Memcached];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Redis => "redis",
            Engine::Valkey => "valkey",
            Engine::Memcached => "memcached",
        }
    }

    /// Display form used in the `type` column
    pub fn display_name(&self) -> &'static str {
        match self {
            Engine::Redis => "Redis",
            Engine::Valkey => "Valkey",
            Engine::Memcached => "Memcached",
        }
    }

    /// Parse an engine name as reported by the service (any casing)
    pub fn from_service(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

impl FromStr for Engine {
    type Err = EcInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Engine::Redis),
            "valkey" => Ok(Engine::Valkey),
            "memcached" => Ok(Engine::Memcached),
            other => Err(EcInfoError::InvalidEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of engines a query is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFilter {
    engines: BTreeSet<Engine>,
}

impl Default for EngineFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl EngineFilter {
    pub fn all() -> Self {
        Self {
            engines: Engine::ALL.into_iter().collect(),
        }
    }

    pub fn new(engines: impl IntoIterator<Item = Engine>) -> Self {
        Self {
            engines: engines.into_iter().collect(),
        }
    }

    /// Parse a comma separated engine list such as `redis,valkey`.
    ///
    /// Every invalid name is reported in a single error.
    pub fn parse(input: &str) -> Result<Self, EcInfoError> {
        let mut engines = BTreeSet::new();
        let mut invalid = Vec::new();

        for part in input.split(',') {
            match part.parse::<Engine>() {
                Ok(engine) => {
                    engines.insert(engine);
                }
                Err(_) => invalid.push(part.trim().to_lowercase()),
            }
        }

        if !invalid.is_empty() {
            return Err(EcInfoError::InvalidEngine(invalid.join(", ")));
        }

        Ok(Self { engines })
    }

    pub fn contains(&self, engine: Engine) -> bool {
        self.engines.contains(&engine)
    }

    /// Whether replication groups (Redis/Valkey) need to be listed at all
    pub fn wants_replication_groups(&self) -> bool {
        self.contains(Engine::Redis) || self.contains(Engine::Valkey)
    }
}

impl fmt::Display for EngineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.engines.iter().map(Engine::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Replication role of a Global Datastore member, normalized to uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    Primary,
    Secondary,
    /// Anything the service reports that is not PRIMARY or SECONDARY, uppercased
    Other(String),
}

impl MemberRole {
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "PRIMARY" => MemberRole::Primary,
            "SECONDARY" => MemberRole::Secondary,
            "" => MemberRole::Other("UNKNOWN".to_string()),
            _ => MemberRole::Other(upper),
        }
    }

    /// Canonical uppercase form
    pub fn as_canonical(&self) -> &str {
        match self {
            MemberRole::Primary => "PRIMARY",
            MemberRole::Secondary => "SECONDARY",
            MemberRole::Other(value) => value,
        }
    }

    /// `Primary` / `Secondary`; other values pass through unchanged
    pub fn display_name(&self) -> &str {
        match self {
            MemberRole::Primary => "Primary",
            MemberRole::Secondary => "Secondary",
            MemberRole::Other(value) => value,
        }
    }
}

/// Tri-state value for record attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute<T> {
    Present(T),
    /// The attribute does not exist for this kind of resource or was not reported
    NotApplicable,
    /// The lookup backing this attribute failed
    Unavailable,
}

impl<T> Attribute<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Attribute::Present(v),
            None => Attribute::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    ReplicationGroup,
    CacheCluster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlowLogSettings {
    /// No slow-log delivery is configured
    Disabled,
    /// Delivery configured; thresholds from the parameter group
    Delivered {
        slower_than_us: Option<i64>,
        max_len: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    pub window: Option<String>,
    pub retention_days: Option<i32>,
}

/// Global Datastore membership attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMembership {
    pub global_datastore_id: String,
    pub role: MemberRole,
}

/// One ElastiCache replication group or standalone cache cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheClusterRecord {
    pub region: String,
    pub kind: ResourceKind,
    /// Capitalized engine name as reported (`Redis`, `Valkey`, `Memcached`)
    pub engine: String,
    pub cluster_id: String,
    pub global: Option<GlobalMembership>,
    pub node_type: String,
    pub engine_version: String,
    pub cluster_mode: Attribute<bool>,
    pub shards: u32,
    pub nodes: u32,
    pub multi_az: Attribute<bool>,
    pub auto_failover: Attribute<bool>,
    pub encryption_transit: Attribute<bool>,
    pub encryption_rest: Attribute<bool>,
    pub slow_logs: Attribute<SlowLogSettings>,
    pub engine_logs: Attribute<bool>,
    pub maintenance_window: Option<String>,
    pub auto_upgrade: Attribute<bool>,
    pub backup: Attribute<BackupSettings>,
}

impl CacheClusterRecord {
    /// Role for display, empty when not part of a Global Datastore
    pub fn display_role(&self) -> &str {
        self.global
            .as_ref()
            .map(|g| g.role.display_name())
            .unwrap_or("")
    }

    pub fn global_datastore_id(&self) -> Option<&str> {
        self.global.as_ref().map(|g| g.global_datastore_id.as_str())
    }
}

/// Capitalize the first character and lowercase the rest
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
