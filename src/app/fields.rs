//! Selectable output columns and how each one renders a record.

use std::fmt;
use std::str::FromStr;

use crate::app::cache_explorer::state::{
    capitalize, Attribute, BackupSettings, CacheClusterRecord, SlowLogSettings,
};
use crate::app::error::EcInfoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    Region,
    Type,
    Name,
    Role,
    NodeType,
    EngineVersion,
    ClusterMode,
    Shards,
    Nodes,
    MultiAz,
    AutoFailover,
    EncryptionTransit,
    EncryptionRest,
    SlowLogs,
    EngineLogs,
    MaintenanceWindow,
    AutoUpgrade,
    Backup,
}

impl InfoField {
    pub const ALL: [InfoField; 18] = [
        InfoField::Region,
        InfoField::Type,
        InfoField::Name,
        InfoField::Role,
        InfoField::NodeType,
        InfoField::EngineVersion,
        InfoField::ClusterMode,
        InfoField::Shards,
        InfoField::Nodes,
        InfoField::MultiAz,
        InfoField::AutoFailover,
        InfoField::EncryptionTransit,
        InfoField::EncryptionRest,
        InfoField::SlowLogs,
        InfoField::EngineLogs,
        InfoField::MaintenanceWindow,
        InfoField::AutoUpgrade,
        InfoField::Backup,
    ];

    /// Name accepted on the command line
    pub fn cli_name(&self) -> &'static str {
        match self {
            InfoField::Region => "region",
            InfoField::Type => "type",
            InfoField::Name => "name",
            InfoField::Role => "role",
            InfoField::NodeType => "node-type",
            InfoField::EngineVersion => "engine-version",
            InfoField::ClusterMode => "cluster-mode",
            InfoField::Shards => "shards",
            InfoField::Nodes => "nodes",
            InfoField::MultiAz => "multi-az",
            InfoField::AutoFailover => "auto-failover",
            InfoField::EncryptionTransit => "encryption-transit",
            InfoField::EncryptionRest => "encryption-rest",
            InfoField::SlowLogs => "slow-logs",
            InfoField::EngineLogs => "engine-logs",
            InfoField::MaintenanceWindow => "maintenance-window",
            InfoField::AutoUpgrade => "auto-upgrade",
            InfoField::Backup => "backup",
        }
    }

    /// Column header: every word title-cased (`multi-az` -> `Multi Az`)
    pub fn header(&self) -> String {
        self.cli_name()
            .split('-')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, InfoField::Shards | InfoField::Nodes)
    }

    pub fn render(&self, record: &CacheClusterRecord) -> String {
        match self {
            InfoField::Region => record.region.clone(),
            InfoField::Type => record.engine.clone(),
            InfoField::Name => format_cluster_name(record.global_datastore_id(), &record.cluster_id),
            InfoField::Role => record.display_role().to_string(),
            InfoField::NodeType => record.node_type.clone(),
            InfoField::EngineVersion => record.engine_version.clone(),
            InfoField::ClusterMode => format_enabled_disabled(&record.cluster_mode),
            InfoField::Shards => record.shards.to_string(),
            InfoField::Nodes => record.nodes.to_string(),
            InfoField::MultiAz => format_enabled_disabled(&record.multi_az),
            InfoField::AutoFailover => format_enabled_disabled(&record.auto_failover),
            InfoField::EncryptionTransit => format_enabled_disabled(&record.encryption_transit),
            InfoField::EncryptionRest => format_enabled_disabled(&record.encryption_rest),
            InfoField::SlowLogs => format_slow_logs(&record.slow_logs),
            InfoField::EngineLogs => format_enabled_disabled(&record.engine_logs),
            InfoField::MaintenanceWindow => {
                format_maintenance_window(record.maintenance_window.as_deref())
            }
            InfoField::AutoUpgrade => format_enabled_disabled(&record.auto_upgrade),
            InfoField::Backup => format_backup(&record.backup),
        }
    }
}

impl FromStr for InfoField {
    type Err = EcInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        InfoField::ALL
            .into_iter()
            .find(|field| field.cli_name() == name)
            .ok_or_else(|| EcInfoError::InvalidField {
                invalid: name,
                valid: valid_field_names(),
            })
    }
}

impl fmt::Display for InfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

fn valid_field_names() -> String {
    InfoField::ALL
        .iter()
        .map(InfoField::cli_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse `-i`: a comma separated field list, or `all`. Every invalid name is reported.
pub fn parse_info_types(input: &str) -> Result<Vec<InfoField>, EcInfoError> {
    if input.trim().eq_ignore_ascii_case("all") {
        return Ok(InfoField::ALL.to_vec());
    }

    let mut fields = Vec::new();
    let mut invalid = Vec::new();
    for part in input.split(',') {
        match part.parse::<InfoField>() {
            Ok(field) => fields.push(field),
            Err(_) => invalid.push(part.trim().to_lowercase()),
        }
    }

    if !invalid.is_empty() {
        return Err(EcInfoError::InvalidField {
            invalid: invalid.join(", "),
            valid: valid_field_names(),
        });
    }
    Ok(fields)
}

// ============================================================================
// Value formatting
// ============================================================================

pub fn format_cluster_name(global_datastore_id: Option<&str>, cluster_id: &str) -> String {
    match global_datastore_id {
        Some(global_id) if !global_id.is_empty() => format!("{}/{}", global_id, cluster_id),
        _ => cluster_id.to_string(),
    }
}

pub fn format_enabled_disabled(value: &Attribute<bool>) -> String {
    match value {
        Attribute::Present(true) => "Enabled".to_string(),
        Attribute::Present(false) => "Disabled".to_string(),
        Attribute::NotApplicable => "N/A".to_string(),
        Attribute::Unavailable => "Unavailable".to_string(),
    }
}

pub fn format_slow_logs(value: &Attribute<SlowLogSettings>) -> String {
    match value {
        Attribute::Present(SlowLogSettings::Delivered {
            slower_than_us: Some(slower_than),
            max_len: Some(max_len),
        }) if *slower_than > 0 => format!("Enabled/{}/{}", slower_than, max_len),
        Attribute::Present(_) => "Disabled".to_string(),
        Attribute::NotApplicable => "N/A".to_string(),
        Attribute::Unavailable => "Unavailable".to_string(),
    }
}

pub fn format_backup(value: &Attribute<BackupSettings>) -> String {
    let settings = match value {
        Attribute::Present(settings) => settings,
        Attribute::NotApplicable => return "N/A".to_string(),
        Attribute::Unavailable => return "Unavailable".to_string(),
    };

    match (settings.retention_days, settings.window.as_deref()) {
        (None, _) => "N/A".to_string(),
        (Some(days), Some(window)) if days > 0 => format!("{} UTC/{} days", window, days),
        (Some(days), None) if days > 0 => format!("Enabled/{} days (no window)", days),
        _ => "Disabled".to_string(),
    }
}

pub fn format_maintenance_window(window: Option<&str>) -> String {
    match window {
        Some(window) if !window.is_empty() => format!("{} UTC", window),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_and_subsets() {
        assert_eq!(parse_info_types("all").unwrap().len(), 18);
        assert_eq!(parse_info_types("ALL").unwrap()[0], InfoField::Region);

        let fields = parse_info_types("region, Node-Type,shards").unwrap();
        assert_eq!(
            fields,
            vec![InfoField::Region, InfoField::NodeType, InfoField::Shards]
        );
    }

    #[test]
    fn test_invalid_fields_are_all_reported() {
        match parse_info_types("region,colour,size") {
            Err(EcInfoError::InvalidField { invalid, valid }) => {
                assert_eq!(invalid, "colour, size");
                assert!(valid.starts_with("region, type, name"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_headers_are_title_cased() {
        assert_eq!(InfoField::NodeType.header(), "Node Type");
        assert_eq!(InfoField::MultiAz.header(), "Multi Az");
        assert_eq!(InfoField::Region.header(), "Region");
    }

    #[test]
    fn test_slow_logs_rendering() {
        let delivered = |slower, max| {
            Attribute::Present(SlowLogSettings::Delivered {
                slower_than_us: slower,
                max_len: max,
            })
        };
        assert_eq!(format_slow_logs(&delivered(Some(10000), Some(128))), "Enabled/10000/128");
        assert_eq!(format_slow_logs(&delivered(Some(0), Some(128))), "Disabled");
        assert_eq!(format_slow_logs(&delivered(None, Some(128))), "Disabled");
        assert_eq!(format_slow_logs(&Attribute::Present(SlowLogSettings::Disabled)), "Disabled");
        assert_eq!(format_slow_logs(&Attribute::Unavailable), "Unavailable");
    }

    #[test]
    fn test_backup_rendering() {
        let backup = |window: Option<&str>, days| {
            Attribute::Present(BackupSettings {
                window: window.map(str::to_string),
                retention_days: days,
            })
        };
        assert_eq!(format_backup(&backup(Some("03:00-04:00"), Some(7))), "03:00-04:00 UTC/7 days");
        assert_eq!(format_backup(&backup(None, Some(1))), "Enabled/1 days (no window)");
        assert_eq!(format_backup(&backup(Some("03:00-04:00"), Some(0))), "Disabled");
        assert_eq!(format_backup(&backup(None, None)), "N/A");
        assert_eq!(format_backup(&Attribute::NotApplicable), "N/A");
    }

    #[test]
    fn test_name_and_window_rendering() {
        assert_eq!(format_cluster_name(Some("ldgnf-g1"), "orders"), "ldgnf-g1/orders");
        assert_eq!(format_cluster_name(None, "orders"), "orders");
        assert_eq!(format_maintenance_window(Some("sun:05:00-sun:06:00")), "sun:05:00-sun:06:00 UTC");
        assert_eq!(format_maintenance_window(None), "");
        assert_eq!(format_enabled_disabled(&Attribute::NotApplicable), "N/A");
    }
}
