//! CSV and Markdown renderings of a record list.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::app::cache_explorer::state::CacheClusterRecord;
use crate::app::error::EcInfoError;
use crate::app::fields::InfoField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Markdown => "md",
        }
    }

    pub fn format(&self, records: &[CacheClusterRecord], fields: &[InfoField]) -> Result<String> {
        match self {
            OutputFormat::Csv => format_csv(records, fields),
            OutputFormat::Markdown => Ok(format_markdown(records, fields)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EcInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(EcInfoError::InvalidOutputFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Markdown => f.write_str("markdown"),
        }
    }
}

/// Header row plus one row per record; empty input gives an empty string
pub fn format_csv(records: &[CacheClusterRecord], fields: &[InfoField]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(fields.iter().map(InfoField::header))
        .context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(fields.iter().map(|field| field.render(record)))
            .with_context(|| format!("Failed to write CSV row for {}", record.cluster_id))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Pipe table; `shards` and `nodes` are right-aligned
pub fn format_markdown(records: &[CacheClusterRecord], fields: &[InfoField]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(records.len() + 2);

    let header: Vec<String> = fields.iter().map(InfoField::header).collect();
    lines.push(format!("| {} |", header.join(" | ")));

    let separators: Vec<&str> = fields
        .iter()
        .map(|field| if field.is_numeric() { "---:" } else { "---" })
        .collect();
    lines.push(format!("| {} |", separators.join(" | ")));

    for record in records {
        let row: Vec<String> = fields
            .iter()
            .map(|field| field.render(record).replace('|', "\\|"))
            .collect();
        lines.push(format!("| {} |", row.join(" | ")));
    }

    lines.join("\n")
}

// ============================================================================
// Output files
// ============================================================================

/// Final output path.
///
/// A path ending in `/` or naming an existing directory gets a generated file name
/// `elasticache-<region>-<YYYYmmdd-HHMMSS>.<ext>`.
pub fn resolve_output_path(
    output: &str,
    region: &str,
    format: OutputFormat,
    now: DateTime<Local>,
) -> PathBuf {
    let path = PathBuf::from(output);
    if output.ends_with('/') || output.ends_with(std::path::MAIN_SEPARATOR) || path.is_dir() {
        let file_name = format!(
            "elasticache-{}-{}.{}",
            region,
            now.format("%Y%m%d-%H%M%S"),
            format.extension()
        );
        return path.join(file_name);
    }
    path
}

/// Write `content`, creating missing parent directories
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache_explorer::state::{Attribute, ResourceKind, SlowLogSettings};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn record(region: &str, id: &str) -> CacheClusterRecord {
        CacheClusterRecord {
            region: region.to_string(),
            kind: ResourceKind::CacheCluster,
            engine: "Memcached".to_string(),
            cluster_id: id.to_string(),
            global: None,
            node_type: "cache.t3.micro".to_string(),
            engine_version: "1.6.17".to_string(),
            cluster_mode: Attribute::NotApplicable,
            shards: 0,
            nodes: 2,
            multi_az: Attribute::Present(false),
            auto_failover: Attribute::NotApplicable,
            encryption_transit: Attribute::NotApplicable,
            encryption_rest: Attribute::NotApplicable,
            slow_logs: Attribute::Present(SlowLogSettings::Disabled),
            engine_logs: Attribute::NotApplicable,
            maintenance_window: None,
            auto_upgrade: Attribute::Present(true),
            backup: Attribute::NotApplicable,
        }
    }

    #[test]
    fn test_markdown_table() {
        let fields = [InfoField::Region, InfoField::Name, InfoField::Nodes, InfoField::MultiAz];
        let output = format_markdown(&[record("us-east-1", "sessions")], &fields);

        assert_eq!(
            output,
            "| Region | Name | Nodes | Multi Az |\n\
             | --- | --- | ---: | --- |\n\
             | us-east-1 | sessions | 2 | Disabled |"
        );
    }

    #[test]
    fn test_csv_output() {
        let fields = [InfoField::Type, InfoField::Name, InfoField::Backup];
        let output = format_csv(
            &[record("us-east-1", "a"), record("us-west-2", "b,c")],
            &fields,
        )
        .unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Type,Name,Backup");
        assert_eq!(lines[1], "Memcached,a,N/A");
        assert_eq!(lines[2], "Memcached,\"b,c\",N/A");
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert_eq!(format_markdown(&[], &InfoField::ALL), "");
        assert_eq!(format_csv(&[], &InfoField::ALL).unwrap(), "");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("Markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap().extension(), "csv");
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(EcInfoError::InvalidOutputFormat(_))
        ));
    }

    #[test]
    fn test_output_path_generation() {
        let now = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();

        let path = resolve_output_path("./output/", "us-east-1", OutputFormat::Markdown, now);
        assert_eq!(path, PathBuf::from("./output/elasticache-us-east-1-20250309-140507.md"));

        let dir = tempfile::tempdir().unwrap();
        let path = resolve_output_path(
            dir.path().to_str().unwrap(),
            "eu-west-1",
            OutputFormat::Csv,
            now,
        );
        assert_eq!(path, dir.path().join("elasticache-eu-west-1-20250309-140507.csv"));

        let path = resolve_output_path("report.csv", "eu-west-1", OutputFormat::Csv, now);
        assert_eq!(path, PathBuf::from("report.csv"));
    }

    #[test]
    fn test_write_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.md");

        write_output(&path, "| Region |").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "| Region |");
    }
}
