//! Output formatting for module reports and health checks
//!
//! Every subcommand renders through [`OutputFormatter`] as JSON, YAML or
//! human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::module::ModuleContext;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Everything a module produced for one target
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub target: PathBuf,
    pub results: serde_json::Map<String, Value>,
    pub extracted_files: Vec<PathBuf>,
    pub iocs: Vec<String>,
    pub review_skipped: bool,
}

impl ModuleReport {
    pub fn new(module: impl Into<String>, target: impl Into<PathBuf>, ctx: ModuleContext) -> Self {
        Self {
            module: module.into(),
            target: target.into(),
            results: ctx.results,
            extracted_files: ctx.extracted_files,
            iocs: ctx.iocs,
            review_skipped: ctx.review_skipped,
        }
    }
}

/// Availability of one external dependency
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub available: bool,
    pub detail: String,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &ModuleReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize module report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize module report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_health(&self, health: &BTreeMap<String, HealthStatus>) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(health)
                .context("Failed to serialize health status to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(health).context("Failed to serialize health status to YAML")
            }
            OutputFormat::Human => Ok(self.format_health_human(health)),
        }
    }

    fn format_report_human(&self, report: &ModuleReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("\u{2713} {} ({})\n", report.module, report.target.display()));
        output.push_str(RULE);
        output.push_str("\n\n");

        for (key, value) in &report.results {
            match value {
                Value::Array(items) if items.is_empty() => {
                    output.push_str(&format!("{}: (none)\n", key));
                }
                Value::Array(items) => {
                    output.push_str(&format!("{}:\n", key));
                    for (i, item) in items.iter().enumerate() {
                        let connector = if i == items.len() - 1 { "\u{2514}" } else { "\u{251C}" };
                        output.push_str(&format!("{}\u{2500} {}\n", connector, display_value(item)));
                    }
                }
                Value::Null => output.push_str(&format!("{}: (no value found)\n", key)),
                other => output.push_str(&format!("{}: {}\n", key, display_value(other))),
            }
        }

        if !report.extracted_files.is_empty() {
            output.push_str("\nQueued for analysis:\n");
            for path in &report.extracted_files {
                output.push_str(&format!("  - {}\n", path.display()));
            }
        }

        if !report.iocs.is_empty() {
            output.push_str("\n\u{26A0} IOCs:\n");
            for ioc in &report.iocs {
                output.push_str(&format!("  - {}\n", ioc));
            }
        }

        if report.review_skipped {
            output.push_str("\nReview skipped: nothing suspicious found\n");
        }

        output
    }

    fn format_health_human(&self, health: &BTreeMap<String, HealthStatus>) -> String {
        let mut output = String::from("Dependency Health\n");
        output.push_str(RULE);
        output.push('\n');
        for (name, status) in health {
            let mark = if status.available { "\u{2713}" } else { "\u{2717}" };
            output.push_str(&format!("{} {:<10} {}\n", mark, name, status.detail));
        }
        output
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
