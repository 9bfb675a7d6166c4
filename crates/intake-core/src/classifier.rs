//! File name classification.
//!
//! A name is lowercased and checked against [`RULES`] in order; the first rule
//! with a keyword contained in the name decides the category. Rule order is
//! part of the contract: a name matching several keyword sets resolves to the
//! earliest rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category tag attached to every listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// Hardware and software asset lists.
    AssetInventory,
    /// Gap analysis worksheets.
    GapWorking,
    /// Capacity and growth plans.
    CapacityPlan,
    /// Network, traffic and system logs.
    NetworkLogs,
    /// Compliance and audit reports.
    ComplianceReport,
    /// Firewall rule exports.
    FirewallRules,
    /// Backup schedules and policies.
    BackupSchedule,
    /// Strategy and roadmap documents.
    StrategyInput,
    /// Anything no rule matched.
    General,
}

impl FileCategory {
    /// The wire tag, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::AssetInventory => "asset_inventory",
            FileCategory::GapWorking => "gap_working",
            FileCategory::CapacityPlan => "capacity_plan",
            FileCategory::NetworkLogs => "network_logs",
            FileCategory::ComplianceReport => "compliance_report",
            FileCategory::FirewallRules => "firewall_rules",
            FileCategory::BackupSchedule => "backup_schedule",
            FileCategory::StrategyInput => "strategy_input",
            FileCategory::General => "general",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `(keywords, category)` rules. Keywords are lowercase.
pub const RULES: &[(&[&str], FileCategory)] = &[
    (&["asset", "inventory"], FileCategory::AssetInventory),
    (&["gap", "working"], FileCategory::GapWorking),
    (&["capacity", "scale"], FileCategory::CapacityPlan),
    (&["log", "latency"], FileCategory::NetworkLogs),
    (&["compliance"], FileCategory::ComplianceReport),
    (&["firewall"], FileCategory::FirewallRules),
    (&["backup"], FileCategory::BackupSchedule),
    (&["strategy", "roadmap"], FileCategory::StrategyInput),
];

/// Classifies a file name. Falls back to [`FileCategory::General`].
pub fn classify(file_name: &str) -> FileCategory {
    let lower = file_name.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(FileCategory::General, |(_, category)| *category)
}
