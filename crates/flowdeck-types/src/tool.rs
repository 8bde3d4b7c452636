use serde::{Deserialize, Serialize};

/// Two capability bands a tool can be published at (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTier {
    /// Always available.
    Tier1,
    /// Requires an advanced tier / explicit opt-in.
    Tier2,
}

/// Coarse grouping used for display and for the Intent Router's keyword
/// scoring (spec §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    FileSystem,
    Shell,
    Search,
    Git,
    Network,
    Vision,
}

/// One entry in the Tool Registry's catalogue (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: &'static str,
    pub category: ToolCategory,
    pub tier: ToolTier,
    pub cli_alias: &'static str,
    pub ide_alias: &'static str,
    pub available: bool,
}
