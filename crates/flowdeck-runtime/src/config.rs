//! Typed configuration tree (spec §6, §2 component "Config"). Load/save
//! shape is lifted line for line from `agtrace-runtime::config`
//! (`resolve_workspace_path` priority chain, `load`/`load_from`/`save`/
//! `save_to`/`default_path`); the serialization format is YAML, not the
//! teacher's TOML, per spec §6, and a legacy-JSON migration step is new
//! (spec §6, §9 "legacy session compatibility" generalised to config).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use flowdeck_types::{ModelRole, Tier};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Resolve the workspace data directory: explicit path, then
/// `FLOWDECK_PATH`, then the XDG data directory, then `~/.flowdeck`.
/// Structurally identical to the teacher's `resolve_workspace_path`.
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("FLOWDECK_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("flowdeck"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".flowdeck"));
    }

    Err(Error::Config(
        "could not determine workspace path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// RAM thresholds driving tier auto-detection (spec §4.3). `max_gb =
/// None` means unbounded above, matching `Tier::default_thresholds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThreshold {
    pub min_gb: u64,
    pub max_gb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDetectionConfig {
    pub auto: bool,
    #[serde(default)]
    pub thresholds: HashMap<String, TierThreshold>,
}

impl TierDetectionConfig {
    fn default_thresholds() -> HashMap<String, TierThreshold> {
        Tier::ALL
            .iter()
            .map(|tier| {
                let (min_gb, max_gb) = tier.default_thresholds();
                (tier.as_str().to_string(), TierThreshold { min_gb, max_gb })
            })
            .collect()
    }
}

impl Default for TierDetectionConfig {
    fn default() -> Self {
        Self {
            auto: true,
            thresholds: Self::default_thresholds(),
        }
    }
}

/// Per-role model name, with an optional override per tier (spec §4.3,
/// §6: "models.{role}.{default, tier_mapping}").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleModelConfig {
    pub default: String,
    #[serde(default)]
    pub tier_mapping: HashMap<String, String>,
}

impl RoleModelConfig {
    fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            tier_mapping: HashMap::new(),
        }
    }

    /// The model for `tier`, using the tier mapping if present (spec
    /// §4.3: "Selection uses the override if present").
    pub fn model_for(&self, tier: Tier) -> &str {
        self.tier_mapping.get(tier.as_str()).unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub tier_detection: TierDetectionConfig,
    pub orchestrator: RoleModelConfig,
    pub coder: RoleModelConfig,
    pub researcher: RoleModelConfig,
    pub vision: RoleModelConfig,
}

impl ModelsConfig {
    pub fn role(&self, role: ModelRole) -> &RoleModelConfig {
        match role {
            ModelRole::Orchestrator => &self.orchestrator,
            ModelRole::Coder => &self.coder,
            ModelRole::Researcher => &self.researcher,
            ModelRole::Vision => &self.vision,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            tier_detection: TierDetectionConfig::default(),
            orchestrator: RoleModelConfig::new("llama3.1:8b"),
            coder: RoleModelConfig::new("qwen2.5-coder:7b"),
            researcher: RoleModelConfig::new("llama3.1:8b"),
            vision: RoleModelConfig::new("llava:7b"),
        }
    }
}

/// Per-process consultation override (spec §6: "consultation{process->
/// {type, timeout}}").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationOverride {
    #[serde(rename = "type")]
    pub kind: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub id: u8,
    pub processes: Vec<u8>,
    pub model: String,
    #[serde(default)]
    pub consultation: HashMap<u8, ConsultationOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    pub default_mode: String,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_mode: "autonomous".to_string(),
            schedules: flowdeck_types::Schedule::ALL
                .iter()
                .map(|schedule| ScheduleConfig {
                    id: schedule.id(),
                    processes: vec![1, 2, 3],
                    model: schedule.default_role().as_str().to_string(),
                    consultation: HashMap::new(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub task: f64,
    pub files: f64,
    pub project: f64,
    pub history: f64,
    pub memory: f64,
    pub errors: f64,
    pub reserve: f64,
}

impl Default for BudgetAllocation {
    fn default() -> Self {
        Self {
            task: 0.1,
            files: 0.35,
            project: 0.15,
            history: 0.15,
            memory: 0.1,
            errors: 0.05,
            reserve: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub strategy: String,
    #[serde(default)]
    pub preserve: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: "summarize_oldest".to_string(),
            preserve: vec!["task".to_string(), "errors".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub max_tokens: u64,
    pub budget_allocation: BudgetAllocation,
    pub compression: CompressionConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 32_000,
            budget_allocation: BudgetAllocation::default(),
            compression: CompressionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityPreset {
    pub iterations: u32,
    pub verification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    pub fast: QualityPreset,
    pub balanced: QualityPreset,
    pub thorough: QualityPreset,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            fast: QualityPreset { iterations: 1, verification: "smoke".to_string() },
            balanced: QualityPreset { iterations: 2, verification: "standard".to_string() },
            thorough: QualityPreset { iterations: 3, verification: "exhaustive".to_string() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliPlatformConfig {
    pub verbose: bool,
    pub mem_graph: bool,
    pub color_output: bool,
}

impl Default for CliPlatformConfig {
    fn default() -> Self {
        Self { verbose: false, mem_graph: false, color_output: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdePlatformConfig {
    pub theme: String,
    pub font_size: u32,
    pub show_token_usage: bool,
}

impl Default for IdePlatformConfig {
    fn default() -> Self {
        Self { theme: "auto".to_string(), font_size: 13, show_token_usage: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformsConfig {
    pub cli: CliPlatformConfig,
    pub ide: IdePlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSection {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaSection {
    fn default() -> Self {
        Self {
            url: flowdeck_providers::OllamaConfig::DEFAULT_URL.to_string(),
            timeout_seconds: flowdeck_providers::OllamaConfig::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// The root configuration tree (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub models: ModelsConfig,
    pub orchestration: OrchestrationConfig,
    pub context: ContextConfig,
    pub quality: QualityConfig,
    pub platforms: PlatformsConfig,
    pub ollama: OllamaSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            models: ModelsConfig::default(),
            orchestration: OrchestrationConfig::default(),
            context: ContextConfig::default(),
            quality: QualityConfig::default(),
            platforms: PlatformsConfig::default(),
            ollama: OllamaSection::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read `path`; if it is absent but the legacy JSON sibling exists,
    /// migrate it in place (spec §6: "legacy ... config.json auto-
    /// migrated on first read, original backed up, compatibility symlink
    /// created") and return the migrated config. A legacy file whose
    /// shape no longer matches is reported as a config error rather than
    /// silently discarded.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        let legacy_path = legacy_json_path(path);
        if legacy_path.exists() {
            return Self::migrate_legacy(&legacy_path, path);
        }

        Ok(Self::default())
    }

    fn migrate_legacy(legacy_path: &Path, yaml_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(legacy_path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| Error::Config(format!("legacy config.json did not parse: {err}")))?;

        config.save_to(yaml_path)?;

        let backup_path = legacy_path.with_extension("json.bak");
        std::fs::rename(legacy_path, &backup_path)?;

        #[cfg(unix)]
        {
            let _ = std::os::unix::fs::symlink(yaml_path, legacy_path);
        }
        #[cfg(not(unix))]
        {
            std::fs::copy(yaml_path, legacy_path)?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Write via a temp-sibling-then-rename so a reader never observes a
    /// half-written config (same discipline the Session Store uses for
    /// session files, spec §4.9).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        let tmp_path = path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("config.yaml"))
    }

    /// Auto-detect the RAM tier from total system memory (spec §4.3),
    /// honouring `FLOWDECK_FORCE_TIER` so tests never depend on the
    /// host's actual RAM.
    pub fn detect_tier(&self) -> Tier {
        if let Ok(forced) = std::env::var("FLOWDECK_FORCE_TIER") {
            if let Some(tier) = Tier::ALL.iter().find(|t| t.as_str().eq_ignore_ascii_case(&forced)) {
                return *tier;
            }
        }

        if !self.models.tier_detection.auto {
            return Tier::Balanced;
        }

        let total_gb = total_memory_gb();
        for tier in Tier::ALL {
            if let Some(threshold) = self.models.tier_detection.thresholds.get(tier.as_str()) {
                let below_max = threshold.max_gb.map(|max| total_gb < max).unwrap_or(true);
                if total_gb >= threshold.min_gb && below_max {
                    return tier;
                }
            }
        }
        Tier::Balanced
    }

    pub fn model_for(&self, role: ModelRole, tier: Tier) -> &str {
        self.models.role(role).model_for(tier)
    }
}

fn legacy_json_path(yaml_path: &Path) -> PathBuf {
    yaml_path.with_extension("json")
}

fn total_memory_gb() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory() / (1024 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config::default();
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.models.coder.default, config.models.coder.default);
    }

    #[test]
    fn loading_a_missing_path_with_no_legacy_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.version, "1");
    }

    #[test]
    fn legacy_json_is_migrated_on_first_read() {
        let dir = TempDir::new().unwrap();
        let yaml_path = dir.path().join("config.yaml");
        let json_path = dir.path().join("config.json");
        std::fs::write(&json_path, serde_json::to_string(&Config::default()).unwrap()).unwrap();

        let migrated = Config::load_from(&yaml_path).unwrap();
        assert_eq!(migrated.version, "1");
        assert!(yaml_path.exists());
        assert!(dir.path().join("config.json.bak").exists());
    }

    #[test]
    fn force_tier_env_override_wins_over_detection() {
        std::env::set_var("FLOWDECK_FORCE_TIER", "minimal");
        let config = Config::default();
        assert_eq!(config.detect_tier(), Tier::Minimal);
        std::env::remove_var("FLOWDECK_FORCE_TIER");
    }

    #[test]
    fn role_model_uses_tier_override_when_present() {
        let mut config = Config::default();
        config
            .models
            .coder
            .tier_mapping
            .insert("minimal".to_string(), "tiny-coder:1b".to_string());
        assert_eq!(config.model_for(ModelRole::Coder, Tier::Minimal), "tiny-coder:1b");
        assert_eq!(config.model_for(ModelRole::Coder, Tier::Balanced), "qwen2.5-coder:7b");
    }
}
