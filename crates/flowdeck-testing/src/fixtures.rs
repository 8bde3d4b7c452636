//! Sample sessions and configs for tests that need realistic data
//! rather than wiring up a live run.

use flowdeck_runtime::Config;
use flowdeck_types::{Intent, PlatformOrigin, Session};

/// A freshly created, otherwise untouched session -- `(0, 0)` START
/// position, no steps, no consultations.
pub fn fresh_session(task: impl Into<String>) -> Session {
    Session::new(task, PlatformOrigin::Cli, Intent::Coding)
}

/// The default config a brand-new workspace would detect on first run,
/// without touching `sysinfo`'s real tier detection so tests stay
/// deterministic across machines.
pub fn sample_config() -> Config {
    Config::default()
}

/// Writes `config` as YAML under `root/config.yaml`, the layout
/// `Config::load_from` expects.
pub fn write_config(root: &std::path::Path, config: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(root)?;
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(root.join("config.yaml"), yaml)?;
    Ok(())
}
