use serde::{Deserialize, Serialize};

/// Category of LM specialization a step can be dispatched to (spec §4.3,
/// glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Orchestrator,
    Coder,
    Researcher,
    Vision,
}

impl ModelRole {
    pub const ALL: [ModelRole; 4] = [
        ModelRole::Orchestrator,
        ModelRole::Coder,
        ModelRole::Researcher,
        ModelRole::Vision,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Coder => "coder",
            Self::Researcher => "researcher",
            Self::Vision => "vision",
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a user prompt's dominant shape (spec §2, Intent
/// Router).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Coding,
    Research,
    Writing,
    Vision,
    General,
}

impl Intent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Research => "research",
            Self::Writing => "writing",
            Self::Vision => "vision",
            Self::General => "general",
        }
    }

    /// Default role an intent resolves to outside of schedules that
    /// override it outright (spec §4.3: "otherwise role derived from
    /// intent, defaulting to coder").
    pub const fn default_role(self) -> ModelRole {
        match self {
            Self::Coding => ModelRole::Coder,
            Self::Research => ModelRole::Researcher,
            Self::Vision => ModelRole::Vision,
            Self::Writing | Self::General => ModelRole::Coder,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RAM-based capability band driving per-role model selection (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Minimal,
    Compact,
    Balanced,
    Performance,
    Advanced,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Minimal,
        Tier::Compact,
        Tier::Balanced,
        Tier::Performance,
        Tier::Advanced,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Compact => "compact",
            Self::Balanced => "balanced",
            Self::Performance => "performance",
            Self::Advanced => "advanced",
        }
    }

    /// Default `[min, max)` GB thresholds (spec §4.3); `max = None` means
    /// unbounded above.
    pub const fn default_thresholds(self) -> (u64, Option<u64>) {
        match self {
            Self::Minimal => (0, Some(16)),
            Self::Compact => (16, Some(24)),
            Self::Balanced => (24, Some(32)),
            Self::Performance => (32, Some(64)),
            Self::Advanced => (64, None),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
