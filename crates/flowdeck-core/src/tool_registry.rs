use flowdeck_types::{ToolCategory, ToolSpec, ToolTier};

/// Canonical catalogue of agent-callable operations (spec §4.8). Entries
/// are genuinely fixed at compile time — adding a tool means adding a row
/// here, not registering one at runtime — so this is a `const` slice
/// rather than a `HashMap` built in a constructor, the way the teacher's
/// provider metadata catalogue (`agtrace-providers::registry::PROVIDERS`)
/// is a `const` slice too.
const CATALOG: &[ToolSpec] = &[
    ToolSpec {
        id: "read_file",
        category: ToolCategory::FileSystem,
        tier: ToolTier::Tier1,
        cli_alias: "read",
        ide_alias: "readFile",
        available: true,
    },
    ToolSpec {
        id: "write_file",
        category: ToolCategory::FileSystem,
        tier: ToolTier::Tier1,
        cli_alias: "write",
        ide_alias: "writeFile",
        available: true,
    },
    ToolSpec {
        id: "edit_file",
        category: ToolCategory::FileSystem,
        tier: ToolTier::Tier1,
        cli_alias: "edit",
        ide_alias: "editFile",
        available: true,
    },
    ToolSpec {
        id: "list_directory",
        category: ToolCategory::FileSystem,
        tier: ToolTier::Tier1,
        cli_alias: "ls",
        ide_alias: "listDir",
        available: true,
    },
    ToolSpec {
        id: "run_shell",
        category: ToolCategory::Shell,
        tier: ToolTier::Tier1,
        cli_alias: "sh",
        ide_alias: "runShell",
        available: true,
    },
    ToolSpec {
        id: "search_text",
        category: ToolCategory::Search,
        tier: ToolTier::Tier1,
        cli_alias: "grep",
        ide_alias: "searchText",
        available: true,
    },
    ToolSpec {
        id: "git_status",
        category: ToolCategory::Git,
        tier: ToolTier::Tier1,
        cli_alias: "git-status",
        ide_alias: "gitStatus",
        available: true,
    },
    ToolSpec {
        id: "git_diff",
        category: ToolCategory::Git,
        tier: ToolTier::Tier1,
        cli_alias: "git-diff",
        ide_alias: "gitDiff",
        available: true,
    },
    ToolSpec {
        id: "git_commit",
        category: ToolCategory::Git,
        tier: ToolTier::Tier2,
        cli_alias: "git-commit",
        ide_alias: "gitCommit",
        available: true,
    },
    ToolSpec {
        id: "web_fetch",
        category: ToolCategory::Network,
        tier: ToolTier::Tier2,
        cli_alias: "fetch",
        ide_alias: "webFetch",
        available: true,
    },
    ToolSpec {
        id: "inspect_image",
        category: ToolCategory::Vision,
        tier: ToolTier::Tier2,
        cli_alias: "vision",
        ide_alias: "inspectImage",
        available: true,
    },
];

/// Legacy aliases front-ends may still emit, mapped to the current tool
/// id (spec §4.8: "Aliases exist only to accept legacy tool names from
/// front-ends").
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("fs_read", "read_file"),
    ("fs_write", "write_file"),
    ("fs_edit", "edit_file"),
    ("shell_exec", "run_shell"),
    ("grep_search", "search_text"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownToolId(String),
    UnknownAlias(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownToolId(id) => write!(f, "unknown tool id: {id}"),
            Self::UnknownAlias(alias) => write!(f, "unknown tool alias: {alias}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Read-only view over the tool catalogue (spec §4.8). Effectively
/// immutable after process start (spec §5) — there is no `register`
/// method, only lookups.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolRegistry;

impl ToolRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn all(&self) -> &'static [ToolSpec] {
        CATALOG
    }

    pub fn find(&self, id: &str) -> Option<&'static ToolSpec> {
        CATALOG.iter().find(|t| t.id == id)
    }

    /// Validate a tool id as emitted by the LM during step execution
    /// (spec §4.1 point 5). Resolves a legacy alias first if the raw id
    /// doesn't match a catalogue entry directly.
    pub fn validate(&self, id: &str) -> Result<&'static ToolSpec, RegistryError> {
        if let Some(spec) = self.find(id) {
            return Ok(spec);
        }
        let resolved = self.resolve_alias(id)?;
        self.find(resolved)
            .ok_or_else(|| RegistryError::UnknownToolId(resolved.to_string()))
    }

    /// Resolve a CLI or IDE legacy alias back to a canonical tool id.
    /// Unknown aliases fail validation (spec §4.8).
    pub fn resolve_alias(&self, alias: &str) -> Result<&'static str, RegistryError> {
        LEGACY_ALIASES
            .iter()
            .find(|(a, _)| *a == alias)
            .map(|(_, id)| *id)
            .ok_or_else(|| RegistryError::UnknownAlias(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_a_canonical_tool_id() {
        let registry = ToolRegistry::new();
        assert!(registry.validate("read_file").is_ok());
    }

    #[test]
    fn resolves_a_legacy_alias() {
        let registry = ToolRegistry::new();
        let spec = registry.validate("fs_read").unwrap();
        assert_eq!(spec.id, "read_file");
    }

    #[test]
    fn rejects_an_unknown_tool_id() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.validate("do_anything"),
            Err(RegistryError::UnknownToolId("do_anything".to_string()))
        );
    }

    #[test]
    fn catalog_has_no_duplicate_ids() {
        let registry = ToolRegistry::new();
        let mut ids: Vec<_> = registry.all().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), registry.all().len());
    }
}
