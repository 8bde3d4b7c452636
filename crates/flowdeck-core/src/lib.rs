//! Tool Registry and Intent Router (spec §2, §4.8) — the two foundational,
//! near-static lookups the rest of the orchestration core is built on.
//! Neither depends on tokio, serde, or anything beyond `flowdeck-types`.

mod intent_router;
mod tool_registry;

pub use intent_router::classify_intent;
pub use tool_registry::{RegistryError, ToolRegistry};
