use super::io::get_json;
use super::models::TagsWireResponse;
use super::OllamaClient;
use crate::Result;

/// Check whether `model` is present on the backend, by listing installed
/// tags (spec §4.3: "probe the LM backend for existence of every
/// configured model").
pub(super) async fn model_exists(client: &OllamaClient, model: &str) -> Result<bool> {
    let tags: TagsWireResponse = get_json(client, "/api/tags").await?;
    Ok(tags.models.iter().any(|entry| tag_matches(&entry.name, model)))
}

/// Ollama tags carry an implicit `:latest` suffix that callers usually
/// omit, so match with and without it.
fn tag_matches(tag: &str, model: &str) -> bool {
    if tag == model {
        return true;
    }
    match tag.split_once(':') {
        Some((name, _tag)) => name == model,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tag_matches() {
        assert!(tag_matches("qwen2.5-coder:7b", "qwen2.5-coder:7b"));
    }

    #[test]
    fn bare_name_matches_tagged_entry() {
        assert!(tag_matches("llama3.1:latest", "llama3.1"));
    }

    #[test]
    fn unrelated_name_does_not_match() {
        assert!(!tag_matches("llama3.1:latest", "qwen2.5-coder"));
    }
}
