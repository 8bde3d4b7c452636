use flowdeck_providers::{OllamaClient, OllamaConfig};

#[test]
fn default_config_points_at_local_daemon() {
    let config = OllamaConfig::default();
    assert_eq!(config.base_url, OllamaConfig::DEFAULT_URL);
    assert_eq!(config.timeout_seconds, OllamaConfig::DEFAULT_TIMEOUT_SECONDS);
    assert!(config.bearer_token.is_none());
}

#[test]
fn from_env_reads_ollama_url_override() {
    std::env::set_var("OLLAMA_URL", "http://example.internal:9999");
    std::env::remove_var("OLLAMA_BEARER_TOKEN");
    let config = OllamaConfig::from_env();
    assert_eq!(config.base_url, "http://example.internal:9999");
    assert!(config.bearer_token.is_none());
    std::env::remove_var("OLLAMA_URL");
}

#[test]
fn from_env_reads_bearer_token_when_present() {
    std::env::remove_var("OLLAMA_URL");
    std::env::set_var("OLLAMA_BEARER_TOKEN", "secret-token");
    let config = OllamaConfig::from_env();
    assert_eq!(config.bearer_token.as_deref(), Some("secret-token"));
    std::env::remove_var("OLLAMA_BEARER_TOKEN");
}

#[test]
fn client_construction_succeeds_with_default_config() {
    let client = OllamaClient::new(OllamaConfig::default());
    assert!(client.is_ok());
}
