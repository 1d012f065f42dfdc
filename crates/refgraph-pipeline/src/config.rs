//! Configuration loading for refgraph.
//! Reads refgraph.toml from the current directory or the path in the
//! REFGRAPH_CONFIG env var. API keys are never stored in the file; each
//! `api_key_secret` names the environment variable holding the key.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub oa: OaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_mode")]
    pub mode: String,
    #[serde(default = "default_local_backend_url")]
    pub local_backend_url: String,
    #[serde(default = "default_local_model")]
    pub local_model: String,
    pub openai: Option<LlmBackendConfig>,
    pub anthropic: Option<LlmBackendConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: default_llm_mode(),
            local_backend_url: default_local_backend_url(),
            local_model: default_local_model(),
            openai: None,
            anthropic: None,
        }
    }
}

fn default_llm_mode() -> String { "local_only".to_string() }
fn default_local_backend_url() -> String { "http://localhost:11434".to_string() }
fn default_local_model() -> String { "llama3:8b".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBackendConfig {
    pub api_key_secret: Option<String>,
    pub model: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Contact address sent to polite-pool APIs (OpenAlex, Crossref, Unpaywall).
    pub mailto: Option<String>,
    pub openalex: Option<SourceConfig>,
    pub crossref: Option<SourceConfig>,
    pub semanticscholar: Option<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    pub api_key_secret: Option<String>,
    #[serde(default = "default_concurrency")]
    pub max_concurrent_requests: u32,
}

fn default_concurrency() -> u32 { 3 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_max_pool")]
    pub max_pool: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_pool: default_max_pool(),
        }
    }
}

fn default_target_count() -> usize { 50 }
fn default_max_pool() -> usize { 200 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OaConfig {
    pub core_api_key_secret: Option<String>,
}

impl Config {
    /// Load configuration from refgraph.toml.
    /// Checks REFGRAPH_CONFIG env var first, then the current directory.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("REFGRAPH_CONFIG")
            .unwrap_or_else(|_| "refgraph.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {path}\n\
                 Copy refgraph.example.toml to refgraph.toml and edit it."
            );
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve an `api_key_secret` name to its value from the environment.
    pub fn resolve_secret(name: &Option<String>) -> Option<String> {
        name.as_ref().and_then(|n| std::env::var(n).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.mode, "local_only");
        assert_eq!(config.pipeline.target_count, 50);
        assert_eq!(config.pipeline.max_pool, 200);
        assert!(config.sources.crossref.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            target_count = 25

            [sources]
            mailto = "team@example.org"

            [sources.openalex]
            max_concurrent_requests = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.target_count, 25);
        assert_eq!(config.pipeline.max_pool, 200);
        assert_eq!(config.sources.mailto.as_deref(), Some("team@example.org"));
        assert_eq!(
            config.sources.openalex.as_ref().unwrap().max_concurrent_requests,
            10
        );
    }
}
