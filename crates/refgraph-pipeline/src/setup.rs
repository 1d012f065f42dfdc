//! Assembly of pipeline collaborators from configuration.

use std::sync::Arc;

use refgraph_llm::backend::{AnthropicBackend, OllamaBackend, OpenAiCompatibleBackend};
use refgraph_llm::LlmBackend;
use refgraph_sources::oa::OaResolver;
use refgraph_sources::sources::crossref::CrossrefSource;
use refgraph_sources::sources::openalex::OpenAlexSource;
use refgraph_sources::sources::semanticscholar::SemanticScholarSource;
use tracing::info;

use crate::config::Config;
use crate::pipeline::SmartReferencePipeline;
use crate::store::ReferenceStore;

/// Select and build the generative backend from `[llm]` config.
pub fn build_llm(config: &Config) -> anyhow::Result<Arc<dyn LlmBackend>> {
    let llm = &config.llm;
    let backend: Arc<dyn LlmBackend> = match llm.mode.as_str() {
        "anthropic" => {
            let cfg = llm
                .anthropic
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("llm.mode = \"anthropic\" but [llm.anthropic] is missing"))?;
            let key = Config::resolve_secret(&cfg.api_key_secret)
                .ok_or_else(|| anyhow::anyhow!("Anthropic API key secret not set in environment"))?;
            Arc::new(AnthropicBackend::new(key, cfg.model.clone()))
        }
        "openai" => {
            let cfg = llm
                .openai
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("llm.mode = \"openai\" but [llm.openai] is missing"))?;
            let base_url = if cfg.base_url.is_empty() {
                "https://api.openai.com".to_string()
            } else {
                cfg.base_url.clone()
            };
            let key = Config::resolve_secret(&cfg.api_key_secret);
            Arc::new(OpenAiCompatibleBackend::new(base_url, cfg.model.clone(), key))
        }
        // "local_only" and anything unrecognized stays local.
        _ => Arc::new(OllamaBackend::new(
            llm.local_backend_url.clone(),
            llm.local_model.clone(),
        )),
    };
    info!(model = backend.model_id(), local = backend.is_local(), "LLM backend selected");
    Ok(backend)
}

/// Crossref as the primary verification source, OpenAlex as the secondary
/// and citation-graph source, wired per `[sources]` config.
pub fn build_pipeline(
    config: &Config,
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn ReferenceStore>,
) -> SmartReferencePipeline {
    let mailto = config.sources.mailto.clone();
    let crossref_limit = config
        .sources
        .crossref
        .as_ref()
        .map(|s| s.max_concurrent_requests as usize)
        .unwrap_or(5);
    let openalex_limit = config
        .sources
        .openalex
        .as_ref()
        .map(|s| s.max_concurrent_requests as usize)
        .unwrap_or(10);

    SmartReferencePipeline::new(
        Arc::new(CrossrefSource::with_concurrency(mailto.clone(), crossref_limit)),
        Arc::new(OpenAlexSource::with_concurrency(mailto, openalex_limit)),
        llm,
        store,
    )
    .with_max_pool(config.pipeline.max_pool)
}

/// Semantic Scholar client per `[sources.semanticscholar]` config.
pub fn build_semantic_scholar(config: &Config) -> SemanticScholarSource {
    let cfg = config.sources.semanticscholar.clone().unwrap_or_default();
    let api_key = Config::resolve_secret(&cfg.api_key_secret);
    let limit = if cfg.max_concurrent_requests == 0 {
        3
    } else {
        cfg.max_concurrent_requests as usize
    };
    SemanticScholarSource::with_concurrency(api_key, limit)
}

/// Full-text resolver with the default strategy chain.
pub fn build_oa_resolver(config: &Config) -> OaResolver {
    OaResolver::new(
        config.sources.mailto.clone(),
        Config::resolve_secret(&config.oa.core_api_key_secret),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_selects_local_backend() {
        let config = Config::default();
        let backend = build_llm(&config).unwrap();
        assert!(backend.is_local());
        assert_eq!(backend.model_id(), "llama3:8b");
    }

    #[test]
    fn test_anthropic_mode_without_section_is_an_error() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            mode = "anthropic"
            "#,
        )
        .unwrap();
        assert!(build_llm(&config).is_err());
    }
}
