//! Wiring of adapters into application services

use std::sync::Arc;

use anyhow::Context;
use application::{AnswerService, FetchOrchestrator, MessageStorePort, SearchAggregator};
use infrastructure::{
    AppConfig, InMemoryMessageStore, MokaCache, OllamaGenerationAdapter, PageFetchAdapter,
    RetryingGenerationAdapter, WebSearchAdapter,
};
use tracing::{debug, info};

/// Everything the commands need
pub struct Services {
    pub search: Option<Arc<SearchAggregator>>,
    pub answers: AnswerService,
    pub store: Arc<InMemoryMessageStore>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("search", &self.search.is_some())
            .field("answers", &self.answers)
            .finish_non_exhaustive()
    }
}

impl Services {
    pub fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let search = if config.search.is_enabled() {
            Some(Arc::new(build_search(config)?))
        } else {
            info!("No Brave Search API key configured, web search disabled");
            None
        };

        let ollama = OllamaGenerationAdapter::new(config.inference.clone())
            .context("failed to create Ollama client")?;
        let generation = RetryingGenerationAdapter::new(ollama, config.retry.clone());
        let store = Arc::new(InMemoryMessageStore::new());

        let mut answers = AnswerService::new(
            Arc::new(generation),
            Arc::clone(&store) as Arc<dyn MessageStorePort>,
        );
        if let Some(search) = &search {
            answers = answers.with_search(Arc::clone(search));
        }
        debug!(search_enabled = search.is_some(), "Services ready");

        Ok(Self {
            search,
            answers,
            store,
        })
    }
}

fn build_search(config: &AppConfig) -> anyhow::Result<SearchAggregator> {
    let fetcher =
        PageFetchAdapter::new(&config.fetch.page).context("failed to create page fetcher")?;
    let orchestrator = FetchOrchestrator::new(
        Arc::new(fetcher),
        Arc::new(MokaCache::with_config(config.cache.page_cache())),
        config.fetch.settings(config.cache.page_ttl()),
    );
    let search =
        WebSearchAdapter::new(&config.search.brave).context("failed to create search client")?;

    Ok(SearchAggregator::new(
        Arc::new(search),
        Arc::new(orchestrator),
        Arc::new(MokaCache::with_config(config.cache.query_cache())),
        config.search.settings(config.cache.query_ttl()),
    ))
}
