use std::sync::Arc;

use crate::{
    config::EngineConfig,
    db::{CatalogEditor, FilmCatalog, InMemoryStore, UserDirectory},
    services::{RecommendationService, SimilarityEngine},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserDirectory>,
    pub films: Arc<dyn FilmCatalog>,
    pub editor: Arc<dyn CatalogEditor>,
    /// Kept here so rating writes can evict stale scores
    pub similarity: Arc<SimilarityEngine>,
    pub recommendations: Arc<RecommendationService>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates state backed by an empty in-memory store with default tuning
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self::with_store(Arc::new(InMemoryStore::new(config.liked_threshold)), config)
    }

    /// Wires the recommendation engine on top of any store
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: UserDirectory + FilmCatalog + CatalogEditor + 'static,
    {
        let users: Arc<dyn UserDirectory> = store.clone();
        let films: Arc<dyn FilmCatalog> = store.clone();
        let similarity = Arc::new(SimilarityEngine::new(config.similarity_ttl));

        let recommendations = RecommendationService::with_default_strategies(
            users.clone(),
            films.clone(),
            similarity.clone(),
            config,
        );

        Self {
            users,
            films,
            editor: store,
            similarity,
            recommendations: Arc::new(recommendations),
        }
    }
}
