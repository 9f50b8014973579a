use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    config::EngineConfig,
    db::{FilmCatalog, UserDirectory},
    error::AppResult,
    models::{CandidateSource, Film, FilmId, RecommendationCandidate, UserId, UserSignal},
    services::{
        CollaborativeRecommender, ContentBasedRecommender, PopularityRecommender, Recommender,
        SimilarityEngine,
    },
};

/// Generates personalized film recommendations
///
/// Runs every registered strategy whose signal requirements the user meets,
/// in registration order, and merges their candidates. Earlier strategies win
/// ties: a film proposed twice keeps the position of its first proposal.
pub struct RecommendationService {
    users: Arc<dyn UserDirectory>,
    strategies: Vec<Arc<dyn Recommender>>,
    config: EngineConfig,
}

impl RecommendationService {
    pub fn new(users: Arc<dyn UserDirectory>, config: EngineConfig) -> Self {
        Self {
            users,
            strategies: Vec::new(),
            config,
        }
    }

    /// Collaborative, then content-based, then popularity
    pub fn with_default_strategies(
        users: Arc<dyn UserDirectory>,
        films: Arc<dyn FilmCatalog>,
        similarity: Arc<SimilarityEngine>,
        config: EngineConfig,
    ) -> Self {
        Self::new(users.clone(), config.clone())
            .register(Arc::new(CollaborativeRecommender::new(
                users.clone(),
                films.clone(),
                similarity,
                config.clone(),
            )))
            .register(Arc::new(ContentBasedRecommender::new(
                users,
                films.clone(),
                config,
            )))
            .register(Arc::new(PopularityRecommender::new(films)))
    }

    /// Appends a strategy with lower priority than every strategy registered so far
    pub fn register(mut self, strategy: Arc<dyn Recommender>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Recommendations sized by the configured default limit
    pub async fn get_recommendation(&self, user_id: UserId) -> AppResult<Vec<Film>> {
        self.get_recommendations(user_id, self.config.recommendation_limit)
            .await
    }

    /// At most `limit` distinct films the user has not liked yet
    pub async fn get_recommendations(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Film>> {
        self.users.get_user_by_id(user_id).await?;

        let vector = self.users.get_score_vector(user_id).await?;
        let friends = self.users.get_users_friends(user_id).await?;
        let signal = UserSignal {
            friend_count: friends.len(),
            rating_count: vector.rated_count(),
        };
        let liked = vector.liked(self.config.liked_threshold);

        // Liked films count as already seen so no strategy can resurface them
        let mut seen: HashSet<FilmId> = liked.into_iter().collect();
        let mut merged: Vec<RecommendationCandidate> = Vec::new();
        for strategy in &self.strategies {
            if merged.len() >= limit {
                break;
            }
            if !strategy.applies_to(&signal) {
                continue;
            }

            let source = strategy.source();
            let films = strategy.recommend(user_id).await?;
            tracing::debug!(
                user_id,
                source = %source,
                proposed = films.len(),
                "Strategy finished"
            );

            merged.extend(
                films
                    .into_iter()
                    .filter(|film| seen.insert(film.id))
                    .map(|film| RecommendationCandidate { film, source }),
            );
        }
        merged.truncate(limit);

        let personalized = merged
            .iter()
            .filter(|candidate| candidate.source != CandidateSource::Popularity)
            .count();
        tracing::info!(
            user_id,
            friends = signal.friend_count,
            ratings = signal.rating_count,
            returned = merged.len(),
            personalized,
            "Recommendations generated"
        );

        Ok(merged.into_iter().map(|candidate| candidate.film).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogEditor, InMemoryStore, MockUserDirectory};
    use crate::error::AppError;
    use crate::models::{Genre, NewFilm, NewUser, RatingVector, User};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn film(id: FilmId) -> Film {
        Film {
            id,
            name: format!("Film {}", id),
            description: String::new(),
            release_date: None,
            duration: 90,
            mpa: None,
            genres: vec![],
            directors: vec![],
            rate: 0.0,
        }
    }

    fn user(id: UserId) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            login: format!("user{}", id),
            name: format!("User {}", id),
            birthday: None,
        }
    }

    /// Strategy returning a fixed list and counting its invocations
    struct FixedStrategy {
        source: CandidateSource,
        films: Vec<FilmId>,
        needs_ratings: bool,
        calls: AtomicUsize,
    }

    impl FixedStrategy {
        fn new(source: CandidateSource, films: Vec<FilmId>, needs_ratings: bool) -> Arc<Self> {
            Arc::new(Self {
                source,
                films,
                needs_ratings,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Recommender for FixedStrategy {
        fn source(&self) -> CandidateSource {
            self.source
        }

        fn applies_to(&self, signal: &UserSignal) -> bool {
            (signal.rating_count > 0) == self.needs_ratings
        }

        async fn recommend(&self, _user_id: UserId) -> AppResult<Vec<Film>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.films.iter().copied().map(film).collect())
        }
    }

    /// Directory knowing user 1 over a five-film catalog
    fn directory(ratings: Vec<(FilmId, u8)>, friends: usize) -> MockUserDirectory {
        let mut mock = MockUserDirectory::new();
        mock.expect_get_user_by_id().returning(|id| {
            if id == 1 {
                Ok(user(1))
            } else {
                Err(AppError::user_not_found(id))
            }
        });
        mock.expect_get_score_vector()
            .returning(move |_| Ok(RatingVector::from_ratings(1..=5, ratings.clone())));
        mock.expect_get_users_friends()
            .returning(move |_| Ok((2..2 + friends as i64).map(user).collect()));
        mock
    }

    fn ids(films: &[Film]) -> Vec<FilmId> {
        films.iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_merges_in_priority_order_without_duplicates() {
        let service = RecommendationService::new(
            Arc::new(directory(vec![(1, 9)], 0)),
            EngineConfig::default(),
        )
        .register(FixedStrategy::new(CandidateSource::Collaborative, vec![3, 2], true))
        .register(FixedStrategy::new(CandidateSource::ContentBased, vec![2, 4, 5], true));

        let result = service.get_recommendations(1, 10).await.unwrap();
        assert_eq!(ids(&result), vec![3, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_truncates_to_limit() {
        let content = FixedStrategy::new(CandidateSource::ContentBased, vec![5], true);
        let service = RecommendationService::new(
            Arc::new(directory(vec![(1, 9)], 0)),
            EngineConfig::default(),
        )
        .register(FixedStrategy::new(CandidateSource::Collaborative, vec![2, 3, 4], true))
        .register(content.clone());

        let result = service.get_recommendations(1, 2).await.unwrap();
        assert_eq!(ids(&result), vec![2, 3]);
        // The limit was filled before the lower-priority strategy was needed
        assert_eq!(content.calls(), 0);

        assert!(service.get_recommendations(1, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_liked_films_never_returned() {
        let service = RecommendationService::new(
            Arc::new(directory(vec![(1, 9), (2, 3)], 0)),
            EngineConfig::default(),
        )
        .register(FixedStrategy::new(CandidateSource::ContentBased, vec![1, 2, 3], true));

        let result = service.get_recommendations(1, 10).await.unwrap();
        // Film 2 was rated below the like threshold, so it may still be suggested
        assert_eq!(ids(&result), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_user_without_ratings_gets_popularity_only() {
        let personal = FixedStrategy::new(CandidateSource::Collaborative, vec![1], true);
        let popular = FixedStrategy::new(CandidateSource::Popularity, vec![4, 5], false);
        let service = RecommendationService::new(
            Arc::new(directory(vec![], 3)),
            EngineConfig::default(),
        )
        .register(personal.clone())
        .register(popular.clone());

        let result = service.get_recommendations(1, 10).await.unwrap();
        assert_eq!(ids(&result), vec![4, 5]);
        assert_eq!(personal.calls(), 0);
        assert_eq!(popular.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found_before_any_work() {
        let strategy = FixedStrategy::new(CandidateSource::Popularity, vec![1], false);

        let mut users = MockUserDirectory::new();
        users
            .expect_get_user_by_id()
            .returning(|id| Err(AppError::user_not_found(id)));
        users.expect_get_score_vector().never();
        users.expect_get_users_friends().never();

        let service = RecommendationService::new(Arc::new(users), EngineConfig::default())
            .register(strategy.clone());

        let result = service.get_recommendations(4, 10).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(strategy.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_limit_is_used() {
        let config = EngineConfig {
            recommendation_limit: 1,
            ..EngineConfig::default()
        };
        let service = RecommendationService::new(Arc::new(directory(vec![], 0)), config)
            .register(FixedStrategy::new(CandidateSource::Popularity, vec![4, 5], false));

        assert_eq!(ids(&service.get_recommendation(1).await.unwrap()), vec![4]);
    }

    #[tokio::test]
    async fn test_collaborative_gate_falls_through_to_content_based() {
        let store = Arc::new(InMemoryStore::new(6));
        for login in ["first", "second"] {
            store
                .create_user(NewUser {
                    email: format!("{}@example.com", login),
                    login: login.to_string(),
                    name: None,
                    birthday: None,
                })
                .await
                .unwrap();
        }
        for genre_id in [1, 2, 2] {
            store
                .create_film(NewFilm {
                    name: format!("Genre {} film", genre_id),
                    description: String::new(),
                    release_date: None,
                    duration: 100,
                    mpa: None,
                    genres: vec![Genre {
                        id: genre_id,
                        name: format!("genre-{}", genre_id),
                    }],
                    directors: vec![],
                })
                .await
                .unwrap();
        }
        store.rate_film(1, 1, 9).await.unwrap();
        store.rate_film(2, 1, 9).await.unwrap();
        store.rate_film(2, 2, 9).await.unwrap();

        let config = EngineConfig {
            min_friends: 1,
            ..EngineConfig::default()
        };
        let service = RecommendationService::with_default_strategies(
            store.clone(),
            store.clone(),
            Arc::default(),
            config,
        );

        // Friendless: only genre matches, the peer's film 1 is not offered
        assert_eq!(ids(&service.get_recommendations(2, 10).await.unwrap()), vec![3]);

        store.add_friend(2, 1).await.unwrap();
        assert_eq!(
            ids(&service.get_recommendations(2, 10).await.unwrap()),
            vec![1, 3]
        );
    }
}
