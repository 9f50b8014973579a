use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    config::EngineConfig,
    db::{FilmCatalog, UserDirectory},
    error::AppResult,
    models::{CandidateSource, Film, FilmId, Genre, UserId, UserSignal},
    services::Recommender,
};

/// Recommends popular films that share a genre with what the user liked
pub struct ContentBasedRecommender {
    users: Arc<dyn UserDirectory>,
    films: Arc<dyn FilmCatalog>,
    config: EngineConfig,
}

impl ContentBasedRecommender {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        films: Arc<dyn FilmCatalog>,
        config: EngineConfig,
    ) -> Self {
        Self {
            users,
            films,
            config,
        }
    }

    /// Catalog films in popularity order whose genres intersect the user's liked genres.
    /// Films the user already liked are left out.
    pub async fn recommend_by_attributes(&self, target: UserId) -> AppResult<Vec<Film>> {
        let liked: BTreeSet<FilmId> = self
            .users
            .get_liked_film_ids(target, self.config.liked_threshold)
            .await?
            .into_iter()
            .collect();
        if liked.is_empty() {
            return Ok(Vec::new());
        }

        let mut genres: BTreeSet<Genre> = BTreeSet::new();
        for film_id in &liked {
            genres.extend(self.films.get_film_by_id(*film_id).await?.genres);
        }
        if genres.is_empty() {
            return Ok(Vec::new());
        }

        let catalog_size = self.films.get_films().await?.len();
        let popular = self.films.get_top_films_by_likes(catalog_size).await?;

        let matches: Vec<Film> = popular
            .into_iter()
            .filter(|film| !liked.contains(&film.id) && film.shares_genre(&genres))
            .collect();

        tracing::debug!(
            user_id = target,
            genres = genres.len(),
            matches = matches.len(),
            "Genre matches collected"
        );
        Ok(matches)
    }
}

#[async_trait::async_trait]
impl Recommender for ContentBasedRecommender {
    fn source(&self) -> CandidateSource {
        CandidateSource::ContentBased
    }

    fn applies_to(&self, signal: &UserSignal) -> bool {
        signal.rating_count > 0
    }

    async fn recommend(&self, user_id: UserId) -> AppResult<Vec<Film>> {
        self.recommend_by_attributes(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockFilmCatalog, MockUserDirectory};

    fn genre(id: i32) -> Genre {
        Genre {
            id,
            name: format!("genre-{}", id),
        }
    }

    fn film(id: FilmId, genre_ids: &[i32]) -> Film {
        Film {
            id,
            name: format!("Film {}", id),
            description: String::new(),
            release_date: None,
            duration: 90,
            mpa: None,
            genres: genre_ids.iter().copied().map(genre).collect(),
            directors: vec![],
            rate: 0.0,
        }
    }

    /// Catalog mock; `popular` lists the films in popularity order
    fn catalog(popular: Vec<Film>) -> MockFilmCatalog {
        let by_id = popular.clone();
        let all = popular.clone();

        let mut mock = MockFilmCatalog::new();
        mock.expect_get_films().returning(move || Ok(all.clone()));
        mock.expect_get_film_by_id().returning(move |id| {
            by_id
                .iter()
                .find(|f| f.id == id)
                .cloned()
                .ok_or_else(|| crate::error::AppError::film_not_found(id))
        });
        mock.expect_get_top_films_by_likes()
            .returning(move |count| Ok(popular.iter().take(count).cloned().collect()));
        mock
    }

    fn liking(films: Vec<FilmId>) -> MockUserDirectory {
        let mut mock = MockUserDirectory::new();
        mock.expect_get_liked_film_ids()
            .returning(move |_, _| Ok(films.clone()));
        mock
    }

    #[tokio::test]
    async fn test_keeps_popularity_order_and_filters_by_genre() {
        let films = catalog(vec![
            film(4, &[2]),
            film(1, &[1]),
            film(3, &[3]),
            film(2, &[1, 3]),
            film(5, &[2, 4]),
        ]);
        let recommender = ContentBasedRecommender::new(
            Arc::new(liking(vec![1])),
            Arc::new(films),
            EngineConfig::default(),
        );

        let result = recommender.recommend_by_attributes(7).await.unwrap();
        let ids: Vec<FilmId> = result.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_genres_are_unioned_across_liked_films() {
        let films = catalog(vec![
            film(5, &[4]),
            film(3, &[2]),
            film(1, &[1]),
            film(2, &[2]),
            film(4, &[3]),
        ]);
        let recommender = ContentBasedRecommender::new(
            Arc::new(liking(vec![1, 2])),
            Arc::new(films),
            EngineConfig::default(),
        );

        let ids: Vec<FilmId> = recommender
            .recommend_by_attributes(7)
            .await
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_no_likes_means_no_candidates() {
        let recommender = ContentBasedRecommender::new(
            Arc::new(liking(vec![])),
            Arc::new(MockFilmCatalog::new()),
            EngineConfig::default(),
        );

        assert!(recommender.recommend_by_attributes(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_liked_films_without_genres_yield_nothing() {
        let films = catalog(vec![film(1, &[]), film(2, &[1])]);
        let recommender = ContentBasedRecommender::new(
            Arc::new(liking(vec![1])),
            Arc::new(films),
            EngineConfig::default(),
        );

        assert!(recommender.recommend_by_attributes(7).await.unwrap().is_empty());
    }

    #[test]
    fn test_applies_only_with_ratings() {
        let recommender = ContentBasedRecommender::new(
            Arc::new(MockUserDirectory::new()),
            Arc::new(MockFilmCatalog::new()),
            EngineConfig::default(),
        );

        assert!(!recommender.applies_to(&UserSignal::default()));
        assert!(recommender.applies_to(&UserSignal {
            friend_count: 0,
            rating_count: 1,
        }));
    }
}
