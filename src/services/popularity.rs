use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    db::FilmCatalog,
    error::AppResult,
    models::{CandidateSource, Film, UserId, UserSignal},
    services::Recommender,
};

/// Cold-start fallback: the most popular films of the whole catalog
pub struct PopularityRecommender {
    films: Arc<dyn FilmCatalog>,
}

impl PopularityRecommender {
    pub fn new(films: Arc<dyn FilmCatalog>) -> Self {
        Self { films }
    }

    /// Whole catalog by popularity, shuffled while nobody has rated anything yet
    pub async fn recommend_popular(&self) -> AppResult<Vec<Film>> {
        let catalog_size = self.films.get_films().await?.len();
        let mut popular = self.films.get_top_films_by_likes(catalog_size).await?;

        // Ranked by likes then mean score, so an unrated leader means an unrated catalog
        let Some((top_id, top_rate)) = popular.first().map(|film| (film.id, film.rate)) else {
            return Ok(popular);
        };
        if top_rate > 0.0 {
            return Ok(popular);
        }

        if self.films.get_film_likes(top_id).await?.is_empty() {
            tracing::debug!(films = popular.len(), "Catalog is unrated, shuffling");
            popular.shuffle(&mut rand::thread_rng());
        }

        Ok(popular)
    }
}

#[async_trait::async_trait]
impl Recommender for PopularityRecommender {
    fn source(&self) -> CandidateSource {
        CandidateSource::Popularity
    }

    fn applies_to(&self, signal: &UserSignal) -> bool {
        signal.rating_count == 0
    }

    async fn recommend(&self, _user_id: UserId) -> AppResult<Vec<Film>> {
        self.recommend_popular().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockFilmCatalog;
    use crate::models::FilmId;

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

    fn ids(films: Vec<Film>) -> Vec<FilmId> {
        films.iter().map(|f| f.id).collect()
    }

    fn catalog(popular: Vec<Film>, top_likes: Vec<UserId>) -> MockFilmCatalog {
        let all = popular.clone();
        let mut mock = MockFilmCatalog::new();
        mock.expect_get_films().returning(move || Ok(all.clone()));
        mock.expect_get_top_films_by_likes()
            .returning(move |count| Ok(popular.iter().take(count).cloned().collect()));
        mock.expect_get_film_likes()
            .returning(move |_| Ok(top_likes.clone()));
        mock
    }

    #[tokio::test]
    async fn test_popularity_order_is_kept_when_liked() {
        let films = catalog(vec![film(3), film(1), film(2)], vec![10]);
        let recommender = PopularityRecommender::new(Arc::new(films));

        assert_eq!(
            ids(recommender.recommend_popular().await.unwrap()),
            vec![3, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_unrated_catalog_is_returned_in_full() {
        let films = catalog((1..=20).map(film).collect(), vec![]);
        let recommender = PopularityRecommender::new(Arc::new(films));

        let mut ids = ids(recommender.recommend_popular().await.unwrap());
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unrated_catalog_is_shuffled() {
        let ordered: Vec<FilmId> = (1..=50).collect();
        let films = catalog(ordered.iter().copied().map(film).collect(), vec![]);
        let recommender = PopularityRecommender::new(Arc::new(films));

        let mut reordered = false;
        for _ in 0..5 {
            reordered |= ids(recommender.recommend_popular().await.unwrap()) != ordered;
        }
        assert!(reordered);
    }

    #[tokio::test]
    async fn test_low_scores_keep_their_order() {
        // Rated, but below the like threshold: mean score still ranks them
        let rated: Vec<Film> = [(4, 5.0), (2, 3.5), (7, 1.0)]
            .into_iter()
            .map(|(id, rate)| Film { rate, ..film(id) })
            .collect();
        let films = catalog(rated, vec![]);
        let recommender = PopularityRecommender::new(Arc::new(films));

        for _ in 0..20 {
            assert_eq!(
                ids(recommender.recommend_popular().await.unwrap()),
                vec![4, 2, 7]
            );
        }
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let mut films = MockFilmCatalog::new();
        films.expect_get_films().returning(|| Ok(vec![]));
        films
            .expect_get_top_films_by_likes()
            .returning(|_| Ok(vec![]));
        films.expect_get_film_likes().never();

        let recommender = PopularityRecommender::new(Arc::new(films));
        assert!(recommender.recommend_popular().await.unwrap().is_empty());
    }

    #[test]
    fn test_applies_only_without_ratings() {
        let recommender = PopularityRecommender::new(Arc::new(MockFilmCatalog::new()));
        assert!(recommender.applies_to(&UserSignal::default()));
        assert!(!recommender.applies_to(&UserSignal {
            friend_count: 3,
            rating_count: 1,
        }));
    }
}
