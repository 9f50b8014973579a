//! Data sources consumed by the recommendation engine
//!
//! The engine never stores anything itself. It reads users, the friend graph,
//! ratings and the catalog through these traits, so the same services run on
//! top of the in-memory store or on PostgreSQL.

use crate::{
    error::AppResult,
    models::{Film, FilmId, NewFilm, NewUser, RatingVector, User, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, PgStore};

/// Users, friendships and per-user ratings
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `NotFound` if the user does not exist
    async fn get_user_by_id(&self, id: UserId) -> AppResult<User>;

    async fn get_users(&self) -> AppResult<Vec<User>>;

    async fn get_users_friends(&self, id: UserId) -> AppResult<Vec<User>>;

    /// The whole catalog mapped to the user's score, 0 where unrated
    async fn get_score_vector(&self, user_id: UserId) -> AppResult<RatingVector>;

    /// Films the user scored at or above `threshold`, in film id order
    async fn get_liked_film_ids(&self, user_id: UserId, threshold: u8) -> AppResult<Vec<FilmId>> {
        let vector = self.get_score_vector(user_id).await?;
        Ok(vector.liked(threshold).into_iter().collect())
    }
}

/// Catalog access and popularity ranking
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmCatalog: Send + Sync {
    async fn get_films(&self) -> AppResult<Vec<Film>>;

    /// Fails with `NotFound` if the film does not exist
    async fn get_film_by_id(&self, id: FilmId) -> AppResult<Film>;

    /// Films ordered by like count, then mean rating, then id
    async fn get_top_films_by_likes(&self, count: usize) -> AppResult<Vec<Film>>;

    /// Users who liked the film
    async fn get_film_likes(&self, film_id: FilmId) -> AppResult<Vec<UserId>>;
}

/// Write side used by the HTTP surface to populate the catalog.
/// The recommendation engine never calls it.
#[async_trait::async_trait]
pub trait CatalogEditor: Send + Sync {
    async fn create_user(&self, request: NewUser) -> AppResult<User>;

    async fn create_film(&self, request: NewFilm) -> AppResult<Film>;

    /// Records or replaces a user's score for a film
    async fn rate_film(&self, film_id: FilmId, user_id: UserId, score: u8) -> AppResult<()>;

    async fn remove_rating(&self, film_id: FilmId, user_id: UserId) -> AppResult<()>;

    /// One-directional: `friend_id` becomes a friend of `user_id`
    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> AppResult<()>;
}
