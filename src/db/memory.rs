use std::collections::{BTreeMap, BTreeSet, HashMap};

use tokio::sync::RwLock;

use super::{CatalogEditor, FilmCatalog, UserDirectory};
use crate::{
    error::{AppError, AppResult},
    models::{validate_score, Film, FilmId, NewFilm, NewUser, RatingVector, User, UserId},
};

/// Process-local store backing the service when no database is configured
pub struct InMemoryStore {
    liked_threshold: u8,
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    users: BTreeMap<UserId, User>,
    films: BTreeMap<FilmId, Film>,
    /// user -> film -> score
    ratings: HashMap<UserId, BTreeMap<FilmId, u8>>,
    /// One-directional, as in "user follows friend"
    friends: HashMap<UserId, BTreeSet<UserId>>,
    next_user_id: UserId,
    next_film_id: FilmId,
}

impl StoreInner {
    fn ensure_user(&self, id: UserId) -> AppResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::user_not_found(id))
        }
    }

    fn ensure_film(&self, id: FilmId) -> AppResult<()> {
        if self.films.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::film_not_found(id))
        }
    }

    /// (like count, mean score) for a film
    fn engagement(&self, film_id: FilmId, liked_threshold: u8) -> (usize, f64) {
        let scores: Vec<u8> = self
            .ratings
            .values()
            .filter_map(|by_film| by_film.get(&film_id).copied())
            .collect();
        if scores.is_empty() {
            return (0, 0.0);
        }
        let likes = scores.iter().filter(|s| **s >= liked_threshold).count();
        let mean = scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64;
        (likes, mean)
    }

    fn film_with_rate(&self, film: &Film, liked_threshold: u8) -> Film {
        let (_, rate) = self.engagement(film.id, liked_threshold);
        Film {
            rate,
            ..film.clone()
        }
    }
}

impl InMemoryStore {
    pub fn new(liked_threshold: u8) -> Self {
        Self {
            liked_threshold: liked_threshold.max(1),
            inner: RwLock::new(StoreInner {
                next_user_id: 1,
                next_film_id: 1,
                ..StoreInner::default()
            }),
        }
    }
}

#[async_trait::async_trait]
impl CatalogEditor for InMemoryStore {
    async fn create_user(&self, request: NewUser) -> AppResult<User> {
        let request = request.validate()?;

        let mut inner = self.inner.write().await;
        let id = inner.next_user_id;
        inner.next_user_id += 1;

        let user = User {
            id,
            name: request.name.unwrap_or_else(|| request.login.clone()),
            email: request.email,
            login: request.login,
            birthday: request.birthday,
        };
        inner.users.insert(id, user.clone());

        tracing::debug!(user_id = id, "User created");
        Ok(user)
    }

    async fn create_film(&self, request: NewFilm) -> AppResult<Film> {
        let request = request.validate()?;

        let mut inner = self.inner.write().await;
        let id = inner.next_film_id;
        inner.next_film_id += 1;

        let film = Film {
            id,
            name: request.name,
            description: request.description,
            release_date: request.release_date,
            duration: request.duration,
            mpa: request.mpa,
            genres: request.genres,
            directors: request.directors,
            rate: 0.0,
        };
        inner.films.insert(id, film.clone());

        tracing::debug!(film_id = id, "Film created");
        Ok(film)
    }

    async fn rate_film(&self, film_id: FilmId, user_id: UserId, score: u8) -> AppResult<()> {
        let score = validate_score(score)?;

        let mut inner = self.inner.write().await;
        inner.ensure_film(film_id)?;
        inner.ensure_user(user_id)?;
        inner
            .ratings
            .entry(user_id)
            .or_default()
            .insert(film_id, score);
        Ok(())
    }

    async fn remove_rating(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_film(film_id)?;
        inner.ensure_user(user_id)?;
        if let Some(by_film) = inner.ratings.get_mut(&user_id) {
            by_film.remove(&film_id);
        }
        Ok(())
    }

    async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        if user_id == friend_id {
            return Err(AppError::InvalidInput(
                "A user cannot befriend themselves".to_string(),
            ));
        }

        let mut inner = self.inner.write().await;
        inner.ensure_user(user_id)?;
        inner.ensure_user(friend_id)?;
        inner.friends.entry(user_id).or_default().insert(friend_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_user_by_id(&self, id: UserId) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::user_not_found(id))
    }

    async fn get_users(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn get_users_friends(&self, id: UserId) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        inner.ensure_user(id)?;
        let friends: Vec<User> = inner
            .friends
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|friend_id| inner.users.get(friend_id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(friends)
    }

    async fn get_score_vector(&self, user_id: UserId) -> AppResult<RatingVector> {
        let inner = self.inner.read().await;
        inner.ensure_user(user_id)?;
        let ratings: Vec<(FilmId, u8)> = inner
            .ratings
            .get(&user_id)
            .map(|by_film| by_film.iter().map(|(id, score)| (*id, *score)).collect())
            .unwrap_or_default();
        Ok(RatingVector::from_ratings(
            inner.films.keys().copied(),
            ratings,
        ))
    }
}

#[async_trait::async_trait]
impl FilmCatalog for InMemoryStore {
    async fn get_films(&self) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .values()
            .map(|film| inner.film_with_rate(film, self.liked_threshold))
            .collect())
    }

    async fn get_film_by_id(&self, id: FilmId) -> AppResult<Film> {
        let inner = self.inner.read().await;
        inner
            .films
            .get(&id)
            .map(|film| inner.film_with_rate(film, self.liked_threshold))
            .ok_or_else(|| AppError::film_not_found(id))
    }

    async fn get_top_films_by_likes(&self, count: usize) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let mut ranked: Vec<(usize, Film)> = inner
            .films
            .values()
            .map(|film| {
                let (likes, rate) = inner.engagement(film.id, self.liked_threshold);
                (
                    likes,
                    Film {
                        rate,
                        ..film.clone()
                    },
                )
            })
            .collect();

        ranked.sort_by(|(likes_a, a), (likes_b, b)| {
            likes_b
                .cmp(likes_a)
                .then_with(|| b.rate.total_cmp(&a.rate))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(ranked
            .into_iter()
            .take(count)
            .map(|(_, film)| film)
            .collect())
    }

    async fn get_film_likes(&self, film_id: FilmId) -> AppResult<Vec<UserId>> {
        let inner = self.inner.read().await;
        inner.ensure_film(film_id)?;
        let mut likes: Vec<UserId> = inner
            .ratings
            .iter()
            .filter(|(_, by_film)| {
                by_film
                    .get(&film_id)
                    .is_some_and(|score| *score >= self.liked_threshold)
            })
            .map(|(user_id, _)| *user_id)
            .collect();
        likes.sort_unstable();
        Ok(likes)
    }
}
