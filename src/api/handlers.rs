use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Film, FilmId, NewFilm, NewUser, RateFilmRequest, User, UserId},
};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_count")]
    pub count: usize,
}

fn default_popular_count() -> usize {
    10
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.editor.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get all users
pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.get_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.get_user_by_id(id).await?))
}

pub async fn get_friends(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.get_users_friends(id).await?))
}

/// Add `friend_id` to the friends of `id`
pub async fn add_friend(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<StatusCode> {
    state.editor.add_friend(id, friend_id).await?;
    Ok(StatusCode::OK)
}

/// Add a film to the catalog
pub async fn create_film(
    State(state): State<AppState>,
    Json(request): Json<NewFilm>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state.editor.create_film(request).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

/// Get the whole catalog
pub async fn get_films(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.get_films().await?))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<FilmId>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.films.get_film_by_id(id).await?))
}

/// Most liked films first
pub async fn get_popular_films(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.get_top_films_by_likes(query.count).await?))
}

/// Record a user's score for a film
pub async fn rate_film(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
    Json(request): Json<RateFilmRequest>,
) -> AppResult<StatusCode> {
    state
        .editor
        .rate_film(film_id, user_id, request.score)
        .await?;
    state.similarity.invalidate_user(user_id);
    Ok(StatusCode::OK)
}

/// Withdraw a user's score for a film
pub async fn remove_rating(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    state.editor.remove_rating(film_id, user_id).await?;
    state.similarity.invalidate_user(user_id);
    Ok(StatusCode::OK)
}

/// Personalized recommendations for a user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = id,
        "Processing recommendation request"
    );

    let films = state.recommendations.get_recommendation(id).await?;

    tracing::info!(
        request_id = %request_id,
        count = films.len(),
        "Recommendations served"
    );

    Ok(Json(films))
}
