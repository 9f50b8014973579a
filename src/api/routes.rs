use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Users
        .route("/users", get(handlers::get_users).post(handlers::create_user))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/friends", get(handlers::get_friends))
        .route("/users/:id/friends/:friend_id", put(handlers::add_friend))
        .route(
            "/users/:id/recommendations",
            get(handlers::get_recommendations),
        )
        // Films
        .route("/films", get(handlers::get_films).post(handlers::create_film))
        .route("/films/popular", get(handlers::get_popular_films))
        .route("/films/:id", get(handlers::get_film))
        .route(
            "/films/:id/ratings/:user_id",
            put(handlers::rate_film).delete(handlers::remove_rating),
        )
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_router(AppState::new());
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = create_router(AppState::new());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
