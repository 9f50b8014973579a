use crate::{
    error::AppResult,
    models::{CandidateSource, Film, UserId, UserSignal},
};

pub mod collaborative;
pub mod content_based;
pub mod popularity;
pub mod recommendations;
pub mod similarity;

pub use collaborative::CollaborativeRecommender;
pub use content_based::ContentBasedRecommender;
pub use popularity::PopularityRecommender;
pub use recommendations::RecommendationService;
pub use similarity::{RatingSnapshot, SimilarityEngine};

/// A strategy producing film candidates for a user
///
/// Strategies are registered with the `RecommendationService` in priority
/// order. Each one decides from the user's signal whether it has anything
/// meaningful to contribute.
#[async_trait::async_trait]
pub trait Recommender: Send + Sync {
    /// Tag attached to every candidate this strategy proposes
    fn source(&self) -> CandidateSource;

    /// Whether the strategy should run for a user with this much signal
    fn applies_to(&self, signal: &UserSignal) -> bool;

    /// Candidates for the user, best first
    async fn recommend(&self, user_id: UserId) -> AppResult<Vec<Film>>;
}
