use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

pub mod film;
pub mod rating_vector;
pub mod user;

pub use film::{Director, Film, Genre, Mpa};
pub use rating_vector::{RatingVector, MAX_SCORE};
pub use user::User;

pub type UserId = i64;
pub type FilmId = i64;

/// Strategy that proposed a recommendation, in merge priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Collaborative,
    ContentBased,
    Popularity,
}

impl Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::Collaborative => write!(f, "collaborative"),
            CandidateSource::ContentBased => write!(f, "content_based"),
            CandidateSource::Popularity => write!(f, "popularity"),
        }
    }
}

/// A film together with the strategy that proposed it. Only used while merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCandidate {
    pub film: Film,
    pub source: CandidateSource,
}

/// How much is known about a user when picking strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserSignal {
    pub friend_count: usize,
    pub rating_count: usize,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birthday: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct NewFilm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub release_date: Option<chrono::NaiveDate>,
    pub duration: u32,
    #[serde(default)]
    pub mpa: Option<Mpa>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub directors: Vec<Director>,
}

#[derive(Debug, Deserialize)]
pub struct RateFilmRequest {
    pub score: u8,
}

impl NewUser {
    /// Checks the login and fills in a missing display name
    pub fn validate(mut self) -> AppResult<Self> {
        if self.login.trim().is_empty() || self.login.contains(char::is_whitespace) {
            return Err(AppError::InvalidInput(
                "Login must be non-empty and contain no spaces".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(AppError::InvalidInput(format!(
                "Invalid email address: {}",
                self.email
            )));
        }
        if self.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
            self.name = Some(self.login.clone());
        }
        Ok(self)
    }
}

impl NewFilm {
    /// Checks the name and drops duplicate genres
    pub fn validate(mut self) -> AppResult<Self> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Film name must not be empty".to_string(),
            ));
        }
        self.genres.sort();
        self.genres.dedup();
        Ok(self)
    }
}

/// Scores run from 1 to `MAX_SCORE`; 0 is reserved for "unrated"
pub fn validate_score(score: u8) -> AppResult<u8> {
    if score == 0 || score > MAX_SCORE {
        return Err(AppError::InvalidInput(format!(
            "Score must be between 1 and {}",
            MAX_SCORE
        )));
    }
    Ok(score)
}
