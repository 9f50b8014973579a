use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::{
    error::{AppError, AppResult},
    models::{RatingVector, UserId},
};

/// Unordered pair of users, stored as `(min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserPair(UserId, UserId);

impl UserPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.0 == user_id || self.1 == user_id
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedScore {
    score: f64,
    computed_at: Instant,
}

/// Version of one user's ratings as seen by the cache. Bumped on every invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation(u64);

/// A user's rating vector tagged with the generation read just before fetching it
#[derive(Debug, Clone)]
pub struct RatingSnapshot {
    pub user_id: UserId,
    pub generation: Generation,
    pub vector: RatingVector,
}

impl RatingSnapshot {
    /// Same snapshot over the union of both catalogs
    pub fn widened_with(&self, other: &RatingVector) -> Self {
        Self {
            user_id: self.user_id,
            generation: self.generation,
            vector: self.vector.widened_with(other),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    scores: HashMap<UserPair, CachedScore>,
    generations: HashMap<UserId, u64>,
}

impl CacheState {
    fn generation(&self, user_id: UserId) -> Generation {
        Generation(self.generations.get(&user_id).copied().unwrap_or_default())
    }
}

/// Cosine similarity between two rating vectors.
///
/// Returns 0 when either vector has no ratings or when no film is rated by
/// both users. Fails with `IncompatibleVectors` if the vectors were built from
/// different catalog snapshots.
pub fn cosine_similarity(a: &RatingVector, b: &RatingVector) -> AppResult<f64> {
    if !a.is_aligned_with(b) {
        return Err(AppError::IncompatibleVectors {
            left: a.len(),
            right: b.len(),
        });
    }

    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let dot: f64 = a
        .values()
        .zip(b.values())
        .map(|(x, y)| f64::from(x) * f64::from(y))
        .sum();
    if dot == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Memoizing similarity calculator shared by every request.
///
/// Entries are keyed by the unordered user pair. They are dropped when either
/// user's ratings change (`invalidate_user`) and, if a TTL is configured, once
/// they are older than the TTL.
///
/// A score is only stored if neither user was invalidated since its snapshot
/// was taken, so a rating write racing a recommendation cannot leave behind a
/// score computed from the ratings it replaced.
#[derive(Debug, Default)]
pub struct SimilarityEngine {
    state: RwLock<CacheState>,
    ttl: Option<Duration>,
}

impl SimilarityEngine {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    /// Cosine similarity of two vectors, without touching the cache
    pub fn similarity(&self, a: &RatingVector, b: &RatingVector) -> AppResult<f64> {
        cosine_similarity(a, b)
    }

    /// Current generation of a user's ratings. Read it before fetching the vector.
    pub fn generation(&self, user_id: UserId) -> Generation {
        self.read_state().generation(user_id)
    }

    /// Previously computed score for the pair, if still fresh
    pub fn cached(&self, a: UserId, b: UserId) -> Option<f64> {
        self.read_state()
            .scores
            .get(&UserPair::new(a, b))
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.score)
    }

    /// Cached score for the pair, computing it on a miss.
    ///
    /// The computed score is stored only while both snapshots are current.
    pub fn similarity_between(&self, a: &RatingSnapshot, b: &RatingSnapshot) -> AppResult<f64> {
        if let Some(score) = self.cached(a.user_id, b.user_id) {
            return Ok(score);
        }

        let score = cosine_similarity(&a.vector, &b.vector)?;

        let mut state = self.write_state();
        if state.generation(a.user_id) != a.generation
            || state.generation(b.user_id) != b.generation
        {
            tracing::debug!(
                user_a = a.user_id,
                user_b = b.user_id,
                "Ratings changed while scoring, not caching"
            );
            return Ok(score);
        }
        state.scores.insert(
            UserPair::new(a.user_id, b.user_id),
            CachedScore {
                score,
                computed_at: Instant::now(),
            },
        );

        tracing::debug!(user_a = a.user_id, user_b = b.user_id, score, "Similarity computed");
        Ok(score)
    }

    /// Drops every cached score involving the user and moves its generation on
    pub fn invalidate_user(&self, user_id: UserId) {
        let mut state = self.write_state();
        *state.generations.entry(user_id).or_default() += 1;

        let before = state.scores.len();
        state.scores.retain(|pair, _| !pair.contains(user_id));

        tracing::debug!(
            user_id,
            evicted = before - state.scores.len(),
            "Similarity cache invalidated"
        );
    }

    pub fn len(&self) -> usize {
        self.read_state().scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CachedScore) -> bool {
        self.ttl
            .map_or(true, |ttl| entry.computed_at.elapsed() < ttl)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
