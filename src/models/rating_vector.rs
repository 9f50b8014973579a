use std::collections::{BTreeMap, BTreeSet};

use super::FilmId;

/// Highest score a user can give a film. Zero is reserved for "unrated".
pub const MAX_SCORE: u8 = 10;

/// One user's scores over the whole catalog, ordered by film id.
///
/// Every film of the catalog snapshot the vector was built from has an entry,
/// so two vectors built from the same snapshot line up index for index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RatingVector {
    scores: BTreeMap<FilmId, u8>,
}

impl RatingVector {
    /// Left-joins the catalog against a user's recorded ratings.
    ///
    /// Ratings for films outside the catalog are dropped. Unrated films get 0.
    pub fn from_ratings(
        catalog: impl IntoIterator<Item = FilmId>,
        ratings: impl IntoIterator<Item = (FilmId, u8)>,
    ) -> Self {
        let mut scores: BTreeMap<FilmId, u8> = catalog.into_iter().map(|id| (id, 0)).collect();
        for (film_id, score) in ratings {
            if let Some(slot) = scores.get_mut(&film_id) {
                *slot = score.min(MAX_SCORE);
            }
        }
        Self { scores }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, film_id: FilmId) -> u8 {
        self.scores.get(&film_id).copied().unwrap_or(0)
    }

    /// Scores in film id order
    pub fn values(&self) -> impl Iterator<Item = u8> + '_ {
        self.scores.values().copied()
    }

    pub fn film_ids(&self) -> impl Iterator<Item = FilmId> + '_ {
        self.scores.keys().copied()
    }

    /// True if both vectors were built over the same set of films
    pub fn is_aligned_with(&self, other: &RatingVector) -> bool {
        self.scores.len() == other.scores.len() && self.scores.keys().eq(other.scores.keys())
    }

    /// Copy of the vector with a zero added for every film only `other` covers.
    ///
    /// Two vectors taken from different catalog snapshots line up once each is
    /// widened with the other. Films missing on one side are unrated there, so
    /// the cosine of the widened pair is the cosine over the union catalog.
    pub fn widened_with(&self, other: &RatingVector) -> RatingVector {
        let scores = self
            .film_ids()
            .chain(other.film_ids())
            .map(|film_id| (film_id, self.score(film_id)))
            .collect();
        RatingVector { scores }
    }

    /// Number of films with a non-zero score
    pub fn rated_count(&self) -> usize {
        self.scores.values().filter(|score| **score > 0).count()
    }

    pub fn rated(&self) -> BTreeSet<FilmId> {
        self.scores
            .iter()
            .filter(|(_, score)| **score > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Films scored at or above `threshold`
    pub fn liked(&self, threshold: u8) -> BTreeSet<FilmId> {
        let threshold = threshold.max(1);
        self.scores
            .iter()
            .filter(|(_, score)| **score >= threshold)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Euclidean norm of the score vector
    pub fn norm(&self) -> f64 {
        self.values()
            .map(|score| f64::from(score).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
