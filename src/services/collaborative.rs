use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    config::{EngineConfig, PeerPool},
    db::{FilmCatalog, UserDirectory},
    error::AppResult,
    models::{CandidateSource, Film, FilmId, UserId, UserSignal},
    services::{
        similarity::{RatingSnapshot, SimilarityEngine},
        Recommender,
    },
};

/// Recommends what the most similar users liked.
///
/// Peers come either from every other user or from the target's friends,
/// depending on `PeerPool`.
pub struct CollaborativeRecommender {
    users: Arc<dyn UserDirectory>,
    films: Arc<dyn FilmCatalog>,
    similarity: Arc<SimilarityEngine>,
    config: EngineConfig,
}

impl CollaborativeRecommender {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        films: Arc<dyn FilmCatalog>,
        similarity: Arc<SimilarityEngine>,
        config: EngineConfig,
    ) -> Self {
        Self {
            users,
            films,
            similarity,
            config,
        }
    }

    /// Ids of films liked by the closest peers that the target has not consumed yet
    pub async fn recommend_by_peers(
        &self,
        target: UserId,
        pool: PeerPool,
    ) -> AppResult<Vec<FilmId>> {
        let target_snapshot = RatingSnapshot {
            user_id: target,
            generation: self.similarity.generation(target),
            vector: self.users.get_score_vector(target).await?,
        };
        if target_snapshot.vector.rated_count() == 0 {
            return Ok(Vec::new());
        }

        let peers = self.ranked_peers(&target_snapshot, pool).await?;
        if peers.is_empty() {
            tracing::debug!(user_id = target, "No peer shares a rating with the user");
            return Ok(Vec::new());
        }

        let target_vector = &target_snapshot.vector;
        let consumed: BTreeSet<FilmId> = if self.config.exclude_rated {
            target_vector.rated()
        } else {
            target_vector.liked(self.config.liked_threshold)
        };

        let mut seen = BTreeSet::new();
        let mut recommendations = Vec::new();
        for (peer, score) in peers.into_iter().take(self.config.top_k_peers) {
            let liked = self
                .users
                .get_liked_film_ids(peer, self.config.liked_threshold)
                .await?;

            tracing::debug!(
                user_id = target,
                peer_id = peer,
                similarity = score,
                liked = liked.len(),
                "Collecting likes from peer"
            );

            recommendations.extend(
                liked
                    .into_iter()
                    .filter(|film_id| !consumed.contains(film_id) && seen.insert(*film_id)),
            );
        }

        Ok(recommendations)
    }

    /// Candidate peers with non-zero similarity, most similar first
    async fn ranked_peers(
        &self,
        target: &RatingSnapshot,
        pool: PeerPool,
    ) -> AppResult<Vec<(UserId, f64)>> {
        let candidates = match pool {
            PeerPool::AllUsers => self.users.get_users().await?,
            PeerPool::Friends => self.users.get_users_friends(target.user_id).await?,
        };

        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates.into_iter().filter(|user| user.id != target.user_id) {
            let score = match self.similarity.cached(target.user_id, candidate.id) {
                Some(score) => score,
                None => {
                    let peer = RatingSnapshot {
                        user_id: candidate.id,
                        generation: self.similarity.generation(candidate.id),
                        vector: self.users.get_score_vector(candidate.id).await?,
                    };
                    self.score_against(target, &peer)?
                }
            };

            if score != 0.0 {
                ranked.push((candidate.id, score));
            }
        }

        ranked.sort_by(|(id_a, a), (id_b, b)| b.total_cmp(a).then_with(|| id_a.cmp(id_b)));
        Ok(ranked)
    }

    /// Similarity of two snapshots, lining them up first if a film was added between reads
    fn score_against(&self, target: &RatingSnapshot, peer: &RatingSnapshot) -> AppResult<f64> {
        if target.vector.is_aligned_with(&peer.vector) {
            return self.similarity.similarity_between(target, peer);
        }

        tracing::debug!(
            user_id = target.user_id,
            peer_id = peer.user_id,
            target_films = target.vector.len(),
            peer_films = peer.vector.len(),
            "Catalog changed between reads, widening vectors"
        );
        self.similarity.similarity_between(
            &target.widened_with(&peer.vector),
            &peer.widened_with(&target.vector),
        )
    }
}

#[async_trait::async_trait]
impl Recommender for CollaborativeRecommender {
    fn source(&self) -> CandidateSource {
        CandidateSource::Collaborative
    }

    fn applies_to(&self, signal: &UserSignal) -> bool {
        signal.rating_count > 0
            && signal.rating_count >= self.config.min_ratings
            && signal.friend_count >= self.config.min_friends
    }

    async fn recommend(&self, user_id: UserId) -> AppResult<Vec<Film>> {
        let ids = self.recommend_by_peers(user_id, self.config.peer_pool).await?;

        let mut films = Vec::with_capacity(ids.len());
        for id in ids {
            films.push(self.films.get_film_by_id(id).await?);
        }
        Ok(films)
    }
}
