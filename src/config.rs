use serde::Deserialize;
use std::time::Duration;

/// Which users the collaborative strategy compares the target against
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeerPool {
    /// Every other registered user
    AllUsers,
    /// Only the target's friends
    Friends,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. Without it the service runs on the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum score (on the 1..=10 scale) for a rating to count as a like
    #[serde(default = "default_liked_threshold")]
    pub liked_threshold: u8,

    /// Friends required before collaborative filtering is attempted
    #[serde(default)]
    pub min_friends: usize,

    /// Ratings required before collaborative filtering is attempted
    #[serde(default = "default_min_ratings")]
    pub min_ratings: usize,

    /// Number of most similar peers whose likes are collected
    #[serde(default = "default_top_k_peers")]
    pub top_k_peers: usize,

    #[serde(default = "default_peer_pool")]
    pub peer_pool: PeerPool,

    /// Exclude every film the target rated, not just the liked ones
    #[serde(default)]
    pub exclude_rated: bool,

    /// Size of the list returned by the recommendations endpoint
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Lifetime of a cached similarity score. Unset means entries live until invalidated.
    #[serde(default)]
    pub similarity_ttl_secs: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_liked_threshold() -> u8 {
    6
}

fn default_min_ratings() -> usize {
    1
}

fn default_top_k_peers() -> usize {
    1
}

fn default_peer_pool() -> PeerPool {
    PeerPool::AllUsers
}

fn default_recommendation_limit() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Recommendation engine tuning derived from this configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            liked_threshold: self.liked_threshold,
            min_friends: self.min_friends,
            min_ratings: self.min_ratings,
            top_k_peers: self.top_k_peers.max(1),
            peer_pool: self.peer_pool,
            exclude_rated: self.exclude_rated,
            recommendation_limit: self.recommendation_limit,
            similarity_ttl: self.similarity_ttl_secs.map(Duration::from_secs),
        }
    }
}

/// Knobs consumed by the recommendation services
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub liked_threshold: u8,
    pub min_friends: usize,
    pub min_ratings: usize,
    pub top_k_peers: usize,
    pub peer_pool: PeerPool,
    pub exclude_rated: bool,
    pub recommendation_limit: usize,
    pub similarity_ttl: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liked_threshold: default_liked_threshold(),
            min_friends: 0,
            min_ratings: default_min_ratings(),
            top_k_peers: default_top_k_peers(),
            peer_pool: default_peer_pool(),
            exclude_rated: false,
            recommendation_limit: default_recommendation_limit(),
            similarity_ttl: None,
        }
    }
}
