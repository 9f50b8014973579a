use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FilmId;

/// A film genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// MPA age rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mpa {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Director {
    pub id: i32,
    pub name: String,
}

/// A catalog entry, in the same shape used by every film listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: Option<NaiveDate>,
    /// Running time in minutes
    pub duration: u32,
    pub mpa: Option<Mpa>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub directors: Vec<Director>,
    /// Mean rating across all users who rated the film, 0 when unrated
    #[serde(default)]
    pub rate: f64,
}

impl Film {
    /// True if the film carries at least one of the given genres
    pub fn shares_genre<'a>(&self, genres: impl IntoIterator<Item = &'a Genre>) -> bool {
        genres.into_iter().any(|genre| self.genres.contains(genre))
    }
}
