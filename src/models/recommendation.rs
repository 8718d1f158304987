use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of recommended content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Movie => write!(f, "movie"),
            ContentKind::Series => write!(f, "series"),
        }
    }
}

/// A resolved, displayable recommendation returned to the client
///
/// Only created from a completion candidate that resolved against the
/// metadata database; `id` is the canonical metadata id and the merge key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub kind: ContentKind,
}

impl Recommendation {
    /// Human-readable label used when a prompt references this title,
    /// e.g. "Inception (2010)"
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// Outcome of a name+year metadata lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedTitle {
    pub id: i64,
    pub poster_url: Option<String>,
}

/// Full metadata record for a single title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleDetails {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub vote_average: Option<f64>,
    pub kind: ContentKind,
}
