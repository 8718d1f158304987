use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::Recommendation;

/// Title/year memo for a recommendation that has been shown in this session
///
/// Prompt building needs the display data of excluded/liked titles even
/// after they leave the working set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownTitle {
    pub title: String,
    pub year: Option<i32>,
}

impl KnownTitle {
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// One user's ongoing recommendation conversation
///
/// Owned by the session store and mutated only by the conversation
/// service. Invariants: `current_recommendations` never contains an id in
/// `excluded_ids`, and never contains duplicate ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub prompt_history: Vec<String>,
    pub excluded_ids: Vec<i64>,
    pub liked_ids: Vec<i64>,
    pub active_criteria: String,
    pub current_recommendations: Vec<Recommendation>,
    pub known_titles: HashMap<i64, KnownTitle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a fresh session seeded with its first prompt
    pub fn new(prompt: String) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            prompt_history: vec![prompt.clone()],
            excluded_ids: Vec::new(),
            liked_ids: Vec::new(),
            active_criteria: prompt,
            current_recommendations: Vec::new(),
            known_titles: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_excluded(&self, id: i64) -> bool {
        self.excluded_ids.contains(&id)
    }

    pub fn is_shown(&self, id: i64) -> bool {
        self.current_recommendations.iter().any(|r| r.id == id)
    }

    /// Records title/year data for every recommendation in the batch
    pub fn remember_titles(&mut self, recommendations: &[Recommendation]) {
        for rec in recommendations {
            self.known_titles.insert(
                rec.id,
                KnownTitle {
                    title: rec.title.clone(),
                    year: rec.year,
                },
            );
        }
    }

    /// Labels for the given ids, skipping ids this session has no title
    /// data for
    pub fn known_labels(&self, ids: &[i64]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.known_titles.get(id).map(KnownTitle::label))
            .collect()
    }
}
