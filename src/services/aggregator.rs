/// Recommendation aggregation
///
/// Turns one natural-language prompt into zero or more validated
/// recommendations: asks the completion provider for a strict-JSON
/// candidate list, parses it, then resolves every candidate against the
/// metadata database. Candidates that fail resolution are dropped rather
/// than failing the batch — the completion provider routinely misspells
/// or invents titles. An empty resolved list is a successful outcome.
use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ContentKind, Recommendation},
    services::providers::{CompletionProvider, MetadataResolver},
};

const MOVIE_INSTRUCTION: &str = "You are a movie recommendation engine. \
    Reply with a raw JSON array of up to 10 movies matching the request, \
    each object exactly {\"name\": \"<movie title>\", \"year\": <release year>}. \
    Output the JSON array only: no markdown, no code fences, no commentary.";

const SERIES_INSTRUCTION: &str = "You are a TV series recommendation engine. \
    Reply with a raw JSON array of up to 10 series matching the request, \
    each object exactly {\"name\": \"<series title>\", \"year\": <first air year>}. \
    Output the JSON array only: no markdown, no code fences, no commentary.";

/// Unresolved candidate as emitted by the completion provider
#[derive(Debug, Deserialize)]
struct RawCandidate {
    name: String,
    #[serde(default)]
    year: Option<i32>,
}

/// Candidate shape for mixed movie/series requests
#[derive(Debug, Deserialize)]
struct RawTaggedCandidate {
    title: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(rename = "type")]
    kind: String,
}

pub struct RecommendationAggregator {
    completions: Arc<dyn CompletionProvider>,
    resolver: Arc<dyn MetadataResolver>,
}

impl RecommendationAggregator {
    pub fn new(
        completions: Arc<dyn CompletionProvider>,
        resolver: Arc<dyn MetadataResolver>,
    ) -> Self {
        Self {
            completions,
            resolver,
        }
    }

    pub async fn recommend_movies(&self, prompt: &str) -> AppResult<Vec<Recommendation>> {
        self.recommend_single_kind(ContentKind::Movie, MOVIE_INSTRUCTION, prompt)
            .await
    }

    pub async fn recommend_series(&self, prompt: &str) -> AppResult<Vec<Recommendation>> {
        self.recommend_single_kind(ContentKind::Series, SERIES_INSTRUCTION, prompt)
            .await
    }

    /// Mixed movie/series recommendations with a type-tagged schema
    pub async fn recommend_mixed(
        &self,
        prompt: &str,
        include_movies: bool,
        include_series: bool,
    ) -> AppResult<Vec<Recommendation>> {
        if !include_movies && !include_series {
            return Err(AppError::InvalidInput(
                "At least one of movies or series must be included".to_string(),
            ));
        }

        let instruction = mixed_instruction(include_movies, include_series);
        let completion = self.completions.complete(&instruction, prompt).await?;
        let raw: Vec<RawTaggedCandidate> = parse_candidates(&completion)?;

        let mut candidates = Vec::with_capacity(raw.len());
        for candidate in raw {
            let kind = match candidate.kind.as_str() {
                "movie" => ContentKind::Movie,
                "series" => ContentKind::Series,
                other => {
                    return Err(AppError::MalformedResponse(format!(
                        "Unknown candidate type: {}",
                        other
                    )))
                }
            };

            let allowed = match kind {
                ContentKind::Movie => include_movies,
                ContentKind::Series => include_series,
            };
            if !allowed {
                tracing::debug!(
                    title = %candidate.title,
                    kind = %kind,
                    "Dropping candidate of unrequested kind"
                );
                continue;
            }

            candidates.push((kind, candidate.title, candidate.year));
        }

        self.resolve_all(candidates).await
    }

    async fn recommend_single_kind(
        &self,
        kind: ContentKind,
        instruction: &str,
        prompt: &str,
    ) -> AppResult<Vec<Recommendation>> {
        let completion = self.completions.complete(instruction, prompt).await?;
        let raw: Vec<RawCandidate> = parse_candidates(&completion)?;

        let candidates = raw
            .into_iter()
            .map(|candidate| (kind, candidate.name, candidate.year))
            .collect();

        self.resolve_all(candidates).await
    }

    /// Resolves candidates in completion order, dropping the unresolvable
    /// and collapsing duplicate ids to their first occurrence
    async fn resolve_all(
        &self,
        candidates: Vec<(ContentKind, String, Option<i32>)>,
    ) -> AppResult<Vec<Recommendation>> {
        let total = candidates.len();
        let mut seen = HashSet::new();
        let mut recommendations = Vec::new();

        for (kind, name, year) in candidates {
            if name.trim().is_empty() {
                tracing::debug!("Dropping unnamed candidate");
                continue;
            }

            match self.resolver.resolve(kind, &name, year).await? {
                Some(resolved) if resolved.id > 0 => {
                    if !seen.insert(resolved.id) {
                        tracing::debug!(id = resolved.id, name = %name, "Dropping duplicate candidate");
                        continue;
                    }
                    recommendations.push(Recommendation {
                        id: resolved.id,
                        title: name,
                        year,
                        poster_url: resolved.poster_url,
                        kind,
                    });
                }
                _ => {
                    tracing::debug!(name = %name, kind = %kind, "Candidate did not resolve, dropping");
                }
            }
        }

        tracing::info!(
            candidates = total,
            resolved = recommendations.len(),
            "Recommendation batch aggregated"
        );

        Ok(recommendations)
    }
}

/// Strict parse of the completion text into typed candidates
///
/// The format contract with the completion provider is enforced only by
/// the instruction text, so the parsed shape is validated here: anything
/// that is not the requested JSON array fails the whole call. A JSON
/// `null` counts as an empty list, matching a provider that answers
/// "nothing matches".
fn parse_candidates<T: DeserializeOwned>(completion: &str) -> AppResult<Vec<T>> {
    let parsed: Option<Vec<T>> = serde_json::from_str(completion.trim())
        .map_err(|e| AppError::MalformedResponse(format!("Expected a JSON candidate array: {}", e)))?;
    Ok(parsed.unwrap_or_default())
}

fn mixed_instruction(include_movies: bool, include_series: bool) -> String {
    let scope = match (include_movies, include_series) {
        (true, true) => "movies and TV series",
        (true, false) => "movies only",
        _ => "TV series only",
    };

    format!(
        "You are a movie and TV recommendation engine. Reply with a raw JSON \
         array of up to 10 recommendations ({scope}) matching the request, each \
         object exactly {{\"title\": \"<title>\", \"year\": <release or first air \
         year>, \"type\": \"movie\" or \"series\"}}. Output the JSON array only: \
         no markdown, no code fences, no commentary."
    )
}
