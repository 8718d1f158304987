/// TMDB-backed metadata resolver
///
/// Resolves completion candidates against The Movie Database: name+year
/// search for canonical ids and poster art, id lookups for full details.
/// Lookups are cached in Redis; negative results are cached too, since the
/// same hallucinated title tends to come back across sessions.
use reqwest::Client as HttpClient;
use reqwest::StatusCode;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        tmdb::{TmdbDetailsResponse, TmdbSearchResponse},
        ContentKind, ResolvedTitle, TitleDetails,
    },
    services::providers::MetadataResolver,
};

const LOOKUP_CACHE_TTL: u64 = 86400; // 1 day
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct TmdbMetadataResolver {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    cache: Cache,
}

impl TmdbMetadataResolver {
    pub fn new(
        http_client: HttpClient,
        cache: Cache,
        api_key: String,
        api_url: String,
        image_url: String,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            image_url,
            cache,
        }
    }

    /// TMDB uses separate endpoints and year parameters for movies and TV
    fn endpoint(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Movie => "movie",
            ContentKind::Series => "tv",
        }
    }

    fn year_param(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Movie => "year",
            ContentKind::Series => "first_air_date_year",
        }
    }

    fn poster_url(&self, poster_path: Option<&str>) -> Option<String> {
        poster_path.map(|path| format!("{}{}", self.image_url, path))
    }

    fn convert_details(&self, kind: ContentKind, details: TmdbDetailsResponse) -> AppResult<TitleDetails> {
        let title = details
            .display_title()
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::MalformedResponse("TMDB details missing a title".to_string())
            })?;

        Ok(TitleDetails {
            id: details.id,
            title,
            year: details.year(),
            poster_url: self.poster_url(details.poster_path.as_deref()),
            overview: details.overview.filter(|s| !s.trim().is_empty()),
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            vote_average: details.vote_average,
            kind,
        })
    }
}

#[async_trait::async_trait]
impl MetadataResolver for TmdbMetadataResolver {
    async fn resolve(
        &self,
        kind: ContentKind,
        name: &str,
        year: Option<i32>,
    ) -> AppResult<Option<ResolvedTitle>> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        cached!(
            self.cache,
            CacheKey::TitleLookup(kind, name.to_string(), year),
            LOOKUP_CACHE_TTL,
            async move {
                let url = format!("{}/search/{}", self.api_url, Self::endpoint(kind));
                let mut query: Vec<(&str, String)> = vec![
                    ("api_key", self.api_key.clone()),
                    ("query", name.to_string()),
                ];
                if let Some(year) = year {
                    query.push((Self::year_param(kind), year.to_string()));
                }

                let response = self.http_client.get(&url).query(&query).send().await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Upstream(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let results: TmdbSearchResponse = response.json().await?;
                let resolved = results.results.into_iter().find(|hit| hit.id > 0).map(|hit| {
                    ResolvedTitle {
                        id: hit.id,
                        poster_url: self.poster_url(hit.poster_path.as_deref()),
                    }
                });

                tracing::debug!(
                    kind = %kind,
                    name = %name,
                    resolved = resolved.is_some(),
                    "Title lookup completed"
                );

                Ok(resolved)
            }
        )
    }

    async fn details(&self, kind: ContentKind, id: i64) -> AppResult<Option<TitleDetails>> {
        if id <= 0 {
            return Ok(None);
        }

        cached!(
            self.cache,
            CacheKey::TitleDetails(kind, id),
            DETAILS_CACHE_TTL,
            async move {
                let url = format!("{}/{}/{}", self.api_url, Self::endpoint(kind), id);
                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", self.api_key.as_str())])
                    .send()
                    .await?;

                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Upstream(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let details: TmdbDetailsResponse = response.json().await?;
                let details = self.convert_details(kind, details)?;

                tracing::debug!(kind = %kind, id = id, "Title details fetched");

                Ok(Some(details))
            }
        )
    }
}
