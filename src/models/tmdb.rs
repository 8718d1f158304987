use serde::Deserialize;

/// Raw TMDB search response for both /search/movie and /search/tv
///
/// Movie hits carry `title`/`release_date`, TV hits carry
/// `name`/`first_air_date`; both are modeled here and normalized by the
/// accessors below.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchHit {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl TmdbSearchHit {
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        parse_year(
            self.release_date
                .as_deref()
                .or(self.first_air_date.as_deref()),
        )
    }
}

/// Raw TMDB details response for /movie/{id} and /tv/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbDetailsResponse {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

impl TmdbDetailsResponse {
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        parse_year(
            self.release_date
                .as_deref()
                .or(self.first_air_date.as_deref()),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

/// Extracts the year from a TMDB date string ("2010-07-16" -> 2010)
pub fn parse_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("2010-07-16")), Some(2010));
        assert_eq!(parse_year(Some("1999")), Some(1999));
        assert_eq!(parse_year(Some("")), None);
        assert_eq!(parse_year(None), None);
    }

    #[test]
    fn test_movie_hit_deserialization() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-16",
            "poster_path": "/inception.jpg"
        }"#;

        let hit: TmdbSearchHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.id, 27205);
        assert_eq!(hit.display_title(), Some("Inception"));
        assert_eq!(hit.year(), Some(2010));
        assert_eq!(hit.poster_path, Some("/inception.jpg".to_string()));
    }

    #[test]
    fn test_tv_hit_deserialization() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20"
        }"#;

        let hit: TmdbSearchHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.display_title(), Some("Breaking Bad"));
        assert_eq!(hit.year(), Some(2008));
        assert_eq!(hit.poster_path, None);
    }

    #[test]
    fn test_details_deserialization() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-16",
            "overview": "A thief who steals corporate secrets",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "vote_average": 8.4
        }"#;

        let details: TmdbDetailsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(details.id, 27205);
        assert_eq!(details.year(), Some(2010));
        assert_eq!(details.genres.len(), 2);
        assert_eq!(details.genres[0].name, "Action");
        assert_eq!(details.vote_average, Some(8.4));
    }

    #[test]
    fn test_empty_search_response() {
        let response: TmdbSearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(response.results.is_empty());

        // TMDB omits the field entirely on some error payloads
        let response: TmdbSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());
    }
}
