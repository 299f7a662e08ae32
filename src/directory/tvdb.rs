/// TheTVDB directory implementation.
use super::tvdb_types::{
    TvdbContentRating, TvdbEnvelope, TvdbEpisode, TvdbLogin, TvdbSearchResult, TvdbSeasonDetails,
    TvdbSeries,
};
use super::{
    DirectoryError, DirectoryService, EpisodeRecord, Genre, SearchCandidate, SeasonRef,
    SeriesRecord,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const DEFAULT_BASE_URL: &str = "https://api4.thetvdb.com/v4";

/// Directory service for the TheTVDB v4 API.
///
/// The client authenticates once on construction and reuses the bearer token
/// for every later request.
pub struct TvdbClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl TvdbClient {
    /// Logs in to TheTVDB and returns an authenticated client.
    ///
    /// # Errors
    ///
    /// Fails if the service cannot be reached or rejects the credentials. No
    /// file can be resolved without a token, so callers should treat this as
    /// fatal.
    pub fn connect(api_key: &str, pin: Option<&str>) -> Result<Self, DirectoryError> {
        Self::connect_to(DEFAULT_BASE_URL, api_key, pin)
    }

    /// Logs in against a custom API base URL.
    pub fn connect_to(
        base_url: &str,
        api_key: &str,
        pin: Option<&str>,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::blocking::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut body = json!({ "apikey": api_key });
        if let Some(pin) = pin {
            body["pin"] = Value::String(pin.to_string());
        }

        let response = client
            .post(format!("{}/login", base_url))
            .json(&body)
            .send()
            .map_err(|e| DirectoryError::RequestError(e.to_string()))?;

        let login: TvdbEnvelope<TvdbLogin> = Self::decode(response, "login")?;

        tracing::debug!(base_url = %base_url, "authenticated with TheTVDB");

        Ok(Self {
            client,
            base_url,
            token: login.data.token,
        })
    }

    /// Issues an authenticated GET request and decodes the `data` payload.
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DirectoryError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .map_err(|e| DirectoryError::RequestError(e.to_string()))?;

        let envelope: TvdbEnvelope<T> = Self::decode(response, path)?;
        Ok(envelope.data)
    }

    /// Maps HTTP failures to directory errors and parses the JSON body.
    fn decode<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
        what: &str,
    ) -> Result<T, DirectoryError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::AuthenticationFailed(format!(
                "HTTP {} for {}",
                status.as_u16(),
                what
            )));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            return Err(DirectoryError::RequestError(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| DirectoryError::ParseError(e.to_string()))
    }

    /// Converts a search hit into a candidate, keeping the raw identifier.
    fn convert_candidate(result: TvdbSearchResult) -> Option<SearchCandidate> {
        let id = match result.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            _ => return None,
        };

        Some(SearchCandidate {
            id,
            name: result.name,
        })
    }

    /// Converts extended series data to our internal SeriesRecord structure.
    ///
    /// Only seasons of the official ordering are kept so that a season
    /// number identifies exactly one season.
    fn convert_series(series: TvdbSeries) -> SeriesRecord {
        let seasons = series
            .seasons
            .into_iter()
            .filter(|season| {
                season
                    .season_type
                    .as_ref()
                    .and_then(|t| t.kind.as_deref())
                    .is_none_or(|kind| kind == "official")
            })
            .filter_map(|season| {
                Some(SeasonRef {
                    number: u32::try_from(season.number).ok()?,
                    id: season.id,
                })
            })
            .collect();

        let genre = (!series.genres.is_empty()).then(|| {
            Genre::List(series.genres.into_iter().map(|g| g.name).collect())
        });

        SeriesRecord {
            id: series.id,
            name: series.name,
            overview: series.overview.unwrap_or_default(),
            genre,
            rating: Self::preferred_rating(&series.content_ratings),
            seasons,
            image_url: series.image.filter(|url| !url.is_empty()),
        }
    }

    /// Picks the US content rating, falling back to the first one listed.
    fn preferred_rating(ratings: &[TvdbContentRating]) -> Option<String> {
        ratings
            .iter()
            .find(|r| r.country.as_deref() == Some("usa"))
            .or_else(|| ratings.first())
            .map(|r| r.name.clone())
    }

    /// Converts a TheTVDB episode to our internal EpisodeRecord structure.
    fn convert_episode(episode: TvdbEpisode) -> Option<EpisodeRecord> {
        Some(EpisodeRecord {
            number: u32::try_from(episode.number).ok()?,
            name: episode.name.unwrap_or_default(),
            overview: episode.overview.unwrap_or_default().trim().to_string(),
            aired: episode.aired.filter(|date| !date.is_empty()),
        })
    }
}

impl DirectoryService for TvdbClient {
    fn search(&self, name: &str) -> Result<Vec<SearchCandidate>, DirectoryError> {
        let results: Vec<TvdbSearchResult> =
            self.get("/search", &[("query", name), ("type", "series")])?;

        Ok(results
            .into_iter()
            .filter_map(Self::convert_candidate)
            .collect())
    }

    fn get_series(&self, id: u64) -> Result<SeriesRecord, DirectoryError> {
        let series: TvdbSeries = self.get(&format!("/series/{}/extended", id), &[("short", "true")])?;
        Ok(Self::convert_series(series))
    }

    fn get_season_episodes(&self, season_id: u64) -> Result<Vec<EpisodeRecord>, DirectoryError> {
        let season: TvdbSeasonDetails = self.get(&format!("/seasons/{}/extended", season_id), &[])?;

        Ok(season
            .episodes
            .into_iter()
            .filter_map(Self::convert_episode)
            .collect())
    }

    fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>, DirectoryError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DirectoryError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DirectoryError::RequestError(format!(
                "HTTP {} for artwork {}",
                response.status().as_u16(),
                url
            )));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| DirectoryError::RequestError(e.to_string()))
    }
}
