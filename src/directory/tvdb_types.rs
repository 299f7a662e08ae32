/// TheTVDB v4 API response types for deserialization.
///
/// These structures mirror the JSON response format of the TheTVDB v4 API.
/// Only the fields we actually map are declared.
use serde::Deserialize;
use serde_json::Value;

/// Every TheTVDB response wraps its payload in a `data` member.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEnvelope<T> {
    pub data: T,
}

/// Payload of `POST /login`.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbLogin {
    pub token: String,
}

/// A single hit of `GET /search`.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbSearchResult {
    /// Namespaced identifier, e.g. `"series-81189"` (sometimes a bare number)
    pub id: Value,
    pub name: String,
}

/// Payload of `GET /series/{id}/extended`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TvdbSeries {
    pub id: u64,
    pub name: String,
    pub overview: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub genres: Vec<TvdbGenre>,
    #[serde(default)]
    pub content_ratings: Vec<TvdbContentRating>,
    #[serde(default)]
    pub seasons: Vec<TvdbSeason>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TvdbGenre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TvdbContentRating {
    pub name: String,
    pub country: Option<String>,
}

/// A season reference inside an extended series record.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbSeason {
    pub id: u64,
    pub number: i64,
    #[serde(rename = "type")]
    pub season_type: Option<TvdbSeasonType>,
}

/// The ordering a season belongs to (official, dvd, absolute, ...).
#[derive(Debug, Deserialize)]
pub(super) struct TvdbSeasonType {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Payload of `GET /seasons/{id}/extended`.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbSeasonDetails {
    #[serde(default)]
    pub episodes: Vec<TvdbEpisode>,
}

/// A single episode of a season.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEpisode {
    pub number: i64,
    /// Episode title (may be null for untranslated episodes)
    pub name: Option<String>,
    pub overview: Option<String>,
    pub aired: Option<String>,
}
