/// Data structures and traits for the series metadata directory.
///
/// This module provides structures to represent directory records for a TV
/// series, its seasons and its episodes, as well as the trait implemented by
/// directory services.
mod tvdb;
mod tvdb_types;

pub use tvdb::TvdbClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Request to the directory service failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The directory service rejected our credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to parse the directory's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// A ranked search hit, in the order the directory returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Raw identifier, possibly prefixed with a namespace tag (`series-123`)
    pub id: String,
    /// Display name of the series
    pub name: String,
}

/// Genre information of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Genre {
    /// Ordered list of genre names, most relevant first
    List(Vec<String>),
    /// A single genre name
    Single(String),
}

impl Genre {
    /// The genre to use when only one can be stored
    pub fn primary(&self) -> Option<&str> {
        match self {
            Genre::List(genres) => genres.first().map(String::as_str),
            Genre::Single(genre) => Some(genre.as_str()),
        }
    }
}

/// Reference from a series to one of its seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRef {
    /// The season number as shown to viewers
    pub number: u32,
    /// The directory's internal season identifier
    pub id: u64,
}

/// Extended series details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Directory identifier of the series
    pub id: u64,
    /// Canonical series name
    pub name: String,
    /// Series level description
    pub overview: String,
    /// Genre(s) of the series
    pub genre: Option<Genre>,
    /// Textual content rating, e.g. `TV-MA`
    pub rating: Option<String>,
    /// Seasons in directory order
    pub seasons: Vec<SeasonRef>,
    /// Poster artwork location
    pub image_url: Option<String>,
}

/// A single episode within a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// The episode number within its season
    pub number: u32,
    /// The episode title
    pub name: String,
    /// Episode level description
    pub overview: String,
    /// First air date, as delivered by the directory (`YYYY-MM-DD`)
    pub aired: Option<String>,
}

/// Trait for directory services that can resolve series and episodes.
///
/// Implementors of this trait retrieve canonical records from sources such
/// as TheTVDB.
pub trait DirectoryService {
    /// Searches for series by name, best match first.
    ///
    /// An empty result is not an error.
    fn search(&self, name: &str) -> Result<Vec<SearchCandidate>, DirectoryError>;

    /// Fetches extended details of a series, including its season list.
    fn get_series(&self, id: u64) -> Result<SeriesRecord, DirectoryError>;

    /// Fetches all episodes of a season by its internal identifier.
    fn get_season_episodes(&self, season_id: u64) -> Result<Vec<EpisodeRecord>, DirectoryError>;

    /// Downloads artwork referenced by a series record.
    fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>, DirectoryError>;
}
