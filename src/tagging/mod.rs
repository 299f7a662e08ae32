//! Container tag mapping
//!
//! This module maps resolved series and episode metadata onto the fixed set
//! of container tag slots and defines the trait used to persist them.

mod mp4;

pub use mp4::Mp4TagWriter;

use crate::directory::{EpisodeRecord, SeriesRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// US TV parental guideline ratings and their container codes
const CONTENT_RATINGS: &[(&str, u32)] = &[
    ("TV-Y", 100),
    ("TV-Y7", 200),
    ("TV-G", 300),
    ("TV-PG", 400),
    ("TV-14", 500),
    ("TV-MA", 600),
];

/// Errors raised when a bundle lacks one of the identity fields
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Series name is missing")]
    MissingSeriesName,

    #[error("Season number is missing")]
    MissingSeasonNumber,

    #[error("Episode number is missing")]
    MissingEpisodeNumber,
}

/// Errors that can occur while persisting tags
#[derive(Debug, Error)]
pub enum TagWriteError {
    /// The container format cannot carry these tags
    #[error("Unsupported container for tagging: {0}")]
    UnsupportedContainer(PathBuf),

    /// Failed to open the file
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The tag codec failed to read or save the container
    #[error("Failed to write tags to {path}: {message}")]
    Codec { path: PathBuf, message: String },
}

/// Kind of media stored in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    TvShow,
}

impl MediaKind {
    /// Numeric media kind code as stored in the container
    pub fn code(self) -> u8 {
        match self {
            MediaKind::TvShow => 10,
        }
    }
}

/// Embedded cover image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artwork {
    /// Sniffed MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Artwork {
    /// Wraps downloaded bytes, returning `None` if they are not an image
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        let kind = infer::get(&data).filter(|_| infer::is_image(&data))?;
        Some(Self {
            mime_type: kind.mime_type().to_string(),
            data,
        })
    }
}

/// Everything known about a file at tagging time
#[derive(Debug, Clone, Default)]
pub struct MetadataBundle<'a> {
    pub episode_title: Option<String>,
    pub series_name: Option<String>,
    pub season_number: Option<i64>,
    pub episode_number: Option<i64>,
    pub series: Option<&'a SeriesRecord>,
    pub episode: Option<&'a EpisodeRecord>,
    /// ISO 639-2 language of the metadata
    pub language: Option<String>,
}

/// The logical tag fields written into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSet {
    pub title: Option<String>,
    pub show_name: String,
    pub album: String,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    /// (episode number, total); the total is left at 0
    pub track_number: Option<(u16, u16)>,
    /// (season number, total); the total is left at 0
    pub disk_number: Option<(u16, u16)>,
    pub media_kind: MediaKind,
    pub content_rating: Option<u32>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    /// Episode level description
    pub short_description: Option<String>,
    /// Series level description
    pub long_description: Option<String>,
    pub language: Option<String>,
    pub artwork: Option<Artwork>,
}

/// Trait for persisting a tag set into a media container
///
/// Implementations must treat a write as all-or-nothing per file.
pub trait TagWriter {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), TagWriteError>;
}

/// Looks up the container code of a textual content rating
///
/// Unknown ratings map to 0.
pub fn content_rating_code(rating: &str) -> u32 {
    let rating = rating.trim();
    CONTENT_RATINGS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(rating))
        .map(|(_, code)| *code)
        .unwrap_or(0)
}

/// Maps a metadata bundle onto container tag fields
///
/// # Errors
///
/// Fails when the series name, season number or episode number is missing.
/// Numbers which are present but do not fit a signed 32 bit slot are
/// silently left out together with the track and disk fields. The track and
/// disk tuples are additionally left out when their number exceeds 16 bits.
pub fn map_tags(bundle: &MetadataBundle<'_>) -> Result<TagSet, MappingError> {
    let series_name = non_empty(bundle.series_name.as_deref()).ok_or(MappingError::MissingSeriesName)?;
    let season = bundle.season_number.ok_or(MappingError::MissingSeasonNumber)?;
    let episode = bundle.episode_number.ok_or(MappingError::MissingEpisodeNumber)?;

    // The number slots hold signed 32 bit values, the track and disk tuples 16 bit
    let positions = match (slot_number(season), slot_number(episode)) {
        (Some(season), Some(episode)) => Some((season, episode)),
        _ => {
            tracing::debug!(season, episode, "season or episode number out of range, omitting");
            None
        }
    };
    let tuple_number = |n: u32| u16::try_from(n).ok().map(|n| (n, 0));

    let series = bundle.series;
    let episode_info = bundle.episode;

    Ok(TagSet {
        title: non_empty(bundle.episode_title.as_deref()),
        show_name: series_name.clone(),
        album: series_name,
        season_number: positions.map(|(season, _)| season),
        episode_number: positions.map(|(_, episode)| episode),
        track_number: positions.and_then(|(_, episode)| tuple_number(episode)),
        disk_number: positions.and_then(|(season, _)| tuple_number(season)),
        media_kind: MediaKind::TvShow,
        content_rating: series
            .and_then(|s| s.rating.as_deref())
            .map(content_rating_code)
            .filter(|code| *code != 0),
        genre: series
            .and_then(|s| s.genre.as_ref())
            .and_then(|g| non_empty(g.primary())),
        release_date: episode_info
            .and_then(|e| e.aired.as_deref())
            .and_then(canonical_date),
        short_description: episode_info.and_then(|e| non_empty(Some(e.overview.as_str()))),
        long_description: series.and_then(|s| non_empty(Some(s.overview.as_str()))),
        language: non_empty(bundle.language.as_deref()),
        artwork: None,
    })
}

/// Coerces a number into the non-negative range of a signed 32 bit slot
fn slot_number(value: i64) -> Option<u32> {
    i32::try_from(value).ok().and_then(|n| u32::try_from(n).ok())
}

/// Reformats an air date to `YYYY-MM-DD`, `None` if it does not parse
fn canonical_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    // Some sources append a time component
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::{episode, mandalorian};

    fn bundle<'a>(series: &'a SeriesRecord, episode: &'a EpisodeRecord) -> MetadataBundle<'a> {
        MetadataBundle {
            episode_title: Some(episode.name.clone()),
            series_name: Some(series.name.clone()),
            season_number: Some(1),
            episode_number: Some(3),
            series: Some(series),
            episode: Some(episode),
            language: Some("eng".to_string()),
        }
    }

    #[test]
    fn test_content_rating_codes() {
        assert_eq!(content_rating_code("TV-Y"), 100);
        assert_eq!(content_rating_code("TV-Y7"), 200);
        assert_eq!(content_rating_code("TV-G"), 300);
        assert_eq!(content_rating_code("TV-PG"), 400);
        assert_eq!(content_rating_code("TV-14"), 500);
        assert_eq!(content_rating_code("TV-MA"), 600);
        assert_eq!(content_rating_code("FSK 16"), 0);
        assert_eq!(content_rating_code(""), 0);
    }

    #[test]
    fn test_full_mapping() {
        let series = mandalorian();
        let episode = episode(3, "Chapter 3: The Sin");

        let tags = map_tags(&bundle(&series, &episode)).unwrap();

        assert_eq!(tags.title.as_deref(), Some("Chapter 3: The Sin"));
        assert_eq!(tags.show_name, "The Mandalorian");
        assert_eq!(tags.album, "The Mandalorian");
        assert_eq!(tags.season_number, Some(1));
        assert_eq!(tags.episode_number, Some(3));
        assert_eq!(tags.track_number, Some((3, 0)));
        assert_eq!(tags.disk_number, Some((1, 0)));
        assert_eq!(tags.media_kind.code(), 10);
        assert_eq!(tags.content_rating, Some(500));
        assert_eq!(tags.genre.as_deref(), Some("Science Fiction"));
        assert_eq!(tags.release_date.as_deref(), Some("2019-11-12"));
        assert_eq!(tags.short_description, Some(episode.overview.clone()));
        assert_eq!(tags.long_description, Some(series.overview.clone()));
        assert_eq!(tags.language.as_deref(), Some("eng"));
    }

    #[test]
    fn test_tv_ma_rating() {
        let mut series = mandalorian();
        series.rating = Some("TV-MA".to_string());
        let episode = episode(3, "Chapter 3");

        let tags = map_tags(&bundle(&series, &episode)).unwrap();

        assert_eq!(tags.content_rating, Some(600));
    }

    #[test]
    fn test_unknown_rating_is_omitted() {
        let mut series = mandalorian();
        series.rating = Some("Not Rated".to_string());
        let episode = episode(3, "Chapter 3");

        let tags = map_tags(&bundle(&series, &episode)).unwrap();

        assert_eq!(tags.content_rating, None);
    }

    #[test]
    fn test_missing_identity_fields() {
        let series = mandalorian();
        let episode = episode(3, "Chapter 3");

        let mut missing_name = bundle(&series, &episode);
        missing_name.series_name = Some("   ".to_string());
        assert_eq!(map_tags(&missing_name), Err(MappingError::MissingSeriesName));

        let mut missing_season = bundle(&series, &episode);
        missing_season.season_number = None;
        assert_eq!(map_tags(&missing_season), Err(MappingError::MissingSeasonNumber));

        let mut missing_episode = bundle(&series, &episode);
        missing_episode.episode_number = None;
        assert_eq!(map_tags(&missing_episode), Err(MappingError::MissingEpisodeNumber));
    }

    #[test]
    fn test_out_of_range_numbers_are_omitted() {
        let series = mandalorian();
        let episode = episode(3, "Chapter 3");
        let mut input = bundle(&series, &episode);
        input.season_number = Some(-1);

        let tags = map_tags(&input).unwrap();

        assert_eq!(tags.season_number, None);
        assert_eq!(tags.episode_number, None);
        assert_eq!(tags.track_number, None);
        assert_eq!(tags.disk_number, None);
        assert_eq!(tags.show_name, "The Mandalorian");
    }

    #[test]
    fn test_large_numbers_keep_their_own_slots() {
        let series = mandalorian();
        let episode = episode(3, "Chapter 3");
        let mut input = bundle(&series, &episode);
        input.season_number = Some(2019);
        input.episode_number = Some(70_000);

        let tags = map_tags(&input).unwrap();

        assert_eq!(tags.season_number, Some(2019));
        assert_eq!(tags.episode_number, Some(70_000));
        assert_eq!(tags.disk_number, Some((2019, 0)));
        assert_eq!(tags.track_number, None);

        input.season_number = Some(i64::from(i32::MAX) + 1);
        let tags = map_tags(&input).unwrap();
        assert_eq!(tags.season_number, None);
        assert_eq!(tags.episode_number, None);
    }

    #[test]
    fn test_descriptions_are_never_swapped() {
        let mut series = mandalorian();
        let mut episode = episode(3, "Chapter 3");

        series.overview = String::new();
        let tags = map_tags(&bundle(&series, &episode)).unwrap();
        assert_eq!(tags.short_description, Some(episode.overview.clone()));
        assert_eq!(tags.long_description, None);

        series.overview = "Series overview".to_string();
        episode.overview = "  ".to_string();
        let tags = map_tags(&bundle(&series, &episode)).unwrap();
        assert_eq!(tags.short_description, None);
        assert_eq!(tags.long_description.as_deref(), Some("Series overview"));
    }

    #[test]
    fn test_genre_shapes() {
        let mut series = mandalorian();
        let episode = episode(3, "Chapter 3");

        series.genre = Some(crate::directory::Genre::Single("Western".to_string()));
        let tags = map_tags(&bundle(&series, &episode)).unwrap();
        assert_eq!(tags.genre.as_deref(), Some("Western"));

        series.genre = None;
        let tags = map_tags(&bundle(&series, &episode)).unwrap();
        assert_eq!(tags.genre, None);
    }

    #[test]
    fn test_release_date_parsing() {
        assert_eq!(canonical_date("2019-11-12").as_deref(), Some("2019-11-12"));
        assert_eq!(canonical_date("2019-1-2").as_deref(), Some("2019-01-02"));
        assert_eq!(canonical_date("2019-11-12T08:00:00Z").as_deref(), Some("2019-11-12"));
        assert_eq!(canonical_date("12.11.2019"), None);
        assert_eq!(canonical_date(""), None);
    }

    #[test]
    fn test_without_directory_records() {
        let input = MetadataBundle {
            episode_title: None,
            series_name: Some("Unlisted Show".to_string()),
            season_number: Some(2),
            episode_number: Some(4),
            ..MetadataBundle::default()
        };

        let tags = map_tags(&input).unwrap();

        assert_eq!(tags.title, None);
        assert_eq!(tags.content_rating, None);
        assert_eq!(tags.genre, None);
        assert_eq!(tags.release_date, None);
        assert_eq!(tags.short_description, None);
        assert_eq!(tags.long_description, None);
        assert_eq!(tags.disk_number, Some((2, 0)));
    }

    #[test]
    fn test_artwork_requires_image_bytes() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let artwork = Artwork::from_bytes(png).unwrap();
        assert_eq!(artwork.mime_type, "image/png");

        assert_eq!(Artwork::from_bytes(b"<html>not found</html>".to_vec()), None);
    }
}
