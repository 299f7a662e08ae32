//! Resolution of filename guesses against the directory
//!
//! Series resolution trusts the directory's ranking: the first search hit is
//! the match. Episode matching goes through the season list of the resolved
//! series, since season numbers are not lookup keys of their own.

use crate::directory::{DirectoryError, DirectoryService, EpisodeRecord, SeriesRecord};
use thiserror::Error;

/// Errors that can occur while resolving a series or an episode
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The directory service failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A search hit carried an identifier we cannot use
    #[error("Invalid series identifier: {0}")]
    InvalidSeriesId(String),

    /// The series has no season with the requested number
    #[error("Season {season} not found for series {series_id}")]
    SeasonNotFound { series_id: u64, season: u32 },
}

/// Normalizes a raw directory identifier to its numeric form
///
/// Some directory responses prefix identifiers with a namespace tag
/// (`series-81189`); the tag is stripped before parsing.
pub fn normalize_series_id(raw: &str) -> Result<u64, ResolutionError> {
    let trimmed = raw.trim();

    let numeric = match trimmed.rsplit_once('-') {
        Some((namespace, id)) if namespace.chars().all(|c| c.is_ascii_alphabetic()) => id,
        _ => trimmed,
    };

    numeric
        .parse::<u64>()
        .map_err(|_| ResolutionError::InvalidSeriesId(raw.to_string()))
}

/// Resolves a series name to its extended directory record
///
/// Returns `Ok(None)` when the directory knows no series of that name.
///
/// # Errors
///
/// Directory failures and unusable identifiers are returned to the caller,
/// which decides how to record them for the file at hand.
pub fn resolve_series(
    directory: &dyn DirectoryService,
    name: &str,
) -> Result<Option<SeriesRecord>, ResolutionError> {
    let candidates = directory.search(name)?;

    let Some(best) = candidates.into_iter().next() else {
        tracing::debug!(series_name = name, "no directory match");
        return Ok(None);
    };

    let id = normalize_series_id(&best.id)?;
    tracing::debug!(series_name = name, matched = %best.name, id, "series matched");

    Ok(Some(directory.get_series(id)?))
}

/// Finds a single episode of a resolved series
///
/// The season is located through the series' season list; the first
/// episode whose number equals `episode` wins. Returns `Ok(None)` when the
/// season exists but holds no such episode.
///
/// # Errors
///
/// Returns [`ResolutionError::SeasonNotFound`] when the series has no season
/// numbered `season`, and directory failures as they occur.
pub fn match_episode(
    directory: &dyn DirectoryService,
    series: &SeriesRecord,
    season: u32,
    episode: u32,
) -> Result<Option<EpisodeRecord>, ResolutionError> {
    let season_ref = series
        .seasons
        .iter()
        .find(|s| s.number == season)
        .ok_or(ResolutionError::SeasonNotFound {
            series_id: series.id,
            season,
        })?;

    let episodes = directory.get_season_episodes(season_ref.id)?;

    Ok(episodes.into_iter().find(|e| e.number == episode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::{FakeDirectory, candidate, episode, mandalorian};

    #[test]
    fn test_normalize_series_id() {
        assert_eq!(normalize_series_id("series-81189").unwrap(), 81189);
        assert_eq!(normalize_series_id("81189").unwrap(), 81189);
        assert_eq!(normalize_series_id(" 42 ").unwrap(), 42);
        assert!(normalize_series_id("series-abc").is_err());
        assert!(normalize_series_id("movie-12-3").is_err());
        assert!(normalize_series_id("").is_err());
    }

    #[test]
    fn test_first_candidate_wins() {
        let directory = FakeDirectory::new()
            .with_search(
                "The Mandalorian",
                vec![
                    candidate("series-361753", "The Mandalorian"),
                    candidate("series-1", "The Mandalorian (Fan Edit)"),
                ],
            )
            .with_series(mandalorian());

        let series = resolve_series(&directory, "The Mandalorian").unwrap().unwrap();

        assert_eq!(series.id, 361753);
        assert_eq!(
            directory.calls(),
            vec!["search:The Mandalorian", "series:361753"]
        );
    }

    #[test]
    fn test_no_results_is_not_an_error() {
        let directory = FakeDirectory::new();

        assert_eq!(resolve_series(&directory, "Nothing").unwrap(), None);
        assert_eq!(directory.calls(), vec!["search:Nothing"]);
    }

    #[test]
    fn test_search_failure_is_returned() {
        let directory = FakeDirectory::new().failing_search("Broken");

        let result = resolve_series(&directory, "Broken");

        assert!(matches!(
            result,
            Err(ResolutionError::Directory(DirectoryError::RequestError(_)))
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let directory = FakeDirectory::new()
            .with_search("The Mandalorian", vec![candidate("series-361753", "The Mandalorian")])
            .with_series(mandalorian())
            .with_season(1001, vec![episode(1, "Chapter 1"), episode(2, "Chapter 2")]);

        let first = resolve_series(&directory, "The Mandalorian").unwrap().unwrap();
        let second = resolve_series(&directory, "The Mandalorian").unwrap().unwrap();
        assert_eq!(first, second);

        let a = match_episode(&directory, &first, 1, 2).unwrap();
        let b = match_episode(&directory, &second, 1, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_match_episode_through_season_list() {
        let directory = FakeDirectory::new().with_season(
            1002,
            vec![episode(1, "Chapter 9"), episode(2, "Chapter 10")],
        );

        let found = match_episode(&directory, &mandalorian(), 2, 2).unwrap();

        assert_eq!(found.map(|e| e.name), Some("Chapter 10".to_string()));
        assert_eq!(directory.calls(), vec!["season:1002"]);
    }

    #[test]
    fn test_first_numeric_match_wins() {
        let directory = FakeDirectory::new().with_season(
            1001,
            vec![episode(3, "First"), episode(3, "Duplicate")],
        );

        let found = match_episode(&directory, &mandalorian(), 1, 3).unwrap();

        assert_eq!(found.map(|e| e.name), Some("First".to_string()));
    }

    #[test]
    fn test_missing_episode_is_none() {
        let directory = FakeDirectory::new().with_season(1001, vec![episode(1, "Chapter 1")]);

        assert_eq!(match_episode(&directory, &mandalorian(), 1, 9).unwrap(), None);
    }

    #[test]
    fn test_missing_season_is_reported() {
        let directory = FakeDirectory::new();

        let result = match_episode(&directory, &mandalorian(), 7, 1);

        assert!(matches!(
            result,
            Err(ResolutionError::SeasonNotFound {
                series_id: 361753,
                season: 7
            })
        ));
        assert!(directory.calls().is_empty());
    }
}
