//! Episode Tagger - Identify loosely named tv episode files and tag them
//!
//! This library interprets video filenames with a language model, resolves
//! the guess against TheTVDB and writes canonical metadata into the MP4
//! container of each file.

mod config;
mod directory;
mod files;
mod interpreter;
mod pipeline;
mod rate_limit;
mod resolution;
mod tagging;

use std::path::PathBuf;
use thiserror::Error;

// Re-export error types
pub use config::ConfigError;
pub use directory::DirectoryError;
pub use files::FileError;
pub use interpreter::InterpreterError;
pub use resolution::ResolutionError;
pub use tagging::{MappingError, TagWriteError};

pub use config::{Config, DEFAULT_LANGUAGE, DEFAULT_MISTRAL_MODEL, interval_from_secs};
pub use directory::{
    DirectoryService, EpisodeRecord, Genre, SearchCandidate, SeasonRef, SeriesRecord, TvdbClient,
};
pub use files::{
    CollectedFiles, SUPPORTED_VIDEO_EXTENSIONS, collect_video_files, ensure_supported,
    is_supported_video,
};
pub use interpreter::{
    FilenameGuess, Interpreter, InterpreterAdapter, InterpreterResponse, MistralInterpreter,
};
pub use pipeline::{ApplyOutcome, CancelHandle, ResolutionResult, Tagger};
pub use rate_limit::{Clock, DEFAULT_MIN_INTERVAL, RateLimiter, SystemClock};
pub use resolution::{match_episode, normalize_series_id, resolve_series};
pub use tagging::{
    Artwork, MediaKind, MetadataBundle, Mp4TagWriter, TagSet, TagWriter, content_rating_code,
    map_tags,
};

/// Progress event emitted while a batch is processed
///
/// These events allow library users to track progress and provide feedback
/// during both phases. Every file produces exactly one `FileAnalyzed` and,
/// if it reaches the apply phase, one `FileTagged` event.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Analyze phase started
    AnalyzeStarted { total: usize },

    /// Interpreting and resolving a specific file
    AnalyzingFile {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// A file was analyzed
    FileAnalyzed {
        index: usize,
        total: usize,
        path: PathBuf,
        matched: bool,
    },

    /// Apply phase started
    ApplyStarted { total: usize },

    /// Writing tags of a specific file
    TaggingFile {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// A file was handled by the apply phase
    FileTagged {
        index: usize,
        total: usize,
        path: PathBuf,
        outcome: ApplyOutcome,
    },

    /// The batch was cancelled before `processed` files were done
    Cancelled { processed: usize, total: usize },
}

/// Top-level error type for tagging runs
#[derive(Debug, Error)]
pub enum TaggerError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid input files
    #[error("File error: {0}")]
    Files(#[from] FileError),

    /// Directory service unusable, e.g. rejected credentials
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Builds a tagger backed by Mistral, TheTVDB and the MP4 tag writer
///
/// Validates `config` and logs in to TheTVDB. A rejected login is fatal for
/// the whole run, unlike per-file directory failures during analysis.
///
/// # Examples
///
/// ```no_run
/// use episode_tagger::{Config, ProgressEvent, connect_tagger};
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// let config = Config {
///     mistral_api_key: "...".to_string(),
///     mistral_model: "mistral-medium".to_string(),
///     tvdb_api_key: "...".to_string(),
///     tvdb_pin: None,
///     language: "eng".to_string(),
///     min_interval: Duration::from_secs(2),
///     embed_artwork: false,
/// };
/// let tagger = connect_tagger(&config).unwrap();
///
/// let files = vec![PathBuf::from("The.Mandalorian.S01E01.mp4")];
/// let results = tagger.analyze(&files, |event| {
///     if let ProgressEvent::AnalyzingFile { index, total, path } = event {
///         println!("[{}/{}] {}", index + 1, total, path.display());
///     }
/// }).unwrap();
///
/// let outcomes = tagger.apply(&results, &config.language, |_| {});
/// ```
pub fn connect_tagger(config: &Config) -> Result<Tagger, TaggerError> {
    config.validate()?;

    let directory = TvdbClient::connect(&config.tvdb_api_key, config.tvdb_pin.as_deref())?;
    tracing::info!("logged in to TheTVDB");

    let interpreter = InterpreterAdapter::new(
        Box::new(MistralInterpreter::new(
            config.mistral_api_key.as_str(),
            config.mistral_model.as_str(),
        )),
        RateLimiter::new(config.min_interval),
    );

    Ok(Tagger::new(
        interpreter,
        Box::new(directory),
        Box::new(Mp4TagWriter::new()),
    )
    .with_artwork(config.embed_artwork))
}
