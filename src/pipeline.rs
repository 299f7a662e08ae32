//! Batch orchestration
//!
//! A batch runs in two sequential phases. The analyze phase interprets each
//! filename and resolves it against the directory; the apply phase writes
//! tags for every file that resolved to both a series and an episode. A
//! failure of one file is recorded for that file and never stops the batch.

use crate::directory::{DirectoryService, EpisodeRecord, SeriesRecord};
use crate::files::ensure_supported;
use crate::interpreter::{FilenameGuess, InterpreterAdapter};
use crate::resolution::{match_episode, resolve_series};
use crate::tagging::{Artwork, MetadataBundle, TagWriter, map_tags};
use crate::{ProgressEvent, TaggerError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of the analyze phase for a single file
///
/// When `error` is set, `series_info` and `episode_info` are both `None`.
/// Without an error either of them may still be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub file_path: PathBuf,
    pub filename: String,
    pub parsed_info: FilenameGuess,
    pub series_info: Option<SeriesRecord>,
    pub episode_info: Option<EpisodeRecord>,
    pub error: Option<String>,
}

impl ResolutionResult {
    fn new(file_path: &Path, filename: String, parsed_info: FilenameGuess) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            filename,
            parsed_info,
            series_info: None,
            episode_info: None,
            error: None,
        }
    }

    /// Marks the file as failed, discarding any partial resolution
    fn failed(mut self, error: String) -> Self {
        self.series_info = None;
        self.episode_info = None;
        self.error = Some(error);
        self
    }

    /// True if both series and episode were resolved
    pub fn is_matched(&self) -> bool {
        self.series_info.is_some() && self.episode_info.is_some()
    }
}

/// Outcome of the apply phase for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ApplyOutcome {
    /// Tags were written
    Tagged,
    /// Writing the tags failed
    Failed(String),
    /// The file lacked series or episode information and was skipped
    Unmatched,
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ApplyOutcome::Tagged)
    }
}

/// Handle to stop a running batch after the file currently in progress
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the resolution and tagging pipeline over a batch of files
pub struct Tagger {
    interpreter: InterpreterAdapter,
    directory: Box<dyn DirectoryService>,
    writer: Box<dyn TagWriter>,
    embed_artwork: bool,
    cancel: CancelHandle,
}

impl Tagger {
    /// Creates a new tagger from its collaborators
    pub fn new(
        interpreter: InterpreterAdapter,
        directory: Box<dyn DirectoryService>,
        writer: Box<dyn TagWriter>,
    ) -> Self {
        Self {
            interpreter,
            directory,
            writer,
            embed_artwork: false,
            cancel: CancelHandle::default(),
        }
    }

    /// Enables downloading and embedding of series artwork
    pub fn with_artwork(mut self, enabled: bool) -> Self {
        self.embed_artwork = enabled;
        self
    }

    /// Returns a handle which stops the batch between two files
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the analyze phase over `file_paths`
    ///
    /// Returns one [`ResolutionResult`] per processed file. Fewer results
    /// than paths are returned only if the batch was cancelled.
    ///
    /// # Errors
    ///
    /// Fails before any file is processed if a path does not carry a
    /// supported video extension.
    pub fn analyze<F>(
        &self,
        file_paths: &[PathBuf],
        mut progress_callback: F,
    ) -> Result<Vec<ResolutionResult>, TaggerError>
    where
        F: FnMut(ProgressEvent),
    {
        ensure_supported(file_paths)?;

        let total = file_paths.len();
        progress_callback(ProgressEvent::AnalyzeStarted { total });

        let mut results = Vec::with_capacity(total);

        for (index, path) in file_paths.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = index, total, "analysis cancelled");
                progress_callback(ProgressEvent::Cancelled {
                    processed: index,
                    total,
                });
                break;
            }

            progress_callback(ProgressEvent::AnalyzingFile {
                index,
                total,
                path: path.clone(),
            });

            let result = self.analyze_file(path);

            progress_callback(ProgressEvent::FileAnalyzed {
                index,
                total,
                path: path.clone(),
                matched: result.is_matched(),
            });

            results.push(result);
        }

        Ok(results)
    }

    /// Interprets and resolves a single file
    fn analyze_file(&self, path: &Path) -> ResolutionResult {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let guess = self.interpreter.guess(&filename);
        let mut result = ResolutionResult::new(path, filename, guess.clone());

        let Some(series_name) = guess.series_name.as_deref() else {
            tracing::info!(path = %path.display(), "no series name recognized");
            return result;
        };

        let series = match resolve_series(self.directory.as_ref(), series_name) {
            Ok(Some(series)) => series,
            Ok(None) => {
                tracing::info!(path = %path.display(), series_name, "series not found in directory");
                return result;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "series resolution failed");
                return result.failed(e.to_string());
            }
        };

        if let (Some(season), Some(episode)) = (guess.season_number, guess.episode_number) {
            match match_episode(self.directory.as_ref(), &series, season, episode) {
                Ok(Some(found)) => result.episode_info = Some(found),
                Ok(None) => {
                    tracing::info!(path = %path.display(), season, episode, "episode not found in season");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "episode lookup failed");
                }
            }
        }

        result.series_info = Some(series);
        result
    }

    /// Runs the apply phase over analyzed files
    ///
    /// Returns one [`ApplyOutcome`] per processed result, in order.
    pub fn apply<F>(
        &self,
        results: &[ResolutionResult],
        language_hint: &str,
        mut progress_callback: F,
    ) -> Vec<ApplyOutcome>
    where
        F: FnMut(ProgressEvent),
    {
        let total = results.len();
        progress_callback(ProgressEvent::ApplyStarted { total });

        let mut outcomes = Vec::with_capacity(total);

        for (index, result) in results.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = index, total, "tagging cancelled");
                progress_callback(ProgressEvent::Cancelled {
                    processed: index,
                    total,
                });
                break;
            }

            progress_callback(ProgressEvent::TaggingFile {
                index,
                total,
                path: result.file_path.clone(),
            });

            let outcome = self.apply_one(result, language_hint);

            progress_callback(ProgressEvent::FileTagged {
                index,
                total,
                path: result.file_path.clone(),
                outcome: outcome.clone(),
            });

            outcomes.push(outcome);
        }

        outcomes
    }

    fn apply_one(&self, result: &ResolutionResult, language_hint: &str) -> ApplyOutcome {
        let (Some(series), Some(episode)) = (&result.series_info, &result.episode_info) else {
            return ApplyOutcome::Unmatched;
        };

        let episode_title = Some(episode.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| result.parsed_info.episode_title.clone());

        let bundle = MetadataBundle {
            episode_title,
            series_name: Some(series.name.clone()),
            season_number: result.parsed_info.season_number.map(i64::from),
            episode_number: result.parsed_info.episode_number.map(i64::from),
            series: Some(series),
            episode: Some(episode),
            language: Some(language_hint.to_string()),
        };

        let mut tags = match map_tags(&bundle) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::info!(path = %result.file_path.display(), error = %e, "skipping file");
                return ApplyOutcome::Unmatched;
            }
        };

        if self.embed_artwork {
            tags.artwork = self.fetch_artwork(series);
        }

        match self.writer.write_tags(&result.file_path, &tags) {
            Ok(()) => ApplyOutcome::Tagged,
            Err(e) => {
                tracing::warn!(path = %result.file_path.display(), error = %e, "failed to write tags");
                ApplyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Downloads the series poster; failures only cost the artwork
    fn fetch_artwork(&self, series: &SeriesRecord) -> Option<Artwork> {
        let url = series.image_url.as_deref()?;

        match self.directory.fetch_artwork(url) {
            Ok(data) => {
                let artwork = Artwork::from_bytes(data);
                if artwork.is_none() {
                    tracing::warn!(url, "artwork is not an image");
                }
                artwork
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to download artwork");
                None
            }
        }
    }
}
