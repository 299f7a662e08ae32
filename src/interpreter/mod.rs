//! Filename interpretation module
//!
//! This module turns a free-text video filename into a structured guess of
//! the series name, season number and episode number. The guess itself is
//! produced by an external language model; everything it returns is treated
//! as untrusted input and normalized into a [`FilenameGuess`] which always
//! carries all of its identity fields.

mod mistral;
mod normalize;

pub use mistral::MistralInterpreter;

use crate::rate_limit::RateLimiter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to a filename interpreter
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// Failed to communicate with the interpreter service
    #[error("Interpreter service error: {0}")]
    ServiceError(String),

    /// The service answered, but the answer could not be understood
    #[error("Failed to parse interpreter response: {reason}\n\nFull response:\n{response}")]
    ParseError { reason: String, response: String },
}

/// Raw answer of an interpreter, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum InterpreterResponse {
    /// The service already returned a decoded JSON value
    Structured(serde_json::Value),
    /// The service returned text which is expected to contain JSON
    Text(String),
}

/// External component guessing the identity of a file from its name
pub trait Interpreter {
    /// Interprets a single filename
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or unusable responses. Callers
    /// are expected to degrade gracefully instead of aborting.
    fn interpret(&self, filename: &str) -> Result<InterpreterResponse, InterpreterError>;
}

/// Structured guess of a file's identity
///
/// `series_name`, `season_number` and `episode_number` are always present;
/// any value which could not be understood is `None`, never a partial or
/// unparsed string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameGuess {
    /// Series name cleaned of separators, quality tags and release info
    pub series_name: Option<String>,
    /// Season number
    pub season_number: Option<u32>,
    /// Episode number within the season
    pub episode_number: Option<u32>,
    /// Episode title, if the filename carried one
    ///
    /// Only used as a fallback for display and tagging, never for lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
}

impl FilenameGuess {
    /// Returns the guess with every field unknown
    pub fn unknown() -> Self {
        Self::default()
    }

    /// True if season and episode number are both known
    pub fn has_episode_position(&self) -> bool {
        self.season_number.is_some() && self.episode_number.is_some()
    }
}

/// Wraps an [`Interpreter`] into an infallible, rate limited guesser
pub struct InterpreterAdapter {
    interpreter: Box<dyn Interpreter>,
    limiter: RateLimiter,
}

impl InterpreterAdapter {
    /// Creates a new adapter gating `interpreter` through `limiter`
    pub fn new(interpreter: Box<dyn Interpreter>, limiter: RateLimiter) -> Self {
        Self {
            interpreter,
            limiter,
        }
    }

    /// Guesses the identity of a file from its name
    ///
    /// Never fails: transport errors and malformed responses degrade to
    /// [`FilenameGuess::unknown`] or to a guess with the affected fields
    /// set to `None`.
    pub fn guess(&self, filename: &str) -> FilenameGuess {
        if filename.trim().is_empty() {
            tracing::debug!("empty filename, skipping interpreter");
            return FilenameGuess::unknown();
        }

        self.limiter.wait();

        match self.interpreter.interpret(filename) {
            Ok(response) => {
                let guess = normalize::normalize_response(&response);
                tracing::debug!(filename, ?guess, "interpreted filename");
                guess
            }
            Err(e) => {
                tracing::warn!(filename, error = %e, "interpreter call failed");
                FilenameGuess::unknown()
            }
        }
    }
}

/// Builds the instruction sent to the interpreter for a single filename
pub(crate) fn instruction_prompt(filename: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("IMPORTANT: Your output MUST be a single JSON object in the FORMAT ");
    prompt.push_str(
        r#"{"series_name": "...", "season_number": X, "episode_number": Y, "episode_title": "..."}. "#,
    );
    prompt.push_str("NOTHING ELSE IS TO BE RETURNED.\n\n");

    prompt.push_str("Extract the tv series identity from the following video filename:\n");
    prompt.push_str("- series_name: the name of the series, cleaned of dots, underscores and other separators, ");
    prompt.push_str("quality tags (1080p, x264, WEB-DL, ...) and release group information\n");
    prompt.push_str("- season_number: the season number as an integer\n");
    prompt.push_str("- episode_number: the episode number as an integer\n");
    prompt.push_str("- episode_title: the episode title if the filename contains one\n");
    prompt.push_str("Do not treat the episode title or the file extension as part of the series name. ");
    prompt.push_str("Use null for anything that cannot be determined.\n\n");

    prompt.push_str("Filename: ");
    prompt.push_str(filename);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::tests::FakeClock;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Answer = Result<InterpreterResponse, InterpreterError>;

    #[derive(Clone, Default)]
    struct ScriptedInterpreter {
        answers: Rc<RefCell<Vec<Answer>>>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedInterpreter {
        fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: Rc::new(RefCell::new(answers)),
                calls: Rc::default(),
            }
        }
    }

    impl Interpreter for ScriptedInterpreter {
        fn interpret(&self, filename: &str) -> Answer {
            self.calls.borrow_mut().push(filename.to_string());
            self.answers.borrow_mut().remove(0)
        }
    }

    fn adapter_for(interpreter: &ScriptedInterpreter, clock: FakeClock) -> InterpreterAdapter {
        InterpreterAdapter::new(
            Box::new(interpreter.clone()),
            RateLimiter::with_clock(Duration::from_secs(2), Box::new(clock)),
        )
    }

    #[test]
    fn test_guess_from_text_response() {
        let interpreter = ScriptedInterpreter::new(vec![Ok(InterpreterResponse::Text(
            r#"{"series_name": "The Mandalorian", "season_number": 1, "episode_number": 1}"#
                .to_string(),
        ))]);
        let adapter = adapter_for(&interpreter, FakeClock::new());

        let guess = adapter.guess("The.Mandalorian.S01E01.Chapter.One.1080p.mkv");

        assert_eq!(guess.series_name.as_deref(), Some("The Mandalorian"));
        assert_eq!(guess.season_number, Some(1));
        assert_eq!(guess.episode_number, Some(1));
    }

    #[test]
    fn test_transport_error_degrades_to_unknown() {
        let interpreter = ScriptedInterpreter::new(vec![Err(
            InterpreterError::ServiceError("connection reset".to_string()),
        )]);
        let adapter = adapter_for(&interpreter, FakeClock::new());

        assert_eq!(adapter.guess("show.s01e02.mkv"), FilenameGuess::unknown());
    }

    #[test]
    fn test_structured_response_is_used_directly() {
        let interpreter = ScriptedInterpreter::new(vec![Ok(
            InterpreterResponse::Structured(json!({
                "series_name": "Dark",
                "season_number": "2",
                "episode_number": 5
            })),
        )]);
        let adapter = adapter_for(&interpreter, FakeClock::new());

        let guess = adapter.guess("dark_s2e5.mp4");

        assert_eq!(guess.series_name.as_deref(), Some("Dark"));
        assert_eq!(guess.season_number, Some(2));
        assert_eq!(guess.episode_number, Some(5));
    }

    #[test]
    fn test_calls_are_rate_limited() {
        let answer = || Ok(InterpreterResponse::Text("{}".to_string()));
        let interpreter = ScriptedInterpreter::new(vec![answer(), answer(), answer()]);
        let clock = FakeClock::new();
        let adapter = adapter_for(&interpreter, clock.clone());

        adapter.guess("a.mkv");
        adapter.guess("b.mkv");
        adapter.guess("c.mkv");

        assert_eq!(interpreter.calls.borrow().len(), 3);
        assert!(clock.elapsed() >= Duration::from_secs(4));
    }

    #[test]
    fn test_empty_filename_skips_interpreter() {
        let interpreter = ScriptedInterpreter::new(Vec::new());
        let adapter = adapter_for(&interpreter, FakeClock::new());

        assert_eq!(adapter.guess("  "), FilenameGuess::unknown());
        assert!(interpreter.calls.borrow().is_empty());
    }

    #[test]
    fn test_prompt_contains_filename_and_fields() {
        let prompt = instruction_prompt("show.name.s01e02.1080p.mkv");

        assert!(prompt.contains("show.name.s01e02.1080p.mkv"));
        assert!(prompt.contains("series_name"));
        assert!(prompt.contains("season_number"));
        assert!(prompt.contains("episode_number"));
    }
}
