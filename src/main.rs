use clap::Parser;
use dialoguer::Confirm;
use episode_tagger::{
    ApplyOutcome, Config, DEFAULT_LANGUAGE, DEFAULT_MISTRAL_MODEL, ProgressEvent,
    ResolutionResult, collect_video_files, connect_tagger, interval_from_secs,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Identify loosely named tv episode files and write canonical metadata
/// into their MP4 tags.
///
/// Credentials are read from the environment or a `.env` file in the
/// current directory.
#[derive(Parser)]
#[command(name = "episode-tagger", version, about)]
struct Args {
    /// Video files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Mistral API key
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    mistral_api_key: String,

    /// Mistral model used to interpret filenames
    #[arg(long, env = "MISTRAL_MODEL", default_value = DEFAULT_MISTRAL_MODEL)]
    mistral_model: String,

    /// TheTVDB API key
    #[arg(long, env = "TVDB_API_KEY", hide_env_values = true)]
    tvdb_api_key: String,

    /// TheTVDB subscriber PIN
    #[arg(long, env = "TVDB_PIN", hide_env_values = true)]
    tvdb_pin: Option<String>,

    /// Metadata language written into the files (ISO 639-2)
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Minimum number of seconds between two interpreter calls
    #[arg(long, default_value_t = 2.0)]
    interval: f64,

    /// Download the series poster and embed it as cover art
    #[arg(long)]
    artwork: bool,

    /// Only analyze, do not write any tags
    #[arg(long)]
    dry_run: bool,

    /// Print the analysis as JSON to stdout
    #[arg(long)]
    json: bool,

    /// Apply tags without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "episode_tagger=debug"
    } else {
        "episode_tagger=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::AnalyzeStarted { total } => {
            println!("=== Analyzing {} file(s) ===", total);
        }
        ProgressEvent::AnalyzingFile { index, total, path } => {
            println!("[{}/{}] Analyzing: {}", index + 1, total, path.display());
        }
        ProgressEvent::FileAnalyzed { matched, .. } => {
            if !matched {
                println!("  No complete match");
            }
        }
        ProgressEvent::ApplyStarted { total } => {
            println!("\n=== Tagging {} file(s) ===", total);
        }
        ProgressEvent::TaggingFile { index, total, path } => {
            println!("[{}/{}] Tagging: {}", index + 1, total, path.display());
        }
        ProgressEvent::FileTagged { outcome, .. } => match outcome {
            ApplyOutcome::Tagged => println!("  Tags written"),
            ApplyOutcome::Failed(reason) => println!("  Failed: {}", reason),
            ApplyOutcome::Unmatched => println!("  Skipped (not matched)"),
        },
        ProgressEvent::Cancelled { processed, total } => {
            println!("Cancelled after {} of {} file(s)", processed, total);
        }
    }
}

/// Prints a status line, keeping stdout clean for JSON output
fn report(quiet: bool, message: &str) {
    write_status(quiet, message, &mut io::stdout(), &mut io::stderr());
}

fn write_status(quiet: bool, message: &str, stdout: &mut impl Write, stderr: &mut impl Write) {
    let out: &mut dyn Write = if quiet { stderr } else { stdout };
    // Nothing sensible is left to do if the terminal is gone
    let _ = writeln!(out, "{}", message);
}

fn print_analysis(results: &[ResolutionResult]) {
    println!("\n=== Analysis Results ===\n");

    for result in results {
        println!("{}", result.filename);

        let guess = &result.parsed_info;
        println!(
            "  Parsed:  {} S{}E{}",
            guess.series_name.as_deref().unwrap_or("?"),
            guess
                .season_number
                .map_or("??".to_string(), |n| format!("{:02}", n)),
            guess
                .episode_number
                .map_or("??".to_string(), |n| format!("{:02}", n)),
        );

        if let Some(error) = &result.error {
            println!("  Error:   {}", error);
        } else {
            match &result.series_info {
                Some(series) => println!("  Series:  {} ({})", series.name, series.id),
                None => println!("  Series:  not found"),
            }
            match &result.episode_info {
                Some(episode) => println!("  Episode: {}", episode.name),
                None => println!("  Episode: not found"),
            }
        }
        println!();
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose);

    let collected = match collect_video_files(&args.paths) {
        Ok(collected) => collected,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    for rejected in &collected.rejected {
        tracing::warn!(path = %rejected.display(), "skipping unsupported file");
    }

    if collected.videos.is_empty() {
        report(args.json, "No video files found.");
        return;
    }

    let min_interval = match interval_from_secs(args.interval) {
        Ok(interval) => interval,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let config = Config {
        mistral_api_key: args.mistral_api_key,
        mistral_model: args.mistral_model,
        tvdb_api_key: args.tvdb_api_key,
        tvdb_pin: args.tvdb_pin,
        language: args.language,
        min_interval,
        embed_artwork: args.artwork,
    };

    let tagger = match connect_tagger(&config) {
        Ok(tagger) => tagger,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let quiet = args.json;
    let results = match tagger.analyze(&collected.videos, |event| {
        if !quiet {
            handle_progress_event(event)
        }
    }) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("\nError during analysis: {}", e);
            process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize results: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_analysis(&results);
    }

    let matched = results.iter().filter(|r| r.is_matched()).count();

    if args.dry_run {
        if !quiet {
            println!("Dry run: {} of {} file(s) would be tagged.", matched, results.len());
        }
        return;
    }

    if matched == 0 {
        if !quiet {
            println!("Nothing to tag.");
        }
        return;
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Write tags to {} file(s)?", matched))
            .default(false)
            .interact();

        match confirmed {
            Ok(true) => {}
            Ok(false) => {
                report(quiet, "Aborted, no files were changed.");
                return;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }

    let outcomes = tagger.apply(&results, &config.language, |event| {
        if !quiet {
            handle_progress_event(event)
        }
    });

    let tagged = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, ApplyOutcome::Failed(_)))
        .count();

    report(
        quiet,
        &format!(
            "\nTagged {} file(s), {} failed, {} skipped.",
            tagged,
            failed,
            outcomes.len() - tagged - failed
        ),
    );

    if failed > 0 {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_goes_to_stderr_in_json_mode() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        write_status(true, "Tagged 1 file(s), 0 failed, 0 skipped.", &mut stdout, &mut stderr);

        assert!(stdout.is_empty());
        assert_eq!(
            String::from_utf8(stderr).unwrap(),
            "Tagged 1 file(s), 0 failed, 0 skipped.\n"
        );
    }

    #[test]
    fn test_status_goes_to_stdout_otherwise() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        write_status(false, "Nothing to tag.", &mut stdout, &mut stderr);

        assert_eq!(String::from_utf8(stdout).unwrap(), "Nothing to tag.\n");
        assert!(stderr.is_empty());
    }
}
