use crate::config::Config;
use crate::error::Result;
use crate::session::Session;
use crate::translate::{
    create_translator, BatchTranslator, CancellationFlag, RunOutcome, TranslationEvent, Translator,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Suffix inserted before the `.srt` extension of exported files.
pub const OUTPUT_SUFFIX: &str = "fa";

/// Options for a single translation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of entries per translation request.
    pub batch_size: usize,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            show_progress: true,
        }
    }
}

/// Statistics from a complete load-translate-export run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub translation_time: Duration,
    pub entries: usize,
    pub translated_entries: usize,
    pub failed_batches: usize,
    pub provider: String,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub output_path: PathBuf,
    pub outcome: RunOutcome,
    pub stats: PipelineStats,
}

/// `movie.srt` -> `movie.fa.srt`, next to the input.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.{}.srt", stem.to_string_lossy(), OUTPUT_SUFFIX));
    output
}

pub fn load_session(input: &Path) -> Result<Session> {
    Session::open(input)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Translate `session` in place with a Gemini translator built from `config`.
pub async fn translate_session(
    session: &mut Session,
    config: &Config,
    pipeline_config: &PipelineConfig,
    cancelled: &CancellationFlag,
) -> Result<RunOutcome> {
    translate_session_with(
        create_translator(config),
        session,
        config.api_key(),
        pipeline_config,
        cancelled,
    )
    .await
}

/// Translate `session` in place with an explicit translator.
pub async fn translate_session_with(
    translator: Box<dyn Translator>,
    session: &mut Session,
    api_key: Option<&str>,
    pipeline_config: &PipelineConfig,
    cancelled: &CancellationFlag,
) -> Result<RunOutcome> {
    let driver = BatchTranslator::new(translator, pipeline_config.batch_size);
    let pb = pipeline_config
        .show_progress
        .then(|| progress_bar(session.len()));

    let outcome = driver
        .translate_all(session, api_key, cancelled, |event| {
            if let Some(pb) = &pb {
                match event {
                    TranslationEvent::BatchStarted { batch, .. } => {
                        pb.set_message(format!("batch {}", batch + 1));
                    }
                    TranslationEvent::BatchFailed { batch, error, .. } => {
                        pb.println(format!("✗ Batch {} failed: {}", batch + 1, error));
                    }
                    TranslationEvent::Progress { processed, .. } => {
                        pb.set_position(*processed as u64);
                    }
                    TranslationEvent::Cancelled { .. } => {
                        pb.abandon_with_message("cancelled");
                    }
                    TranslationEvent::Completed(_) => {
                        pb.finish_with_message("done");
                    }
                    _ => {}
                }
            }
            Ok(())
        })
        .await;

    if let (Some(pb), Err(_)) = (&pb, &outcome) {
        pb.abandon_with_message("failed");
    }

    outcome
}

/// Write the session as SRT to `output`.
pub fn export_session(session: &Session, output: &Path) -> Result<()> {
    fs::write(output, session.export())?;
    info!("Wrote {} entries to {}", session.len(), output.display());
    Ok(())
}

/// Load `input`, translate it, pass the session to `review`, and write the
/// result to `output`.
///
/// A cancelled run still exports; untranslated entries keep their original text.
pub async fn translate_file<R>(
    input: &Path,
    output: &Path,
    config: &Config,
    pipeline_config: PipelineConfig,
    cancelled: &CancellationFlag,
    review: R,
) -> Result<PipelineResult>
where
    R: FnOnce(&mut Session) -> Result<()>,
{
    translate_file_with(
        create_translator(config),
        input,
        output,
        config.api_key(),
        pipeline_config,
        cancelled,
        review,
    )
    .await
}

pub async fn translate_file_with<R>(
    translator: Box<dyn Translator>,
    input: &Path,
    output: &Path,
    api_key: Option<&str>,
    pipeline_config: PipelineConfig,
    cancelled: &CancellationFlag,
    review: R,
) -> Result<PipelineResult>
where
    R: FnOnce(&mut Session) -> Result<()>,
{
    let start_time = Instant::now();
    let provider = translator.name().to_string();

    let mut session = load_session(input)?;

    // Only a stop requested while this run is active counts
    if cancelled.is_cancelled() {
        debug!("Clearing cancellation requested before the run started");
        cancelled.reset();
    }

    let translation_start = Instant::now();
    let outcome =
        translate_session_with(translator, &mut session, api_key, &pipeline_config, cancelled)
            .await?;
    let translation_time = translation_start.elapsed();

    if let RunOutcome::Cancelled(_) = outcome {
        warn!("Translation cancelled; exporting partial result");
    }

    review(&mut session)?;
    export_session(&session, output)?;

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        translation_time,
        entries: session.len(),
        translated_entries: session.translated_count(),
        failed_batches: outcome.stats().map(|s| s.failed_batches).unwrap_or(0),
        provider,
    };

    Ok(PipelineResult {
        output_path: output.to_path_buf(),
        outcome,
        stats,
    })
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    let status = match result.outcome {
        RunOutcome::NothingToDo => "nothing to translate",
        RunOutcome::Completed(_) => "completed",
        RunOutcome::Cancelled(_) => "cancelled",
    };

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                   Subtitle Translation Summary                 ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Status:     {}", status);
    println!("  Provider:   {}", result.stats.provider);
    println!(
        "  Entries:    {} ({} translated)",
        result.stats.entries, result.stats.translated_entries
    );
    if result.stats.failed_batches > 0 {
        println!(
            "  Failed:     {} batch(es) left untranslated",
            result.stats.failed_batches
        );
    }
    println!();
    println!("  Timing:");
    println!(
        "    Translate:   {:.2}s",
        result.stats.translation_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 10);
        assert!(config.show_progress);
    }

    #[tokio::test]
    async fn test_translate_session_requires_credential() {
        let mut session = Session::new();
        session.load("1\n00:00:01,000 --> 00:00:02,000\nHello\n");
        let pipeline_config = PipelineConfig {
            show_progress: false,
            ..PipelineConfig::default()
        };

        let result = translate_session(
            &mut session,
            &Config::default(),
            &pipeline_config,
            &CancellationFlag::new(),
        )
        .await;

        assert!(matches!(result, Err(crate::FarsubError::MissingCredential)));
        assert_eq!(session.translated_count(), 0);
    }

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("/path/to/movie.srt")),
            PathBuf::from("/path/to/movie.fa.srt")
        );
        assert_eq!(
            derive_output_path(Path::new("episode.01.srt")),
            PathBuf::from("episode.01.fa.srt")
        );
        assert_eq!(
            derive_output_path(Path::new("/subs/noext")),
            PathBuf::from("/subs/noext.fa.srt")
        );
    }
}
