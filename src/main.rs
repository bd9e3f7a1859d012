use anyhow::{Context, Result};
use clap::Parser;
use farsub::config::Config;
use farsub::interactive::{review_session, run_interactive_wizard};
use farsub::pipeline::{derive_output_path, print_summary, translate_file, PipelineConfig};
use farsub::session::Session;
use farsub::translate::CancellationFlag;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "farsub")]
#[command(version, about = "Translate SRT subtitles into colloquial Persian")]
#[command(
    long_about = "Translate SRT subtitle files into colloquial Persian with Google Gemini. \
                  Run without arguments for the interactive wizard."
)]
struct Cli {
    /// Input subtitle file (omit to start the interactive wizard)
    input: Option<PathBuf>,

    /// Output subtitle file (defaults to <input>.fa.srt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of subtitle entries per translation request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Gemini model name
    #[arg(short, long)]
    model: Option<String>,

    /// Review and edit translations before saving
    #[arg(short, long)]
    review: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("farsub={}", level)));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Stop at the next batch boundary on Ctrl+C.
fn install_cancel_handler() -> Result<CancellationFlag> {
    let cancelled = CancellationFlag::new();
    let handle = cancelled.clone();
    ctrlc::set_handler(move || {
        if !handle.is_cancelled() {
            eprintln!("\nCancelling after the current batch...");
        }
        handle.cancel();
    })
    .context("Failed to install Ctrl+C handler")?;
    Ok(cancelled)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    let cancelled = install_cancel_handler()?;

    let Some(input) = cli.input else {
        let wizard = run_interactive_wizard().await?;
        let result = translate_file(
            &wizard.input,
            &wizard.output,
            &wizard.config,
            wizard.pipeline_config,
            &cancelled,
            reviewer(wizard.review),
        )
        .await
        .context("Translation failed")?;
        print_summary(&result);
        return Ok(());
    };

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let output = cli.output.unwrap_or_else(|| derive_output_path(&input));

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    info!("Input:      {}", input.display());
    info!("Output:     {}", output.display());
    info!("Model:      {}", config.model);
    info!("Batch size: {}", config.batch_size);

    let pipeline_config = PipelineConfig {
        batch_size: config.batch_size,
        show_progress: true,
    };

    let result = translate_file(
        &input,
        &output,
        &config,
        pipeline_config,
        &cancelled,
        reviewer(cli.review),
    )
    .await
    .context("Translation failed")?;

    print_summary(&result);
    Ok(())
}

/// The interactive review step, or a no-op when review is off.
fn reviewer(enabled: bool) -> impl FnOnce(&mut Session) -> farsub::Result<()> {
    move |session| {
        if enabled {
            review_session(session)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["farsub", "movie.srt", "-b", "8", "--review"]);
        assert_eq!(cli.input, Some(PathBuf::from("movie.srt")));
        assert_eq!(cli.batch_size, Some(8));
        assert!(cli.review);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_disabled_reviewer_leaves_session_untouched() {
        let mut session = Session::new();
        session.load("1\n00:00:01,000 --> 00:00:02,000\nHello\n");

        reviewer(false)(&mut session).unwrap();
        assert_eq!(session.translated_count(), 0);
    }

    #[test]
    fn test_cli_without_input() {
        let cli = Cli::parse_from(["farsub"]);
        assert!(cli.input.is_none());
        assert!(cli.output.is_none());
    }
}
