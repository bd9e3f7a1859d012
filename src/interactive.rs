use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{derive_output_path, PipelineConfig};
use crate::session::Session;
use crate::translate::{create_translator, Translator};
use console::style;
use dialoguer::{Confirm, Editor, FuzzySelect, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const SUBTITLE_EXTENSIONS: &[&str] = &["srt"];

/// Longest original/translated text shown in the review list.
const PREVIEW_CHARS: usize = 40;

pub struct InteractiveResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Config,
    pub pipeline_config: PipelineConfig,
    pub review: bool,
}

pub async fn run_interactive_wizard() -> anyhow::Result<InteractiveResult> {
    print_header();

    // Step 1: Check/Setup API Key
    let config = setup_api_key().await?;

    // Step 2: Select subtitle file
    let input = select_subtitle_file()?;
    let output = derive_output_path(&input);

    // Step 3: Review after translation?
    let review = Confirm::new()
        .with_prompt("Review and edit translations before saving?")
        .default(false)
        .interact()?;

    // Step 4: Confirm
    print_summary(&input, &output, &config);

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    println!();

    let pipeline_config = PipelineConfig {
        batch_size: config.batch_size,
        show_progress: true,
    };

    Ok(InteractiveResult {
        input,
        output,
        config,
        pipeline_config,
        review,
    })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║     farsub - Colloquial Persian Subtitle Tool     ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

async fn setup_api_key() -> anyhow::Result<Config> {
    let mut config = Config::load().unwrap_or_default();

    if config.api_key().is_some() {
        println!("{} API key configured", style("✓").green());
        return Ok(config);
    }

    println!("{} Gemini API key not found", style("!").yellow());
    println!("  Get one at: https://aistudio.google.com/apikey\n");

    let api_key: String = Input::new()
        .with_prompt("Enter your Gemini API key")
        .interact_text()?;
    let api_key = api_key.trim().to_string();

    if api_key.is_empty() {
        anyhow::bail!("API key is required");
    }

    let translator = create_translator(&config);
    match translator.validate_key(&api_key).await {
        Ok(true) => println!("{} API key accepted", style("✓").green()),
        Ok(false) => anyhow::bail!("API key was rejected by {}", translator.name()),
        Err(e) => println!(
            "{} Could not verify API key ({}), continuing anyway",
            style("!").yellow(),
            e
        ),
    }

    config.gemini_api_key = Some(api_key);

    // Offer to save
    if Confirm::new()
        .with_prompt("Save API key to config file?")
        .default(true)
        .interact()?
    {
        let path = config.save()?;
        println!(
            "{} API key saved to {}\n",
            style("✓").green(),
            path.display()
        );
    }

    Ok(config)
}

fn select_subtitle_file() -> anyhow::Result<PathBuf> {
    println!("\n{}", style("Select subtitle file:").bold());

    let files = scan_subtitle_files(Path::new("."))?;

    if files.is_empty() {
        println!("  No .srt files found in current directory.\n");
        return prompt_path();
    }

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a file")
        .items(&items)
        .default(0)
        .interact()?;

    if selection == files.len() {
        prompt_path()
    } else {
        Ok(files[selection].clone())
    }
}

fn prompt_path() -> anyhow::Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Enter file path")
        .interact_text()?;
    let path = PathBuf::from(path.trim());
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn scan_subtitle_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if SUBTITLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                    files.push(path);
                }
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn print_summary(input: &Path, output: &Path, config: &Config) {
    println!("\n{}", style("═══ Summary ═══").bold());
    println!("  Input:      {}", style(input.display()).cyan());
    println!("  Output:     {}", style(output.display()).cyan());
    println!("  Model:      {}", config.model);
    println!("  Batch size: {}", config.batch_size);
    println!();
}

/// Let the user pick entries and overwrite their translations until they are done.
///
/// Translations are edited in `$EDITOR`, so multi-line text survives. Closing
/// the editor without saving leaves the entry unchanged.
pub fn review_session(session: &mut Session) -> Result<()> {
    if session.is_empty() {
        return Ok(());
    }

    println!(
        "\n{} {}/{} entries translated",
        style("Review:").bold(),
        session.translated_count(),
        session.len()
    );

    loop {
        let mut items: Vec<String> = session
            .entries()
            .iter()
            .map(|e| {
                let marker = if e.is_translated() {
                    style("✓").green()
                } else {
                    style("·").yellow()
                };
                format!(
                    "{} #{} {}  │  {}",
                    marker,
                    e.id,
                    preview(&e.original_text),
                    preview(&e.translated_text)
                )
            })
            .collect();
        items.push("Done".to_string());

        let selection = FuzzySelect::new()
            .with_prompt("Select an entry to edit")
            .items(&items)
            .default(0)
            .interact()?;

        if selection == session.len() {
            return Ok(());
        }

        let entry = &session.entries()[selection];
        let id = entry.id;
        println!(
            "\n  {} --> {}\n  {}",
            entry.start_time,
            entry.end_time,
            style(&entry.original_text).dim()
        );

        match Editor::new().extension(".txt").edit(&entry.translated_text)? {
            Some(edited) => {
                session.edit_translation(selection, clean_edit(&edited))?;
                println!("{} Entry #{} updated", style("✓").green(), id);
            }
            None => println!("{} No changes saved", style("·").yellow()),
        }
    }
}

/// Normalize editor output: unify line endings and drop surrounding blank
/// space while keeping the line breaks inside the text.
fn clean_edit(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// First line of `text`, shortened to a fixed number of characters.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
