use crate::error::{FarsubError, Result};
use crate::subtitle::{format_srt, parse_srt_detailed, SkippedBlock, SubtitleEntry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where a session is in its translation lifecycle.
///
/// A cancelled run returns to `Idle`, the same as a session that never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationStatus::Idle => write!(f, "idle"),
            TranslationStatus::Processing => write!(f, "processing"),
            TranslationStatus::Completed => write!(f, "completed"),
            TranslationStatus::Error => write!(f, "error"),
        }
    }
}

/// The loaded subtitle file and the state of its translation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    entries: Vec<SubtitleEntry>,
    status: TranslationStatus,
    progress: u8,
    source: Option<PathBuf>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session directly from entries, e.g. for tests or programmatic use.
    pub fn from_entries(entries: Vec<SubtitleEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Read and parse a subtitle file into a fresh session.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FarsubError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let mut session = Self::new();
        let skipped = session.load(&content);
        session.source = Some(path.to_path_buf());

        if !skipped.is_empty() {
            warn!(
                "Skipped {} malformed subtitle block(s) in {}",
                skipped.len(),
                path.display()
            );
        }
        info!("Loaded {} subtitle entries from {}", session.len(), path.display());

        Ok(session)
    }

    /// Replace all entries with the parse of `content` and reset status and progress.
    /// Returns the blocks that could not be parsed.
    pub fn load(&mut self, content: &str) -> Vec<SkippedBlock> {
        let parsed = parse_srt_detailed(content);
        self.entries = parsed.entries;
        self.status = TranslationStatus::Idle;
        self.progress = 0;
        parsed.skipped
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> TranslationStatus {
        self.status
    }

    /// Percentage of entries processed by the last or current run.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn translated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_translated()).count()
    }

    /// Manually set the translation of the entry at `index`.
    pub fn edit_translation(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        let len = self.entries.len();
        let entry = self.entries.get_mut(index).ok_or_else(|| {
            FarsubError::Subtitle(format!("Entry {} out of range ({} entries)", index, len))
        })?;
        entry.translated_text = text.into();
        Ok(())
    }

    /// Serialize the current state as SRT text.
    pub fn export(&self) -> String {
        format_srt(&self.entries)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SubtitleEntry] {
        &mut self.entries
    }

    pub(crate) fn begin_run(&mut self) {
        self.status = TranslationStatus::Processing;
        self.progress = 0;
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub(crate) fn finish_run(&mut self) {
        self.status = TranslationStatus::Completed;
    }

    pub(crate) fn cancel_run(&mut self) {
        self.status = TranslationStatus::Idle;
    }

    pub(crate) fn fail_run(&mut self) {
        self.status = TranslationStatus::Error;
        for entry in &mut self.entries {
            entry.is_translating = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n";

    #[test]
    fn test_load_replaces_entries_and_resets_state() {
        let mut session = Session::new();
        session.load(SAMPLE);
        session.begin_run();
        session.set_progress(40);
        session.fail_run();

        let skipped = session.load("7\n00:00:09,000 --> 00:00:10,000\nOnly\n");
        assert!(skipped.is_empty());
        assert_eq!(session.len(), 1);
        assert_eq!(session.entries()[0].id, 7);
        assert_eq!(session.status(), TranslationStatus::Idle);
        assert_eq!(session.progress(), 0);
    }

    #[test]
    fn test_load_reports_skipped_blocks() {
        let mut session = Session::new();
        let skipped = session.load("oops\nnot a block\n\n1\n00:00:01,000 --> 00:00:02,000\nHi\n");
        assert_eq!(session.len(), 1);
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_edit_translation() {
        let mut session = Session::new();
        session.load(SAMPLE);

        session.edit_translation(1, "خداحافظ").unwrap();
        assert_eq!(session.entries()[1].translated_text, "خداحافظ");
        assert_eq!(session.entries()[1].original_text, "Bye");
        assert_eq!(session.translated_count(), 1);

        assert!(session.edit_translation(5, "x").is_err());
    }

    #[test]
    fn test_export_falls_back_to_original() {
        let mut session = Session::new();
        session.load(SAMPLE);
        session.edit_translation(0, "سلام").unwrap();

        let output = session.export();
        assert!(output.contains("1\n00:00:01,000 --> 00:00:02,000\nسلام\n"));
        assert!(output.contains("2\n00:00:03,000 --> 00:00:04,000\nBye\n"));
    }

    #[test]
    fn test_open_missing_file() {
        let result = Session::open(Path::new("/nonexistent/movie.srt"));
        assert!(matches!(result, Err(FarsubError::FileNotFound(_))));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TranslationStatus::Idle.to_string(), "idle");
        assert_eq!(TranslationStatus::Processing.to_string(), "processing");
        assert_eq!(TranslationStatus::Completed.to_string(), "completed");
        assert_eq!(TranslationStatus::Error.to_string(), "error");
    }
}
