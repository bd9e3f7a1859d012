pub mod srt;

pub use srt::{format_srt, parse_srt, parse_srt_detailed, ParsedSrt, SkipReason, SkippedBlock};

/// One subtitle block: source numbering, time range, and both texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    /// Id from the source file. Not guaranteed unique or sequential.
    pub id: i64,
    /// `HH:MM:SS,mmm`
    pub start_time: String,
    /// `HH:MM:SS,mmm`
    pub end_time: String,
    pub original_text: String,
    /// Empty until translated or edited.
    pub translated_text: String,
    /// Set while the entry's batch is in flight.
    pub is_translating: bool,
}

impl SubtitleEntry {
    pub fn new(
        id: i64,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        original_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            start_time: start_time.into(),
            end_time: end_time.into(),
            original_text: original_text.into(),
            translated_text: String::new(),
            is_translating: false,
        }
    }

    pub fn is_translated(&self) -> bool {
        !self.translated_text.is_empty()
    }

    /// Text used for export: the translation if present, otherwise the original.
    pub fn display_text(&self) -> &str {
        if self.translated_text.is_empty() {
            &self.original_text
        } else {
            &self.translated_text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_falls_back_to_original() {
        let mut entry = SubtitleEntry::new(1, "00:00:01,000", "00:00:02,000", "Hello");
        assert!(!entry.is_translated());
        assert_eq!(entry.display_text(), "Hello");

        entry.translated_text = "سلام".to_string();
        assert!(entry.is_translated());
        assert_eq!(entry.display_text(), "سلام");
    }
}
