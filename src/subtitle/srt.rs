// SRT subtitle format
use super::SubtitleEntry;
use regex::Regex;
use std::num::IntErrorKind;
use std::sync::OnceLock;
use tracing::debug;

/// Why a block was left out of the parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewLines,
    InvalidId,
    InvalidTiming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    /// Zero-based position of the block in the input.
    pub position: usize,
    pub first_line: String,
    pub reason: SkipReason,
}

/// Parse output together with the blocks that were dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedSrt {
    pub entries: Vec<SubtitleEntry>,
    pub skipped: Vec<SkippedBlock>,
}

fn block_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n\s*\r?\n").expect("Invalid regex"))
}

fn line_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n").expect("Invalid regex"))
}

fn timing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3}) --> ([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})",
        )
        .expect("Invalid regex")
    })
}

/// Parse SRT text into entries, silently dropping malformed blocks.
pub fn parse_srt(content: &str) -> Vec<SubtitleEntry> {
    parse_srt_detailed(content).entries
}

/// Parse SRT text, also reporting which blocks were dropped.
pub fn parse_srt_detailed(content: &str) -> ParsedSrt {
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content).trim();
    let mut parsed = ParsedSrt::default();

    for (position, block) in block_separator().split(content).enumerate() {
        match parse_block(block) {
            Ok(entry) => parsed.entries.push(entry),
            Err(reason) => {
                let first_line = block.lines().next().unwrap_or_default().trim().to_string();
                debug!(
                    "Skipping subtitle block {} ({:?}): {:?}",
                    position + 1,
                    reason,
                    first_line
                );
                parsed.skipped.push(SkippedBlock {
                    position,
                    first_line,
                    reason,
                });
            }
        }
    }

    parsed
}

fn parse_block(block: &str) -> std::result::Result<SubtitleEntry, SkipReason> {
    let lines: Vec<&str> = line_separator().split(block).collect();
    if lines.len() < 3 {
        return Err(SkipReason::TooFewLines);
    }

    let id = parse_id(lines[0]).ok_or(SkipReason::InvalidId)?;

    let caps = timing_line()
        .captures(lines[1].trim())
        .ok_or(SkipReason::InvalidTiming)?;

    let original_text = lines[2..].join("\n").trim().to_string();

    Ok(SubtitleEntry::new(id, &caps[1], &caps[2], original_text))
}

/// Lenient integer parse: an optional sign followed by the leading digits.
/// Trailing garbage after the digits is ignored; ids beyond `i64` saturate.
fn parse_id(line: &str) -> Option<i64> {
    let line = line.trim();
    let end = line
        .char_indices()
        .skip_while(|&(i, c)| i == 0 && (c == '-' || c == '+'))
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    match line[..end].parse::<i64>() {
        Ok(id) => Some(id),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Render entries as SRT, preferring translated text over the original.
pub fn format_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}\n{} --> {}\n{}\n",
                entry.id,
                entry.start_time,
                entry.end_time,
                entry.display_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
