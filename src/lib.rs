pub mod config;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod session;
pub mod subtitle;
pub mod translate;

pub use config::Config;
pub use error::{FarsubError, Result};
pub use pipeline::{translate_file, PipelineConfig, PipelineResult, PipelineStats};
pub use session::{Session, TranslationStatus};
pub use subtitle::{format_srt, parse_srt, SubtitleEntry};
pub use translate::{BatchTranslator, CancellationFlag, RunOutcome, TranslationEvent, Translator};
