pub mod batch;
pub mod gemini;

pub use batch::{BatchTranslator, RunOutcome, RunStats, TranslationEvent};
pub use gemini::GeminiTranslator;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `texts` in order. The result should have the same length and order.
    async fn translate_batch(&self, texts: &[&str], api_key: &str) -> Result<Vec<String>>;

    /// Check whether `api_key` is accepted by the provider.
    async fn validate_key(&self, api_key: &str) -> Result<bool>;

    fn name(&self) -> &'static str;
}

/// Build the translator described by `config`.
pub fn create_translator(config: &Config) -> Box<dyn Translator> {
    Box::new(
        GeminiTranslator::new()
            .with_model(config.model.clone())
            .with_max_retries(config.max_retries),
    )
}

/// Cooperative stop signal, checked between batches.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());

        handle.cancel();
        assert!(flag.is_cancelled());

        flag.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_create_translator() {
        let translator = create_translator(&Config::default());
        assert_eq!(translator.name(), "gemini");
    }
}
