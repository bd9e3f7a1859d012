use crate::error::{FarsubError, Result};
use crate::session::Session;
use crate::translate::{CancellationFlag, Translator};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// State changes published while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationEvent {
    Started {
        total_entries: usize,
        total_batches: usize,
    },
    /// The entries in `range` are marked in flight.
    BatchStarted { batch: usize, range: Range<usize> },
    /// `applied` entries of the batch received a translation.
    BatchTranslated {
        batch: usize,
        range: Range<usize>,
        applied: usize,
    },
    BatchFailed {
        batch: usize,
        range: Range<usize>,
        error: String,
    },
    Progress {
        percent: u8,
        processed: usize,
        total: usize,
    },
    Cancelled { processed: usize },
    Completed(RunStats),
}

/// Statistics from a translation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total_batches: usize,
    pub translated_batches: usize,
    pub failed_batches: usize,
    pub entries_translated: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The session had no entries.
    NothingToDo,
    Completed(RunStats),
    /// Stopped at a batch boundary; later batches were not sent.
    Cancelled(RunStats),
}

impl RunOutcome {
    pub fn stats(&self) -> Option<&RunStats> {
        match self {
            RunOutcome::NothingToDo => None,
            RunOutcome::Completed(stats) | RunOutcome::Cancelled(stats) => Some(stats),
        }
    }
}

/// Contiguous index ranges of at most `batch_size` covering `0..total`.
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    if batch_size == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

/// Rounded percentage of processed entries; 100 only once everything is processed.
fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 || processed >= total {
        return 100;
    }
    let percent = ((processed as f64 * 100.0) / total as f64).round() as u8;
    percent.min(99)
}

/// Translates a session batch by batch, one request in flight at a time.
pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    batch_size: usize,
}

impl BatchTranslator {
    pub fn new(translator: Box<dyn Translator>, batch_size: usize) -> Self {
        Self {
            translator: Arc::from(translator),
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate every entry of `session` in place.
    ///
    /// Each batch is sent only after the previous one resolved. A failing batch
    /// is logged and skipped; its entries keep their previous translation.
    /// `cancel` is checked before each batch, so a request already in flight
    /// always finishes. Every state change is reported to `on_event`; an error
    /// from the observer aborts the run and leaves the session in
    /// [`TranslationStatus::Error`](crate::session::TranslationStatus::Error).
    pub async fn translate_all<F>(
        &self,
        session: &mut Session,
        api_key: Option<&str>,
        cancel: &CancellationFlag,
        mut on_event: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&TranslationEvent) -> Result<()>,
    {
        if session.is_empty() {
            debug!("No subtitle entries to translate");
            return Ok(RunOutcome::NothingToDo);
        }

        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(FarsubError::MissingCredential)?;

        if self.batch_size == 0 {
            return Err(FarsubError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        session.begin_run();

        match self.run(session, api_key, cancel, &mut on_event).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Translation run failed: {}", e);
                session.fail_run();
                Err(e)
            }
        }
    }

    async fn run<F>(
        &self,
        session: &mut Session,
        api_key: &str,
        cancel: &CancellationFlag,
        on_event: &mut F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&TranslationEvent) -> Result<()>,
    {
        let start_time = Instant::now();
        let total = session.len();
        let ranges = batch_ranges(total, self.batch_size);
        let mut stats = RunStats {
            total_batches: ranges.len(),
            ..RunStats::default()
        };

        info!(
            "Translating {} entries in {} batches of up to {} using {}",
            total,
            ranges.len(),
            self.batch_size(),
            self.translator.name()
        );
        on_event(&TranslationEvent::Started {
            total_entries: total,
            total_batches: ranges.len(),
        })?;

        let mut processed = 0;

        for (batch, range) in ranges.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Translation cancelled after {}/{} entries",
                    processed, total
                );
                session.cancel_run();
                stats.elapsed = start_time.elapsed();
                on_event(&TranslationEvent::Cancelled { processed })?;
                return Ok(RunOutcome::Cancelled(stats));
            }

            let entries = &mut session.entries_mut()[range.clone()];
            for entry in entries.iter_mut() {
                entry.is_translating = true;
            }
            on_event(&TranslationEvent::BatchStarted {
                batch,
                range: range.clone(),
            })?;

            debug!(
                "Sending batch {}/{} (entries {}..{})",
                batch + 1,
                stats.total_batches,
                range.start,
                range.end
            );

            let texts: Vec<&str> = session.entries()[range.clone()]
                .iter()
                .map(|e| e.original_text.as_str())
                .collect();
            let result = self.translator.translate_batch(&texts, api_key).await;

            let entries = &mut session.entries_mut()[range.clone()];
            let event = match result {
                Ok(translations) => {
                    if translations.len() != entries.len() {
                        warn!(
                            "Batch {} returned {} translations for {} entries",
                            batch + 1,
                            translations.len(),
                            entries.len()
                        );
                    }

                    let mut applied = 0;
                    for (entry, text) in entries.iter_mut().zip(translations) {
                        entry.translated_text = text;
                        applied += 1;
                    }
                    for entry in entries.iter_mut() {
                        entry.is_translating = false;
                    }

                    stats.translated_batches += 1;
                    stats.entries_translated += applied;
                    TranslationEvent::BatchTranslated {
                        batch,
                        range: range.clone(),
                        applied,
                    }
                }
                Err(e) => {
                    warn!("Batch {} failed: {}", batch + 1, e);
                    for entry in entries.iter_mut() {
                        entry.is_translating = false;
                    }

                    stats.failed_batches += 1;
                    TranslationEvent::BatchFailed {
                        batch,
                        range: range.clone(),
                        error: e.to_string(),
                    }
                }
            };
            on_event(&event)?;

            processed = range.end;
            let percent = progress_percent(processed, total);
            session.set_progress(percent);
            on_event(&TranslationEvent::Progress {
                percent,
                processed,
                total,
            })?;
        }

        session.finish_run();
        stats.elapsed = start_time.elapsed();

        info!(
            "Translation complete: {}/{} batches succeeded, {} entries translated in {:.2}s",
            stats.translated_batches,
            stats.total_batches,
            stats.entries_translated,
            stats.elapsed.as_secs_f64()
        );
        on_event(&TranslationEvent::Completed(stats.clone()))?;

        Ok(RunOutcome::Completed(stats))
    }
}
