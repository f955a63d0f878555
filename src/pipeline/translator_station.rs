//! Translator station that turns utterances into tagged translation results.

use crate::defaults;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{PipelineEvent, TranslationResult, Utterance};
use crate::translation::engine::{Completion, TranslationEngine};
use crate::translation::prompt::{normalize_translation, system_prompt};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Immutable settings for the translation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    pub system_prompt: String,
    pub max_output_tokens: u32,
    /// Attempts per utterance when the engine fails transiently (at least 1).
    pub max_attempts: u32,
    /// Delay before the first retry; retry `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            system_prompt: system_prompt(
                defaults::SOURCE_LANGUAGE_NAME,
                defaults::TARGET_LANGUAGE_NAME,
            ),
            max_output_tokens: defaults::MAX_OUTPUT_TOKENS,
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
        }
    }
}

/// Linear backoff: retry `n` waits `n * backoff`, saturating.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// How one utterance fared against the engine.
#[derive(Debug, PartialEq)]
enum Outcome {
    Translated(String),
    /// No usable translation; carries the reason.
    Untranslated(String),
    /// The engine will refuse every request from now on.
    EngineUnusable(String),
}

/// Station that translates each utterance with a completion engine.
///
/// Emits exactly one result per utterance. When no usable translation comes
/// back the result is `Failed` with the finish reason, so the synthesis stage
/// can move past that sequence number instead of waiting for it. A rejected
/// credential is the exception: it is reported as a fatal station error and
/// the worker exits.
pub struct TranslatorStation {
    engine: Arc<dyn TranslationEngine>,
    config: TranslationConfig,
    event_tx: Option<Sender<PipelineEvent>>,
}

impl TranslatorStation {
    pub fn new(engine: Arc<dyn TranslationEngine>, config: TranslationConfig) -> Self {
        Self {
            engine,
            config,
            event_tx: None,
        }
    }

    /// Send progress events to a console renderer.
    pub fn with_event_sender(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Translate one utterance text, retrying transient engine failures.
    ///
    fn translate(&self, sequence: u64, text: &str) -> Outcome {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let start = Instant::now();
            let outcome = self.engine.complete(
                &self.config.system_prompt,
                text,
                self.config.max_output_tokens,
            );
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(Completion::Content(raw)) => {
                    let normalized = normalize_translation(&raw);
                    if normalized.is_empty() {
                        tracing::warn!(sequence, elapsed_ms, "engine returned empty content");
                        return Outcome::Untranslated("empty".to_string());
                    }
                    tracing::debug!(sequence, elapsed_ms, attempt, "translated");
                    return Outcome::Translated(normalized);
                }
                Ok(Completion::Declined { finish_reason }) => {
                    tracing::warn!(
                        sequence,
                        finish_reason = finish_reason.as_str(),
                        "engine produced no translation"
                    );
                    return Outcome::Untranslated(finish_reason);
                }
                Err(e) if e.is_credential_rejection() => {
                    return Outcome::EngineUnusable(e.to_string());
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = retry_delay(self.config.retry_backoff, attempt);
                    tracing::warn!(
                        sequence,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "translation attempt failed: {e}"
                    );
                    thread::sleep(delay);
                }
                Err(e) => {
                    tracing::error!(sequence, attempt, "translation failed: {e}");
                    return Outcome::Untranslated(e.to_string());
                }
            }
        }

        // Loop always returns on the last attempt
        Outcome::Untranslated("retries exhausted".to_string())
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.event_tx {
            // Rendering is best-effort
            tx.try_send(event).ok();
        }
    }
}

impl Station for TranslatorStation {
    type Input = Utterance;
    type Output = TranslationResult;

    fn name(&self) -> &'static str {
        "translator"
    }

    fn process(&mut self, utterance: Utterance) -> Result<Option<TranslationResult>, StationError> {
        let sequence = utterance.sequence;
        tracing::debug!(sequence, engine = self.engine.name(), "translating");

        let result = match self.translate(sequence, &utterance.text) {
            Outcome::Translated(text) => {
                self.emit(PipelineEvent::Translated {
                    sequence,
                    text: text.clone(),
                });
                TranslationResult::ok(sequence, text)
            }
            Outcome::Untranslated(reason) => {
                self.emit(PipelineEvent::TranslationFailed {
                    sequence,
                    reason: reason.clone(),
                });
                TranslationResult::failed(sequence, reason)
            }
            Outcome::EngineUnusable(reason) => {
                self.emit(PipelineEvent::TranslationFailed {
                    sequence,
                    reason: reason.clone(),
                });
                return Err(StationError::Fatal(format!(
                    "{} rejected the credentials at sequence {sequence}: {reason}",
                    self.engine.name()
                )));
            }
        };

        Ok(Some(result))
    }
}
