//! Synthesis station: speaks translations strictly in sequence order.

use crate::pipeline::channel::{Delivery, SequencedReceiver, SkipCause};
use crate::pipeline::types::{PipelineEvent, TranslationResult, TranslationStatus};
use crate::synthesis::synthesizer::{CancellationReason, SynthesisOutcome, Synthesizer};
use crossbeam_channel::Sender;

/// Counters reported when the synthesis stage exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisSummary {
    /// Texts whose playback completed.
    pub spoken: u64,
    /// Texts the engine canceled.
    pub canceled: u64,
    /// Results that arrived without a translation.
    pub untranslated: u64,
    /// Sequence numbers given up on.
    pub skipped: u64,
    /// Results that arrived after their slot was skipped.
    pub discarded: u64,
}

/// Consumes the tag-addressed result channel and drives the synthesizer.
///
/// Never speaks sequence `n + 1` before `n` has been spoken, reported
/// untranslated, or skipped.
pub struct SynthesisStation {
    synthesizer: Box<dyn Synthesizer>,
    summary: SynthesisSummary,
    event_tx: Option<Sender<PipelineEvent>>,
}

impl SynthesisStation {
    pub fn new(synthesizer: Box<dyn Synthesizer>) -> Self {
        Self {
            synthesizer,
            summary: SynthesisSummary::default(),
            event_tx: None,
        }
    }

    /// Send progress events to a console renderer.
    pub fn with_event_sender(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Runs until the result channel is closed and drained.
    pub fn run(mut self, mut input: SequencedReceiver) -> SynthesisSummary {
        tracing::debug!(synthesizer = self.synthesizer.name(), "synthesis started");
        while let Some(delivery) = input.recv_expected() {
            match delivery {
                Delivery::Ready(result) => self.handle_result(result),
                Delivery::Skipped { sequence, cause } => self.handle_skip(sequence, cause),
            }
        }
        self.summary.discarded = input.discarded();
        tracing::info!(
            spoken = self.summary.spoken,
            canceled = self.summary.canceled,
            untranslated = self.summary.untranslated,
            skipped = self.summary.skipped,
            "synthesis finished"
        );
        self.summary
    }

    fn handle_result(&mut self, result: TranslationResult) {
        let TranslationResult {
            sequence,
            text,
            status,
        } = result;

        if let TranslationStatus::Failed(reason) = status {
            tracing::info!(sequence, reason = reason.as_str(), "nothing to speak");
            self.summary.untranslated += 1;
            return;
        }

        match self.synthesizer.speak(&text) {
            SynthesisOutcome::Completed => {
                tracing::debug!(sequence, text = text.as_str(), "synthesis completed");
                self.summary.spoken += 1;
                self.emit(PipelineEvent::Spoken { sequence, text });
            }
            SynthesisOutcome::Canceled {
                reason,
                error_detail,
            } => {
                self.summary.canceled += 1;
                // Engine details only mean something for errors
                let detail = match reason {
                    CancellationReason::Error => error_detail,
                    _ => None,
                };
                match detail {
                    Some(ref detail) => tracing::warn!(
                        sequence,
                        reason = %reason,
                        detail = detail.as_str(),
                        "synthesis canceled"
                    ),
                    None => tracing::warn!(sequence, reason = %reason, "synthesis canceled"),
                }
                self.emit(PipelineEvent::SpeechCanceled {
                    sequence,
                    reason: reason.to_string(),
                    detail,
                });
            }
        }
    }

    fn handle_skip(&mut self, sequence: u64, cause: SkipCause) {
        let reason = match cause {
            SkipCause::GapTimeout => "translation timed out",
            SkipCause::Closed => "translation never arrived",
        };
        tracing::warn!(sequence, "skipping: {reason}");
        self.summary.skipped += 1;
        self.emit(PipelineEvent::Skipped {
            sequence,
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.event_tx {
            tx.try_send(event).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::result_channel;
    use crate::synthesis::synthesizer::MockSynthesizer;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_speaks_in_sequence_order() {
        let synth = MockSynthesizer::new();
        let spoken = synth.spoken();
        let (tx, rx) = result_channel(8, Duration::from_secs(5));
        for seq in [1, 0, 2] {
            tx.send(TranslationResult::ok(seq, format!("译文{seq}")))
                .unwrap();
        }
        drop(tx);

        let summary = SynthesisStation::new(Box::new(synth)).run(rx);
        assert_eq!(summary.spoken, 3);
        assert_eq!(*spoken.lock().unwrap(), vec!["译文0", "译文1", "译文2"]);
    }

    #[test]
    fn test_failed_translation_is_not_spoken() {
        let synth = MockSynthesizer::new();
        let spoken = synth.spoken();
        let (tx, rx) = result_channel(8, Duration::from_secs(5));
        tx.send(TranslationResult::failed(0, "content_filter"))
            .unwrap();
        tx.send(TranslationResult::ok(1, "你好")).unwrap();
        drop(tx);

        let summary = SynthesisStation::new(Box::new(synth)).run(rx);
        assert_eq!(summary.untranslated, 1);
        assert_eq!(summary.spoken, 1);
        assert_eq!(*spoken.lock().unwrap(), vec!["你好"]);
    }

    #[test]
    fn test_canceled_playback_continues_with_next() {
        let synth = MockSynthesizer::new().with_failure_on("坏");
        let spoken = synth.spoken();
        let (event_tx, event_rx) = unbounded();
        let (tx, rx) = result_channel(8, Duration::from_secs(5));
        tx.send(TranslationResult::ok(0, "坏")).unwrap();
        tx.send(TranslationResult::ok(1, "好")).unwrap();
        drop(tx);

        let summary = SynthesisStation::new(Box::new(synth))
            .with_event_sender(event_tx)
            .run(rx);

        assert_eq!(summary.canceled, 1);
        assert_eq!(summary.spoken, 1);
        assert_eq!(spoken.lock().unwrap().len(), 2);

        let events: Vec<PipelineEvent> = event_rx.try_iter().collect();
        assert_eq!(
            events[0],
            PipelineEvent::SpeechCanceled {
                sequence: 0,
                reason: "error".to_string(),
                detail: Some("mock synthesis failure".to_string()),
            }
        );
        assert_eq!(
            events[1],
            PipelineEvent::Spoken {
                sequence: 1,
                text: "好".to_string()
            }
        );
    }

    #[test]
    fn test_missing_result_is_skipped() {
        let synth = MockSynthesizer::new();
        let spoken = synth.spoken();
        let (tx, rx) = result_channel(8, Duration::from_millis(30));
        tx.send(TranslationResult::ok(0, "一")).unwrap();
        tx.send(TranslationResult::ok(2, "三")).unwrap();

        let handle = std::thread::spawn(move || SynthesisStation::new(Box::new(synth)).run(rx));
        std::thread::sleep(Duration::from_millis(100));
        drop(tx);

        let summary = handle.join().unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(*spoken.lock().unwrap(), vec!["一", "三"]);
    }
}
