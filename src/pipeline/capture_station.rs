//! Capture station: drives a recognition session and emits utterances.

use crate::defaults;
use crate::error::Result;
use crate::pipeline::channel::UtteranceSender;
use crate::pipeline::types::{PipelineEvent, Utterance};
use crate::recognition::recognizer::{RecognitionConfig, RecognitionEvent, Recognizer};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Immutable settings for the capture stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub recognition: RecognitionConfig,
    /// Recognized text equal to this word (ignoring case and punctuation)
    /// ends the session. `None` disables the keyword.
    pub stop_word: Option<String>,
    /// How often the loop checks for an operator stop while idle.
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig::default(),
            stop_word: Some(defaults::STOP_WORD.to_string()),
            poll_interval: Duration::from_millis(defaults::CAPTURE_POLL_MS),
        }
    }
}

/// Why the capture stage stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    SessionStopped,
    Canceled(String),
    StopWord,
    Operator,
    DownstreamClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::SessionStopped => write!(f, "session stopped"),
            StopReason::Canceled(reason) => write!(f, "canceled: {}", reason),
            StopReason::StopWord => write!(f, "stop word recognized"),
            StopReason::Operator => write!(f, "stopped by operator"),
            StopReason::DownstreamClosed => write!(f, "translation stage gone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CaptureState {
    Listening,
    Done(StopReason),
}

/// Lowercase and strip surrounding punctuation, so "Stop." matches "stop".
fn keyword_form(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Station owning the recognizer.
///
/// Engine events arrive on a channel private to this station; the run loop
/// drains it on one thread, so the stop decision is a plain state change.
pub struct CaptureStation {
    recognizer: Box<dyn Recognizer>,
    config: CaptureConfig,
    stop_word: Option<String>,
    next_sequence: u64,
    state: CaptureState,
    event_tx: Option<Sender<PipelineEvent>>,
}

impl CaptureStation {
    pub fn new(recognizer: Box<dyn Recognizer>, config: CaptureConfig) -> Self {
        let stop_word = config
            .stop_word
            .as_deref()
            .map(keyword_form)
            .filter(|w| !w.is_empty());
        Self {
            recognizer,
            config,
            stop_word,
            next_sequence: 0,
            state: CaptureState::Listening,
            event_tx: None,
        }
    }

    /// Send progress events to a console renderer.
    pub fn with_event_sender(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Starts the recognition session and returns its event stream.
    pub fn start(&mut self) -> Result<Receiver<RecognitionEvent>> {
        let (events_tx, events_rx) = unbounded();
        tracing::info!(
            recognizer = self.recognizer.name(),
            language = self.config.recognition.language.as_str(),
            silence_timeout_ms = self.config.recognition.silence_timeout_ms,
            "starting recognition"
        );
        self.recognizer.start(&self.config.recognition, events_tx)?;
        Ok(events_rx)
    }

    /// Runs until the session ends, the stop word is heard, the operator
    /// clears `running`, or the translation stage goes away.
    ///
    /// Dropping `output` on return is what lets the translation stage drain.
    pub fn run(
        mut self,
        events: Receiver<RecognitionEvent>,
        output: UtteranceSender,
        running: Arc<AtomicBool>,
    ) -> StopReason {
        let poll_interval = self.config.poll_interval;

        while self.state == CaptureState::Listening {
            if !running.load(Ordering::SeqCst) {
                self.state = CaptureState::Done(StopReason::Operator);
                break;
            }
            match events.recv_timeout(poll_interval) {
                Ok(event) => self.handle_event(event, &output),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.state = CaptureState::Done(StopReason::SessionStopped);
                }
            }
        }

        if let Err(e) = self.recognizer.stop() {
            tracing::warn!("failed to stop recognizer: {e}");
        }

        let reason = match std::mem::replace(&mut self.state, CaptureState::Listening) {
            CaptureState::Done(reason) => reason,
            CaptureState::Listening => StopReason::SessionStopped,
        };
        tracing::info!(utterances = self.next_sequence, "capture ended: {reason}");
        self.emit(PipelineEvent::SessionEnded {
            reason: reason.to_string(),
        });
        reason
    }

    fn handle_event(&mut self, event: RecognitionEvent, output: &UtteranceSender) {
        match event {
            RecognitionEvent::SessionStarted => {
                tracing::debug!("session started");
                self.emit(PipelineEvent::SessionStarted);
            }
            RecognitionEvent::Recognizing { text } => {
                tracing::trace!(text = text.as_str(), "recognizing");
                self.emit(PipelineEvent::Partial { text });
            }
            RecognitionEvent::Recognized { text } => self.handle_recognized(&text, output),
            RecognitionEvent::SessionStopped => {
                tracing::debug!("session stopped");
                self.state = CaptureState::Done(StopReason::SessionStopped);
            }
            RecognitionEvent::Canceled { reason } => {
                tracing::error!(reason = reason.as_str(), "recognition canceled");
                self.state = CaptureState::Done(StopReason::Canceled(reason));
            }
        }
    }

    fn handle_recognized(&mut self, text: &str, output: &UtteranceSender) {
        let text = text.trim();
        if text.chars().count() <= 1 {
            tracing::debug!(text, "utterance too short, dropped");
            return;
        }

        if let Some(ref stop_word) = self.stop_word
            && keyword_form(text) == *stop_word
        {
            tracing::info!("stop word recognized");
            self.state = CaptureState::Done(StopReason::StopWord);
            return;
        }

        let sequence = self.next_sequence;
        self.emit(PipelineEvent::Recognized {
            sequence,
            text: text.to_string(),
        });
        if output.send(Utterance::new(sequence, text)).is_err() {
            self.state = CaptureState::Done(StopReason::DownstreamClosed);
            return;
        }
        self.next_sequence += 1;
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.event_tx {
            tx.try_send(event).ok();
        }
    }
}
