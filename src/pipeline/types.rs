//! Messages exchanged between pipeline stages.

use std::fmt;
use std::time::SystemTime;

/// One finalized segment of recognized speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Correlation key, assigned once at capture time.
    pub sequence: u64,
    /// Recognized text.
    pub text: String,
    /// When the recognizer finalized this segment.
    pub source_timestamp: SystemTime,
}

impl Utterance {
    /// Creates a new utterance stamped with the current time.
    pub fn new(sequence: u64, text: impl Into<String>) -> Self {
        Self {
            sequence,
            text: text.into(),
            source_timestamp: SystemTime::now(),
        }
    }
}

/// Outcome of translating one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationStatus {
    Ok,
    /// No translatable content was produced. Carries the engine's finish
    /// reason or the error that ended the last attempt.
    Failed(String),
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationStatus::Ok => write!(f, "ok"),
            TranslationStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// A translation tagged with the sequence number of its utterance.
///
/// Emitted for every utterance, including failed ones, so the synthesis
/// stage never waits for a tag that will not arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub sequence: u64,
    /// Translated text (empty when the status is `Failed`).
    pub text: String,
    pub status: TranslationStatus,
}

impl TranslationResult {
    /// Creates a successful result.
    pub fn ok(sequence: u64, text: impl Into<String>) -> Self {
        Self {
            sequence,
            text: text.into(),
            status: TranslationStatus::Ok,
        }
    }

    /// Creates a failed result with an empty text.
    pub fn failed(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            sequence,
            text: String::new(),
            status: TranslationStatus::Failed(reason.into()),
        }
    }

    /// Returns true if this result carries a translation to speak.
    pub fn is_ok(&self) -> bool {
        self.status == TranslationStatus::Ok
    }
}

/// Progress notifications for console rendering.
///
/// Sent with `try_send`; a slow or absent consumer never blocks a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    SessionStarted,
    /// Interim hypothesis, never forwarded downstream.
    Partial { text: String },
    Recognized { sequence: u64, text: String },
    Translated { sequence: u64, text: String },
    TranslationFailed { sequence: u64, reason: String },
    Spoken { sequence: u64, text: String },
    SpeechCanceled {
        sequence: u64,
        reason: String,
        detail: Option<String>,
    },
    Skipped { sequence: u64, reason: String },
    SessionEnded { reason: String },
}
