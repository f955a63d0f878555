use crate::defaults;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Immutable settings for the synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Voice name understood by the engine.
    pub voice: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            voice: defaults::VOICE.to_string(),
        }
    }
}

/// Why a synthesis request did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The engine failed; the outcome carries error details.
    Error,
    /// The audio stream ended before playback finished.
    EndOfStream,
    /// Playback was interrupted on request.
    CancelledByUser,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationReason::Error => write!(f, "error"),
            CancellationReason::EndOfStream => write!(f, "end of stream"),
            CancellationReason::CancelledByUser => write!(f, "cancelled by user"),
        }
    }
}

/// Result of speaking one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Completed,
    Canceled {
        reason: CancellationReason,
        error_detail: Option<String>,
    },
}

impl SynthesisOutcome {
    /// Cancellation caused by an engine error.
    pub fn error(detail: impl Into<String>) -> Self {
        SynthesisOutcome::Canceled {
            reason: CancellationReason::Error,
            error_detail: Some(detail.into()),
        }
    }
}

/// Trait for speech synthesis engines.
///
/// `speak` blocks until playback has finished or was canceled.
pub trait Synthesizer: Send {
    fn speak(&mut self, text: &str) -> SynthesisOutcome;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "synthesizer"
    }
}

/// Synthesizer that writes each translation as a line instead of speaking it.
pub struct ConsoleSynthesizer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> ConsoleSynthesizer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl ConsoleSynthesizer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Synthesizer for ConsoleSynthesizer<W> {
    fn speak(&mut self, text: &str) -> SynthesisOutcome {
        match writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            Ok(()) => SynthesisOutcome::Completed,
            Err(e) => SynthesisOutcome::error(format!("write failed: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Mock synthesizer for testing.
///
/// Records every text it was asked to speak. Texts registered with
/// `with_failure_on` are canceled with an error instead.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer {
    spoken: Arc<Mutex<Vec<String>>>,
    fail_on: Vec<String>,
    delay: Option<std::time::Duration>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel with an error when asked to speak `text`.
    pub fn with_failure_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    /// Simulate playback time.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared log of texts passed to `speak`, in call order.
    pub fn spoken(&self) -> Arc<Mutex<Vec<String>>> {
        self.spoken.clone()
    }
}

impl Synthesizer for MockSynthesizer {
    fn speak(&mut self, text: &str) -> SynthesisOutcome {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        if self.fail_on.iter().any(|f| f == text) {
            SynthesisOutcome::error("mock synthesis failure")
        } else {
            SynthesisOutcome::Completed
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
