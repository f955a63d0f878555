use crate::defaults;
use crate::error::{InterpError, Result};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Immutable settings for a recognition session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    /// Locale of the speaker, e.g. `en-US`.
    pub language: String,
    /// Trailing silence that ends an utterance segment.
    pub silence_timeout_ms: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: defaults::SOURCE_LANGUAGE.to_string(),
            silence_timeout_ms: defaults::SILENCE_TIMEOUT_MS,
        }
    }
}

/// Events delivered by a recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    SessionStarted,
    /// Interim hypothesis for the segment in progress.
    Recognizing { text: String },
    /// Finalized segment.
    Recognized { text: String },
    SessionStopped,
    /// The session ended abnormally (device failure, auth, network).
    Canceled { reason: String },
}

/// Trait for continuous speech recognition engines.
///
/// Engines push events into the sender they are started with, from whatever
/// thread they deliver on. The capture stage owns the receiving end.
pub trait Recognizer: Send {
    /// Start a continuous recognition session.
    fn start(&mut self, config: &RecognitionConfig, events: Sender<RecognitionEvent>)
    -> Result<()>;

    /// Stop the session. Must be safe to call more than once.
    fn stop(&mut self) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "recognizer"
    }
}

/// Recognizer that replays a fixed list of events, for tests and demos.
pub struct ScriptedRecognizer {
    script: Vec<RecognitionEvent>,
    delay: Duration,
    fail_start: bool,
    stopped: Arc<AtomicBool>,
    stop_calls: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ScriptedRecognizer {
    /// Replays `script` verbatim. No session events are added.
    pub fn new(script: Vec<RecognitionEvent>) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            fail_start: false,
            stopped: Arc::new(AtomicBool::new(false)),
            stop_calls: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// A full session: started, one finalized event per text, stopped.
    pub fn session<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut script = vec![RecognitionEvent::SessionStarted];
        script.extend(
            texts
                .into_iter()
                .map(|t| RecognitionEvent::Recognized { text: t.into() }),
        );
        script.push(RecognitionEvent::SessionStopped);
        Self::new(script)
    }

    /// Wait between events.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Flag set once `stop()` has been called.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_calls.clone()
    }
}

impl Recognizer for ScriptedRecognizer {
    fn start(
        &mut self,
        config: &RecognitionConfig,
        events: Sender<RecognitionEvent>,
    ) -> Result<()> {
        if self.fail_start {
            return Err(InterpError::Recognition {
                message: "mock recognizer failed to start".to_string(),
            });
        }
        tracing::debug!(
            language = config.language.as_str(),
            silence_timeout_ms = config.silence_timeout_ms,
            "scripted session starting"
        );

        let script = std::mem::take(&mut self.script);
        let delay = self.delay;
        let stopped = self.stopped.clone();
        self.worker = Some(thread::spawn(move || {
            for event in script {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                if events.send(event).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_calls.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            return Err(InterpError::Recognition {
                message: "scripted recognizer thread panicked".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
