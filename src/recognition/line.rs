//! Recognizer that treats each input line as one finalized utterance.
//!
//! Stands in for a speech engine when text arrives from a terminal, a pipe,
//! or an external dictation tool writing one segment per line.

use crate::error::{InterpError, Result};
use crate::recognition::recognizer::{RecognitionConfig, RecognitionEvent, Recognizer};
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub struct LineRecognizer {
    reader: Option<Box<dyn BufRead + Send>>,
    stopped: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    events: Option<Sender<RecognitionEvent>>,
}

impl LineRecognizer {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader: Some(reader),
            stopped: Arc::new(AtomicBool::new(false)),
            ended: Arc::new(AtomicBool::new(false)),
            events: None,
        }
    }

    /// Recognizer over standard input.
    pub fn stdin() -> Self {
        Self::new(Box::new(std::io::BufReader::new(std::io::stdin())))
    }
}

fn read_lines(
    mut reader: Box<dyn BufRead + Send>,
    events: Sender<RecognitionEvent>,
    stopped: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
) {
    let mut line = Vec::new();
    let last = loop {
        line.clear();
        // Invalid UTF-8 is replaced, not an error
        let read = reader.read_until(b'\n', &mut line);
        if stopped.load(Ordering::SeqCst) {
            return;
        }
        match read {
            Ok(0) => break RecognitionEvent::SessionStopped,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let partial = RecognitionEvent::Recognizing { text: text.clone() };
                if events.send(partial).is_err()
                    || events.send(RecognitionEvent::Recognized { text }).is_err()
                {
                    return;
                }
            }
            Err(e) => {
                break RecognitionEvent::Canceled {
                    reason: format!("input read failed: {e}"),
                };
            }
        }
    };

    ended.store(true, Ordering::SeqCst);
    // Receiver may already be gone during shutdown
    events.send(last).ok();
}

impl Recognizer for LineRecognizer {
    fn start(
        &mut self,
        config: &RecognitionConfig,
        events: Sender<RecognitionEvent>,
    ) -> Result<()> {
        let reader = self.reader.take().ok_or_else(|| InterpError::Recognition {
            message: "line recognizer can only be started once".to_string(),
        })?;

        tracing::debug!(
            language = config.language.as_str(),
            "line recognizer ignores silence timeout; each line is one utterance"
        );

        events
            .send(RecognitionEvent::SessionStarted)
            .map_err(|_| InterpError::ChannelClosed {
                channel: "recognition events".to_string(),
            })?;

        let stopped = self.stopped.clone();
        let ended = self.ended.clone();
        let thread_events = events.clone();
        // Detached: a blocked read cannot be interrupted, the thread dies with the process
        thread::Builder::new()
            .name("line-recognizer".to_string())
            .spawn(move || read_lines(reader, thread_events, stopped, ended))?;

        self.events = Some(events);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let already_stopped = self.stopped.swap(true, Ordering::SeqCst);
        if !already_stopped
            && !self.ended.load(Ordering::SeqCst)
            && let Some(events) = self.events.take()
        {
            events.send(RecognitionEvent::SessionStopped).ok();
        }
        self.events = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "lines"
    }
}
