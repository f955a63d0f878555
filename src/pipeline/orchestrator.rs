//! Translation pipeline that runs from session start until the last
//! translation has been spoken.

use crate::defaults;
use crate::error::Result;
use crate::pipeline::capture_station::{CaptureConfig, CaptureStation, StopReason};
use crate::pipeline::channel::{result_channel, utterance_channel};
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::station::StationRunner;
use crate::pipeline::synthesis_station::{SynthesisStation, SynthesisSummary};
use crate::pipeline::translator_station::{TranslationConfig, TranslatorStation};
use crate::pipeline::types::PipelineEvent;
use crate::recognition::recognizer::Recognizer;
use crate::synthesis::synthesizer::Synthesizer;
use crate::translation::engine::TranslationEngine;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub capture: CaptureConfig,
    pub translation: TranslationConfig,
    /// Translation workers sharing the utterance channel (at least 1)
    pub workers: usize,
    /// Channel buffer sizes
    pub utterance_buffer: usize,
    pub result_buffer: usize,
    /// How long synthesis waits for a missing sequence number once a later
    /// one is buffered
    pub gap_timeout: Duration,
    /// How long `stop()` waits for in-flight translations to be spoken
    pub shutdown_timeout: Duration,
    /// Optional event sender for console rendering (crossbeam, non-blocking)
    pub event_tx: Option<Sender<PipelineEvent>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            translation: TranslationConfig::default(),
            workers: defaults::TRANSLATION_WORKERS,
            utterance_buffer: defaults::UTTERANCE_BUFFER,
            result_buffer: defaults::RESULT_BUFFER,
            gap_timeout: Duration::from_millis(defaults::GAP_TIMEOUT_MS),
            shutdown_timeout: Duration::from_secs(5),
            event_tx: None,
        }
    }
}

/// What a finished pipeline reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Why capture ended. `None` if the capture thread never reported.
    pub stop_reason: Option<StopReason>,
    /// Synthesis counters. `None` if synthesis did not drain in time.
    pub synthesis: Option<SynthesisSummary>,
    /// Threads still running when the shutdown deadline passed.
    pub detached_threads: usize,
}

/// Cloneable operator stop switch, safe to trigger from a signal handler task.
#[derive(Debug, Clone)]
pub struct StopSignal {
    running: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn trigger(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    /// Cleared by the operator or when capture ends
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    capture_rx: Option<Receiver<StopReason>>,
    synthesis_rx: Option<Receiver<SynthesisSummary>>,
    shutdown_timeout: Duration,
}

impl PipelineHandle {
    /// Blocks until the session ends on its own and every translation has
    /// been spoken, skipped, or reported as failed.
    pub fn wait(mut self) -> PipelineReport {
        let synthesis = self.synthesis_rx.as_ref().and_then(|rx| rx.recv().ok());
        let stop_reason = self.capture_rx.as_ref().and_then(|rx| rx.recv().ok());
        let detached_threads = join_threads(&mut self.threads, None);
        PipelineReport {
            stop_reason,
            synthesis,
            detached_threads,
        }
    }

    /// Stops capture and lets in-flight translations drain.
    ///
    /// Waits up to the shutdown timeout for synthesis to finish, then 1s for
    /// threads. After the deadline, remaining threads are detached and die
    /// with the process.
    pub fn stop(mut self) -> PipelineReport {
        self.running.store(false, Ordering::SeqCst);

        let synthesis = self
            .synthesis_rx
            .as_ref()
            .and_then(|rx| rx.recv_timeout(self.shutdown_timeout).ok());
        let stop_reason = self
            .capture_rx
            .as_ref()
            .and_then(|rx| rx.recv_timeout(Duration::from_secs(1)).ok());

        let deadline = Instant::now() + Duration::from_secs(1);
        let detached_threads = join_threads(&mut self.threads, Some(deadline));
        PipelineReport {
            stop_reason,
            synthesis,
            detached_threads,
        }
    }

    /// Switch that stops the pipeline without consuming the handle.
    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            running: self.running.clone(),
        }
    }

    /// Returns true while capture is still listening.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Joins finished threads, reporting panics. Without a deadline this blocks
/// until all are done; with one, returns the number left running.
fn join_threads(threads: &mut Vec<JoinHandle<()>>, deadline: Option<Instant>) -> usize {
    let poll_interval = Duration::from_millis(50);

    loop {
        let mut remaining = Vec::new();
        for handle in threads.drain(..) {
            if deadline.is_none() || handle.is_finished() {
                if let Err(panic_info) = handle.join() {
                    let msg = panic_info
                        .downcast_ref::<&str>()
                        .copied()
                        .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                        .unwrap_or("unknown panic");
                    tracing::error!("pipeline thread panicked: {msg}");
                }
            } else {
                remaining.push(handle);
            }
        }
        *threads = remaining;

        if threads.is_empty() {
            return 0;
        }

        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            tracing::warn!(
                "shutdown timeout, {} thread(s) still running, detaching",
                threads.len()
            );
            // Dropping JoinHandles detaches threads
            let detached = threads.len();
            threads.clear();
            return detached;
        }

        thread::sleep(poll_interval);
    }
}

/// Translation pipeline: Recognizer → Capture → Translation → Synthesis.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline with default error reporter.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sends console events to `tx`.
    pub fn with_event_sender(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.config.event_tx = Some(tx);
        self
    }

    /// Starts the recognition session and the three stages.
    ///
    /// # Arguments
    /// * `recognizer` - Speech recognition engine
    /// * `engine` - Completion engine shared by all translation workers
    /// * `synthesizer` - Speech synthesis engine
    ///
    /// # Returns
    /// Handle to wait for or stop the pipeline
    pub fn start(
        self,
        recognizer: Box<dyn Recognizer>,
        engine: Arc<dyn TranslationEngine>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Result<PipelineHandle> {
        let running = Arc::new(AtomicBool::new(true));

        let mut capture = CaptureStation::new(recognizer, self.config.capture.clone());
        if let Some(ref event_tx) = self.config.event_tx {
            capture = capture.with_event_sender(event_tx.clone());
        }
        // Start recognition before any thread exists so a failure leaves nothing behind
        let recognition_events = capture.start()?;

        let (utterance_tx, utterance_rx) = utterance_channel(self.config.utterance_buffer);
        let (result_tx, result_rx) =
            result_channel(self.config.result_buffer, self.config.gap_timeout);

        let mut threads = Vec::new();

        // Synthesis
        let mut synthesis = SynthesisStation::new(synthesizer);
        if let Some(ref event_tx) = self.config.event_tx {
            synthesis = synthesis.with_event_sender(event_tx.clone());
        }
        let (synthesis_tx, synthesis_rx) = bounded(1);
        threads.push(
            thread::Builder::new()
                .name("synthesis".to_string())
                .spawn(move || {
                    let summary = synthesis.run(result_rx);
                    synthesis_tx.send(summary).ok();
                })?,
        );

        // Translation workers; the result channel closes when the last one exits
        let workers = self.config.workers.max(1);
        for worker in 0..workers {
            let mut station = TranslatorStation::new(engine.clone(), self.config.translation.clone());
            if let Some(ref event_tx) = self.config.event_tx {
                station = station.with_event_sender(event_tx.clone());
            }
            let runner = StationRunner::spawn_named(
                format!("translator-{worker}"),
                station,
                utterance_rx.clone(),
                result_tx.clone(),
                self.error_reporter.clone(),
            )?;
            threads.push(thread::spawn(move || {
                if let Err(msg) = runner.join() {
                    tracing::error!("{msg}");
                }
            }));
        }
        drop(result_tx);
        drop(utterance_rx);
        tracing::debug!(workers, "translation workers started");

        // Capture
        let (capture_tx, capture_rx) = bounded(1);
        let capture_running = running.clone();
        threads.push(
            thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || {
                    let reason =
                        capture.run(recognition_events, utterance_tx, capture_running.clone());
                    capture_running.store(false, Ordering::SeqCst);
                    capture_tx.send(reason).ok();
                })?,
        );

        Ok(PipelineHandle {
            running,
            threads,
            capture_rx: Some(capture_rx),
            synthesis_rx: Some(synthesis_rx),
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }
}
