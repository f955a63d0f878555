//! Station abstraction and runner for the translation pipeline.

use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, Sender};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A processing station in the pipeline.
///
/// Each station receives input, processes it, and produces output.
/// Stations run in their own threads and are connected by channels.
pub trait Station: Send + 'static {
    /// The input type this station receives.
    type Input: Send + 'static;
    /// The output type this station produces.
    type Output: Send + 'static;

    /// Processes a single input item.
    ///
    /// Returns:
    /// - `Ok(Some(output))` - Successfully processed and produced output
    /// - `Ok(None)` - Successfully processed but no output
    /// - `Err(StationError)` - Processing failed
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError>;

    /// Returns the name of this station for logging and error reporting.
    fn name(&self) -> &'static str;

    /// Called when the station is shutting down.
    fn shutdown(&mut self) {}
}

/// Runs a station in a dedicated thread.
///
/// The thread exits when the input channel is closed and drained, when the
/// output channel has no receiver left, or on a fatal error. Dropping the
/// output sender on exit is what propagates shutdown to the next station.
pub struct StationRunner<S: Station> {
    handle: Option<JoinHandle<()>>,
    station_name: &'static str,
    _phantom: PhantomData<S>,
}

impl<S: Station> StationRunner<S> {
    /// Spawns a station in a thread named `thread_name`.
    ///
    /// Worker pools run several copies of one station, so the thread name is
    /// given separately from the station name.
    ///
    /// # Arguments
    /// * `station` - The station implementation to run
    /// * `input_rx` - Channel to receive inputs from
    /// * `output_tx` - Channel to send outputs to
    /// * `error_reporter` - Reporter for handling errors
    pub fn spawn_named(
        thread_name: impl Into<String>,
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> crate::error::Result<Self> {
        let station_name = station.name();

        let handle = thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                Self::run_station(&mut station, input_rx, output_tx, error_reporter);
            })?;

        Ok(Self {
            handle: Some(handle),
            station_name,
            _phantom: PhantomData,
        })
    }

    fn run_station(
        station: &mut S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) {
        let station_name = station.name();
        tracing::debug!(station = station_name, "station started");

        while let Ok(input) = input_rx.recv() {
            match station.process(input) {
                Ok(Some(output)) => {
                    if output_tx.send(output).is_err() {
                        tracing::debug!(station = station_name, "output channel closed");
                        break;
                    }
                }
                Ok(None) => {}
                Err(error @ StationError::Recoverable(_)) => {
                    error_reporter.report(station_name, &error);
                }
                Err(error @ StationError::Fatal(_)) => {
                    error_reporter.report(station_name, &error);
                    break;
                }
            }
        }

        station.shutdown();
        tracing::debug!(station = station_name, "station stopped");
    }

    /// Waits for the station thread to complete.
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| format!("Station '{}' thread panicked", self.station_name))
        } else {
            Ok(())
        }
    }

    /// Returns the name of the station.
    pub fn name(&self) -> &'static str {
        self.station_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{TranslationResult, Utterance};
    use crossbeam_channel::bounded;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    // Station that "translates" by uppercasing
    struct ShoutStation {
        shutdown_called: Arc<AtomicBool>,
    }

    impl Station for ShoutStation {
        type Input = Utterance;
        type Output = TranslationResult;

        fn process(&mut self, input: Utterance) -> Result<Option<TranslationResult>, StationError> {
            Ok(Some(TranslationResult::ok(
                input.sequence,
                input.text.to_uppercase(),
            )))
        }

        fn name(&self) -> &'static str {
            "shout"
        }

        fn shutdown(&mut self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
        }
    }

    // Station that rejects utterances containing a marker word
    struct PickyStation {
        fatal_on: Option<u64>,
    }

    impl Station for PickyStation {
        type Input = Utterance;
        type Output = TranslationResult;

        fn process(&mut self, input: Utterance) -> Result<Option<TranslationResult>, StationError> {
            if Some(input.sequence) == self.fatal_on {
                return Err(StationError::Fatal(format!("engine gone at {}", input.sequence)));
            }
            if input.text.contains("skip") {
                return Err(StationError::Recoverable(format!(
                    "cannot translate {}",
                    input.sequence
                )));
            }
            Ok(Some(TranslationResult::ok(input.sequence, input.text)))
        }

        fn name(&self) -> &'static str {
            "picky"
        }
    }

    #[derive(Default)]
    struct MockReporter {
        errors: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl ErrorReporter for MockReporter {
        fn report(&self, station: &str, error: &StationError) {
            let mut errors = self.errors.lock().unwrap();
            errors.push((station.to_string(), error.to_string()));
        }
    }

    fn sequences(rx: &Receiver<TranslationResult>) -> Vec<u64> {
        rx.iter().map(|r| r.sequence).collect()
    }

    #[test]
    fn test_runner_processes_in_order_and_shuts_down() {
        let (input_tx, input_rx) = bounded(10);
        let (output_tx, output_rx) = bounded(10);
        let shutdown_flag = Arc::new(AtomicBool::new(false));

        let station = ShoutStation {
            shutdown_called: shutdown_flag.clone(),
        };
        let runner = StationRunner::spawn_named(
            "shout-0",
            station,
            input_rx,
            output_tx,
            Arc::new(MockReporter::default()),
        )
        .unwrap();
        assert_eq!(runner.name(), "shout");

        input_tx.send(Utterance::new(0, "hello")).unwrap();
        input_tx.send(Utterance::new(1, "world")).unwrap();
        drop(input_tx);

        let outputs: Vec<TranslationResult> = output_rx.iter().collect();
        assert_eq!(
            outputs,
            vec![
                TranslationResult::ok(0, "HELLO"),
                TranslationResult::ok(1, "WORLD")
            ]
        );

        runner.join().unwrap();
        assert!(shutdown_flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_runner_reports_recoverable_and_continues() {
        let (input_tx, input_rx) = bounded(10);
        let (output_tx, output_rx) = bounded(10);
        let reporter = Arc::new(MockReporter::default());
        let errors = reporter.errors.clone();

        let runner = StationRunner::spawn_named(
            "picky-0",
            PickyStation { fatal_on: None },
            input_rx,
            output_tx,
            reporter,
        )
        .unwrap();

        input_tx.send(Utterance::new(0, "fine")).unwrap();
        input_tx.send(Utterance::new(1, "skip me")).unwrap();
        input_tx.send(Utterance::new(2, "also fine")).unwrap();
        drop(input_tx);

        assert_eq!(sequences(&output_rx), vec![0, 2]);
        runner.join().unwrap();

        let reported = errors.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, "picky");
        assert!(reported[0].1.contains("cannot translate 1"));
    }

    #[test]
    fn test_runner_stops_on_fatal() {
        let (input_tx, input_rx) = bounded(10);
        let (output_tx, output_rx) = bounded(10);
        let reporter = Arc::new(MockReporter::default());
        let errors = reporter.errors.clone();

        let runner = StationRunner::spawn_named(
            "picky-0",
            PickyStation { fatal_on: Some(1) },
            input_rx,
            output_tx,
            reporter,
        )
        .unwrap();

        for seq in 0..4 {
            input_tx.send(Utterance::new(seq, "text")).unwrap();
        }

        // Output closes once the station exits, even though input is still open
        assert_eq!(sequences(&output_rx), vec![0]);
        runner.join().unwrap();
        drop(input_tx);

        let reported = errors.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert!(reported[0].1.starts_with("Fatal error"));
    }

    #[test]
    fn test_runner_exits_when_output_dropped() {
        let (input_tx, input_rx) = bounded(10);
        let (output_tx, output_rx) = bounded(10);
        let shutdown_flag = Arc::new(AtomicBool::new(false));

        let runner = StationRunner::spawn_named(
            "shout-worker-0",
            ShoutStation {
                shutdown_called: shutdown_flag.clone(),
            },
            input_rx,
            output_tx,
            Arc::new(MockReporter::default()),
        )
        .unwrap();

        drop(output_rx);
        input_tx.send(Utterance::new(0, "nobody listens")).unwrap();

        runner.join().unwrap();
        assert!(shutdown_flag.load(Ordering::SeqCst));
    }
}
