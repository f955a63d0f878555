//! Typed point-to-point channels between stages.
//!
//! Capture → Translation is a plain FIFO. Translation → Synthesis is
//! tag-addressed: the receiver hands out results strictly by sequence number,
//! buffering early arrivals, so translation workers may finish out of order.

use crate::pipeline::types::{TranslationResult, Utterance};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub type UtteranceSender = Sender<Utterance>;
pub type UtteranceReceiver = Receiver<Utterance>;
pub type ResultSender = Sender<TranslationResult>;

/// Creates the FIFO channel from capture to translation.
pub fn utterance_channel(capacity: usize) -> (UtteranceSender, UtteranceReceiver) {
    bounded(capacity)
}

/// Creates the tag-addressed channel from translation to synthesis.
///
/// The receiver starts expecting sequence number 0.
pub fn result_channel(capacity: usize, gap_timeout: Duration) -> (ResultSender, SequencedReceiver) {
    let (tx, rx) = bounded(capacity);
    (tx, SequencedReceiver::new(rx, gap_timeout))
}

/// What the synthesis stage gets for the sequence number it expects next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The result tagged with the expected sequence number.
    Ready(TranslationResult),
    /// The expected sequence number was given up on.
    Skipped { sequence: u64, cause: SkipCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    /// A later result was buffered and the missing one did not arrive within
    /// the gap timeout.
    GapTimeout,
    /// The channel closed with later results still buffered.
    Closed,
}

/// Receiver that yields results in strict sequence order.
///
/// Waiting is unbounded while nothing is buffered: no result pending means no
/// utterance is known to be missing, only that nobody is talking. Once a later
/// sequence number is buffered, the missing one is waited for at most
/// `gap_timeout` (measured from when the gap was first observed) and then
/// skipped. Results older than the expectation are discarded.
pub struct SequencedReceiver {
    rx: Receiver<TranslationResult>,
    expected: u64,
    pending: BTreeMap<u64, TranslationResult>,
    gap_timeout: Duration,
    gap_since: Option<Instant>,
    disconnected: bool,
    discarded: u64,
}

impl SequencedReceiver {
    pub fn new(rx: Receiver<TranslationResult>, gap_timeout: Duration) -> Self {
        Self {
            rx,
            expected: 0,
            pending: BTreeMap::new(),
            gap_timeout,
            gap_since: None,
            disconnected: false,
            discarded: 0,
        }
    }

    /// The sequence number the next delivery will carry.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Number of late results dropped because their slot was already skipped.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Number of early results waiting for their turn.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Blocks until the expected sequence number can be delivered or skipped.
    ///
    /// Returns `None` once the channel is closed and every buffered result has
    /// been delivered. The expectation advances by one for every `Some`.
    pub fn recv_expected(&mut self) -> Option<Delivery> {
        loop {
            if let Some(result) = self.pending.remove(&self.expected) {
                return Some(self.advance(Delivery::Ready(result)));
            }

            if self.disconnected {
                if self.pending.is_empty() {
                    return None;
                }
                let sequence = self.expected;
                return Some(self.advance(Delivery::Skipped {
                    sequence,
                    cause: SkipCause::Closed,
                }));
            }

            let received = match self.gap_since {
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(since) => {
                    let remaining = self.gap_timeout.saturating_sub(since.elapsed());
                    self.rx.recv_timeout(remaining)
                }
            };

            match received {
                Ok(result) => self.accept(result),
                Err(RecvTimeoutError::Disconnected) => self.disconnected = true,
                Err(RecvTimeoutError::Timeout) => {
                    let sequence = self.expected;
                    return Some(self.advance(Delivery::Skipped {
                        sequence,
                        cause: SkipCause::GapTimeout,
                    }));
                }
            }
        }
    }

    fn accept(&mut self, result: TranslationResult) {
        if result.sequence < self.expected {
            self.discarded += 1;
            tracing::warn!(
                sequence = result.sequence,
                expected = self.expected,
                "late translation discarded"
            );
            return;
        }
        if result.sequence > self.expected && self.gap_since.is_none() {
            self.gap_since = Some(Instant::now());
        }
        if self.pending.insert(result.sequence, result).is_some() {
            tracing::warn!("duplicate translation result replaced");
        }
    }

    fn advance(&mut self, delivery: Delivery) -> Delivery {
        self.expected += 1;
        // A remaining gap restarts its clock for the new expectation
        self.gap_since = if self.pending.keys().next().is_some_and(|&s| s > self.expected) {
            Some(Instant::now())
        } else {
            None
        };
        delivery
    }
}
