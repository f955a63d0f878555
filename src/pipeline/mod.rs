//! Streaming translation pipeline.
//!
//! Three stations, each in its own thread, connected by bounded crossbeam
//! channels: capture emits utterances, translation workers turn them into
//! tagged results, and synthesis speaks the results in sequence order.

pub mod capture_station;
pub mod channel;
pub mod error;
pub mod orchestrator;
pub mod station;
pub mod synthesis_station;
pub mod translator_station;
pub mod types;

pub use capture_station::{CaptureConfig, CaptureStation, StopReason};
pub use channel::{Delivery, SequencedReceiver, SkipCause, result_channel, utterance_channel};
pub use error::{ErrorReporter, LogReporter, StationError};
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle, PipelineReport, StopSignal};
pub use station::{Station, StationRunner};
pub use synthesis_station::{SynthesisStation, SynthesisSummary};
pub use translator_station::{TranslationConfig, TranslatorStation};
pub use types::{PipelineEvent, TranslationResult, TranslationStatus, Utterance};
