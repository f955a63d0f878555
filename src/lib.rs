//! interpsh - Live spoken translation for the terminal
//!
//! Recognized speech is translated by a chat-completion service and spoken
//! back in order, through a three-stage threaded pipeline.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod recognition;
pub mod synthesis;
pub mod translation;

// Composition root - needs everything
#[cfg(all(feature = "cli", feature = "azure-openai"))]
pub mod app;

// Engine traits (recognize → translate → speak)
pub use recognition::{RecognitionEvent, Recognizer};
pub use synthesis::{SynthesisOutcome, Synthesizer};
pub use translation::{Completion, TranslationEngine};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle, PipelineReport};

// Error handling
pub use error::{InterpError, Result};

// Config
pub use config::{Config, Speaker};

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
