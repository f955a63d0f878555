//! Default configuration constants for interpsh.
//!
//! Shared by the config file types, the CLI and the pipeline so every entry
//! point starts from the same values.

/// Locale of the speaker's language, passed to the recognizer.
pub const SOURCE_LANGUAGE: &str = "en-US";

/// Human-readable name of the speaker's language, used in the system prompt.
pub const SOURCE_LANGUAGE_NAME: &str = "English";

/// Human-readable name of the listener's language, used in the system prompt.
pub const TARGET_LANGUAGE_NAME: &str = "Chinese";

/// Trailing silence that ends an utterance segment, in milliseconds.
///
/// Short values lower latency for a single steady speaker (200-300ms suits
/// news reading). Conversations with several people need more, otherwise
/// natural pauses split sentences.
pub const SILENCE_TIMEOUT_MS: u32 = 200;

/// Voice used by the synthesizer.
pub const VOICE: &str = "cmn";

/// Upper bound on generated translation length, in tokens.
pub const MAX_OUTPUT_TOKENS: u32 = 100;

/// HTTP request timeout for one translation call, in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Attempts per utterance for transient translation failures.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; later retries wait proportionally longer.
pub const RETRY_BACKOFF_MS: u64 = 250;

/// Azure OpenAI REST API version.
pub const AZURE_API_VERSION: &str = "2023-07-01-preview";

/// How long synthesis waits for a missing sequence number once a later one
/// has arrived, in milliseconds.
///
/// Must exceed one full translation attempt cycle, otherwise slow
/// translations are skipped and then discarded on arrival.
pub const GAP_TIMEOUT_MS: u64 = 40_000;

/// Number of concurrent translation workers.
pub const TRANSLATION_WORKERS: usize = 1;

/// Channel buffer between capture and translation.
pub const UTTERANCE_BUFFER: usize = 64;

/// Channel buffer between translation and synthesis.
pub const RESULT_BUFFER: usize = 64;

/// Interval at which the capture loop checks for an operator stop.
pub const CAPTURE_POLL_MS: u64 = 100;

/// Recognized text equal to this word ends the session.
pub const STOP_WORD: &str = "stop";

/// Default synthesis program.
pub const SYNTHESIS_PROGRAM: &str = "espeak-ng";

/// A synthesis program still running after this long is killed.
pub const SYNTHESIS_TIMEOUT_MS: u64 = 60_000;
