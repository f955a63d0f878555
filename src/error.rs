//! Error types for interpsh.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Recognition errors
    #[error("Speech recognition failed: {message}")]
    Recognition { message: String },

    // Translation errors
    #[error("Translation request failed: {message}")]
    TranslationRequest { message: String },

    #[error("Translation service returned status {status}: {message}")]
    TranslationApi { status: u16, message: String },

    #[error("Translation request timed out after {timeout_ms}ms")]
    TranslationTimeout { timeout_ms: u64 },

    #[error("Translation service rate limited the request")]
    TranslationRateLimited,

    #[error("Translation response malformed: {message}")]
    TranslationResponse { message: String },

    // Synthesis errors
    #[error("Speech synthesis tool not found: {tool}")]
    SynthesisToolNotFound { tool: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // Pipeline errors
    #[error("Channel '{channel}' closed")]
    ChannelClosed { channel: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl InterpError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, timeouts, rate limiting and server-side (5xx) errors
    /// are transient. Everything else fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            InterpError::TranslationRequest { .. }
            | InterpError::TranslationTimeout { .. }
            | InterpError::TranslationRateLimited => true,
            InterpError::TranslationApi { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the service refused the credential or deployment itself.
    ///
    /// Every later request fails the same way, so the translation stage
    /// shuts down instead of failing each utterance in turn.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            InterpError::TranslationApi {
                status: 401 | 403,
                ..
            }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, InterpError>;
