//! Translation engines and prompt handling.

#[cfg(feature = "azure-openai")]
pub mod azure;
pub mod engine;
pub mod prompt;

#[cfg(feature = "azure-openai")]
pub use azure::{AzureOpenAiEngine, AzureOpenAiSettings};
pub use engine::{Completion, MockEngine, MockReply, TranslationEngine};
pub use prompt::{normalize_translation, system_prompt};
