use crate::defaults;
use crate::error::{InterpError, Result};
use crate::pipeline::{CaptureConfig, PipelineConfig, TranslationConfig};
use crate::recognition::RecognitionConfig;
use crate::synthesis::SynthesisConfig;
use crate::translation::system_prompt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_OPENAI_ENDPOINT: &str = "INTERPSH_OPENAI_ENDPOINT";
pub const ENV_OPENAI_KEY: &str = "INTERPSH_OPENAI_KEY";
pub const ENV_OPENAI_DEPLOYMENT: &str = "INTERPSH_OPENAI_DEPLOYMENT";
pub const ENV_VOICE: &str = "INTERPSH_VOICE";
pub const ENV_LANGUAGE: &str = "INTERPSH_LANGUAGE";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionSection,
    pub translation: TranslationSection,
    pub synthesis: SynthesisSection,
    pub pipeline: PipelineSection,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionSection {
    pub language: String,
    pub silence_timeout_ms: u32,
    /// Empty disables the stop keyword.
    pub stop_word: String,
}

/// Translation service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationSection {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub source_language: String,
    pub target_language: String,
    pub max_output_tokens: u32,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisSection {
    pub speaker: Speaker,
    pub voice: String,
    pub program: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

/// Where translations are delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Speaker {
    /// Run a text-to-speech program per translation
    Command,
    /// Print translations to stdout
    Console,
}

/// Stage wiring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    pub workers: usize,
    pub utterance_buffer: usize,
    pub result_buffer: usize,
    pub gap_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for RecognitionSection {
    fn default() -> Self {
        Self {
            language: defaults::SOURCE_LANGUAGE.to_string(),
            silence_timeout_ms: defaults::SILENCE_TIMEOUT_MS,
            stop_word: defaults::STOP_WORD.to_string(),
        }
    }
}

impl Default for TranslationSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: defaults::AZURE_API_VERSION.to_string(),
            source_language: defaults::SOURCE_LANGUAGE_NAME.to_string(),
            target_language: defaults::TARGET_LANGUAGE_NAME.to_string(),
            max_output_tokens: defaults::MAX_OUTPUT_TOKENS,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            speaker: Speaker::Command,
            voice: defaults::VOICE.to_string(),
            program: defaults::SYNTHESIS_PROGRAM.to_string(),
            args: vec!["-v".to_string(), "{voice}".to_string(), "{text}".to_string()],
            timeout_ms: defaults::SYNTHESIS_TIMEOUT_MS,
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: defaults::TRANSLATION_WORKERS,
            utterance_buffer: defaults::UTTERANCE_BUFFER,
            result_buffer: defaults::RESULT_BUFFER,
            gap_timeout_ms: defaults::GAP_TIMEOUT_MS,
            poll_interval_ms: defaults::CAPTURE_POLL_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only falls back to defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - INTERPSH_OPENAI_ENDPOINT → translation.endpoint
    /// - INTERPSH_OPENAI_KEY → translation.api_key
    /// - INTERPSH_OPENAI_DEPLOYMENT → translation.deployment
    /// - INTERPSH_VOICE → synthesis.voice
    /// - INTERPSH_LANGUAGE → recognition.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENV_OPENAI_ENDPOINT)
            && !endpoint.is_empty()
        {
            self.translation.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var(ENV_OPENAI_KEY)
            && !key.is_empty()
        {
            self.translation.api_key = key;
        }

        if let Ok(deployment) = std::env::var(ENV_OPENAI_DEPLOYMENT)
            && !deployment.is_empty()
        {
            self.translation.deployment = deployment;
        }

        if let Ok(voice) = std::env::var(ENV_VOICE)
            && !voice.is_empty()
        {
            self.synthesis.voice = voice;
        }

        if let Ok(language) = std::env::var(ENV_LANGUAGE)
            && !language.is_empty()
        {
            self.recognition.language = language;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/interpsh/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("interpsh")
            .join("config.toml")
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> Result<()> {
            Err(InterpError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        }

        if self.recognition.language.trim().is_empty() {
            return invalid("recognition.language", "must not be empty");
        }
        if self.translation.max_output_tokens == 0 {
            return invalid("translation.max_output_tokens", "must be at least 1");
        }
        if self.translation.max_attempts == 0 {
            return invalid("translation.max_attempts", "must be at least 1");
        }
        if self.translation.retry_backoff_ms > 60_000 {
            return invalid("translation.retry_backoff_ms", "must be at most 60000");
        }
        if self.translation.request_timeout_ms == 0 {
            return invalid("translation.request_timeout_ms", "must be positive");
        }
        if self.synthesis.voice.trim().is_empty() {
            return invalid("synthesis.voice", "must not be empty");
        }
        if self.synthesis.speaker == Speaker::Command && self.synthesis.program.trim().is_empty() {
            return invalid("synthesis.program", "must not be empty");
        }
        if self.synthesis.timeout_ms == 0 {
            return invalid("synthesis.timeout_ms", "must be positive");
        }
        if !(1..=32).contains(&self.pipeline.workers) {
            return invalid("pipeline.workers", "must be between 1 and 32");
        }
        if self.pipeline.utterance_buffer == 0 || self.pipeline.result_buffer == 0 {
            return invalid("pipeline", "channel buffers must be at least 1");
        }
        if self.pipeline.gap_timeout_ms == 0 {
            return invalid("pipeline.gap_timeout_ms", "must be positive");
        }
        if self.pipeline.poll_interval_ms == 0 {
            return invalid("pipeline.poll_interval_ms", "must be positive");
        }
        Ok(())
    }

    pub fn recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            language: self.recognition.language.clone(),
            silence_timeout_ms: self.recognition.silence_timeout_ms,
        }
    }

    pub fn translation_config(&self) -> TranslationConfig {
        TranslationConfig {
            system_prompt: system_prompt(
                &self.translation.source_language,
                &self.translation.target_language,
            ),
            max_output_tokens: self.translation.max_output_tokens,
            max_attempts: self.translation.max_attempts,
            retry_backoff: Duration::from_millis(self.translation.retry_backoff_ms),
        }
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            voice: self.synthesis.voice.clone(),
        }
    }

    /// Build the stage wiring for a pipeline run.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let stop_word = self.recognition.stop_word.trim();
        PipelineConfig {
            capture: CaptureConfig {
                recognition: self.recognition_config(),
                stop_word: (!stop_word.is_empty()).then(|| stop_word.to_string()),
                poll_interval: Duration::from_millis(self.pipeline.poll_interval_ms),
            },
            translation: self.translation_config(),
            workers: self.pipeline.workers,
            utterance_buffer: self.pipeline.utterance_buffer,
            result_buffer: self.pipeline.result_buffer,
            gap_timeout: Duration::from_millis(self.pipeline.gap_timeout_ms),
            ..PipelineConfig::default()
        }
    }

    #[cfg(feature = "azure-openai")]
    pub fn azure_settings(&self) -> crate::translation::AzureOpenAiSettings {
        crate::translation::AzureOpenAiSettings {
            endpoint: self.translation.endpoint.clone(),
            api_key: self.translation.api_key.clone(),
            deployment: self.translation.deployment.clone(),
            api_version: self.translation.api_version.clone(),
            timeout: Duration::from_millis(self.translation.request_timeout_ms),
        }
    }

    /// Effective configuration as TOML, with the API key masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.translation.api_key.is_empty() {
            shown.translation.api_key = "********".to_string();
        }
        toml::to_string_pretty(&shown).map_err(|e| InterpError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Commented template listing every option with its default.
    pub fn dump_template() -> &'static str {
        CONFIG_TEMPLATE
    }
}

const CONFIG_TEMPLATE: &str = r#"# interpsh configuration
# Location: ~/.config/interpsh/config.toml

[recognition]
# Locale of the speaker
language = "en-US"
# Trailing silence (ms) that ends an utterance
silence_timeout_ms = 200
# Saying this word alone ends the session; empty disables it
stop_word = "stop"

[translation]
# Azure OpenAI resource, e.g. "https://my-resource.openai.azure.com"
# Env: INTERPSH_OPENAI_ENDPOINT
endpoint = ""
# Env: INTERPSH_OPENAI_KEY
api_key = ""
# Env: INTERPSH_OPENAI_DEPLOYMENT
deployment = ""
api_version = "2023-07-01-preview"
source_language = "English"
target_language = "Chinese"
max_output_tokens = 100
request_timeout_ms = 10000
# Attempts per utterance on network errors, timeouts, 429 and 5xx
max_attempts = 3
retry_backoff_ms = 250

[synthesis]
# "command" runs a text-to-speech program, "console" prints translations
speaker = "command"
# Env: INTERPSH_VOICE
voice = "cmn"
program = "espeak-ng"
# {voice} and {text} are substituted per translation
args = ["-v", "{voice}", "{text}"]
# The program is killed if one translation takes longer than this to speak
timeout_ms = 60000

[pipeline]
# Translation workers; results are still spoken in order
workers = 1
utterance_buffer = 64
result_buffer = 64
# How long to wait for a missing translation once a later one is ready
gap_timeout_ms = 40000
poll_interval_ms = 100
"#;
