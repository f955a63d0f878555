//! Live translation entry point.
//!
//! Orchestrates the complete flow:
//! recognize → translate → speak

use crate::config::{Config, Speaker};
use crate::error::{InterpError, Result};
use crate::output::render_event;
use crate::pipeline::{Pipeline, PipelineEvent, PipelineHandle, PipelineReport};
use crate::recognition::{LineRecognizer, Recognizer};
use crate::synthesis::{CommandSynthesizer, ConsoleSynthesizer, Synthesizer};
use crate::translation::{AzureOpenAiEngine, TranslationEngine};
use crossbeam_channel::bounded;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Overrides taken from the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub language: Option<String>,
    pub voice: Option<String>,
    pub speaker: Option<Speaker>,
    pub stop_word: Option<String>,
    pub no_stop_word: bool,
    pub workers: Option<usize>,
    pub gap_timeout: Option<Duration>,
    pub input: Option<PathBuf>,
    pub quiet: bool,
}

/// Apply command-line overrides on top of file and environment values.
pub fn apply_overrides(config: &mut Config, options: &RunOptions) {
    if let Some(ref language) = options.language {
        config.recognition.language = language.clone();
    }
    if let Some(ref voice) = options.voice {
        config.synthesis.voice = voice.clone();
    }
    if let Some(speaker) = options.speaker {
        config.synthesis.speaker = speaker;
    }
    if let Some(ref word) = options.stop_word {
        config.recognition.stop_word = word.clone();
    }
    if options.no_stop_word {
        config.recognition.stop_word.clear();
    }
    if let Some(workers) = options.workers {
        config.pipeline.workers = workers;
    }
    if let Some(gap_timeout) = options.gap_timeout {
        config.pipeline.gap_timeout_ms = gap_timeout.as_millis().try_into().unwrap_or(u64::MAX);
    }
}

/// Run the translate command until the session ends or Ctrl+C is pressed.
///
/// A first Ctrl+C stops capture and lets in-flight translations be spoken;
/// a second one exits immediately.
pub async fn run_translate_command(mut config: Config, options: RunOptions) -> Result<PipelineReport> {
    apply_overrides(&mut config, &options);
    config.validate()?;

    let (event_tx, event_rx) = bounded::<PipelineEvent>(256);
    let renderer = if options.quiet {
        drop(event_rx);
        None
    } else {
        Some(
            thread::Builder::new()
                .name("console".to_string())
                .spawn(move || {
                    for event in event_rx {
                        render_event(&event);
                    }
                })?,
        )
    };

    // The HTTP client blocks; keep it off the async workers
    let input = options.input.clone();
    let handle = tokio::task::spawn_blocking(move || start_pipeline(&config, input, event_tx))
        .await
        .map_err(|e| InterpError::Other(format!("pipeline startup task failed: {e}")))??;

    let stop = handle.stop_signal();
    let quiet = options.quiet;
    let signals = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if !quiet {
            eprintln!("\nStopping, finishing pending translations (Ctrl+C again to quit)...");
        }
        stop.trigger();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let report = tokio::task::spawn_blocking(move || handle.wait())
        .await
        .map_err(|e| InterpError::Other(format!("pipeline task failed: {e}")))?;
    signals.abort();

    if let Some(renderer) = renderer
        && renderer.join().is_err()
    {
        tracing::warn!("console renderer panicked");
    }

    Ok(report)
}

fn start_pipeline(
    config: &Config,
    input: Option<PathBuf>,
    event_tx: crossbeam_channel::Sender<PipelineEvent>,
) -> Result<PipelineHandle> {
    let recognizer: Box<dyn Recognizer> = match input {
        Some(path) => {
            let file = File::open(&path).map_err(|e| InterpError::Recognition {
                message: format!("cannot open {}: {e}", path.display()),
            })?;
            Box::new(LineRecognizer::new(Box::new(BufReader::new(file))))
        }
        None => Box::new(LineRecognizer::stdin()),
    };

    let engine: Arc<dyn TranslationEngine> =
        Arc::new(AzureOpenAiEngine::new(config.azure_settings())?);

    let synthesizer: Box<dyn Synthesizer> = match config.synthesis.speaker {
        Speaker::Console => Box::new(ConsoleSynthesizer::stdout()),
        Speaker::Command => Box::new(
            CommandSynthesizer::system(
                config.synthesis_config(),
                Duration::from_millis(config.synthesis.timeout_ms),
            )
            .with_command(
                config.synthesis.program.clone(),
                config.synthesis.args.clone(),
            ),
        ),
    };

    tracing::info!(
        recognizer = recognizer.name(),
        engine = engine.name(),
        synthesizer = synthesizer.name(),
        workers = config.pipeline.workers,
        "starting pipeline"
    );

    Pipeline::new(config.pipeline_config())
        .with_event_sender(event_tx)
        .start(recognizer, engine, synthesizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let options = RunOptions {
            language: Some("en-GB".to_string()),
            voice: Some("zh".to_string()),
            speaker: Some(Speaker::Console),
            workers: Some(4),
            gap_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        apply_overrides(&mut config, &options);

        assert_eq!(config.recognition.language, "en-GB");
        assert_eq!(config.synthesis.voice, "zh");
        assert_eq!(config.synthesis.speaker, Speaker::Console);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.gap_timeout_ms, 5000);
    }

    #[test]
    fn test_no_stop_word_clears_keyword() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &RunOptions {
                no_stop_word: true,
                ..Default::default()
            },
        );
        assert!(config.recognition.stop_word.is_empty());
        assert_eq!(config.pipeline_config().capture.stop_word, None);
    }

    #[test]
    fn test_empty_options_keep_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, &RunOptions::default());
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_before_listening() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lines.txt");
        std::fs::write(&input, "hello there\n").unwrap();

        let options = RunOptions {
            input: Some(input),
            quiet: true,
            ..Default::default()
        };
        let result = run_translate_command(Config::default(), options).await;
        assert!(matches!(
            result,
            Err(InterpError::ConfigInvalidValue { .. })
        ));
    }
}
