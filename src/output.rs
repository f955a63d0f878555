//! Event rendering for terminal output.
//!
//! Everything goes to stderr so that `--speaker console` can print bare
//! translations on stdout.

use crate::pipeline::PipelineEvent;
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Clear the current terminal line (replaces a partial hypothesis).
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// Format an event as one finished line.
///
/// Returns `None` for partial hypotheses, which are drawn in place instead.
pub fn format_event(event: &PipelineEvent) -> Option<String> {
    let line = match event {
        PipelineEvent::SessionStarted => format!("{}", "Listening...".dimmed()),
        PipelineEvent::Partial { .. } => return None,
        PipelineEvent::Recognized { sequence, text } => {
            format!("{} {text}", format!("[{sequence}] >").dimmed())
        }
        PipelineEvent::Translated { sequence, text } => {
            format!("{} {}", format!("[{sequence}] =").dimmed(), text.green())
        }
        PipelineEvent::TranslationFailed { sequence, reason } => format!(
            "{} {}",
            format!("[{sequence}] =").dimmed(),
            format!("no translation ({reason})").yellow()
        ),
        PipelineEvent::Spoken { sequence, .. } => {
            format!("{}", format!("[{sequence}] spoken").dimmed())
        }
        PipelineEvent::SpeechCanceled {
            sequence,
            reason,
            detail,
        } => {
            let detail = detail
                .as_ref()
                .map(|d| format!(": {d}"))
                .unwrap_or_default();
            format!(
                "{} {}",
                format!("[{sequence}]").dimmed(),
                format!("speech canceled, {reason}{detail}").red()
            )
        }
        PipelineEvent::Skipped { sequence, reason } => format!(
            "{} {}",
            format!("[{sequence}]").dimmed(),
            format!("skipped, {reason}").yellow()
        ),
        PipelineEvent::SessionEnded { reason } => {
            format!("{}", format!("Session ended: {reason}").dimmed())
        }
    };
    Some(line)
}

/// Render one event to stderr.
pub fn render_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Partial { text } => {
            eprint!("\r\x1b[2K{}", text.dimmed());
            io::stderr().flush().ok();
        }
        other => {
            if let Some(line) = format_event(other) {
                clear_line();
                eprintln!("{line}");
            }
        }
    }
}
