//! Command-line interface for interpsh
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Speaker;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Live spoken translation for the terminal
#[derive(Parser, Debug)]
#[command(
    name = "interpsh",
    version,
    about = "Live spoken translation for the terminal"
)]
pub struct Cli {
    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress console output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Speaker locale for recognition (e.g., en-US)
    #[arg(long, global = true, value_name = "LANG")]
    pub language: Option<String>,

    /// Synthesis voice name
    #[arg(long, global = true, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Where translations go: speak them with a TTS program, or print them
    #[arg(long, global = true, value_enum, value_name = "SPEAKER")]
    pub speaker: Option<Speaker>,

    /// Word that ends the session when said on its own
    #[arg(long, global = true, value_name = "WORD", conflicts_with = "no_stop_word")]
    pub stop_word: Option<String>,

    /// Disable the stop word
    #[arg(long, global = true)]
    pub no_stop_word: bool,

    /// Number of translation workers
    #[arg(long, global = true, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=32))]
    pub workers: Option<u16>,

    /// How long to wait for a missing translation. Examples: 40s, 2m, 1m30s
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub gap_timeout: Option<Duration>,

    /// Read utterances line by line from a file instead of stdin
    #[arg(long, global = true, value_name = "PATH")]
    pub input: Option<PathBuf>,
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`), and compound (`1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("duration must be positive".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Translate speech until the session ends (default)
    Run,

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Show the effective configuration (file, environment, defaults)
    Show,
    /// Dump a commented configuration template
    Dump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["interpsh"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.language.is_none());
        assert!(cli.voice.is_none());
        assert!(cli.speaker.is_none());
        assert!(cli.stop_word.is_none());
        assert!(!cli.no_stop_word);
        assert!(cli.workers.is_none());
        assert!(cli.gap_timeout.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["interpsh", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "interpsh",
            "run",
            "--voice",
            "zh",
            "--speaker",
            "console",
            "--workers",
            "4",
            "--gap-timeout",
            "1m30s",
            "--stop-word",
            "halt",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Run));
        assert_eq!(cli.voice.as_deref(), Some("zh"));
        assert_eq!(cli.speaker, Some(Speaker::Console));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.gap_timeout, Some(Duration::from_secs(90)));
        assert_eq!(cli.stop_word.as_deref(), Some("halt"));
    }

    #[test]
    fn test_stop_word_conflicts_with_disable() {
        let result =
            Cli::try_parse_from(["interpsh", "--stop-word", "halt", "--no-stop-word"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_workers_range() {
        assert!(Cli::try_parse_from(["interpsh", "--workers", "0"]).is_err());
        assert!(Cli::try_parse_from(["interpsh", "--workers", "33"]).is_err());
    }

    #[test]
    fn test_parse_config_actions() {
        let cli = Cli::try_parse_from(["interpsh", "config", "dump"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Dump
            })
        );
        let cli = Cli::try_parse_from(["interpsh", "--config", "/tmp/x.toml", "config", "show"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["interpsh", "completions", "bash"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("40"), Ok(Duration::from_secs(40)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }
}
