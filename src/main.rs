use anyhow::Result;
use clap::{CommandFactory, Parser};
use interpsh::cli::{Cli, Commands, ConfigAction};
use interpsh::config::Config;
use interpsh::pipeline::PipelineReport;
use owo_colors::OwoColorize;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    interpsh::logging::init(cli.verbose, cli.quiet);

    match cli.command.take() {
        None | Some(Commands::Run) => run(cli).await?,
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "interpsh", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(feature = "azure-openai")]
async fn run(cli: Cli) -> Result<()> {
    use interpsh::app::{RunOptions, run_translate_command};

    let config = load_config(cli.config.as_deref())?;
    let options = RunOptions {
        language: cli.language,
        voice: cli.voice,
        speaker: cli.speaker,
        stop_word: cli.stop_word,
        no_stop_word: cli.no_stop_word,
        workers: cli.workers.map(usize::from),
        gap_timeout: cli.gap_timeout,
        input: cli.input,
        quiet: cli.quiet,
    };

    let report = run_translate_command(config, options).await?;
    if !cli.quiet {
        print_report(&report);
    }
    Ok(())
}

#[cfg(not(feature = "azure-openai"))]
async fn run(_cli: Cli) -> Result<()> {
    anyhow::bail!("interpsh was built without a translation engine (enable the azure-openai feature)")
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/interpsh/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&std::path::Path>) -> Result<()> {
    let config_path = custom_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Show => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            print!("{}", config.to_display_toml()?);
            if let Err(e) = config.validate() {
                eprintln!("{} {}", "warning:".yellow(), e);
            }
        }
        ConfigAction::Dump => print!("{}", Config::dump_template()),
    }

    Ok(())
}

#[cfg_attr(not(feature = "azure-openai"), allow(dead_code))]
fn print_report(report: &PipelineReport) {
    let reason = report
        .stop_reason
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match report.synthesis {
        Some(summary) => eprintln!(
            "{} {} spoken, {} untranslated, {} skipped, {} canceled ({})",
            "Done:".green(),
            summary.spoken,
            summary.untranslated,
            summary.skipped,
            summary.canceled,
            reason
        ),
        None => eprintln!("{} ({})", "Stopped before all translations were spoken".yellow(), reason),
    }

    if report.detached_threads > 0 {
        eprintln!(
            "{} {} thread(s) did not finish in time",
            "warning:".yellow(),
            report.detached_threads
        );
    }
}
