//! Speech synthesis through an external text-to-speech program.

use crate::defaults;
use crate::error::{InterpError, Result};
use crate::synthesis::synthesizer::{SynthesisConfig, SynthesisOutcome, Synthesizer};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Trait for executing system commands (allows mocking in tests).
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments and wait for it to exit.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
///
/// A program still running after `timeout` is killed and reported as an
/// error, so a hung player cannot stall synthesis.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(Duration::from_millis(defaults::SYNTHESIS_TIMEOUT_MS))
    }
}

impl SystemCommandExecutor {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Read a child pipe to the end on its own thread so the child never blocks
/// on a full pipe while we poll for exit.
fn collect_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    })
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InterpError::SynthesisToolNotFound {
                        tool: command.to_string(),
                    }
                } else {
                    InterpError::Synthesis {
                        message: format!("Failed to execute {}: {}", command, e),
                    }
                }
            })?;

        let stdout = collect_pipe(child.stdout.take());
        let stderr = collect_pipe(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                return Err(InterpError::Synthesis {
                    message: format!(
                        "{} did not finish within {}ms",
                        command,
                        self.timeout.as_millis()
                    ),
                });
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(InterpError::Synthesis {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command,
                    status.code(),
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).to_string())
    }
}

/// Synthesizer that runs a text-to-speech program once per text.
///
/// Arguments may contain `{voice}` and `{text}` placeholders. The default
/// invocation is `espeak-ng -v {voice} {text}`, which plays on the default
/// output device and exits when playback is done.
pub struct CommandSynthesizer<E: CommandExecutor> {
    executor: E,
    program: String,
    args: Vec<String>,
    config: SynthesisConfig,
}

impl<E: CommandExecutor> CommandSynthesizer<E> {
    pub fn new(executor: E, config: SynthesisConfig) -> Self {
        Self {
            executor,
            program: defaults::SYNTHESIS_PROGRAM.to_string(),
            args: vec!["-v".to_string(), "{voice}".to_string(), "{text}".to_string()],
            config,
        }
    }

    /// Use a different program and argument template.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    fn render_args(&self, text: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{voice}", &self.config.voice).replace("{text}", text))
            .collect()
    }
}

impl CommandSynthesizer<SystemCommandExecutor> {
    /// Create a synthesizer using the system command executor.
    pub fn system(config: SynthesisConfig, timeout: Duration) -> Self {
        Self::new(SystemCommandExecutor::with_timeout(timeout), config)
    }
}

impl<E: CommandExecutor> Synthesizer for CommandSynthesizer<E> {
    fn speak(&mut self, text: &str) -> SynthesisOutcome {
        let args = self.render_args(text);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        match self.executor.execute(&self.program, &arg_refs) {
            Ok(_) => SynthesisOutcome::Completed,
            Err(e) => SynthesisOutcome::error(e.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
