//! Speech synthesis engines driven by the synthesis stage.

pub mod command;
pub mod synthesizer;

pub use command::{CommandExecutor, CommandSynthesizer, SystemCommandExecutor};
pub use synthesizer::{
    CancellationReason, ConsoleSynthesizer, MockSynthesizer, SynthesisConfig, SynthesisOutcome,
    Synthesizer,
};
