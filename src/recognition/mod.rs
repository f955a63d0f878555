//! Speech recognition engines feeding the capture stage.

pub mod line;
pub mod recognizer;

pub use line::LineRecognizer;
pub use recognizer::{RecognitionConfig, RecognitionEvent, Recognizer, ScriptedRecognizer};
