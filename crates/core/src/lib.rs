pub mod difficulty;
pub mod error;
pub mod evaluator;
pub mod interview;
pub mod knowledge;
pub mod models;
pub mod prompts;
pub mod question_bank;
pub mod room;
pub mod scoring;
pub mod selector;
pub mod storage;
pub mod store;
pub mod voice;

pub use error::{ForgeError, Result};

/// Commands the interview logic issues to whatever runtime carries the conversation.
///
/// Keeps the session's decision-making apart from side effects such as
/// speaking text to the candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Speak the given text to the candidate.
    SpeakText(String),
    /// The session is over; speak the final summary.
    SessionComplete(String),
}
