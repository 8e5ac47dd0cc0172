/// Events a voice (or text) transport feeds into an interview.
///
/// Speech-to-text and text-to-speech live outside this crate; a transport
/// only has to translate its own frames into these events and turn
/// `Command`s back into speech.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// The latest complete transcript of what the candidate is saying.
    Transcript(String),
    UserStartedSpeaking,
    UserStoppedSpeaking,
    Error(String),
    Closed,
}
