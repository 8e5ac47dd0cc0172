use anyhow::{Context, Result};
use forge_core::Command;
use forge_core::interview::InterviewSession;
use forge_core::store::Store;
use forge_core::voice::VoiceEvent;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Runs an interview over stdin/stdout: each line typed is one complete answer.
pub async fn run_console<S: Store + ?Sized + 'static>(interview: InterviewSession<S>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<VoiceEvent>(32);
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let driver = tokio::spawn(interview.run(event_rx, command_tx));

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    for event in line_events(line) {
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }
        let _ = event_tx.send(VoiceEvent::Closed).await;
    });

    while let Some(command) = command_rx.recv().await {
        match command {
            Command::SpeakText(text) => {
                println!("\ncoach> {text}");
                print!("you> ");
                let _ = std::io::stdout().flush();
            }
            Command::SessionComplete(text) => {
                println!("\ncoach> {text}");
                break;
            }
        }
    }

    // stdin reads cannot be cancelled; the process exits right after.
    reader.abort();
    driver.await.context("Interview task panicked")?
}

/// One typed line stands in for a finished utterance.
fn line_events(line: String) -> Vec<VoiceEvent> {
    let text = line.trim();
    if text.is_empty() {
        return Vec::new();
    }
    vec![
        VoiceEvent::UserStartedSpeaking,
        VoiceEvent::Transcript(text.to_string()),
        VoiceEvent::UserStoppedSpeaking,
    ]
}
