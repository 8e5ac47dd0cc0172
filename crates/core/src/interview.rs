use crate::{
    Command,
    difficulty::{Difficulty, UNSEEN_TOPIC_LEVEL},
    evaluator::Evaluator,
    question_bank::{DEFAULT_TOPIC, QuestionBank},
    selector::select_next,
    storage::SessionStorage,
    store::Store,
    voice::VoiceEvent,
};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const DEFAULT_MAX_QUESTIONS: usize = 3;
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct InterviewConfig {
    /// Answers collected before the session wraps up.
    pub max_questions: usize,
    /// How long a transcript may sit without further speech before it is taken as the answer.
    pub silence_timeout: Duration,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_MAX_QUESTIONS,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    NotStarted,
    AwaitingAnswer,
    Evaluating,
    Finished,
}

/// Drives one spoken interview: asks, scores, adapts, and summarizes.
///
/// Storage failures are logged and never stop the conversation.
pub struct InterviewSession<S: Store + ?Sized> {
    session_id: String,
    user_id: String,
    storage: SessionStorage<S>,
    evaluator: Arc<dyn Evaluator>,
    bank: Arc<dyn QuestionBank>,
    config: InterviewConfig,
    state: InterviewState,
    first_topic: Option<String>,
    current_topic: String,
    current_question: String,
    asked_topics: Vec<String>,
    answered: usize,
}

impl<S: Store + ?Sized> InterviewSession<S> {
    /// Attaches to an existing stored session.
    pub async fn new(
        storage: SessionStorage<S>,
        evaluator: Arc<dyn Evaluator>,
        bank: Arc<dyn QuestionBank>,
        session_id: &str,
        config: InterviewConfig,
    ) -> crate::Result<Self> {
        let session = storage.require_session(session_id).await?;
        Ok(Self {
            session_id: session.id,
            user_id: session.user_id,
            storage,
            evaluator,
            bank,
            config,
            state: InterviewState::NotStarted,
            first_topic: None,
            current_topic: String::new(),
            current_question: String::new(),
            asked_topics: Vec::new(),
            answered: 0,
        })
    }

    /// Opens with `topic` instead of the bank's first topic.
    pub fn with_first_topic(mut self, topic: impl Into<String>) -> Self {
        self.first_topic = Some(topic.into());
        self
    }

    pub fn state(&self) -> InterviewState {
        self.state
    }

    pub fn current_topic(&self) -> &str {
        &self.current_topic
    }

    pub fn current_question(&self) -> &str {
        &self.current_question
    }

    /// Greets the candidate with an easy question on the opening topic.
    pub fn ask_first_question(&mut self) -> Command {
        let topic = self
            .first_topic
            .clone()
            .or_else(|| self.bank.all_topics().into_iter().next())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let question = self.bank.question(&topic, Difficulty::Easy);

        tracing::info!(session_id = %self.session_id, topic = %topic, "Asking first question");
        self.current_topic = topic;
        self.current_question = question.clone();
        self.state = InterviewState::AwaitingAnswer;

        Command::SpeakText(format!(
            "Hello! I'm your interview coach. Let's start with a question: {question}"
        ))
    }

    /// Scores an answer and decides what to say next.
    ///
    /// Returns `None` when no answer is expected or the answer is blank.
    pub async fn process_answer(&mut self, answer: &str) -> Option<Command> {
        let answer = answer.trim();
        if self.state != InterviewState::AwaitingAnswer || answer.is_empty() {
            return None;
        }
        self.state = InterviewState::Evaluating;

        let evaluation = self
            .evaluator
            .evaluate(&self.current_question, answer, &self.current_topic)
            .await;
        tracing::info!(
            session_id = %self.session_id,
            topic = %self.current_topic,
            score = evaluation.score,
            "Evaluated answer"
        );

        if let Err(e) = self
            .storage
            .add_question(
                &self.session_id,
                &self.current_question,
                answer,
                evaluation.score,
                &self.current_topic,
                evaluation.weak_points.clone(),
            )
            .await
        {
            tracing::error!(session_id = %self.session_id, "Failed to store answer: {}", e);
        }
        self.asked_topics.push(self.current_topic.clone());
        self.answered += 1;

        let levels = match self.storage.knowledge().all_levels(&self.user_id).await {
            Ok(levels) => levels,
            Err(e) => {
                tracing::error!(user_id = %self.user_id, "Failed to load knowledge levels: {}", e);
                BTreeMap::new()
            }
        };
        let feedback = feedback_for(evaluation.score);

        if self.answered >= self.config.max_questions {
            return Some(self.finish(feedback, &levels).await);
        }

        let topic = select_next(&levels, &self.asked_topics, &self.bank.all_topics())
            .unwrap_or_else(|_| DEFAULT_TOPIC.to_string());
        let level = levels.get(&topic).copied().unwrap_or(UNSEEN_TOPIC_LEVEL);
        let difficulty = Difficulty::for_level(level);
        let question = self
            .evaluator
            .generate_question(&topic, difficulty, &levels)
            .await;

        tracing::info!(
            session_id = %self.session_id,
            topic = %topic,
            difficulty = %difficulty,
            "Asking next question"
        );
        self.current_topic = topic;
        self.current_question = question.clone();
        self.state = InterviewState::AwaitingAnswer;

        Some(Command::SpeakText(format!(
            "Thank you. {feedback} Next question: {question}"
        )))
    }

    async fn finish(&mut self, feedback: &str, levels: &BTreeMap<String, f64>) -> Command {
        self.state = InterviewState::Finished;
        if let Err(e) = self.storage.end_session(&self.session_id).await {
            tracing::error!(session_id = %self.session_id, "Failed to end session: {}", e);
        }
        tracing::info!(session_id = %self.session_id, answered = self.answered, "Interview complete");
        Command::SessionComplete(summary_text(feedback, self.config.max_questions, levels))
    }

    /// Runs the conversation until the session finishes or the transport closes.
    ///
    /// A transcript becomes the answer when the candidate stops speaking or
    /// once `silence_timeout` passes without a newer transcript.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<VoiceEvent>,
        commands: mpsc::Sender<Command>,
    ) -> Result<()> {
        commands
            .send(self.ask_first_question())
            .await
            .context("Command channel closed before the first question")?;

        let mut pending = String::new();
        // Set by each new transcript; other events leave the silence window running.
        let mut silence_deadline: Option<Instant> = None;
        while self.state != InterviewState::Finished {
            let event = match silence_deadline {
                Some(deadline) if !pending.is_empty() => {
                    match tokio::time::timeout_at(deadline, events.recv()).await {
                        Ok(event) => event,
                        Err(_) => {
                            tracing::debug!("Silence timeout, treating transcript as the answer");
                            silence_deadline = None;
                            self.answer_pending(&mut pending, &commands).await?;
                            continue;
                        }
                    }
                }
                _ => events.recv().await,
            };

            match event {
                Some(VoiceEvent::Transcript(text)) => {
                    if self.state == InterviewState::AwaitingAnswer {
                        pending = text.trim().to_string();
                        silence_deadline = Some(Instant::now() + self.config.silence_timeout);
                    }
                }
                Some(VoiceEvent::UserStartedSpeaking) => {
                    pending.clear();
                    silence_deadline = None;
                }
                Some(VoiceEvent::UserStoppedSpeaking) => {
                    silence_deadline = None;
                    self.answer_pending(&mut pending, &commands).await?;
                }
                Some(VoiceEvent::Error(e)) => {
                    tracing::warn!(session_id = %self.session_id, "Voice transport error: {}", e);
                }
                Some(VoiceEvent::Closed) | None => {
                    tracing::info!(session_id = %self.session_id, "Voice transport closed");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn answer_pending(
        &mut self,
        pending: &mut String,
        commands: &mpsc::Sender<Command>,
    ) -> Result<()> {
        let answer = std::mem::take(pending);
        if let Some(command) = self.process_answer(&answer).await {
            commands
                .send(command)
                .await
                .context("Command channel closed")?;
        }
        Ok(())
    }
}

fn feedback_for(score: f64) -> &'static str {
    if score >= 8.0 {
        "That was a strong answer."
    } else if score >= 6.0 {
        "Good answer, but there's room for improvement."
    } else {
        "Let's work on strengthening this area."
    }
}

fn summary_text(feedback: &str, max_questions: usize, levels: &BTreeMap<String, f64>) -> String {
    let mut parts = vec![
        format!("Thank you. {feedback}"),
        format!("That concludes our {max_questions}-question practice session!"),
        "Here's your performance summary:".to_string(),
    ];

    let mut ranked: Vec<_> = levels.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (topic, level) in &ranked {
        // Whole percent, truncated.
        let percent = (*level * 100.0) as u32;
        parts.push(format!("{}: {percent}%.", display_topic(topic)));
    }

    let average = if levels.is_empty() {
        UNSEEN_TOPIC_LEVEL
    } else {
        levels.values().sum::<f64>() / levels.len() as f64
    };
    let advice = if average >= 0.7 {
        "Great job overall! Keep practicing to stay sharp."
    } else if average >= 0.5 {
        "Good effort! Focus on your weaker areas for improvement."
    } else {
        "There's room for growth. Consider practicing more with specific examples."
    };
    parts.push(advice.to_string());
    parts.push("Check your dashboard to see your progress over time. Goodbye!".to_string());

    parts.join(" ")
}

/// `system_design` -> `System Design`
fn display_topic(topic: &str) -> String {
    topic
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
