use crate::error::{ForgeError, Result};
use crate::knowledge::KnowledgeTracker;
use crate::models::{
    KnowledgeMap, QuestionRecord, ScoreSample, Session, SessionHistoryEntry, SessionSummary,
};
use crate::scoring::{session_average, session_topic_averages};
use crate::store::{Store, keys};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persists sessions and keeps each user's knowledge history in step with them.
pub struct SessionStorage<S: Store + ?Sized> {
    store: Arc<S>,
    knowledge: KnowledgeTracker<S>,
}

impl<S: Store + ?Sized> Clone for SessionStorage<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            knowledge: self.knowledge.clone(),
        }
    }
}

impl<S: Store + ?Sized> SessionStorage<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            knowledge: KnowledgeTracker::new(store.clone()),
            store,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeTracker<S> {
        &self.knowledge
    }

    pub async fn create_session(&self, user_id: &str) -> Result<Session> {
        let session = Session::new(user_id);
        self.save_session(&session).await?;
        self.store
            .list_push(&keys::user_sessions(user_id), &session.id)
            .await?;
        tracing::info!(session_id = %session.id, user_id, "Created session");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        load_session(self.store.as_ref(), session_id).await
    }

    pub async fn require_session(&self, session_id: &str) -> Result<Session> {
        self.get_session(session_id)
            .await?
            .ok_or_else(|| ForgeError::SessionNotFound(session_id.to_string()))
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.store
            .set(&keys::session(&session.id), &serde_json::to_string(session)?)
            .await
    }

    /// Appends an evaluated answer to the session and to the user's knowledge history.
    ///
    /// The score is validated before anything is written.
    pub async fn add_question(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
        score: f64,
        topic: &str,
        weak_points: Vec<String>,
    ) -> Result<QuestionRecord> {
        let sample = ScoreSample::new(topic, score)?;
        let mut session = self.require_session(session_id).await?;
        let record = QuestionRecord::new(question, answer, &sample, weak_points);
        session.push_question(record.clone());
        self.save_session(&session).await?;
        self.knowledge
            .record_sample(&session.user_id, &sample)
            .await?;
        Ok(record)
    }

    pub async fn end_session(&self, session_id: &str) -> Result<Session> {
        let mut session = self.require_session(session_id).await?;
        if !session.is_ended() {
            session.end();
            self.save_session(&session).await?;
            tracing::info!(session_id, "Ended session");
        }
        Ok(session)
    }

    /// Normalized per-topic averages for one session.
    pub async fn session_scores(&self, session_id: &str) -> Result<BTreeMap<String, f64>> {
        let session = self.require_session(session_id).await?;
        Ok(session_topic_averages(&session))
    }

    /// All sessions of a user, newest first.
    pub async fn user_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let sessions = load_user_sessions(self.store.as_ref(), user_id).await?;
        Ok(sessions
            .into_iter()
            .map(|session| SessionSummary {
                average_score: session_average(&session),
                questions_asked: session.questions.len(),
                id: session.id,
                date: session.started_at,
                started_at: session.started_at,
                ended_at: session.ended_at,
                questions: session.questions,
            })
            .collect())
    }

    /// Current levels plus per-session history, oldest session first.
    pub async fn knowledge_map(&self, user_id: &str) -> Result<KnowledgeMap> {
        let topics = self.knowledge.all_levels(user_id).await?;
        let sessions = load_user_sessions(self.store.as_ref(), user_id).await?;
        let history = sessions
            .iter()
            .rev()
            .enumerate()
            .map(|(idx, session)| SessionHistoryEntry {
                session: idx + 1,
                topics: session_topic_averages(session),
            })
            .collect();
        Ok(KnowledgeMap { topics, history })
    }

    pub async fn improvement(&self, user_id: &str) -> Result<BTreeMap<String, f64>> {
        self.knowledge.improvement(user_id).await
    }
}

pub(crate) async fn load_session<S: Store + ?Sized>(
    store: &S,
    session_id: &str,
) -> Result<Option<Session>> {
    match store.get(&keys::session(session_id)).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Loads a user's sessions in list order (newest first), skipping dangling ids.
pub(crate) async fn load_user_sessions<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<Session>> {
    let ids = store.list_range(&keys::user_sessions(user_id), 0, -1).await?;
    let mut sessions = Vec::with_capacity(ids.len());
    for id in ids {
        match load_session(store, &id).await? {
            Some(session) => sessions.push(session),
            None => tracing::warn!(session_id = %id, user_id, "Session listed but missing"),
        }
    }
    Ok(sessions)
}
