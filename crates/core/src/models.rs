use crate::error::{ForgeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Highest score an evaluator may award.
pub const MAX_SCORE: f64 = 10.0;

/// A validated score for one topic at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    topic: String,
    value: f64,
    timestamp: DateTime<Utc>,
}

impl ScoreSample {
    /// Builds a sample, rejecting blank topics and scores outside `0..=10`.
    pub fn new(topic: impl Into<String>, value: f64) -> Result<Self> {
        let topic = topic.into();
        validate_topic(&topic)?;
        validate_score(value)?;
        Ok(Self {
            topic,
            value,
            timestamp: Utc::now(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn validate_score(value: f64) -> Result<()> {
    // NaN fails the range check as well.
    if (0.0..=MAX_SCORE).contains(&value) {
        Ok(())
    } else {
        Err(ForgeError::InvalidScore(value))
    }
}

pub(crate) fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        Err(ForgeError::InvalidTopic(topic.to_string()))
    } else {
        Ok(())
    }
}

/// One asked question together with the candidate's answer and its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub topic: String,
    pub weak_points: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl QuestionRecord {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        sample: &ScoreSample,
        weak_points: Vec<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            score: sample.value(),
            topic: sample.topic().to_string(),
            weak_points,
            timestamp: sample.timestamp(),
        }
    }
}

/// A single interview session as persisted under `session:{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
    #[serde(default)]
    pub current_scores: BTreeMap<String, Vec<f64>>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: new_session_id(),
            user_id: user_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            questions: Vec::new(),
            current_scores: BTreeMap::new(),
        }
    }

    /// Appends a record and mirrors its score into `current_scores`.
    pub fn push_question(&mut self, record: QuestionRecord) {
        self.current_scores
            .entry(record.topic.clone())
            .or_default()
            .push(record.score);
        self.questions.push(record);
    }

    /// Topics asked so far, in order.
    pub fn asked_topics(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.topic.clone()).collect()
    }

    pub fn last_question(&self) -> Option<&QuestionRecord> {
        self.questions.last()
    }

    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("sess_{}", &hex[..8])
}

/// Listing entry returned for a user's sessions.
///
/// `average_score` is on the raw 0-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub date: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub questions_asked: usize,
    pub average_score: f64,
    pub questions: Vec<QuestionRecord>,
}

/// Per-session topic averages (normalized to 0-1), tagged with a 1-based session index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    pub session: usize,
    #[serde(flatten)]
    pub topics: BTreeMap<String, f64>,
}

/// The knowledge snapshot plus chronological per-session history of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMap {
    pub topics: BTreeMap<String, f64>,
    pub history: Vec<SessionHistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_sample_rejects_out_of_range_values() {
        assert!(matches!(
            ScoreSample::new("algorithms", 10.5),
            Err(ForgeError::InvalidScore(_))
        ));
        assert!(matches!(
            ScoreSample::new("algorithms", -0.1),
            Err(ForgeError::InvalidScore(_))
        ));
        assert!(matches!(
            ScoreSample::new("algorithms", f64::NAN),
            Err(ForgeError::InvalidScore(_))
        ));
        assert!(ScoreSample::new("algorithms", 0.0).is_ok());
        assert!(ScoreSample::new("algorithms", 10.0).is_ok());
    }

    #[test]
    fn score_sample_rejects_blank_topics() {
        assert!(matches!(
            ScoreSample::new("", 5.0),
            Err(ForgeError::InvalidTopic(_))
        ));
        assert!(matches!(
            ScoreSample::new("   ", 5.0),
            Err(ForgeError::InvalidTopic(_))
        ));
    }

    #[test]
    fn session_ids_have_expected_shape() {
        let session = Session::new("u1");
        assert!(session.id.starts_with("sess_"));
        assert_eq!(session.id.len(), "sess_".len() + 8);
        assert!(!session.is_ended());
    }

    #[test]
    fn push_question_tracks_current_scores() {
        let mut session = Session::new("u1");
        for (topic, score) in [("algorithms", 8.0), ("leadership", 6.0), ("algorithms", 9.0)] {
            let sample = ScoreSample::new(topic, score).unwrap();
            session.push_question(QuestionRecord::new("q", "a", &sample, vec![]));
        }
        assert_eq!(session.current_scores["algorithms"], vec![8.0, 9.0]);
        assert_eq!(session.current_scores["leadership"], vec![6.0]);
        assert_eq!(
            session.asked_topics(),
            vec!["algorithms", "leadership", "algorithms"]
        );
    }

    #[test]
    fn history_entry_flattens_topics() {
        let entry = SessionHistoryEntry {
            session: 2,
            topics: BTreeMap::from([("algorithms".to_string(), 0.5)]),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"session": 2, "algorithms": 0.5}));
    }
}
