//! Read-only reductions over session records.
//!
//! Two scales are in play: per-topic averages are normalized to `0..=1`,
//! while the overall session average stays on the raw `0..=10` scale.

use crate::models::{MAX_SCORE, Session};
use std::collections::BTreeMap;

/// Mean score per topic within one session, normalized to `0..=1`.
pub fn session_topic_averages(session: &Session) -> BTreeMap<String, f64> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for q in &session.questions {
        grouped.entry(q.topic.clone()).or_default().push(q.score);
    }
    grouped
        .into_iter()
        .map(|(topic, scores)| (topic, mean(&scores) / MAX_SCORE))
        .collect()
}

/// Mean of all raw scores in the session, or 0 for an empty session.
pub fn session_average(session: &Session) -> f64 {
    let scores: Vec<f64> = session.questions.iter().map(|q| q.score).collect();
    mean(&scores)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionRecord, ScoreSample};

    fn session_with(scores: &[(&str, f64)]) -> Session {
        let mut session = Session::new("u1");
        for (topic, score) in scores {
            let sample = ScoreSample::new(*topic, *score).unwrap();
            session.push_question(QuestionRecord::new("q", "a", &sample, vec![]));
        }
        session
    }

    #[test]
    fn averages_per_topic_are_normalized() {
        let session = session_with(&[("algorithms", 8.0), ("algorithms", 9.0), ("leadership", 6.0)]);
        let averages = session_topic_averages(&session);
        assert_eq!(averages.len(), 2);
        assert!((averages["algorithms"] - 0.85).abs() < 1e-9);
        assert!((averages["leadership"] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn session_average_is_raw() {
        let session = session_with(&[("algorithms", 8.0), ("algorithms", 9.0), ("leadership", 6.0)]);
        assert!((session_average(&session) - 23.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_session_yields_zero() {
        let session = Session::new("u1");
        assert_eq!(session_average(&session), 0.0);
        assert!(session_topic_averages(&session).is_empty());
    }
}
