//! Per-user competence tracking.
//!
//! A user's history is an append-only list of raw scores per topic. The
//! current level of a topic is derived lazily from the most recent samples,
//! so recording never rewrites earlier values.

use crate::error::Result;
use crate::models::{MAX_SCORE, ScoreSample};
use crate::scoring::{mean, session_topic_averages};
use crate::storage::load_user_sessions;
use crate::store::{Store, keys};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of most recent samples that make up a topic's current level.
pub const RECENT_WINDOW: usize = 3;

/// Recorded raw scores per topic, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeState {
    topics: BTreeMap<String, Vec<f64>>,
}

impl KnowledgeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: &ScoreSample) {
        self.topics
            .entry(sample.topic().to_string())
            .or_default()
            .push(sample.value());
    }

    pub fn samples(&self, topic: &str) -> &[f64] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Average of the last `RECENT_WINDOW` samples divided by 10, or 0 if none.
    pub fn current_level(&self, topic: &str) -> f64 {
        let samples = self.samples(topic);
        let recent = &samples[samples.len().saturating_sub(RECENT_WINDOW)..];
        mean(recent) / MAX_SCORE
    }

    pub fn all_levels(&self) -> BTreeMap<String, f64> {
        self.topics
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(topic, _)| (topic.clone(), self.current_level(topic)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.values().all(Vec::is_empty)
    }
}

/// Change per topic between the first and last entries of a chronological
/// history of normalized session averages.
///
/// Only topics present at both ends are reported; fewer than two sessions
/// yield an empty map.
pub fn improvement(history: &[BTreeMap<String, f64>]) -> BTreeMap<String, f64> {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return BTreeMap::new();
    };
    if history.len() < 2 {
        return BTreeMap::new();
    }
    last.iter()
        .filter_map(|(topic, end)| first.get(topic).map(|start| (topic.clone(), end - start)))
        .collect()
}

/// Store-backed access to every user's `KnowledgeState`.
pub struct KnowledgeTracker<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for KnowledgeTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store + ?Sized> KnowledgeTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn load(&self, user_id: &str) -> Result<KnowledgeState> {
        match self.store.get(&keys::knowledge(user_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(KnowledgeState::new()),
        }
    }

    /// Validates and appends one score. Invalid input never reaches the store.
    pub async fn record(&self, user_id: &str, topic: &str, score: f64) -> Result<ScoreSample> {
        let sample = ScoreSample::new(topic, score)?;
        self.record_sample(user_id, &sample).await?;
        Ok(sample)
    }

    /// Appends in one store step, so concurrent sessions of a user never drop samples.
    pub async fn record_sample(&self, user_id: &str, sample: &ScoreSample) -> Result<()> {
        self.store
            .json_array_push(&keys::knowledge(user_id), sample.topic(), sample.value())
            .await?;
        tracing::debug!(
            user_id,
            topic = sample.topic(),
            score = sample.value(),
            "Recorded score"
        );
        Ok(())
    }

    pub async fn current_level(&self, user_id: &str, topic: &str) -> Result<f64> {
        Ok(self.load(user_id).await?.current_level(topic))
    }

    pub async fn all_levels(&self, user_id: &str) -> Result<BTreeMap<String, f64>> {
        Ok(self.load(user_id).await?.all_levels())
    }

    pub async fn improvement(&self, user_id: &str) -> Result<BTreeMap<String, f64>> {
        let sessions = load_user_sessions(self.store.as_ref(), user_id).await?;
        let history: Vec<_> = sessions.iter().rev().map(session_topic_averages).collect();
        Ok(improvement(&history))
    }
}
