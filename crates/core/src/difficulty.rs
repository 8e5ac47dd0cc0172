use serde::{Deserialize, Serialize};
use std::fmt;

/// Levels below this get easy questions.
pub const MEDIUM_THRESHOLD: f64 = 0.4;
/// Levels at or above this get hard questions.
pub const HARD_THRESHOLD: f64 = 0.7;
/// Level assumed for a topic the candidate has never been scored on.
pub const UNSEEN_TOPIC_LEVEL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Maps a normalized level to a tier. Boundaries belong to the higher tier.
    pub fn for_level(level: f64) -> Self {
        if level >= HARD_THRESHOLD {
            Difficulty::Hard
        } else if level >= MEDIUM_THRESHOLD {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
