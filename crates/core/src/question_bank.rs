use crate::difficulty::Difficulty;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use rand::seq::SliceRandom;

/// Topic used when a lookup names a topic the bank does not know.
pub const DEFAULT_TOPIC: &str = "behavioral";

/// Source of canned interview questions and the default topic vocabulary.
pub trait QuestionBank: Send + Sync {
    fn question(&self, topic: &str, difficulty: Difficulty) -> String;

    /// Known topics, in a fixed order.
    fn all_topics(&self) -> Vec<String>;
}

struct TopicQuestions {
    topic: &'static str,
    easy: [&'static str; 3],
    medium: [&'static str; 3],
    hard: [&'static str; 3],
}

impl TopicQuestions {
    fn tier(&self, difficulty: Difficulty) -> &[&'static str] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

static QUESTIONS: [TopicQuestions; 5] = [
    TopicQuestions {
        topic: "leadership",
        easy: [
            "Tell me about a time you helped a team member who was struggling.",
            "Describe a situation where you had to motivate your team.",
            "Have you ever had to give constructive feedback? How did you approach it?",
        ],
        medium: [
            "Tell me about a time you led a team through a difficult project.",
            "Describe a situation where you had to influence people without direct authority.",
            "Tell me about a time when your team disagreed with your decision. How did you handle it?",
        ],
        hard: [
            "Describe a time you had to make an unpopular decision as a leader.",
            "Tell me about your biggest leadership failure and what you learned.",
            "How do you balance being a strong leader with being collaborative?",
        ],
    },
    TopicQuestions {
        topic: "algorithms",
        easy: [
            "Explain how you would reverse a string.",
            "How would you find if a string is a palindrome?",
            "Describe how a hash table works.",
        ],
        medium: [
            "How would you detect a cycle in a linked list?",
            "Explain how you'd implement a LRU cache.",
            "Walk me through finding the kth largest element in an array.",
        ],
        hard: [
            "Design an algorithm to find the longest palindromic substring.",
            "How would you implement a trie and what are its use cases?",
            "Explain dynamic programming and give an example of when you'd use it.",
        ],
    },
    TopicQuestions {
        topic: "system_design",
        easy: [
            "How would you design a URL shortener?",
            "Explain the difference between SQL and NoSQL databases.",
            "What is load balancing and why is it important?",
        ],
        medium: [
            "Design a rate limiter for an API.",
            "How would you design a notification system?",
            "Design a file storage system like Dropbox.",
        ],
        hard: [
            "Design Twitter's feed system.",
            "How would you design a distributed cache?",
            "Design a real-time analytics system for a large e-commerce site.",
        ],
    },
    TopicQuestions {
        topic: "conflict_resolution",
        easy: [
            "Tell me about a time you disagreed with a coworker.",
            "How do you handle criticism?",
            "Describe a situation where you had to compromise.",
        ],
        medium: [
            "Tell me about a time you had to work with a difficult team member.",
            "Describe a situation where you had to navigate office politics.",
            "How do you handle it when your idea is rejected?",
        ],
        hard: [
            "Tell me about the most difficult conflict you've resolved.",
            "Describe a time when you had to choose between two team members' ideas.",
            "How do you handle a situation where upper management makes a decision you disagree with?",
        ],
    },
    TopicQuestions {
        topic: "behavioral",
        easy: [
            "Why are you interested in this role?",
            "What are your biggest strengths?",
            "Where do you see yourself in 5 years?",
        ],
        medium: [
            "Tell me about a time you failed and what you learned.",
            "Describe your ideal work environment.",
            "How do you prioritize when you have multiple deadlines?",
        ],
        hard: [
            "What's the biggest risk you've ever taken?",
            "Tell me about a time you had to adapt to a major change.",
            "Describe a situation where you had to learn something completely new quickly.",
        ],
    },
];

/// The built-in question bank: three questions per topic and tier.
pub struct StaticQuestionBank {
    matcher: SkimMatcherV2,
}

impl Default for StaticQuestionBank {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticQuestionBank {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Every question for a topic and tier, falling back to `DEFAULT_TOPIC`.
    pub fn questions(&self, topic: &str, difficulty: Difficulty) -> &'static [&'static str] {
        let entry = QUESTIONS
            .iter()
            .find(|q| q.topic == topic)
            .or_else(|| QUESTIONS.iter().find(|q| q.topic == DEFAULT_TOPIC))
            .unwrap_or(&QUESTIONS[0]);
        entry.tier(difficulty)
    }

    /// Maps free-form input onto the bank's vocabulary.
    ///
    /// Tries an exact match, then a `snake_case` normalization, then the best
    /// fuzzy match. Returns `None` if nothing matches.
    pub fn resolve_topic(&self, input: &str) -> Option<String> {
        let normalized = input
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        if normalized.is_empty() {
            return None;
        }
        if let Some(entry) = QUESTIONS.iter().find(|q| q.topic == normalized) {
            return Some(entry.topic.to_string());
        }
        QUESTIONS
            .iter()
            .filter_map(|q| {
                self.matcher
                    .fuzzy_match(q.topic, &normalized)
                    .map(|score| (score, q.topic))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, topic)| topic.to_string())
    }
}

impl QuestionBank for StaticQuestionBank {
    fn question(&self, topic: &str, difficulty: Difficulty) -> String {
        let pool = self.questions(topic, difficulty);
        pool.choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(pool[0])
            .to_string()
    }

    fn all_topics(&self) -> Vec<String> {
        QUESTIONS.iter().map(|q| q.topic.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_listed_in_fixed_order() {
        let bank = StaticQuestionBank::new();
        assert_eq!(
            bank.all_topics(),
            vec![
                "leadership",
                "algorithms",
                "system_design",
                "conflict_resolution",
                "behavioral"
            ]
        );
    }

    #[test]
    fn question_comes_from_the_requested_tier() {
        let bank = StaticQuestionBank::new();
        for _ in 0..10 {
            let q = bank.question("algorithms", Difficulty::Hard);
            assert!(bank.questions("algorithms", Difficulty::Hard).contains(&q.as_str()));
        }
    }

    #[test]
    fn unknown_topic_falls_back_to_behavioral() {
        let bank = StaticQuestionBank::new();
        let q = bank.question("underwater_basket_weaving", Difficulty::Easy);
        assert!(bank.questions(DEFAULT_TOPIC, Difficulty::Easy).contains(&q.as_str()));
    }

    #[test]
    fn resolve_topic_normalizes_and_fuzzy_matches() {
        let bank = StaticQuestionBank::new();
        assert_eq!(bank.resolve_topic("leadership").as_deref(), Some("leadership"));
        assert_eq!(bank.resolve_topic("System Design").as_deref(), Some("system_design"));
        assert_eq!(
            bank.resolve_topic("conflict-resolution").as_deref(),
            Some("conflict_resolution")
        );
        assert_eq!(bank.resolve_topic("algo").as_deref(), Some("algorithms"));
        assert_eq!(bank.resolve_topic("zzz"), None);
        assert_eq!(bank.resolve_topic("  "), None);
    }
}
