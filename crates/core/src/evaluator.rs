use crate::difficulty::Difficulty;
use crate::error::{ForgeError, Result};
use crate::models::MAX_SCORE;
use crate::prompts::{EVALUATE_ANSWER, GENERATE_QUESTION, PromptSet};
use crate::question_bank::QuestionBank;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Score used whenever an answer cannot be evaluated.
pub const NEUTRAL_SCORE: f64 = 5.0;
/// Weak point reported alongside `NEUTRAL_SCORE` after an upstream failure.
pub const FALLBACK_WEAK_POINT: &str = "Unable to evaluate - API error";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Longest wait for one model call before the fallback is used.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The structured result of scoring one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    #[serde(default)]
    pub weak_points: Vec<String>,
}

impl Evaluation {
    pub fn fallback() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            weak_points: vec![FALLBACK_WEAK_POINT.to_string()],
        }
    }
}

pub fn fallback_question(topic: &str) -> String {
    format!("Tell me about a time you dealt with a challenging {topic} situation.")
}

/// Scores answers and writes follow-up questions.
///
/// Implementations never fail: upstream or parse errors degrade to
/// `Evaluation::fallback()` and `fallback_question`, so a broken model call
/// can never abort an interview or corrupt the knowledge history.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, question: &str, answer: &str, topic: &str) -> Evaluation;

    async fn generate_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
        levels: &BTreeMap<String, f64>,
    ) -> String;
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// An `Evaluator` backed by the Anthropic Messages API.
pub struct LlmEvaluator {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    request_timeout: Duration,
    prompts: PromptSet,
}

impl LlmEvaluator {
    pub fn new(api_key: SecretString, model: String, prompts: PromptSet) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            prompts,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<MessagesResponse>()
            .await?;

        resp.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ForgeError::UpstreamUnavailable("No response from LLM".to_string()))
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, question: &str, answer: &str, topic: &str) -> Evaluation {
        let Some(prompt) = self.prompts.render(
            EVALUATE_ANSWER,
            &[("question", question), ("answer", answer), ("topic", topic)],
        ) else {
            tracing::error!("Missing prompt template '{}'", EVALUATE_ANSWER);
            return Evaluation::fallback();
        };

        match self.complete(&prompt, 1000).await {
            Ok(text) => parse_evaluation(&text).unwrap_or_else(|| {
                tracing::warn!("Could not parse evaluation from model output: {:?}", text);
                Evaluation::fallback()
            }),
            Err(e) => {
                tracing::error!("Error evaluating answer: {}", e);
                Evaluation::fallback()
            }
        }
    }

    async fn generate_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
        levels: &BTreeMap<String, f64>,
    ) -> String {
        let weak = weakest_topics(levels, 2).join(", ");
        let weak = if weak.is_empty() { "no data yet".to_string() } else { weak };
        let Some(prompt) = self.prompts.render(
            GENERATE_QUESTION,
            &[("topic", topic), ("difficulty", difficulty.as_str()), ("weak_topics", weak.as_str())],
        ) else {
            tracing::error!("Missing prompt template '{}'", GENERATE_QUESTION);
            return fallback_question(topic);
        };

        match self.complete(&prompt, 500).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_question(topic),
            Err(e) => {
                tracing::error!("Error generating question: {}", e);
                fallback_question(topic)
            }
        }
    }
}

/// Evaluator used when no model is configured: neutral scores, canned questions.
pub struct OfflineEvaluator {
    bank: Arc<dyn QuestionBank>,
}

impl OfflineEvaluator {
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl Evaluator for OfflineEvaluator {
    async fn evaluate(&self, _question: &str, _answer: &str, _topic: &str) -> Evaluation {
        Evaluation {
            score: NEUTRAL_SCORE,
            weak_points: vec!["Detailed feedback is unavailable in offline mode".to_string()],
        }
    }

    async fn generate_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
        _levels: &BTreeMap<String, f64>,
    ) -> String {
        self.bank.question(topic, difficulty)
    }
}

/// Topics with the lowest levels, weakest first.
pub fn weakest_topics(levels: &BTreeMap<String, f64>, n: usize) -> Vec<String> {
    let mut ranked: Vec<_> = levels.iter().collect();
    ranked.sort_by(|a, b| a.1.total_cmp(b.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(t, _)| t.clone()).collect()
}

/// Extracts an `Evaluation` from model output.
///
/// Accepts a JSON object anywhere in the text, or the older
/// `SCORE:` / `WEAK_POINTS:` line format. Scores outside `0..=10` are rejected.
pub fn parse_evaluation(text: &str) -> Option<Evaluation> {
    let parsed = parse_json_evaluation(text).or_else(|| parse_marked_evaluation(text))?;
    if (0.0..=MAX_SCORE).contains(&parsed.score) {
        Some(parsed)
    } else {
        None
    }
}

fn parse_json_evaluation(text: &str) -> Option<Evaluation> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn parse_marked_evaluation(text: &str) -> Option<Evaluation> {
    let score = text
        .lines()
        .find_map(|line| line.trim().strip_prefix("SCORE:"))
        .and_then(|s| s.trim().parse::<f64>().ok())?;

    let weak_points = text
        .lines()
        .skip_while(|line| !line.contains("WEAK_POINTS:"))
        .skip(1)
        .filter_map(|line| line.trim().strip_prefix('-'))
        .map(|wp| wp.trim().to_string())
        .filter(|wp| !wp.is_empty())
        .collect();

    Some(Evaluation { score, weak_points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question_bank::StaticQuestionBank;

    #[test]
    fn parses_json_output() {
        let text = r#"Here you go: {"score": 7.5, "weak_points": ["No metrics", "Vague result"]}"#;
        let eval = parse_evaluation(text).unwrap();
        assert_eq!(eval.score, 7.5);
        assert_eq!(eval.weak_points, vec!["No metrics", "Vague result"]);
    }

    #[test]
    fn parses_marker_output() {
        let text = "SCORE: 6\nWEAK_POINTS:\n- Missing STAR structure\n- No numbers\n\nBe specific.";
        let eval = parse_evaluation(text).unwrap();
        assert_eq!(eval.score, 6.0);
        assert_eq!(eval.weak_points, vec!["Missing STAR structure", "No numbers"]);
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(parse_evaluation(r#"{"score": 42}"#).is_none());
        assert!(parse_evaluation("SCORE: -1").is_none());
        assert!(parse_evaluation("SCORE: great").is_none());
        assert!(parse_evaluation("no structure at all").is_none());
    }

    #[test]
    fn weakest_topics_are_sorted_ascending() {
        let levels = BTreeMap::from([
            ("leadership".to_string(), 0.6),
            ("algorithms".to_string(), 0.2),
            ("behavioral".to_string(), 0.4),
        ]);
        assert_eq!(weakest_topics(&levels, 2), vec!["algorithms", "behavioral"]);
    }

    #[tokio::test]
    async fn unreachable_model_degrades_to_defaults() {
        let evaluator = LlmEvaluator::new(
            SecretString::from("test-key".to_string()),
            "test-model".to_string(),
            PromptSet::default(),
        )
        .with_base_url("http://127.0.0.1:9");

        let eval = evaluator.evaluate("Q?", "A.", "algorithms").await;
        assert_eq!(eval, Evaluation::fallback());

        let question = evaluator
            .generate_question("leadership", Difficulty::Easy, &BTreeMap::new())
            .await;
        assert_eq!(question, fallback_question("leadership"));
    }

    #[tokio::test]
    async fn silent_model_times_out_to_defaults() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer them.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let evaluator = LlmEvaluator::new(
            SecretString::from("test-key".to_string()),
            "test-model".to_string(),
            PromptSet::default(),
        )
        .with_base_url(&format!("http://{addr}"))
        .with_request_timeout(Duration::from_millis(200));

        let eval = tokio::time::timeout(
            Duration::from_secs(10),
            evaluator.evaluate("Q?", "A.", "algorithms"),
        )
        .await
        .expect("evaluate should give up on a silent upstream");
        assert_eq!(eval, Evaluation::fallback());

        let question = tokio::time::timeout(
            Duration::from_secs(10),
            evaluator.generate_question("leadership", Difficulty::Hard, &BTreeMap::new()),
        )
        .await
        .expect("generate_question should give up on a silent upstream");
        assert_eq!(question, fallback_question("leadership"));
        server.abort();
    }

    #[tokio::test]
    async fn offline_evaluator_uses_the_bank() {
        let bank = Arc::new(StaticQuestionBank::new());
        let evaluator = OfflineEvaluator::new(bank.clone());
        let eval = evaluator.evaluate("Q?", "A.", "algorithms").await;
        assert_eq!(eval.score, NEUTRAL_SCORE);
        let q = evaluator
            .generate_question("algorithms", Difficulty::Medium, &BTreeMap::new())
            .await;
        assert!(bank.questions("algorithms", Difficulty::Medium).contains(&q.as_str()));
    }

    // Makes a live call to the Anthropic API. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn live_evaluation_returns_a_score() {
        dotenvy::dotenv_override().ok();
        let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");
        let evaluator = LlmEvaluator::new(
            SecretString::from(api_key),
            "claude-3-sonnet-20240229".to_string(),
            PromptSet::default(),
        );
        let eval = evaluator
            .evaluate(
                "Describe how a hash table works.",
                "It hashes keys into buckets; collisions are chained. Lookups are O(1) on average.",
                "algorithms",
            )
            .await;
        assert_ne!(eval, Evaluation::fallback());
        assert!((0.0..=10.0).contains(&eval.score));
    }
}
