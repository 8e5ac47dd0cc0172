use forge_core::Result;
use forge_core::difficulty::Difficulty;
use forge_core::question_bank::QuestionBank;
use forge_core::storage::SessionStorage;
use forge_core::store::Store;

/// Raw scores per topic for each demo session, oldest first. Every topic improves.
const DEMO_SESSIONS: [[(&str, [f64; 3]); 4]; 5] = [
    [
        ("leadership", [4.0, 4.5, 5.0]),
        ("algorithms", [3.0, 3.5, 4.0]),
        ("system_design", [5.0, 5.5, 6.0]),
        ("conflict_resolution", [4.5, 5.0, 5.5]),
    ],
    [
        ("leadership", [5.5, 6.0, 6.0]),
        ("algorithms", [5.0, 5.5, 6.0]),
        ("system_design", [6.0, 6.5, 7.0]),
        ("conflict_resolution", [6.0, 6.5, 6.5]),
    ],
    [
        ("leadership", [6.5, 7.0, 7.0]),
        ("algorithms", [6.5, 7.0, 7.5]),
        ("system_design", [7.0, 7.5, 7.5]),
        ("conflict_resolution", [7.0, 7.0, 7.5]),
    ],
    [
        ("leadership", [7.5, 8.0, 8.0]),
        ("algorithms", [7.5, 8.0, 8.5]),
        ("system_design", [8.0, 8.0, 8.5]),
        ("conflict_resolution", [7.5, 8.0, 8.5]),
    ],
    [
        ("leadership", [8.0, 8.5, 9.0]),
        ("algorithms", [8.5, 9.0, 9.0]),
        ("system_design", [8.5, 8.5, 9.0]),
        ("conflict_resolution", [8.5, 9.0, 9.0]),
    ],
];

fn weak_points_for(score: f64) -> Vec<String> {
    let points: &[&str] = if score < 5.0 {
        &["Missing specific metrics", "Vague impact statement", "No STAR format"]
    } else if score < 7.0 {
        &["Could provide more specific numbers", "Result could be stronger"]
    } else {
        &["Minor: Could add one more concrete example"]
    };
    points.iter().map(|p| p.to_string()).collect()
}

/// Writes five ended sessions with steadily improving scores. Returns their ids, oldest first.
pub async fn seed_demo<S: Store + ?Sized>(
    storage: &SessionStorage<S>,
    bank: &dyn QuestionBank,
    user_id: &str,
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(DEMO_SESSIONS.len());

    for (idx, topics) in DEMO_SESSIONS.iter().enumerate() {
        let session = storage.create_session(user_id).await?;
        tracing::info!(session_id = %session.id, "Seeding demo session {}", idx + 1);

        for (topic, scores) in topics {
            for score in scores {
                let question = bank.question(topic, Difficulty::Medium);
                let answer = format!(
                    "In my previous role at TechCorp, I handled {} by implementing a solution that resulted in measurable impact...",
                    topic.replace('_', " ")
                );
                storage
                    .add_question(&session.id, &question, &answer, *score, topic, weak_points_for(*score))
                    .await?;
            }
        }

        storage.end_session(&session.id).await?;
        ids.push(session.id);
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::question_bank::StaticQuestionBank;
    use forge_core::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn seeded_history_shows_improvement_everywhere() {
        let storage = SessionStorage::new(Arc::new(MemoryStore::new()));
        let ids = seed_demo(&storage, &StaticQuestionBank::new(), "demo_user")
            .await
            .unwrap();
        assert_eq!(ids.len(), 5);

        let sessions = storage.user_sessions("demo_user").await.unwrap();
        assert_eq!(sessions.len(), 5);
        assert!(sessions.iter().all(|s| s.ended_at.is_some() && s.questions_asked == 12));
        // Newest first.
        assert_eq!(sessions[0].id, ids[4]);

        let improvement = storage.improvement("demo_user").await.unwrap();
        assert_eq!(improvement.len(), 4);
        assert!(improvement.values().all(|delta| *delta > 0.0));
        let (biggest, _) = improvement
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(biggest, "algorithms");

        let map = storage.knowledge_map("demo_user").await.unwrap();
        assert_eq!(map.history.len(), 5);
        assert!((map.topics["algorithms"] - 26.5 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn weak_points_shrink_as_scores_rise() {
        assert_eq!(weak_points_for(4.5).len(), 3);
        assert_eq!(weak_points_for(6.5).len(), 2);
        assert_eq!(weak_points_for(9.0).len(), 1);
    }
}
