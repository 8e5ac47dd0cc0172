mod config;
mod error;
mod routes;
mod state;
mod ws;

use crate::config::Config;
use crate::state::AppState;
use anyhow::{Context, Result};
use forge_core::evaluator::{Evaluator, LlmEvaluator, OfflineEvaluator};
use forge_core::interview::InterviewConfig;
use forge_core::prompts::PromptSet;
use forge_core::question_bank::{QuestionBank, StaticQuestionBank};
use forge_core::room::{DailyRooms, RoomProvisioner};
use forge_core::storage::SessionStorage;
use forge_core::store::{RedisStore, Store};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting Forge API...");

    // --- 3. Connect Storage ---
    let store: Arc<dyn Store> = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?,
    );

    // --- 4. Initialize Collaborators ---
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::with_overrides(dir).context("Failed to load LLM prompts")?,
        None => PromptSet::default(),
    };
    let bank: Arc<dyn QuestionBank> = Arc::new(StaticQuestionBank::new());
    let evaluator: Arc<dyn Evaluator> = match &config.anthropic_api_key {
        Some(key) => Arc::new(LlmEvaluator::new(key.clone(), config.chat_model.clone(), prompts)),
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not set - answers get neutral scores");
            Arc::new(OfflineEvaluator::new(bank.clone()))
        }
    };
    let rooms: Arc<dyn RoomProvisioner> = Arc::new(DailyRooms::new(
        config.daily_api_key.clone(),
        &config.daily_api_url,
    ));

    if config.voice_enabled() {
        tracing::info!("Voice mode enabled");
    } else {
        tracing::warn!("Voice disabled - missing API keys (need DEEPGRAM_API_KEY and DAILY_API_KEY)");
    }

    let state = Arc::new(AppState {
        storage: SessionStorage::new(store),
        evaluator,
        bank,
        rooms,
        interview: InterviewConfig {
            max_questions: config.max_questions,
            ..InterviewConfig::default()
        },
        voice_enabled: config.voice_enabled(),
    });

    // --- 5. Serve ---
    let app = routes::router(state);
    tracing::info!("Starting Forge API, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}
