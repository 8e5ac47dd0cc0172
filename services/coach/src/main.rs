mod config;
mod console;
mod demo;

use crate::config::Config;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use forge_core::evaluator::{Evaluator, LlmEvaluator, OfflineEvaluator};
use forge_core::interview::{InterviewConfig, InterviewSession};
use forge_core::prompts::PromptSet;
use forge_core::question_bank::{QuestionBank, StaticQuestionBank};
use forge_core::storage::SessionStorage;
use forge_core::store::{MemoryStore, RedisStore, Store};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Practice interviews from the terminal")]
struct Cli {
    /// Keep everything in memory instead of Redis
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run an interactive interview; each line you type is one answer
    Practice {
        #[arg(long, default_value = "demo_user")]
        user_id: String,
        /// Opening topic, e.g. "system design"
        #[arg(long)]
        topic: Option<String>,
    },
    /// Write five sessions of improving demo data
    SeedDemo {
        #[arg(long, default_value = "demo_user")]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Connect Storage ---
    let store: Arc<dyn Store> = if args.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            RedisStore::connect(&config.redis_url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?,
        )
    };
    let storage = SessionStorage::new(store);
    let bank = Arc::new(StaticQuestionBank::new());

    match args.command {
        CliCommand::Practice { user_id, topic } => {
            let first_topic = match topic {
                Some(input) => match bank.resolve_topic(&input) {
                    Some(resolved) => Some(resolved),
                    None => bail!(
                        "Unknown topic '{}'. Choose one of: {}",
                        input,
                        bank.all_topics().join(", ")
                    ),
                },
                None => None,
            };
            let evaluator = build_evaluator(&config, bank.clone())?;
            practice(&config, storage, evaluator, bank, &user_id, first_topic).await
        }
        CliCommand::SeedDemo { user_id } => seed(storage, bank.as_ref(), &user_id).await,
    }
}

fn build_evaluator(config: &Config, bank: Arc<dyn QuestionBank>) -> Result<Arc<dyn Evaluator>> {
    let Some(key) = &config.anthropic_api_key else {
        tracing::warn!("ANTHROPIC_API_KEY not set - answers get neutral scores");
        return Ok(Arc::new(OfflineEvaluator::new(bank)));
    };
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::with_overrides(dir).context("Failed to load LLM prompts")?,
        None => PromptSet::default(),
    };
    Ok(Arc::new(LlmEvaluator::new(
        key.clone(),
        config.chat_model.clone(),
        prompts,
    )))
}

async fn practice(
    config: &Config,
    storage: SessionStorage<dyn Store>,
    evaluator: Arc<dyn Evaluator>,
    bank: Arc<StaticQuestionBank>,
    user_id: &str,
    first_topic: Option<String>,
) -> Result<()> {
    let session = storage
        .create_session(user_id)
        .await
        .context("Failed to create session")?;
    println!("Session {} started for {}. Type your answers; Ctrl-D quits.", session.id, user_id);

    let interview_config = InterviewConfig {
        max_questions: config.max_questions,
        ..InterviewConfig::default()
    };
    let mut interview =
        InterviewSession::new(storage.clone(), evaluator, bank, &session.id, interview_config)
            .await
            .context("Failed to attach to session")?;
    if let Some(topic) = first_topic {
        interview = interview.with_first_topic(topic);
    }

    console::run_console(interview).await?;

    let scores = storage.session_scores(&session.id).await?;
    if !scores.is_empty() {
        println!("\nThis session:");
        for (topic, level) in &scores {
            println!("  {topic}: {:.1}/10", level * 10.0);
        }
    }
    Ok(())
}

async fn seed(storage: SessionStorage<dyn Store>, bank: &dyn QuestionBank, user_id: &str) -> Result<()> {
    println!("Generating demo data for {user_id}...");
    let ids = demo::seed_demo(&storage, bank, user_id)
        .await
        .context("Failed to seed demo data")?;
    for (idx, id) in ids.iter().enumerate() {
        println!("  Session {} ({})", idx + 1, id);
    }

    let map = storage.knowledge_map(user_id).await?;
    let mut topics: Vec<_> = map.topics.into_iter().collect();
    topics.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("\nFinal knowledge map:");
    for (topic, level) in topics {
        println!("  {topic}: {:.1}/10", level * 10.0);
    }

    let mut improvement: Vec<_> = storage.improvement(user_id).await?.into_iter().collect();
    improvement.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("\nOverall improvement:");
    for (topic, change) in improvement {
        println!("  {topic}: {:+.1} points", change * 10.0);
    }
    Ok(())
}
