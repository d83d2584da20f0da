mod commands;
mod config;
mod docs;
mod llm;
mod prompts;
mod qa;
mod rlm;
mod session;
mod state;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context as _;
use futures::FutureExt;
use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info, Level};

use config::{QaBackend, QaConfig};
use llm::{Generator, LlmClient};
use qa::{EngineHandle, QaEngine};
use session::SessionStore;
use state::AppState;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    let qa_config = QaConfig::from_env()?;
    let backend = QaBackend::from_env()?;
    info!(?qa_config, "QA configuration loaded");

    // Generative refinement is optional
    let generator: Option<Arc<dyn Generator>> = match LlmClient::from_env()? {
        Some(client) => {
            info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client) as Arc<dyn Generator>)
        }
        None => {
            info!("No LLM API key set; refinement and recursive mode disabled");
            None
        }
    };

    // Loaded lazily on first question, and again after /docqa reload
    let engine = Arc::new(EngineHandle::new(move || {
        let backend = backend.clone();
        let generator = generator.clone();
        let qa_config = qa_config.clone();
        async move { QaEngine::load(&backend, generator, qa_config).await }.boxed()
    }));

    // Parse admin user IDs from env
    let admin_ids: HashSet<u64> = dotenv::var("ADMIN_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if !admin_ids.is_empty() {
        info!(count = admin_ids.len(), "Admin users configured");
    }

    let max_upload_bytes = dotenv::var("QA_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    let app_state = AppState {
        engine,
        sessions: SessionStore::new(),
        admin_ids,
        max_upload_bytes,
    };

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::docqa()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, commands, gid).await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, commands).await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting DocQA Discord bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
