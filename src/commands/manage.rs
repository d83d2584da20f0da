use tracing::{info, warn};

use crate::state::Context;

/// Clear your question history (the document stays loaded)
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let cleared = session.lock().await.clear_history();
    ctx.say(format!("History cleared ({} entries).", cleared))
        .await?;
    Ok(())
}

/// End your session, discarding the document, settings and history
#[poise::command(slash_command, guild_only)]
pub async fn close(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let ended = ctx.data().sessions.end(ctx.author().id.get()).await;
    let reply = if ended {
        "Session closed."
    } else {
        "No active session."
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Reload the QA engine (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn reload(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    ctx.defer().await?;
    let engine = &ctx.data().engine;
    engine.reset().await;
    info!(user = ctx.author().name, "Engine reload requested");

    match engine.get().await {
        Ok(engine) => {
            let generative = if engine.generative_enabled() {
                "enabled"
            } else {
                "disabled (no API key)"
            };
            ctx.say(format!(
                "QA engine reloaded.\nBackend: `{}`\nGenerative refinement: {}",
                engine.backend_name(),
                generative
            ))
            .await?;
        }
        Err(e) => {
            warn!(error = %e, "Engine reload failed");
            ctx.say(format!("Error: {}", e)).await?;
        }
    }
    Ok(())
}
