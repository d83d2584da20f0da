use super::ask::confidence_line;
use super::send_chunked;
use crate::qa::AnswerResult;
use crate::state::Context;

const PREVIEW_CHARS: usize = 1500;

/// Show your recent questions and answers
#[poise::command(slash_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "How many entries (default 10)"] limit: Option<u32>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let session = session.lock().await;

    if session.history_len() == 0 {
        ctx.say("No questions asked yet.").await?;
        return Ok(());
    }

    let limit = limit.unwrap_or(10).max(1) as usize;
    let mut reply = format!("**Conversation history** ({} total)\n", session.history_len());
    for (n, entry) in session.recent(limit) {
        reply.push_str(&format!("\n**Q{}:** {}\n**A:** {}\n", n, entry.question, entry.answer));
        if session.settings.show_confidence {
            let result = AnswerResult::new(entry.answer.as_str(), entry.score);
            reply.push_str(&format!("_{}_\n", confidence_line(&result)));
        }
    }

    send_chunked(&ctx, &reply).await
}

/// Preview the start of the loaded document
#[poise::command(slash_command, guild_only)]
pub async fn preview(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let session = session.lock().await;

    let Some(doc) = session.document.as_ref() else {
        ctx.say("No document loaded.").await?;
        return Ok(());
    };

    let excerpt = doc.excerpt(PREVIEW_CHARS);
    let more = if excerpt.len() < doc.text.len() { "..." } else { "" };
    let reply = format!(
        "**{}** ({:?}, {} characters)\n```\n{}{}\n```",
        doc.name,
        doc.format,
        doc.char_len(),
        excerpt.replace("```", "'''"),
        more
    );
    send_chunked(&ctx, &reply).await
}
