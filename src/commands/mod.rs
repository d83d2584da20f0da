mod ask;
mod history;
mod manage;
mod settings;
mod upload;

use crate::state::Context;

/// Discord messages are capped at 2000 chars; leave headroom.
const MESSAGE_LIMIT: usize = 1990;

/// DocQA - ask questions about an uploaded document
#[poise::command(
    slash_command,
    subcommands(
        "upload::upload",
        "ask::ask",
        "ask::top",
        "history::history",
        "history::preview",
        "settings::settings",
        "manage::clear",
        "manage::close",
        "manage::reload"
    )
)]
pub async fn docqa(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a message in Discord-safe chunks.
/// Uses ctx.say() for all chunks; poise routes follow-ups through the
/// interaction webhook, which doesn't require Send Messages channel permission.
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_message(text, MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Split on the last newline (or space) before `limit` bytes, never inside a
/// UTF-8 sequence.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= limit {
            parts.push(remaining);
            break;
        }
        let mut cut = limit;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let split_at = remaining[..cut]
            .rfind('\n')
            .or_else(|| remaining[..cut].rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(cut);
        parts.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    parts
}
