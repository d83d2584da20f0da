use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::docs::ingest_bytes;
use crate::state::Context;

/// Upload a document (PDF, TXT or DOCX) to ask questions about
#[poise::command(slash_command, guild_only)]
pub async fn upload(
    ctx: Context<'_>,
    #[description = "PDF, TXT or DOCX file"] file: serenity::Attachment,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let max_bytes = ctx.data().max_upload_bytes;
    if file.size as usize > max_bytes {
        ctx.say(format!(
            "**{}** is {} KB; the limit is {} KB.",
            file.filename,
            file.size / 1024,
            max_bytes / 1024
        ))
        .await?;
        return Ok(());
    }

    info!(
        user = ctx.author().name,
        file = %file.filename,
        size = file.size,
        "Upload started"
    );

    let bytes = file.download().await?;
    let name = file.filename.clone();
    // PDF and DOCX parsing is CPU-bound
    let ingested = tokio::task::spawn_blocking(move || ingest_bytes(&name, &bytes)).await?;

    let doc = match ingested {
        Ok(doc) => doc,
        Err(e) => {
            warn!(file = %file.filename, error = %e, "Upload rejected");
            ctx.say(format!("Error processing document: {}", e)).await?;
            return Ok(());
        }
    };

    let chars = doc.char_len();
    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let replaced = session.lock().await.load_document(doc);

    let reply = if replaced {
        format!(
            "Document **{}** loaded successfully.\nDocument length: {} characters",
            file.filename, chars
        )
    } else {
        format!(
            "Document **{}** is already loaded.\nDocument length: {} characters",
            file.filename, chars
        )
    };
    ctx.say(reply).await?;
    Ok(())
}
