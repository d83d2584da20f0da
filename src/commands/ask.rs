use tracing::info;

use super::send_chunked;
use crate::config::{MAX_ANSWER_LENGTH, MIN_ANSWER_LENGTH};
use crate::qa::aggregate::NO_ANSWER;
use crate::qa::extractive::Span;
use crate::qa::AnswerResult;
use crate::state::Context;

const NO_DOCUMENT: &str = "Please upload a document first with `/docqa upload`.";

/// Ask a question about your uploaded document
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Refine the answer with the generative model"] refine: Option<bool>,
    #[description = "Recursive mode: decompose, solve, synthesize (needs refine)"]
    recursive: Option<bool>,
    #[description = "Maximum answer length in words (10-200)"] max_length: Option<u32>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    // Held for the whole request: one question per session at a time
    let mut session = session.lock().await;

    let generative;
    let result = {
        let Some(doc) = session.document.as_ref() else {
            ctx.say(NO_DOCUMENT).await?;
            return Ok(());
        };

        let engine = ctx.data().engine.get().await?;
        generative = engine.generative_enabled();

        let mut options = session.ask_options(generative);
        if let Some(refine) = refine {
            options.refine = refine && generative;
        }
        if let Some(recursive) = recursive {
            options.recursive = recursive;
        }
        options.recursive &= options.refine;
        if let Some(len) = max_length {
            options.max_answer_length =
                (len as usize).clamp(MIN_ANSWER_LENGTH, MAX_ANSWER_LENGTH);
        }

        info!(
            user = ctx.author().name,
            question,
            refine = options.refine,
            recursive = options.recursive,
            "Question received"
        );

        engine.answer_question(&question, &doc.text, &options).await
    };
    session.record(&question, &result);

    info!(
        score = result.score,
        answer_len = result.answer.len(),
        "Question answered"
    );

    let mut reply = format!(
        "**Q{}:** {}\n\n**Answer:** {}",
        session.history_len(),
        question,
        result.answer
    );
    if session.settings.show_confidence {
        reply.push_str(&format!("\n\n{}", confidence_line(&result)));
    }
    if refine == Some(true) && !generative {
        reply.push_str("\n\n_Generative refinement is unavailable: no API key configured._");
    }

    send_chunked(&ctx, &reply).await
}

/// List the top candidate answers for a question
#[poise::command(slash_command, guild_only)]
pub async fn top(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "How many answers (1-10)"] count: Option<u32>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let session = session.lock().await;
    let Some(doc) = session.document.as_ref() else {
        ctx.say(NO_DOCUMENT).await?;
        return Ok(());
    };

    let top_k = count.unwrap_or(3).clamp(1, 10) as usize;
    let engine = ctx.data().engine.get().await?;
    let spans = engine.multiple_answers(&question, &doc.text, top_k).await;

    send_chunked(&ctx, &top_reply(&question, &spans)).await
}

fn top_reply(question: &str, spans: &[Span]) -> String {
    let mut reply = format!("**Top answers for:** {}\n", question);
    if spans.is_empty() {
        reply.push_str(&format!("\n{}", NO_ANSWER));
    }
    for (i, span) in spans.iter().enumerate() {
        reply.push_str(&format!(
            "\n**{}.** {} ({:.2}%)",
            i + 1,
            span.answer,
            span.score * 100.0
        ));
    }
    reply
}

pub(super) fn confidence_line(result: &AnswerResult) -> String {
    format!(
        "Confidence: {:.2}% ({})",
        result.score * 100.0,
        result.confidence_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_line_formats_percentages() {
        assert_eq!(
            confidence_line(&AnswerResult::new("x", 0.8731)),
            "Confidence: 87.31% (High Confidence)"
        );
        assert_eq!(
            confidence_line(&AnswerResult::new("x", 0.0)),
            "Confidence: 0.00% (Low Confidence)"
        );
    }

    #[test]
    fn top_reply_lists_spans_or_says_nothing_was_found() {
        assert_eq!(
            top_reply("Who?", &[]),
            "**Top answers for:** Who?\n\nCould not find an answer."
        );

        let spans = [Span {
            answer: "Google".to_string(),
            score: 0.5,
            start: 0,
            end: 6,
        }];
        assert_eq!(
            top_reply("Who?", &spans),
            "**Top answers for:** Who?\n\n**1.** Google (50.00%)"
        );
    }
}
