use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tracing::debug;

use super::chunker::Chunk;
use super::extractive::{ExtractiveQa, Span};
use super::AnswerResult;

pub const NO_ANSWER: &str = "Could not find an answer.";

/// Score every chunk and keep the single best span.
///
/// Chunk failures are skipped. Up to `concurrency` chunks are in flight at
/// once, but results are folded in chunk order with a strict `>` so the
/// first of equally-scored answers wins regardless of completion order.
pub async fn best_of_chunks<'a, I>(
    qa: &dyn ExtractiveQa,
    question: &str,
    chunks: I,
    max_answer_len: usize,
    concurrency: usize,
) -> AnswerResult
where
    I: IntoIterator<Item = Chunk<'a>>,
    I::IntoIter: Send,
{
    let mut results = stream::iter(chunks)
        .map(|chunk: Chunk<'a>| {
            let index = chunk.index;
            qa.answer(question, chunk.text, max_answer_len)
                .map(move |outcome| (index, outcome))
                .boxed()
        })
        .buffered(concurrency.max(1))
        .boxed();

    let mut best = AnswerResult::new(NO_ANSWER, 0.0);
    while let Some((index, outcome)) = results.next().await {
        match outcome {
            Ok(span) if span.score > best.score => {
                debug!(chunk = index, score = span.score, "new best chunk answer");
                best = span.into();
            }
            Ok(_) => {}
            Err(e) => debug!(chunk = index, error = %e, "chunk scoring failed, skipping"),
        }
    }
    best
}

/// Pool the top `top_k` spans of every chunk and keep the best `top_k` overall.
pub async fn top_of_chunks<'a, I>(
    qa: &dyn ExtractiveQa,
    question: &str,
    chunks: I,
    top_k: usize,
    concurrency: usize,
) -> Vec<Span>
where
    I: IntoIterator<Item = Chunk<'a>>,
    I::IntoIter: Send,
{
    let mut results = stream::iter(chunks)
        .map(|chunk: Chunk<'a>| {
            let index = chunk.index;
            qa.top_k(question, chunk.text, top_k)
                .map(move |outcome| (index, outcome))
                .boxed()
        })
        .buffered(concurrency.max(1))
        .boxed();

    let mut all = Vec::new();
    while let Some((index, outcome)) = results.next().await {
        match outcome {
            Ok(spans) => all.extend(spans),
            Err(e) => debug!(chunk = index, error = %e, "chunk scoring failed, skipping"),
        }
    }

    // Stable sort keeps chunk order among equal scores
    all.sort_by(|a, b| b.score.total_cmp(&a.score));
    all.truncate(top_k);
    all
}
