pub mod aggregate;
pub mod chunker;
pub mod enrich;
pub mod extractive;
pub mod handle;
pub mod pipeline;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{QaBackend, QaConfig, ENRICH_MIN_SCORE};
use crate::llm::Generator;
use crate::prompts;
use crate::rlm::{RlmController, RlmOutcome, INSUFFICIENT_INFO};

use chunker::Chunker;
use extractive::{ExtractiveQa, HostedQa, Span};
use pipeline::PythonPipeline;

pub use handle::EngineHandle;

/// The answer to one question, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub score: f64,
}

impl AnswerResult {
    pub fn new(answer: impl Into<String>, score: f64) -> Self {
        Self {
            answer: answer.into(),
            score,
        }
    }

    pub fn confidence_label(&self) -> &'static str {
        if self.score >= 0.7 {
            "High Confidence"
        } else if self.score >= 0.4 {
            "Medium Confidence"
        } else {
            "Low Confidence"
        }
    }
}

impl From<Span> for AnswerResult {
    fn from(span: Span) -> Self {
        Self {
            answer: span.answer,
            score: span.score,
        }
    }
}

/// How a single question should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskOptions {
    pub max_answer_length: usize,
    pub refine: bool,
    pub recursive: bool,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            max_answer_length: 100,
            refine: false,
            recursive: false,
        }
    }
}

/// Extractive QA with optional generative refinement and recursive mode.
pub struct QaEngine {
    qa: Arc<dyn ExtractiveQa>,
    generator: Option<Arc<dyn Generator>>,
    config: QaConfig,
}

impl QaEngine {
    pub fn new(
        qa: Arc<dyn ExtractiveQa>,
        generator: Option<Arc<dyn Generator>>,
        config: QaConfig,
    ) -> Self {
        Self {
            qa,
            generator,
            config,
        }
    }

    /// Load the configured extractive backend.
    pub async fn load(
        backend: &QaBackend,
        generator: Option<Arc<dyn Generator>>,
        config: QaConfig,
    ) -> Result<Self> {
        let qa: Arc<dyn ExtractiveQa> = match backend {
            QaBackend::Local { model } => Arc::new(PythonPipeline::spawn(model).await?),
            QaBackend::Http { endpoint, token } => {
                Arc::new(HostedQa::new(endpoint.clone(), token.clone())?)
            }
        };
        info!(
            backend = qa.name(),
            generative = generator.is_some(),
            "QA engine ready"
        );
        Ok(Self::new(qa, generator, config))
    }

    pub fn generative_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn backend_name(&self) -> &str {
        self.qa.name()
    }

    /// Answer `question` from `context`. Never fails: problems come back as
    /// zero-confidence results or fall back to a simpler path.
    pub async fn answer_question(
        &self,
        question: &str,
        context: &str,
        options: &AskOptions,
    ) -> AnswerResult {
        if let Some(rejected) = validate(question, context) {
            return rejected;
        }

        if options.recursive {
            if let Some(generator) = &self.generator {
                return self
                    .answer_recursive(generator.as_ref(), question, context, options)
                    .await;
            }
        }

        self.answer_plain(question, context, options.max_answer_length, options.refine)
            .await
    }

    async fn answer_recursive(
        &self,
        generator: &dyn Generator,
        question: &str,
        context: &str,
        options: &AskOptions,
    ) -> AnswerResult {
        let controller = RlmController::new(self, generator);
        match controller
            .run(question, context, options.max_answer_length)
            .await
        {
            RlmOutcome::Decomposed { answer, .. } => answer,
            RlmOutcome::Failed { .. } => AnswerResult::new(INSUFFICIENT_INFO, 0.0),
            RlmOutcome::Fallback { stage, error } => {
                warn!(%stage, error = %error, "recursive mode failed, answering directly");
                self.answer_plain(question, context, options.max_answer_length, true)
                    .await
            }
        }
    }

    /// The extractive path: chunked or direct scoring, then score-gated
    /// enrichment and optional refinement.
    pub async fn answer_plain(
        &self,
        question: &str,
        context: &str,
        max_answer_length: usize,
        refine: bool,
    ) -> AnswerResult {
        if let Some(rejected) = validate(question, context) {
            return rejected;
        }

        let mut result = if context.chars().count() > self.config.chunk_threshold {
            match Chunker::new(self.config.chunk_size, self.config.chunk_overlap) {
                Ok(chunker) => {
                    aggregate::best_of_chunks(
                        self.qa.as_ref(),
                        question,
                        chunker.chunks(context),
                        max_answer_length,
                        self.config.chunk_concurrency,
                    )
                    .await
                }
                Err(e) => return AnswerResult::new(format!("Error: {}", e), 0.0),
            }
        } else {
            match self.qa.answer(question, context, max_answer_length).await {
                Ok(span) => span.into(),
                Err(e) => return AnswerResult::new(format!("Error: {}", e), 0.0),
            }
        };

        if result.score <= ENRICH_MIN_SCORE {
            debug!(score = result.score, "low confidence, returning span as-is");
            return result;
        }

        result.answer = enrich::enrich_answer(&result.answer, context);

        if refine {
            if let Some(generator) = &self.generator {
                result.answer = self.refine(generator.as_ref(), question, result.answer).await;
            }
        }

        result
    }

    /// Best-effort rephrasing; any failure keeps the extracted answer.
    async fn refine(&self, generator: &dyn Generator, question: &str, answer: String) -> String {
        match generator.generate(&prompts::refine(question, &answer)).await {
            Ok(refined) => refined,
            Err(e) => {
                warn!(error = %e, "refinement failed, keeping extracted answer");
                answer
            }
        }
    }

    /// Several candidate spans, best first.
    pub async fn multiple_answers(&self, question: &str, context: &str, top_k: usize) -> Vec<Span> {
        if context.chars().count() > self.config.chunk_threshold {
            return match Chunker::new(self.config.chunk_size, self.config.top_k_overlap) {
                Ok(chunker) => {
                    aggregate::top_of_chunks(
                        self.qa.as_ref(),
                        question,
                        chunker.chunks(context),
                        top_k,
                        self.config.chunk_concurrency,
                    )
                    .await
                }
                Err(e) => vec![error_span(e)],
            };
        }

        match self.qa.top_k(question, context, top_k).await {
            Ok(spans) => spans,
            Err(e) => vec![error_span(e)],
        }
    }
}

fn validate(question: &str, context: &str) -> Option<AnswerResult> {
    if question.trim().is_empty() {
        return Some(AnswerResult::new("Please provide a question.", 0.0));
    }
    if context.trim().is_empty() {
        return Some(AnswerResult::new("No document context provided.", 0.0));
    }
    None
}

fn error_span(e: anyhow::Error) -> Span {
    Span {
        answer: format!("Error: {}", e),
        score: 0.0,
        start: 0,
        end: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{ScriptedGenerator, ScriptedQa};

    const BERT_DOC: &str = "BERT was introduced by Google in 2018. It revolutionized NLP.";

    fn engine(qa: ScriptedQa, generator: Option<ScriptedGenerator>) -> (QaEngine, Option<Arc<ScriptedGenerator>>) {
        let generator = generator.map(Arc::new);
        let engine = QaEngine::new(
            Arc::new(qa),
            generator.clone().map(|g| g as Arc<dyn Generator>),
            QaConfig::default(),
        );
        (engine, generator)
    }

    fn long_doc(answer_sentence: &str) -> String {
        let filler = "Nothing of note happens in this sentence. ".repeat(100);
        format!("{}{} {}", filler, answer_sentence, filler)
    }

    #[tokio::test]
    async fn blank_inputs_are_soft_failures() {
        let (engine, _) = engine(ScriptedQa::new(), None);
        let opts = AskOptions::default();

        let r = engine.answer_question("   ", BERT_DOC, &opts).await;
        assert_eq!(r, AnswerResult::new("Please provide a question.", 0.0));

        let r = engine.answer_question("When?", "", &opts).await;
        assert_eq!(r, AnswerResult::new("No document context provided.", 0.0));
    }

    #[tokio::test]
    async fn short_document_is_answered_directly_and_enriched() {
        let (engine, _) = engine(ScriptedQa::new().with("2018", "2018", 0.93), None);
        let r = engine
            .answer_question("When was BERT introduced?", BERT_DOC, &AskOptions::default())
            .await;
        assert!(r.answer.contains("2018"));
        assert_eq!(r.answer, "BERT was introduced by Google in 2018.");
        assert!(r.score > ENRICH_MIN_SCORE);
    }

    #[tokio::test]
    async fn direct_call_failure_is_reported_in_the_answer() {
        let (engine, _) = engine(ScriptedQa::new(), None);
        let r = engine.answer_question("q?", BERT_DOC, &AskOptions::default()).await;
        assert!(r.answer.starts_with("Error: "));
        assert_eq!(r.score, 0.0);
    }

    #[tokio::test]
    async fn long_document_is_chunked() {
        let doc = long_doc("The treaty was signed in Vienna.");
        let qa = ScriptedQa::new().with("Vienna", "Vienna", 0.8);
        let (engine, _) = engine(qa, None);

        let r = engine.answer_question("Where?", &doc, &AskOptions::default()).await;
        assert_eq!(r.answer, "The treaty was signed in Vienna.");
        assert_eq!(r.score, 0.8);
    }

    #[tokio::test]
    async fn chunked_answering_runs_on_a_spawned_task() {
        let (engine, _) = engine(ScriptedQa::new().with("Vienna", "Vienna", 0.8), None);
        let engine = Arc::new(engine);
        let doc = long_doc("The treaty was signed in Vienna.");

        let answered = tokio::spawn({
            let engine = engine.clone();
            let doc = doc.clone();
            async move { engine.answer_question("Where?", &doc, &AskOptions::default()).await }
        })
        .await
        .unwrap();
        assert_eq!(answered.answer, "The treaty was signed in Vienna.");

        let top = tokio::spawn(async move { engine.multiple_answers("Where?", &doc, 2).await })
            .await
            .unwrap();
        assert_eq!(top[0].answer, "Vienna");
    }

    #[tokio::test]
    async fn low_confidence_skips_enrichment_and_refinement() {
        let generator = ScriptedGenerator::new().reply("should not be used");
        let (engine, generator) = engine(ScriptedQa::new().with("Google", "Google", 0.05), Some(generator));
        let opts = AskOptions {
            refine: true,
            ..AskOptions::default()
        };

        let r = engine.answer_question("Who?", BERT_DOC, &opts).await;
        assert_eq!(r, AnswerResult::new("Google", 0.05));
        assert!(generator.unwrap().prompts().is_empty());
    }

    #[tokio::test]
    async fn refinement_replaces_the_enriched_answer() {
        let generator = ScriptedGenerator::new().reply("Google introduced BERT.");
        let (engine, generator) = engine(ScriptedQa::new().with("Google", "Google", 0.6), Some(generator));
        let opts = AskOptions {
            refine: true,
            ..AskOptions::default()
        };

        let r = engine.answer_question("Who?", BERT_DOC, &opts).await;
        assert_eq!(r, AnswerResult::new("Google introduced BERT.", 0.6));
        let prompts = generator.unwrap().prompts();
        assert!(prompts[0].contains("Context snippet from document: BERT was introduced by Google in 2018."));
    }

    #[tokio::test]
    async fn refinement_failure_keeps_the_enriched_answer() {
        let generator = ScriptedGenerator::new().fail("503");
        let (engine, _) = engine(ScriptedQa::new().with("Google", "Google", 0.6), Some(generator));
        let opts = AskOptions {
            refine: true,
            ..AskOptions::default()
        };

        let r = engine.answer_question("Who?", BERT_DOC, &opts).await;
        assert_eq!(r.answer, "BERT was introduced by Google in 2018.");
    }

    #[tokio::test]
    async fn recursive_mode_without_generator_answers_directly() {
        let (engine, _) = engine(ScriptedQa::new().with("Google", "Google", 0.6), None);
        let opts = AskOptions {
            recursive: true,
            refine: true,
            ..AskOptions::default()
        };
        let r = engine.answer_question("Who?", BERT_DOC, &opts).await;
        assert_eq!(r.score, 0.6);
    }

    #[tokio::test]
    async fn recursive_mode_reports_insufficient_information() {
        let generator = ScriptedGenerator::new().reply("Who?\nWhen?");
        let (engine, generator) = engine(ScriptedQa::new().with("Who?", "x", 0.0), Some(generator));
        let opts = AskOptions {
            recursive: true,
            refine: true,
            ..AskOptions::default()
        };

        let r = engine.answer_question("Who and when?", BERT_DOC, &opts).await;
        assert_eq!(r, AnswerResult::new(INSUFFICIENT_INFO, 0.0));
        assert_eq!(generator.unwrap().prompts().len(), 1);
    }

    #[tokio::test]
    async fn recursive_failure_falls_back_to_refined_direct_answer() {
        let generator = ScriptedGenerator::new()
            .fail("decompose blew up")
            .reply("Google did.");
        let (engine, generator) = engine(ScriptedQa::new().with("Google", "Google", 0.6), Some(generator));
        let opts = AskOptions {
            recursive: true,
            refine: true,
            ..AskOptions::default()
        };

        let r = engine.answer_question("Who made BERT?", BERT_DOC, &opts).await;
        assert_eq!(r, AnswerResult::new("Google did.", 0.6));
        assert_eq!(generator.unwrap().prompts().len(), 2);
    }

    #[tokio::test]
    async fn multiple_answers_on_long_documents_are_ranked() {
        let doc = long_doc("The treaty was signed in Vienna.");
        let qa = ScriptedQa::new()
            .with("Vienna", "Vienna", 0.8)
            .with("Nothing", "nothing", 0.1);
        let (engine, _) = engine(qa, None);

        let top = engine.multiple_answers("Where?", &doc, 3).await;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].answer, "Vienna");
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn multiple_answers_failure_is_one_error_record() {
        let (engine, _) = engine(ScriptedQa::new(), None);
        let top = engine.multiple_answers("q?", BERT_DOC, 3).await;
        assert_eq!(top.len(), 1);
        assert!(top[0].answer.starts_with("Error: "));
        assert_eq!((top[0].score, top[0].start, top[0].end), (0.0, 0, 0));
    }

    #[test]
    fn confidence_labels() {
        assert_eq!(AnswerResult::new("", 0.7).confidence_label(), "High Confidence");
        assert_eq!(AnswerResult::new("", 0.45).confidence_label(), "Medium Confidence");
        assert_eq!(AnswerResult::new("", 0.1).confidence_label(), "Low Confidence");
    }

    /// Runs the real `transformers` pipeline; needs Python with the model available.
    #[tokio::test]
    #[ignore]
    async fn bert_finds_the_year() {
        let backend = QaBackend::Local {
            model: "distilbert-base-cased-distilled-squad".to_string(),
        };
        let engine = QaEngine::load(&backend, None, QaConfig::default()).await.unwrap();
        let r = engine
            .answer_question("When was BERT introduced?", BERT_DOC, &AskOptions::default())
            .await;
        assert!(r.answer.contains("2018"), "got {:?}", r);
        assert!(r.score > ENRICH_MIN_SCORE);
    }
}
