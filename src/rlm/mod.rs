//! Recursive mode: decompose a complex question with the generative model,
//! answer every sub-question on the extractive path, then synthesize one
//! answer from the surviving evidence.

pub mod parse;

use std::fmt;

use tracing::{debug, info};

use crate::config::EVIDENCE_MIN_SCORE;
use crate::llm::Generator;
use crate::prompts;
use crate::qa::{AnswerResult, QaEngine};

pub const INSUFFICIENT_INFO: &str =
    "I couldn't find sufficient information to answer complex inquiry.";

/// A sub-question and the text the extractive model found for it.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub sub_question: String,
    pub found: String,
}

/// Which generative call a fallback came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decompose,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Decompose => f.write_str("decompose"),
            Stage::Synthesize => f.write_str("synthesize"),
        }
    }
}

#[derive(Debug)]
pub enum RlmOutcome {
    /// Evidence was found and synthesized into an answer.
    Decomposed {
        answer: AnswerResult,
        sub_questions: Vec<String>,
        evidence: Vec<Evidence>,
    },
    /// Every sub-answer was noise; no synthesis call was made.
    Failed { sub_questions: Vec<String> },
    /// A generative call failed; the caller should answer the plain way.
    Fallback { stage: Stage, error: anyhow::Error },
}

pub struct RlmController<'a> {
    engine: &'a QaEngine,
    generator: &'a dyn Generator,
}

impl<'a> RlmController<'a> {
    pub fn new(engine: &'a QaEngine, generator: &'a dyn Generator) -> Self {
        Self { engine, generator }
    }

    pub async fn run(&self, question: &str, context: &str, max_answer_len: usize) -> RlmOutcome {
        let sub_questions = match self.generator.generate(&prompts::decompose(question)).await {
            Ok(reply) => parse::sub_questions(&reply),
            Err(error) => {
                return RlmOutcome::Fallback {
                    stage: Stage::Decompose,
                    error,
                }
            }
        };
        info!(count = sub_questions.len(), ?sub_questions, "question decomposed");

        let mut evidence = Vec::new();
        for sub_question in &sub_questions {
            let result = self
                .engine
                .answer_plain(sub_question, context, max_answer_len, false)
                .await;
            if result.score > EVIDENCE_MIN_SCORE {
                evidence.push(Evidence {
                    sub_question: sub_question.clone(),
                    found: result.answer,
                });
            } else {
                debug!(sub_question, score = result.score, "sub-answer dropped as noise");
            }
        }

        if evidence.is_empty() {
            return RlmOutcome::Failed { sub_questions };
        }

        match self
            .generator
            .generate(&prompts::synthesize(question, &evidence))
            .await
        {
            Ok(text) => {
                info!(evidence = evidence.len(), "answer synthesized");
                RlmOutcome::Decomposed {
                    // Synthesized text has no extractive score to report
                    answer: AnswerResult::new(text.trim(), 1.0),
                    sub_questions,
                    evidence,
                }
            }
            Err(error) => RlmOutcome::Fallback {
                stage: Stage::Synthesize,
                error,
            },
        }
    }
}
