//! Scripted stand-ins for the model services, used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::extractive::{ExtractiveQa, Span};
use crate::llm::Generator;

/// Answers from a rule table: the first rule whose needle occurs in the
/// context wins. Contexts matching no rule fail.
#[derive(Default)]
pub struct ScriptedQa {
    rules: Vec<(String, String, f64)>,
    calls: AtomicUsize,
}

impl ScriptedQa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, needle: &str, answer: &str, score: f64) -> Self {
        self.rules.push((needle.to_string(), answer.to_string(), score));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, question: &str, context: &str) -> Result<Span> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|(needle, _, _)| context.contains(needle.as_str()) || question == needle)
            .map(|(_, answer, score)| {
                let start = context.find(answer.as_str()).unwrap_or(0);
                Span {
                    answer: answer.clone(),
                    score: *score,
                    start,
                    end: start + answer.len(),
                }
            })
            .ok_or_else(|| anyhow!("no span for this context"))
    }
}

#[async_trait]
impl ExtractiveQa for ScriptedQa {
    async fn answer(&self, question: &str, context: &str, _max_answer_len: usize) -> Result<Span> {
        self.lookup(question, context)
    }

    async fn top_k(&self, question: &str, context: &str, _top_k: usize) -> Result<Vec<Span>> {
        self.lookup(question, context).map(|span| vec![span])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Replies with queued completions in order and records every prompt.
/// An exhausted queue (or a queued `Err`) fails the call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies.lock().unwrap().push(Err(message.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(anyhow!("no scripted reply left"));
        }
        replies.remove(0).map_err(|e| anyhow!(e))
    }
}
