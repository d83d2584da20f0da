use std::str::FromStr;

use anyhow::{bail, Result};
use tracing::warn;

/// Score a span must exceed before it is enriched or refined.
pub const ENRICH_MIN_SCORE: f64 = 0.05;
/// Sub-answers at or below this score are dropped as noise in recursive mode.
pub const EVIDENCE_MIN_SCORE: f64 = 0.01;
/// Answers with more words than this are treated as sentence-length already.
pub const ENRICH_MAX_WORDS: usize = 15;

pub const MIN_ANSWER_LENGTH: usize = 10;
pub const MAX_ANSWER_LENGTH: usize = 200;

/// Where extractive answers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaBackend {
    /// A `transformers` question-answering pipeline hosted in-process.
    Local { model: String },
    /// A hosted inference endpoint speaking the same request/response shape.
    Http {
        endpoint: String,
        token: Option<String>,
    },
}

/// Chunking and scoring parameters for the answer path.
#[derive(Debug, Clone)]
pub struct QaConfig {
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k_overlap: usize,
    pub chunk_concurrency: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 3000,
            chunk_size: 2500,
            chunk_overlap: 300,
            top_k_overlap: 200,
            chunk_concurrency: 1,
        }
    }
}

impl QaConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            chunk_threshold: env_or("QA_CHUNK_THRESHOLD", defaults.chunk_threshold),
            chunk_size: env_or("QA_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_or("QA_CHUNK_OVERLAP", defaults.chunk_overlap),
            top_k_overlap: env_or("QA_TOPK_OVERLAP", defaults.top_k_overlap),
            chunk_concurrency: env_or("QA_CHUNK_CONCURRENCY", defaults.chunk_concurrency).max(1),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("QA_CHUNK_SIZE must be positive");
        }
        if self.chunk_overlap >= self.chunk_size || self.top_k_overlap >= self.chunk_size {
            bail!(
                "chunk overlaps ({}, {}) must be smaller than QA_CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.top_k_overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}

impl QaBackend {
    pub fn from_env() -> Result<Self> {
        let kind = dotenv::var("QA_BACKEND").unwrap_or_else(|_| "local".to_string());
        let model = dotenv::var("QA_MODEL")
            .unwrap_or_else(|_| "distilbert-base-cased-distilled-squad".to_string());

        match kind.as_str() {
            "local" => Ok(Self::Local { model }),
            "http" => {
                let endpoint = dotenv::var("QA_ENDPOINT").unwrap_or_else(|_| {
                    format!("https://api-inference.huggingface.co/models/{}", model)
                });
                let token = dotenv::var("HF_API_TOKEN").ok().filter(|t| !t.is_empty());
                Ok(Self::Http { endpoint, token })
            }
            other => bail!("unknown QA_BACKEND '{}' (expected 'local' or 'http')", other),
        }
    }
}

/// Per-session toggles, adjustable through `/docqa settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub refine: bool,
    pub recursive: bool,
    pub max_answer_length: usize,
    pub show_confidence: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refine: false,
            recursive: false,
            max_answer_length: 100,
            show_confidence: true,
        }
    }
}

impl SessionSettings {
    pub fn set_max_answer_length(&mut self, len: usize) -> usize {
        self.max_answer_length = len.clamp(MIN_ANSWER_LENGTH, MAX_ANSWER_LENGTH);
        self.max_answer_length
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match dotenv::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_answer_path() {
        let config = QaConfig::default();
        assert_eq!(config.chunk_threshold, 3000);
        assert_eq!(config.chunk_size, 2500);
        assert_eq!(config.chunk_overlap, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let config = QaConfig {
            chunk_overlap: 2500,
            ..QaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn answer_length_is_clamped() {
        let mut settings = SessionSettings::default();
        assert_eq!(settings.set_max_answer_length(5), MIN_ANSWER_LENGTH);
        assert_eq!(settings.set_max_answer_length(500), MAX_ANSWER_LENGTH);
        assert_eq!(settings.set_max_answer_length(64), 64);
    }
}
