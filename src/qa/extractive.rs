use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One extracted answer span as reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub answer: String,
    pub score: f64,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
}

/// An extractive question-answering model, treated as a scoring oracle.
#[async_trait]
pub trait ExtractiveQa: Send + Sync {
    /// Best span for `question` inside `context`.
    async fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<Span>;

    /// Up to `top_k` spans, best first.
    async fn top_k(&self, question: &str, context: &str, top_k: usize) -> Result<Vec<Span>>;

    fn name(&self) -> &str;
}

/// Client for a hosted question-answering endpoint (Hugging Face inference
/// API request/response shape).
pub struct HostedQa {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostedResponse {
    Many(Vec<Span>),
    One(Span),
    Error { error: String },
}

impl HostedQa {
    pub fn new(endpoint: String, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    async fn call(&self, body: serde_json::Value) -> Result<Vec<Span>> {
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req.send().await.context("QA request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read QA response")?;
        if !status.is_success() {
            bail!("QA endpoint returned {}: {}", status, text);
        }

        match serde_json::from_str::<HostedResponse>(&text).context("Failed to parse QA JSON")? {
            HostedResponse::Many(spans) => Ok(spans),
            HostedResponse::One(span) => Ok(vec![span]),
            HostedResponse::Error { error } => bail!("QA endpoint error: {}", error),
        }
    }
}

#[async_trait]
impl ExtractiveQa for HostedQa {
    async fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<Span> {
        let body = serde_json::json!({
            "inputs": { "question": question, "context": context },
            "parameters": { "max_answer_len": max_answer_len },
        });
        self.call(body)
            .await?
            .into_iter()
            .next()
            .context("QA endpoint returned no answer")
    }

    async fn top_k(&self, question: &str, context: &str, top_k: usize) -> Result<Vec<Span>> {
        let body = serde_json::json!({
            "inputs": { "question": question, "context": context },
            "parameters": { "top_k": top_k },
        });
        self.call(body).await
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}
