use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generative model: free-text prompt in, free-text completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Client for an OpenAI-compatible chat completions endpoint. Defaults to
/// Gemini's compatibility endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    /// Build a client from the environment, or `None` when no API key is
    /// configured (generative features are then disabled).
    pub fn from_env() -> Result<Option<Self>> {
        let Some(api_key) = api_key_from(|key| dotenv::var(key).ok()) else {
            return Ok(None);
        };

        let base_url = dotenv::var("LLM_BASE_URL").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });
        let model =
            dotenv::var("LLM_MODEL").unwrap_or_else(|_| "gemini-flash-latest".to_string());

        Self::new(base_url, model, api_key).map(Some)
    }

    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") || base.ends_with("/openai") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": 2048,
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            bail!("LLM endpoint returned {}: {}", status, text);
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;
        Ok(completion_text(&json))
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let content = self.chat(&messages).await?;
        let content = content.trim();
        if content.is_empty() {
            bail!("LLM returned an empty completion");
        }
        Ok(content.to_string())
    }
}

/// First non-blank of `GEMINI_API_KEY`, then `LLM_API_KEY`.
fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["GEMINI_API_KEY", "LLM_API_KEY"]
        .into_iter()
        .filter_map(lookup)
        .find(|key| !key.trim().is_empty())
}

/// Content of `choices[0].message.content`, empty when absent or null.
fn completion_text(json: &serde_json::Value) -> String {
    json["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> LlmClient {
        LlmClient::new(base.to_string(), "m".to_string(), "k".to_string()).unwrap()
    }

    #[test]
    fn blank_gemini_key_falls_through_to_generic_key() {
        fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
            move |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        }

        assert_eq!(
            api_key_from(env(&[("GEMINI_API_KEY", ""), ("LLM_API_KEY", "sk-1")])),
            Some("sk-1".to_string())
        );
        assert_eq!(
            api_key_from(env(&[("GEMINI_API_KEY", "g-1"), ("LLM_API_KEY", "sk-1")])),
            Some("g-1".to_string())
        );
        assert_eq!(api_key_from(env(&[("GEMINI_API_KEY", "  ")])), None);
        assert_eq!(api_key_from(env(&[])), None);
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(
            client("https://generativelanguage.googleapis.com/v1beta/openai/").endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
        assert_eq!(
            client("http://localhost:1234/v1").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("http://localhost:1234").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("http://host/v1/chat/completions").endpoint(),
            "http://host/v1/chat/completions"
        );
    }

    #[test]
    fn completion_text_handles_null_content() {
        let ok = serde_json::json!({"choices": [{"message": {"content": "Paris"}}]});
        assert_eq!(completion_text(&ok), "Paris");

        let null = serde_json::json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(completion_text(&null), "");

        let empty = serde_json::json!({"choices": []});
        assert_eq!(completion_text(&empty), "");
    }
}
