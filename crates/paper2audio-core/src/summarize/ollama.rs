use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::stream::json_chunks;
use super::{SummarizeError, Summarizer, TEMPERATURE};
use crate::until_cancelled;

pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_URL: &str = "http://localhost:11434";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Local generation-server backend (Ollama `/api/generate`, streamed).
pub struct Ollama {
    model: String,
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

impl Ollama {
    pub fn new(model: &str, url: &str, client: reqwest::Client) -> Self {
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model.trim()
        };
        let url = if url.trim().is_empty() {
            DEFAULT_URL
        } else {
            url.trim()
        };
        Self {
            model: model.to_string(),
            url: url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, SummarizeError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            options: GenerateOptions {
                temperature: TEMPERATURE,
            },
        };

        let url = format!("{}/api/generate", self.url);
        tracing::debug!(model = %self.model, %url, prompt_chars = prompt.len(), "generate request");

        let resp = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                backend: "ollama",
                status: status.as_u16(),
                body,
            });
        }

        let mut narration = String::new();
        let mut chunks = std::pin::pin!(json_chunks(resp.bytes_stream()));
        let mut received = 0usize;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if let Some(message) = chunk.error {
                return Err(SummarizeError::Backend {
                    backend: "ollama",
                    message,
                });
            }
            if let Some(text) = chunk.response {
                narration.push_str(&text);
            }
            received += 1;
        }
        tracing::debug!(chunks = received, "generation stream finished");

        Ok(narration.trim().to_string())
    }
}

impl Summarizer for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    fn summarize<'a>(
        &'a self,
        prompt: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>> {
        Box::pin(until_cancelled(
            cancel,
            SummarizeError::Cancelled,
            self.generate(prompt),
        ))
    }
}
