use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{SummarizeError, Summarizer, TEMPERATURE};
use crate::credentials::{CredentialProvider, OPENAI_API_KEY};
use crate::until_cancelled;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str =
    "You write neutral, analytical, audio-ready summaries for technical papers.";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote chat-completion backend.
pub struct OpenAiChat {
    model: String,
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(
        model: &str,
        base_url: &str,
        client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model.trim()
        };
        Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        let api_key = self
            .credentials
            .get(OPENAI_API_KEY)
            .ok_or(SummarizeError::MissingCredential(OPENAI_API_KEY))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, %url, prompt_chars = prompt.len(), "chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                backend: "openai",
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(SummarizeError::NoChoices("openai"))?;
        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

impl Summarizer for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    fn summarize<'a>(
        &'a self,
        prompt: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>> {
        Box::pin(until_cancelled(
            cancel,
            SummarizeError::Cancelled,
            self.complete(prompt),
        ))
    }
}
