use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{Speaker, SynthesisError, ensure_ok, or_default, write_body_atomically};
use crate::credentials::{CredentialProvider, OPENAI_API_KEY};
use crate::until_cancelled;

pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    format: &'static str,
}

/// Remote speech API returning AAC audio.
pub struct OpenAiSpeech {
    voice: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenAiSpeech {
    pub fn new(
        voice: &str,
        model: &str,
        base_url: &str,
        client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            voice: or_default(voice, DEFAULT_VOICE),
            model: or_default(model, DEFAULT_MODEL),
            base_url: or_default(base_url, DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
            credentials,
        }
    }

    async fn render(&self, text: &str, out_path: &Path) -> Result<(), SynthesisError> {
        let api_key = self
            .credentials
            .get(OPENAI_API_KEY)
            .ok_or(SynthesisError::MissingCredential(OPENAI_API_KEY))?;

        let url = format!("{}/audio/speech", self.base_url);
        tracing::debug!(voice = %self.voice, model = %self.model, %url, "speech request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&SpeechRequest {
                model: &self.model,
                voice: &self.voice,
                input: text,
                format: "aac",
            })
            .send()
            .await?;
        let resp = ensure_ok(resp, "openai").await?;

        let bytes = write_body_atomically(resp, out_path).await?;
        tracing::debug!(bytes, path = %out_path.display(), "speech written");
        Ok(())
    }
}

impl Speaker for OpenAiSpeech {
    fn name(&self) -> &str {
        "openai"
    }

    fn speak<'a>(
        &'a self,
        text: &'a str,
        out_path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
        Box::pin(until_cancelled(
            cancel,
            SynthesisError::Cancelled,
            self.render(text, out_path),
        ))
    }
}
