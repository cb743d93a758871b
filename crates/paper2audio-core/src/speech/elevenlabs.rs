use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{Speaker, SynthesisError, ensure_ok, or_default, write_body_atomically};
use crate::credentials::{CredentialProvider, ELEVEN_API_KEY};
use crate::until_cancelled;

pub const DEFAULT_VOICE: &str = "Rachel";
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

const MODEL_ID: &str = "eleven_multilingual_v2";
const STABILITY: f32 = 0.45;
const SIMILARITY_BOOST: f32 = 0.75;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct TextToSpeech<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Remote per-voice streaming speech API.
pub struct ElevenLabs {
    voice: String,
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl ElevenLabs {
    pub fn new(
        voice: &str,
        base_url: &str,
        client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            voice: or_default(voice, DEFAULT_VOICE),
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
            .get(ELEVEN_API_KEY)
            .ok_or(SynthesisError::MissingCredential(ELEVEN_API_KEY))?;

        let url = format!("{}/text-to-speech/{}/stream", self.base_url, self.voice);
        tracing::debug!(voice = %self.voice, %url, "speech request");

        let resp = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&TextToSpeech {
                text,
                model_id: MODEL_ID,
                voice_settings: VoiceSettings {
                    stability: STABILITY,
                    similarity_boost: SIMILARITY_BOOST,
                },
            })
            .send()
            .await?;
        let resp = ensure_ok(resp, "elevenlabs").await?;

        let bytes = write_body_atomically(resp, out_path).await?;
        tracing::debug!(bytes, path = %out_path.display(), "speech written");
        Ok(())
    }
}

impl Speaker for ElevenLabs {
    fn name(&self) -> &str {
        "elevenlabs"
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
