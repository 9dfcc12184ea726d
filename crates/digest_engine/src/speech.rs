use futures_util::StreamExt;
use serde::Serialize;
use thiserror::Error;

use crate::api::{endpoint, ensure_success, map_reqwest_error, ApiError, ApiFailure, ApiSettings};

pub const DEFAULT_SPEECH_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_VOICE_ID: &str = "JBFqnCBsd6RMkjVDRZzb";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("text-to-speech rejected the API key")]
    Unauthorized,
    #[error("text-to-speech request failed: {0}")]
    Api(#[from] ApiError),
}

/// Text-to-speech client returning raw audio bytes (mp3).
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_id: String,
    max_bytes: u64,
}

impl SpeechClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        settings: &ApiSettings,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model_id: "eleven_monolingual_v1".to_string(),
            max_bytes: settings.max_body_bytes,
        })
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        voice: VoiceSettings,
    ) -> Result<Vec<u8>, SpeechError> {
        let url = endpoint(&self.base_url, &format!("v1/text-to-speech/{voice_id}"))?;
        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
                voice_settings: voice,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SpeechError::Unauthorized);
        }
        let response = ensure_success(response).await?;

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(self.too_large(Some(content_len)).into());
            }
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = audio.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(self.too_large(Some(next_len)).into());
            }
            audio.extend_from_slice(&chunk);
        }
        Ok(audio)
    }

    fn too_large(&self, actual: Option<u64>) -> ApiError {
        ApiError::new(
            ApiFailure::TooLarge {
                max_bytes: self.max_bytes,
                actual,
            },
            "audio response too large",
        )
    }
}
