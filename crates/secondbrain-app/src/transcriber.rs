//! Whisper-compatible speech-to-text client (spec §6
//! `providers.speech_to_text_api_key`), grounded on the original
//! `WhisperTranscriber` (`assistant.services.whisper`) collaborator shape.
//! Blocking, like `GoogleGeocoder`: `Transcriber::transcribe` is a
//! synchronous trait called from inside a transport's `spawn_blocking`.

use secondbrain_processor::error::Result;
use secondbrain_processor::transcribe::Transcriber;
use tracing::warn;

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

pub struct WhisperTranscriber {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { client: reqwest::blocking::Client::new(), api_key: api_key.into() }
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let Ok(part) = reqwest::blocking::multipart::Part::bytes(audio.to_vec()).file_name("audio.ogg").mime_str("audio/ogg") else {
            warn!("whisper: failed to build multipart body");
            return Ok(String::new());
        };
        let form = reqwest::blocking::multipart::Form::new().part("file", part).text("model", "whisper-1");

        let response = self.client.post(TRANSCRIPTION_URL).bearer_auth(&self.api_key).multipart(form).send();

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(%err, "whisper transcription request failed");
                return Ok(String::new());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            warn!(%status, %body, "whisper api error");
            return Ok(String::new());
        }

        let body: serde_json::Value = match response.json() {
            Ok(b) => b,
            Err(err) => {
                warn!(%err, "whisper response not JSON");
                return Ok(String::new());
            }
        };

        Ok(body.get("text").and_then(|t| t.as_str()).unwrap_or("").to_string())
    }
}
