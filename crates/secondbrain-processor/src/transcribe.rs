//! Voice transcription routing (spec §2 "voice transcriptions", §6
//! `speech_to_text_api_key`). The speech-to-text provider itself is an
//! external collaborator (spec §1) — this module only defines the seam a
//! transport adapter calls before handing transcribed text to
//! `MessageProcessor::process`.

use crate::error::Result;

/// Black-box speech-to-text provider.
pub trait Transcriber {
    /// Transcribes raw audio bytes (already downloaded by the transport
    /// adapter) to plain text. Returns an empty string, not an error, when
    /// no transcription could be produced — callers treat that the same
    /// as "not configured".
    fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Reference implementation for deployments with no speech-to-text
/// credentials configured: voice messages are reported back to the user
/// as unsupported rather than silently dropped.
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
    fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_transcriber_returns_empty_text() {
        assert_eq!(NullTranscriber.transcribe(b"\x00\x01").unwrap(), "");
    }
}
