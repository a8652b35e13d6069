//! Speech collaborator traits

use async_trait::async_trait;

use crate::result::Transcript;
use crate::Result;

/// Speech-to-text collaborator
///
/// Called as an opaque request/response service. A second `Transcriber` may
/// be wired into the orchestrator as a fallback provider, invoked only when
/// the primary fails.
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn Transcriber> = Arc::new(HttpTranscriber::new(config));
/// let transcript = stt.transcribe(&audio, "en").await?;
/// println!("Transcribed: {}", transcript.text);
/// ```
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe a complete utterance
    ///
    /// # Arguments
    /// * `audio` - Raw utterance audio (PCM16 little-endian bytes)
    /// * `language` - BCP-47-ish language tag the session is configured for
    ///
    /// # Returns
    /// Transcript with text and provider confidence
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<Transcript>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Text-to-speech collaborator
#[async_trait]
pub trait Synthesizer: Send + Sync + 'static {
    /// Synthesize text to audio bytes
    ///
    /// # Arguments
    /// * `text` - Text to synthesize
    /// * `voice_model` - Voice model identifier from the session config
    async fn synthesize(&self, text: &str, voice_model: &str) -> Result<Vec<u8>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct MockTranscriber {
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, audio: &[u8], _language: &str) -> Result<Transcript> {
            if self.fail {
                return Err(Error::Provider("stt unavailable".into()));
            }
            if audio.is_empty() {
                return Err(Error::InvalidInput("no audio".into()));
            }
            Ok(Transcript::new("test transcription", 0.95, self.name()))
        }

        fn name(&self) -> &str {
            "mock-stt"
        }
    }

    #[tokio::test]
    async fn test_mock_transcriber() {
        let stt = MockTranscriber { fail: false };
        let transcript = stt.transcribe(&[0u8; 64], "en").await.unwrap();
        assert_eq!(transcript.text, "test transcription");
        assert_eq!(transcript.provider, "mock-stt");

        let failing = MockTranscriber { fail: true };
        assert!(failing.transcribe(&[0u8; 64], "en").await.is_err());
    }
}
