//! Pipeline result types
//!
//! Every utterance handled by the orchestrator terminates in a
//! [`CommandResult`] carrying a spoken-or-text message, whether the pipeline
//! succeeded, stopped on a turn-policy verdict, or failed at a stage.

use serde::{Deserialize, Serialize};

/// Transcription output from an STT collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Transcribed text
    pub text: String,
    /// Provider confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Provider name, for logging
    pub provider: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            provider: provider.into(),
        }
    }

    /// Whether the transcript contains any speech
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// How an utterance terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// The turn was accepted and a command/answer response was produced
    Answer,
    /// The turn was rejected, queued, or interrupted by turn policy;
    /// the message explains the verdict
    TurnManagement,
    /// A pipeline stage failed; the message is the user-facing explanation
    Failure(FailureKind),
}

/// Which stage of the pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unknown session id
    SessionNotFound,
    /// Session was torn down while the utterance was in flight
    SessionClosed,
    /// Audio empty, undersized, or oversized; or empty transcript
    InvalidInput,
    /// Transcription failed on primary and fallback providers
    Transcription,
}

/// Terminal result of one utterance through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Session the utterance belonged to
    pub session_id: String,
    /// How the utterance terminated
    pub kind: ResponseKind,
    /// User-facing message; never empty
    pub text: String,
    /// Synthesized audio, when TTS was enabled and synthesis succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<u8>>,
    /// Final transcript, when transcription completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Identified speaker, when identification completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    /// Speaker identification confidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_confidence: Option<f32>,
}

impl CommandResult {
    /// A successful command/answer response
    pub fn answer(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            kind: ResponseKind::Answer,
            text: text.into(),
            audio: None,
            transcript: None,
            speaker_id: None,
            speaker_confidence: None,
        }
    }

    /// A turn-management response (rejection/queue/interrupt explanation)
    pub fn turn_management(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            kind: ResponseKind::TurnManagement,
            text: text.into(),
            audio: None,
            transcript: None,
            speaker_id: None,
            speaker_confidence: None,
        }
    }

    /// A typed stage failure with a user-facing message
    pub fn failure(
        session_id: impl Into<String>,
        kind: FailureKind,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            kind: ResponseKind::Failure(kind),
            text: text.into(),
            audio: None,
            transcript: None,
            speaker_id: None,
            speaker_confidence: None,
        }
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_speaker(mut self, speaker_id: impl Into<String>, confidence: f32) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self.speaker_confidence = Some(confidence);
        self
    }

    /// Whether the pipeline produced a command/answer response
    pub fn is_answer(&self) -> bool {
        self.kind == ResponseKind::Answer
    }

    /// Whether the utterance stopped on a turn-policy verdict
    pub fn is_turn_management(&self) -> bool {
        self.kind == ResponseKind::TurnManagement
    }

    /// Whether a pipeline stage failed
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ResponseKind::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_empty() {
        assert!(Transcript::new("  ", 0.9, "mock").is_empty());
        assert!(!Transcript::new("hello", 0.9, "mock").is_empty());
    }

    #[test]
    fn test_confidence_clamped() {
        let t = Transcript::new("hi", 1.7, "mock");
        assert_eq!(t.confidence, 1.0);
    }

    #[test]
    fn test_wire_shape_omits_absent_fields() {
        let result = CommandResult::turn_management("s1", "please wait your turn");
        let json = serde_json::to_value(&result).unwrap();

        // Absent optional fields must not appear on the wire
        assert!(json.get("audio").is_none());
        assert!(json.get("transcript").is_none());
        assert_eq!(json["kind"], "turn_management");
        assert_eq!(json["text"], "please wait your turn");
    }

    #[test]
    fn test_result_builders() {
        let result = CommandResult::answer("s1", "the branch opens at nine")
            .with_transcript("when does the branch open")
            .with_speaker("Speaker_1", 0.82);

        assert!(result.is_answer());
        assert_eq!(result.speaker_id.as_deref(), Some("Speaker_1"));

        let rejection = CommandResult::turn_management("s1", "please wait your turn");
        assert!(rejection.is_turn_management());
        assert!(!rejection.is_failure());

        let failed = CommandResult::failure("s1", FailureKind::Transcription, "could not hear that");
        assert!(failed.is_failure());
        assert!(!failed.text.is_empty());
    }
}
