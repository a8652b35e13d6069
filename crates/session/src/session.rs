//! Voice session state

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voice_floor_core::{ConversationMode, ConversationState, UserProfile};

/// Per-session configuration, fixed at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Synthesize audio for responses
    pub tts_enabled: bool,
    /// Voice model used for synthesis
    pub voice_model: String,
    /// Language tag passed to transcription
    pub language: String,
    /// How many speakers the session expects
    pub expected_speakers: usize,
    /// Turn-taking policy
    pub mode: ConversationMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tts_enabled: true,
            voice_model: "standard".to_string(),
            language: "en".to_string(),
            expected_speakers: 2,
            mode: ConversationMode::default(),
        }
    }
}

impl SessionConfig {
    /// Overlay a user profile's preferences onto this config
    pub fn personalize(mut self, profile: &UserProfile) -> Self {
        if let Some(voice) = &profile.preferred_voice {
            self.voice_model = voice.clone();
        }
        if let Some(mode) = profile.preferred_mode {
            self.mode = mode;
        }
        if let Some(language) = &profile.preferred_language {
            self.language = language.clone();
        }
        self
    }
}

/// One completed pipeline pass through a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Speaker the utterance was attributed to
    pub speaker_id: String,
    /// Final transcript
    pub transcript: String,
    /// Response text delivered
    pub response: String,
    /// When the interaction completed
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        speaker_id: impl Into<String>,
        transcript: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            transcript: transcript.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Mutable state of one live voice session
///
/// Guarded by the owning handle's lock; mutated by the orchestrator on every
/// utterance.
#[derive(Debug)]
pub struct VoiceSession {
    pub session_id: String,
    pub client_id: String,
    pub config: SessionConfig,
    /// Speaker of the most recent accepted turn
    pub current_speaker: Option<String>,
    /// Conversational context supplied with the latest utterance
    pub current_context: String,
    pub paused: bool,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub interaction_count: u64,
    pub last_response: Option<String>,
    /// Bounded history, oldest evicted
    history: VecDeque<Interaction>,
    history_limit: usize,
}

impl VoiceSession {
    pub fn new(
        session_id: impl Into<String>,
        client_id: impl Into<String>,
        config: SessionConfig,
        history_limit: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            client_id: client_id.into(),
            config,
            current_speaker: None,
            current_context: String::new(),
            paused: false,
            created_at: Instant::now(),
            last_activity: Instant::now(),
            interaction_count: 0,
            last_response: None,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Update last activity
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Check if the session has been idle past the timeout
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    /// Record a completed interaction, evicting the oldest past the cap
    pub fn record_interaction(&mut self, interaction: Interaction) {
        self.current_speaker = Some(interaction.speaker_id.clone());
        self.last_response = Some(interaction.response.clone());
        self.interaction_count += 1;

        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(interaction);
        self.touch();
    }

    /// Interaction history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Interaction> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Point-in-time session statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub client_id: String,
    pub mode: ConversationMode,
    pub lifecycle: ConversationState,
    pub interaction_count: u64,
    pub speaker_count: usize,
    pub turn_count: usize,
    pub queued_count: usize,
    pub waiting_for_response: bool,
    pub uptime_secs: u64,
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personalize_overlays_preferences() {
        let profile = UserProfile {
            preferred_voice: Some("warm-contralto".to_string()),
            preferred_mode: Some(ConversationMode::Open),
            preferred_language: None,
        };
        let config = SessionConfig::default().personalize(&profile);

        assert_eq!(config.voice_model, "warm-contralto");
        assert_eq!(config.mode, ConversationMode::Open);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut session = VoiceSession::new("s1", "c1", SessionConfig::default(), 3);

        for i in 0..5 {
            session.record_interaction(Interaction::new(
                "Speaker_1",
                format!("utterance {}", i),
                format!("response {}", i),
            ));
        }

        assert_eq!(session.history_len(), 3);
        assert_eq!(session.interaction_count, 5);
        let oldest = session.history().next().unwrap();
        assert_eq!(oldest.transcript, "utterance 2");
        assert_eq!(session.last_response.as_deref(), Some("response 4"));
    }

    #[test]
    fn test_expiry() {
        let session = VoiceSession::new("s1", "c1", SessionConfig::default(), 10);
        assert!(!session.is_expired(Duration::from_secs(60)));
        assert!(session.is_expired(Duration::from_nanos(1)));
    }
}
