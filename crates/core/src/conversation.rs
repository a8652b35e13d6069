//! Conversation types: turns, modes, and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Policy governing who may speak next in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// One speaker holds the floor for the whole session
    SingleSpeaker,
    /// Speakers alternate with enforced gaps and response expectations
    #[default]
    Structured,
    /// Free-for-all; near-simultaneous turns are deferred, not rejected
    Open,
}

impl ConversationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationMode::SingleSpeaker => "single_speaker",
            ConversationMode::Structured => "structured",
            ConversationMode::Open => "open",
        }
    }
}

impl std::fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConversationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single_speaker" | "single" => Ok(ConversationMode::SingleSpeaker),
            "structured" => Ok(ConversationMode::Structured),
            "open" => Ok(ConversationMode::Open),
            other => Err(format!("unknown conversation mode: {}", other)),
        }
    }
}

/// Conversation lifecycle state for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No turn accepted yet
    #[default]
    Starting,
    /// At least one turn accepted, conversation flowing
    Active,
    /// A question is pending an answer
    WaitingForResponse,
    /// A farewell was detected; conversation winding down
    Ending,
    /// Conversation closed; no further turns accepted
    Ended,
}

impl ConversationState {
    /// Whether the conversation still accepts turns
    pub fn accepts_turns(&self) -> bool {
        !matches!(self, ConversationState::Ended)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversationState::Starting => "starting",
            ConversationState::Active => "active",
            ConversationState::WaitingForResponse => "waiting_for_response",
            ConversationState::Ending => "ending",
            ConversationState::Ended => "ended",
        };
        write!(f, "{}", s)
    }
}

/// One accepted utterance attributed to a speaker
///
/// Turns are immutable once created and only ever appended to a session's
/// turn list or drained from its deferral queue in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker the utterance is attributed to
    pub speaker_id: String,
    /// Raw input text
    pub text: String,
    /// When the turn was created
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn stamped with the current time
    pub fn new(speaker_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get word count of the input text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "structured".parse::<ConversationMode>().unwrap(),
            ConversationMode::Structured
        );
        assert_eq!(
            "SINGLE_SPEAKER".to_lowercase().parse::<ConversationMode>().unwrap(),
            ConversationMode::SingleSpeaker
        );
        assert!("chaos".parse::<ConversationMode>().is_err());
    }

    #[test]
    fn test_state_accepts_turns() {
        assert!(ConversationState::Starting.accepts_turns());
        assert!(ConversationState::Ending.accepts_turns());
        assert!(!ConversationState::Ended.accepts_turns());
    }

    #[test]
    fn test_turn_creation() {
        let turn = Turn::new("Speaker_1", "what is the refund policy?");
        assert_eq!(turn.speaker_id, "Speaker_1");
        assert_eq!(turn.word_count(), 5);
    }
}
