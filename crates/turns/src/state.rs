//! Per-session turn state

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use voice_floor_core::{ConversationMode, ConversationState, Turn};

/// Verdict for one attempted turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Turn accepted and appended to the conversation
    Accepted {
        turn: Turn,
        signals: TurnSignals,
    },
    /// Turn rejected by mode policy; the reason is user-facing
    Rejected { reason: String },
    /// Turn deferred into the FIFO queue; the reason is user-facing
    Queued { reason: String },
    /// Turn arrived while the conversation was winding down; issuing the
    /// interruption closes the conversation
    Interrupted,
}

impl TurnOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TurnOutcome::Accepted { .. })
    }
}

/// Conversational signals derived from an accepted turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSignals {
    /// The new input is a question
    pub question_asked: bool,
    /// The new input answered a pending question
    pub response_given: bool,
    /// The new input signals the conversation is ending
    pub ending_detected: bool,
}

/// Mutable turn-taking state for one session
///
/// All fields are guarded by the coordinator's per-session lock; nothing in
/// here is shared without it.
#[derive(Debug)]
pub struct TurnState {
    /// Conversation mode fixed at session start
    pub mode: ConversationMode,
    /// Lifecycle state
    pub lifecycle: ConversationState,
    /// Accepted turns, append-only
    pub turns: Vec<Turn>,
    /// FIFO queue of deferred turns (Open mode)
    pub queue: VecDeque<Turn>,
    /// Speaker of the most recent accepted turn
    pub current_speaker: Option<String>,
    /// Single-speaker mode: the only speaker ever accepted
    pub authorized_speaker: Option<String>,
    /// When the most recent turn was accepted
    pub last_turn_at: Option<Instant>,
    /// A question is pending an answer
    pub waiting_for_response: bool,
    /// Who asked the pending question; set whenever waiting
    pub question_by: Option<String>,
    /// Specific speaker expected to answer; `None` means any speaker other
    /// than the asker
    pub expected_responder: Option<String>,
    /// When the pending question was asked
    pub question_at: Option<Instant>,
}

impl TurnState {
    pub fn new(mode: ConversationMode) -> Self {
        Self {
            mode,
            lifecycle: ConversationState::Starting,
            turns: Vec::new(),
            queue: VecDeque::new(),
            current_speaker: None,
            authorized_speaker: None,
            last_turn_at: None,
            waiting_for_response: false,
            question_by: None,
            expected_responder: None,
            question_at: None,
        }
    }

    /// Clear the pending-question bookkeeping
    pub fn clear_waiting(&mut self) {
        self.waiting_for_response = false;
        self.question_by = None;
        self.expected_responder = None;
        self.question_at = None;
    }

    /// Mark a question pending from `asker`
    pub fn mark_waiting(&mut self, asker: &str) {
        self.waiting_for_response = true;
        self.question_by = Some(asker.to_string());
        self.expected_responder = None;
        self.question_at = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = TurnState::new(ConversationMode::Open);
        assert_eq!(state.lifecycle, ConversationState::Starting);
        assert!(state.turns.is_empty());
        assert!(state.queue.is_empty());
        assert!(!state.waiting_for_response);
    }

    #[test]
    fn test_waiting_bookkeeping() {
        let mut state = TurnState::new(ConversationMode::Structured);
        state.mark_waiting("Speaker_1");
        assert!(state.waiting_for_response);
        assert_eq!(state.question_by.as_deref(), Some("Speaker_1"));
        assert!(state.question_at.is_some());

        state.clear_waiting();
        assert!(!state.waiting_for_response);
        assert!(state.question_by.is_none());
        assert!(state.question_at.is_none());
    }
}
