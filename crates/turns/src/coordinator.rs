//! The turn coordinator state machine

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use voice_floor_config::TurnSettings;
use voice_floor_core::{ConversationMode, ConversationState, Turn};

use crate::analysis::{is_farewell, is_question};
use crate::state::{TurnOutcome, TurnSignals, TurnState};
use crate::TurnError;

/// Read-only snapshot of a session's turn state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStateSnapshot {
    pub mode: ConversationMode,
    pub lifecycle: ConversationState,
    pub turn_count: usize,
    pub queued_count: usize,
    pub current_speaker: Option<String>,
    pub waiting_for_response: bool,
}

/// Enforces who may speak next, per session
///
/// State is keyed by session id; each session's state sits behind its own
/// lock so unrelated sessions never contend. Locks are only ever held for
/// synchronous, in-memory work.
pub struct TurnCoordinator {
    settings: TurnSettings,
    sessions: DashMap<String, Mutex<TurnState>>,
}

impl TurnCoordinator {
    pub fn new(settings: TurnSettings) -> Self {
        Self {
            settings,
            sessions: DashMap::new(),
        }
    }

    /// Create per-session turn state in the given mode; idempotent
    pub fn initialize_session(&self, session_id: &str, mode: ConversationMode) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Mutex::new(TurnState::new(mode)));
    }

    /// Tear down per-session turn state; missing session is a no-op
    pub fn remove_session(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "turn state removed");
        }
    }

    /// Whether the session has been initialized
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Validate and record one attempted turn
    pub fn process_turn(
        &self,
        session_id: &str,
        speaker_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| TurnError::SessionNotInitialized(session_id.to_string()))?;
        let mut state = entry.lock();

        if state.lifecycle == ConversationState::Ended {
            return Ok(TurnOutcome::Rejected {
                reason: "the conversation has already ended".to_string(),
            });
        }
        if state.lifecycle == ConversationState::Ending {
            // One wrap-up interruption is allowed; it closes the conversation
            state.lifecycle = ConversationState::Ended;
            tracing::debug!(
                session_id = %session_id,
                speaker_id = %speaker_id,
                "turn arrived while conversation is ending, conversation closed"
            );
            return Ok(TurnOutcome::Interrupted);
        }

        if let Some(verdict) = self.validate(&state, speaker_id) {
            tracing::debug!(
                session_id = %session_id,
                speaker_id = %speaker_id,
                mode = %state.mode,
                outcome = ?verdict,
                "turn not accepted"
            );
            if let TurnOutcome::Queued { .. } = verdict {
                state.queue.push_back(Turn::new(speaker_id, text));
            }
            return Ok(verdict);
        }

        let outcome = Self::accept(&mut state, speaker_id, text, self.settings.analysis_window);
        tracing::debug!(
            session_id = %session_id,
            speaker_id = %speaker_id,
            turn_count = state.turns.len(),
            lifecycle = %state.lifecycle,
            "turn accepted"
        );
        Ok(outcome)
    }

    /// Mode validation; `None` means the turn may be accepted
    fn validate(&self, state: &TurnState, speaker_id: &str) -> Option<TurnOutcome> {
        match state.mode {
            ConversationMode::SingleSpeaker => {
                if let Some(authorized) = &state.authorized_speaker {
                    if authorized != speaker_id {
                        return Some(TurnOutcome::Rejected {
                            reason: format!("only {} may speak in this session", authorized),
                        });
                    }
                }
                None
            }
            ConversationMode::Structured => {
                if let Some(last) = state.last_turn_at {
                    if last.elapsed() < self.settings.structured_min_gap() {
                        return Some(TurnOutcome::Rejected {
                            reason: "please wait for the current speaker to finish".to_string(),
                        });
                    }
                }
                if state.waiting_for_response {
                    match &state.expected_responder {
                        Some(expected) if expected != speaker_id => {
                            return Some(TurnOutcome::Rejected {
                                reason: format!("waiting for a response from {}", expected),
                            });
                        }
                        None if state.question_by.as_deref() == Some(speaker_id) => {
                            return Some(TurnOutcome::Rejected {
                                reason: "waiting for a response from another participant"
                                    .to_string(),
                            });
                        }
                        _ => {}
                    }
                }
                None
            }
            ConversationMode::Open => {
                if let (Some(current), Some(last)) = (&state.current_speaker, state.last_turn_at) {
                    if current != speaker_id && last.elapsed() < self.settings.open_queue_window() {
                        return Some(TurnOutcome::Queued {
                            reason: format!(
                                "{} is still speaking; your turn is queued and will be \
                                 processed next",
                                current
                            ),
                        });
                    }
                }
                None
            }
        }
    }

    /// Append an accepted turn and derive conversational signals
    fn accept(
        state: &mut TurnState,
        speaker_id: &str,
        text: &str,
        analysis_window: usize,
    ) -> TurnOutcome {
        let turn = Turn::new(speaker_id, text);
        state.turns.push(turn.clone());
        state.current_speaker = Some(speaker_id.to_string());
        state.last_turn_at = Some(std::time::Instant::now());

        if state.mode == ConversationMode::SingleSpeaker && state.authorized_speaker.is_none() {
            state.authorized_speaker = Some(speaker_id.to_string());
        }

        let signals = Self::analyze(state, speaker_id, text, analysis_window);

        // Response detection clears the previous question before a new one
        // is recorded
        if signals.response_given {
            state.clear_waiting();
        }
        if signals.question_asked {
            state.mark_waiting(speaker_id);
        }

        state.lifecycle = if signals.ending_detected {
            ConversationState::Ending
        } else if state.waiting_for_response {
            ConversationState::WaitingForResponse
        } else {
            ConversationState::Active
        };

        TurnOutcome::Accepted { turn, signals }
    }

    /// Pattern analysis over the most recent turns
    ///
    /// Runs after the new turn has been appended, so the window includes it.
    /// Question and response detection only concern the newest input; ending
    /// detection scans the whole window so a farewell is not lost to an
    /// overlapping turn.
    fn analyze(
        state: &TurnState,
        speaker_id: &str,
        text: &str,
        analysis_window: usize,
    ) -> TurnSignals {
        let ending_detected = state
            .turns
            .iter()
            .rev()
            .take(analysis_window)
            .any(|turn| is_farewell(&turn.text));

        let response_given = state.waiting_for_response
            && state.question_by.as_deref() != Some(speaker_id);

        TurnSignals {
            question_asked: is_question(text),
            response_given,
            ending_detected,
        }
    }

    /// Explicitly enqueue input for deferred processing
    ///
    /// Returns the queue length after insertion.
    pub fn queue_input(
        &self,
        session_id: &str,
        speaker_id: &str,
        text: &str,
    ) -> Result<usize, TurnError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| TurnError::SessionNotInitialized(session_id.to_string()))?;
        let mut state = entry.lock();
        state.queue.push_back(Turn::new(speaker_id, text));
        Ok(state.queue.len())
    }

    /// Drain the next deferred turn through the accepted path
    ///
    /// Turns drain strictly in insertion order; each drained turn is
    /// recorded exactly as if it had been accepted live, preserving its
    /// original speaker and text.
    pub fn dequeue_next_turn(&self, session_id: &str) -> Result<Option<TurnOutcome>, TurnError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| TurnError::SessionNotInitialized(session_id.to_string()))?;
        let mut state = entry.lock();

        let Some(queued) = state.queue.pop_front() else {
            return Ok(None);
        };

        let outcome = Self::accept(
            &mut state,
            &queued.speaker_id,
            &queued.text,
            self.settings.analysis_window,
        );
        Ok(Some(outcome))
    }

    /// Whether a silence prompt is due for a pending question
    pub fn silence_prompt_due(&self, session_id: &str) -> Result<bool, TurnError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| TurnError::SessionNotInitialized(session_id.to_string()))?;
        let state = entry.lock();

        Ok(state.waiting_for_response
            && state
                .question_at
                .map(|at| at.elapsed() >= self.settings.response_prompt_after())
                .unwrap_or(false))
    }

    /// Read-only snapshot for stats reporting
    pub fn snapshot(&self, session_id: &str) -> Result<TurnStateSnapshot, TurnError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| TurnError::SessionNotInitialized(session_id.to_string()))?;
        let state = entry.lock();

        Ok(TurnStateSnapshot {
            mode: state.mode,
            lifecycle: state.lifecycle,
            turn_count: state.turns.len(),
            queued_count: state.queue.len(),
            current_speaker: state.current_speaker.clone(),
            waiting_for_response: state.waiting_for_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn coordinator() -> TurnCoordinator {
        TurnCoordinator::new(TurnSettings::default())
    }

    /// Settings with short windows so tests can cross them by sleeping
    fn fast_settings() -> TurnSettings {
        TurnSettings {
            structured_min_gap_ms: 30,
            open_queue_window_ms: 30,
            response_prompt_after_ms: 50,
            analysis_window: 5,
        }
    }

    #[test]
    fn test_unknown_session() {
        let coord = coordinator();
        assert!(matches!(
            coord.process_turn("missing", "Speaker_1", "hello"),
            Err(TurnError::SessionNotInitialized(_))
        ));
    }

    #[test]
    fn test_single_speaker_locks_to_first() {
        let coord = coordinator();
        coord.initialize_session("s1", ConversationMode::SingleSpeaker);

        let first = coord.process_turn("s1", "Speaker_1", "hello").unwrap();
        assert!(first.is_accepted());

        // Every other speaker is rejected, never queued, for the session's
        // whole lifetime
        for attempt in 0..3 {
            let other = coord
                .process_turn("s1", "Speaker_2", &format!("attempt {}", attempt))
                .unwrap();
            match other {
                TurnOutcome::Rejected { reason } => {
                    assert!(reason.contains("Speaker_1"));
                }
                outcome => panic!("expected rejection, got {:?}", outcome),
            }
        }

        // The authorized speaker keeps the floor
        let again = coord.process_turn("s1", "Speaker_1", "still me").unwrap();
        assert!(again.is_accepted());

        let snapshot = coord.snapshot("s1").unwrap();
        assert_eq!(snapshot.turn_count, 2);
        assert_eq!(snapshot.queued_count, 0);
    }

    #[test]
    fn test_structured_rejects_fast_second_turn() {
        let coord = coordinator();
        coord.initialize_session("s1", ConversationMode::Structured);

        assert!(coord.process_turn("s1", "A", "first").unwrap().is_accepted());

        // Second turn well inside the 2000ms gap
        match coord.process_turn("s1", "B", "too soon").unwrap() {
            TurnOutcome::Rejected { reason } => {
                assert!(reason.contains("wait for the current speaker"));
            }
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[test]
    fn test_structured_accepts_after_gap() {
        let coord = TurnCoordinator::new(fast_settings());
        coord.initialize_session("s1", ConversationMode::Structured);

        assert!(coord.process_turn("s1", "A", "first").unwrap().is_accepted());
        std::thread::sleep(Duration::from_millis(40));
        assert!(coord.process_turn("s1", "B", "second").unwrap().is_accepted());
    }

    #[test]
    fn test_structured_question_response_flow() {
        let coord = TurnCoordinator::new(fast_settings());
        coord.initialize_session("s1", ConversationMode::Structured);

        let question = coord
            .process_turn("s1", "A", "what is the refund policy?")
            .unwrap();
        match question {
            TurnOutcome::Accepted { signals, .. } => {
                assert!(signals.question_asked);
                assert!(!signals.response_given);
            }
            outcome => panic!("expected acceptance, got {:?}", outcome),
        }
        assert!(coord.snapshot("s1").unwrap().waiting_for_response);

        // The asker cannot answer their own question even after the gap
        std::thread::sleep(Duration::from_millis(40));
        match coord.process_turn("s1", "A", "also, one more thing").unwrap() {
            TurnOutcome::Rejected { reason } => {
                assert!(reason.contains("another participant"));
            }
            outcome => panic!("expected rejection, got {:?}", outcome),
        }

        // A different speaker answers; waiting clears
        let reply = coord
            .process_turn("s1", "B", "refunds take five business days")
            .unwrap();
        match reply {
            TurnOutcome::Accepted { signals, .. } => {
                assert!(signals.response_given);
            }
            outcome => panic!("expected acceptance, got {:?}", outcome),
        }
        assert!(!coord.snapshot("s1").unwrap().waiting_for_response);
    }

    #[test]
    fn test_open_mode_queues_overlapping_speaker() {
        let coord = coordinator();
        coord.initialize_session("s1", ConversationMode::Open);

        assert!(coord.process_turn("s1", "A", "first").unwrap().is_accepted());

        // Different speaker inside the 1000ms window is queued, not rejected
        match coord.process_turn("s1", "B", "me too").unwrap() {
            TurnOutcome::Queued { reason } => {
                assert!(reason.contains("queued"));
            }
            outcome => panic!("expected queue, got {:?}", outcome),
        }

        // Same speaker continuing is accepted
        assert!(coord.process_turn("s1", "A", "continuing").unwrap().is_accepted());

        let snapshot = coord.snapshot("s1").unwrap();
        assert_eq!(snapshot.queued_count, 1);
        assert_eq!(snapshot.turn_count, 2);
    }

    #[test]
    fn test_open_mode_queue_drains_fifo() {
        let coord = coordinator();
        coord.initialize_session("s1", ConversationMode::Open);

        assert!(coord.process_turn("s1", "A", "opening").unwrap().is_accepted());
        coord.queue_input("s1", "B", "first queued").unwrap();
        coord.queue_input("s1", "C", "second queued").unwrap();
        coord.queue_input("s1", "B", "third queued").unwrap();

        let drained: Vec<(String, String)> = std::iter::from_fn(|| {
            coord.dequeue_next_turn("s1").unwrap().map(|outcome| match outcome {
                TurnOutcome::Accepted { turn, .. } => (turn.speaker_id, turn.text),
                outcome => panic!("drained turn not accepted: {:?}", outcome),
            })
        })
        .collect();

        assert_eq!(
            drained,
            vec![
                ("B".to_string(), "first queued".to_string()),
                ("C".to_string(), "second queued".to_string()),
                ("B".to_string(), "third queued".to_string()),
            ]
        );

        // Drained turns were reinserted through the accepted path
        let snapshot = coord.snapshot("s1").unwrap();
        assert_eq!(snapshot.turn_count, 4);
        assert_eq!(snapshot.queued_count, 0);
        assert!(coord.dequeue_next_turn("s1").unwrap().is_none());
    }

    #[test]
    fn test_open_mode_accepts_after_window() {
        let coord = TurnCoordinator::new(fast_settings());
        coord.initialize_session("s1", ConversationMode::Open);

        assert!(coord.process_turn("s1", "A", "first").unwrap().is_accepted());
        std::thread::sleep(Duration::from_millis(40));
        assert!(coord.process_turn("s1", "B", "after the window").unwrap().is_accepted());
    }

    #[test]
    fn test_farewell_winds_down_then_closes() {
        let coord = TurnCoordinator::new(fast_settings());
        coord.initialize_session("s1", ConversationMode::Structured);

        let farewell = coord.process_turn("s1", "A", "okay, goodbye").unwrap();
        match farewell {
            TurnOutcome::Accepted { signals, .. } => assert!(signals.ending_detected),
            outcome => panic!("expected acceptance, got {:?}", outcome),
        }
        assert_eq!(
            coord.snapshot("s1").unwrap().lifecycle,
            ConversationState::Ending
        );

        // A turn during wind-down is interrupted and closes the conversation
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(
            coord.process_turn("s1", "B", "wait, one more thing").unwrap(),
            TurnOutcome::Interrupted
        );
        assert_eq!(
            coord.snapshot("s1").unwrap().lifecycle,
            ConversationState::Ended
        );

        // Once ended, every turn is rejected
        std::thread::sleep(Duration::from_millis(40));
        match coord.process_turn("s1", "A", "hello again?").unwrap() {
            TurnOutcome::Rejected { reason } => assert!(reason.contains("ended")),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
        assert_eq!(coord.snapshot("s1").unwrap().turn_count, 1);
    }

    #[test]
    fn test_silence_prompt_due() {
        let coord = TurnCoordinator::new(fast_settings());
        coord.initialize_session("s1", ConversationMode::Structured);

        coord
            .process_turn("s1", "A", "does anyone know the schedule?")
            .unwrap();
        assert!(!coord.silence_prompt_due("s1").unwrap());

        std::thread::sleep(Duration::from_millis(60));
        assert!(coord.silence_prompt_due("s1").unwrap());
    }

    #[test]
    fn test_remove_session() {
        let coord = coordinator();
        coord.initialize_session("s1", ConversationMode::Open);
        coord.process_turn("s1", "A", "hello").unwrap();

        coord.remove_session("s1");
        assert!(!coord.has_session("s1"));
        assert!(coord.snapshot("s1").is_err());

        // Idempotent
        coord.remove_session("s1");
    }
}
