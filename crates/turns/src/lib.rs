//! Turn coordination for multi-speaker voice sessions
//!
//! A per-session state machine decides whether each attempted utterance is
//! accepted, rejected, queued for deferred processing, or treated as an
//! interruption, under one of three conversation modes. Policy verdicts are
//! structured outcomes, never errors: they are expected, frequent control
//! flow.

pub mod analysis;
pub mod coordinator;
pub mod state;

pub use analysis::{is_farewell, is_question};
pub use coordinator::{TurnCoordinator, TurnStateSnapshot};
pub use state::{TurnOutcome, TurnSignals, TurnState};

use thiserror::Error;

/// Turn coordination errors
#[derive(Error, Debug, Clone)]
pub enum TurnError {
    /// The session was never initialized with the coordinator
    #[error("session not initialized: {0}")]
    SessionNotInitialized(String),
}
