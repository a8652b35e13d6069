//! Utterance pipeline for the voice floor coordinator
//!
//! The [`Orchestrator`] sequences audio validation, transcription, speaker
//! identification, turn authorization, response resolution, speech
//! synthesis, and dispatch for each utterance, translating every stage's
//! failure into a typed, message-carrying result. Network stages await
//! without holding any session-scoped state lock; per-session submission
//! order is preserved by an admission gate.

pub mod orchestrator;
pub mod phrasing;
pub mod resolver;

pub use orchestrator::Orchestrator;
pub use phrasing::PhraseBook;
pub use resolver::{RuleBasedResolver, RuleMatch};

use thiserror::Error;

use voice_floor_session::SessionError;
use voice_floor_turns::TurnError;

/// Pipeline surface errors
///
/// Most failure modes are encoded in [`voice_floor_core::CommandResult`];
/// this enum covers the operations that fail before a result can be
/// produced (unknown sessions on the management surface).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("turn error: {0}")]
    Turn(#[from] TurnError),
}
