//! Speaker identification for live voice sessions
//!
//! Given an utterance's audio and transcript, re-identifies a returning
//! speaker within a session or mints a new one, maintaining a running
//! feature profile per speaker. Cross-session enrollment is kept in a
//! separate store that live identification never touches.
//!
//! The acoustic features are explicitly heuristic placeholders for real
//! voice biometrics; they sit behind the narrow [`FeatureExtractor`] trait
//! so a real model can be swapped in without touching the rest of the
//! system.

pub mod enrollment;
pub mod features;
pub mod identifier;
pub mod record;

pub use enrollment::{EnrolledSpeakerProfile, EnrollmentStore};
pub use features::{FeatureExtractor, HeuristicFeatureExtractor, VoiceFeatures};
pub use identifier::{Identification, SpeakerIdentifier};
pub use record::SpeakerRecord;

use thiserror::Error;

/// Speaker identification errors
#[derive(Error, Debug, Clone)]
pub enum SpeakerError {
    /// The session was never initialized with the identifier
    #[error("session not initialized: {0}")]
    SessionNotInitialized(String),

    /// The caller supplied unusable input (e.g. no audio data)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
