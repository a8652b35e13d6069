//! Session lifecycle for the voice floor coordinator
//!
//! The registry owns every active [`VoiceSession`] and keeps the speaker and
//! turn sub-state in lockstep with it: a session never exists without both,
//! and ending a session tears all three down atomically from the caller's
//! point of view.

pub mod registry;
pub mod session;

pub use registry::{SessionHandle, SessionRegistry};
pub use session::{Interaction, SessionConfig, SessionStats, VoiceSession};

use thiserror::Error;

/// Session errors
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Unknown session id
    #[error("session not found: {0}")]
    NotFound(String),

    /// A session with this id is already active
    #[error("session already exists: {0}")]
    AlreadyExists(String),

    /// The registry is at capacity
    #[error("maximum of {max} concurrent sessions reached")]
    Capacity { max: usize },
}
