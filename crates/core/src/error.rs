//! Shared error type for collaborator contracts

use thiserror::Error;

/// Errors surfaced by core collaborator traits
#[derive(Error, Debug)]
pub enum Error {
    /// A session id was used before the owning component initialized it
    #[error("session not initialized: {0}")]
    SessionNotInitialized(String),

    /// Caller supplied input the contract cannot accept
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An external provider (STT, TTS, resolver, preferences) failed
    #[error("provider error: {0}")]
    Provider(String),

    /// Delivery to the session's live connection failed
    #[error("delivery error: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, Error>;
