//! Core traits and types for the voice floor coordinator
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits for pluggable backends (STT, TTS, resolver, delivery)
//! - Conversation types (turns, modes, lifecycle states)
//! - Pipeline result types
//! - Error types

pub mod conversation;
pub mod error;
pub mod result;
pub mod traits;

pub use conversation::{ConversationMode, ConversationState, Turn};
pub use error::{Error, Result};
pub use result::{CommandResult, FailureKind, ResponseKind, Transcript};

pub use traits::{
    // Resolution
    ContextResolver, Resolution,
    // Delivery
    Delivery,
    // Preferences
    NoPreferences, PreferencesStore, UserProfile,
    // Speech
    Synthesizer, Transcriber,
};
