//! Collaborator traits consumed by the pipeline
//!
//! All external intelligence (STT, TTS, context resolution, delivery,
//! preferences) sits behind these interfaces so the core can be wired with
//! mocks in tests and real providers in production.

pub mod delivery;
pub mod preferences;
pub mod resolver;
pub mod speech;

pub use delivery::Delivery;
pub use preferences::{NoPreferences, PreferencesStore, UserProfile};
pub use resolver::{ContextResolver, Resolution};
pub use speech::{Synthesizer, Transcriber};
