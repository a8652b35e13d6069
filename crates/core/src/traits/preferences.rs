//! User preference store collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationMode;
use crate::Result;

/// Long-lived user profile read at session start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Preferred TTS voice model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_voice: Option<String>,
    /// Preferred conversation mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_mode: Option<ConversationMode>,
    /// Preferred language tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

/// External preferences collaborator
///
/// Consulted exactly once per session, at creation, to personalize the
/// session config. Never written to by the core.
#[async_trait]
pub trait PreferencesStore: Send + Sync + 'static {
    /// Fetch the profile for a client, if one exists
    async fn profile(&self, client_id: &str) -> Result<Option<UserProfile>>;
}

/// A preferences store with no profiles; used when personalization is not
/// wired up
#[derive(Debug, Default)]
pub struct NoPreferences;

#[async_trait]
impl PreferencesStore for NoPreferences {
    async fn profile(&self, _client_id: &str) -> Result<Option<UserProfile>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_preferences() {
        let store = NoPreferences;
        assert!(store.profile("client-1").await.unwrap().is_none());
    }
}
