//! Response delivery collaborator

use async_trait::async_trait;

use crate::Result;

/// Push a response to a session's live connection
///
/// This is an injected connection-registry interface owned by the delivery
/// layer, replacing process-wide broadcast registries so sessions and tests
/// stay isolated. Delivery is fire-and-forget from the pipeline's point of
/// view: failures are logged by the caller, never propagated as pipeline
/// failures.
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Deliver a response to the session's connection
    ///
    /// # Arguments
    /// * `session_id` - Target session
    /// * `text` - Response text, always present
    /// * `audio` - Synthesized audio, when available
    async fn deliver(&self, session_id: &str, text: &str, audio: Option<&[u8]>) -> Result<()>;
}
