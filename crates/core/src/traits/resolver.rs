//! Context-aware response resolution

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Result of a context-aware resolution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// Response text
    pub text: String,
    /// Number of relevant results backing the response; zero signals the
    /// caller to fall back to the rule-based resolver
    pub relevant_results: usize,
}

impl Resolution {
    pub fn new(text: impl Into<String>, relevant_results: usize) -> Self {
        Self {
            text: text.into(),
            relevant_results,
        }
    }

    /// A resolution with nothing relevant to say
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            relevant_results: 0,
        }
    }

    /// Whether the resolver found anything relevant
    pub fn is_relevant(&self) -> bool {
        self.relevant_results > 0 && !self.text.trim().is_empty()
    }
}

/// Context-aware response resolver (RAG-style collaborator)
///
/// Turns an authorized utterance's transcript into a response using whatever
/// knowledge is indexed for the client. The intelligence is a black box; the
/// contract is query + conversation context + client id in, text and a
/// relevance count out.
#[async_trait]
pub trait ContextResolver: Send + Sync + 'static {
    /// Resolve a response for the query
    ///
    /// # Arguments
    /// * `query` - The utterance transcript
    /// * `context` - The session's current conversational context
    /// * `client_id` - Client whose knowledge base to consult
    async fn resolve(&self, query: &str, context: &str, client_id: &str) -> Result<Resolution>;

    /// Get resolver name for logging
    fn name(&self) -> &str;
}
