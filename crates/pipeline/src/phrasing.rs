//! Response phrasing with injectable randomness
//!
//! Phrase pools give spoken responses some variety without a template
//! engine. The randomness source is seedable so tests can pin the exact
//! phrasing that comes out.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

static REJECTION_TEMPLATES: &[&str] = &[
    "Hold on: {reason}.",
    "One moment please, {reason}.",
    "Not just yet, {reason}.",
];

static QUEUE_TEMPLATES: &[&str] = &[
    "Got it, {reason}.",
    "Heard you, {reason}.",
];

static INTERRUPT_PHRASES: &[&str] = &[
    "We're just wrapping up; I'll take that in a moment.",
    "The conversation is winding down, one second please.",
];

static SILENCE_PROMPTS: &[&str] = &[
    "Is anyone able to answer that question?",
    "Still waiting on an answer, would anyone like to respond?",
    "That question is still open if anyone wants to take it.",
];

static TRANSCRIPTION_FAILURES: &[&str] = &[
    "Sorry, I couldn't make out what was said. Could you repeat that?",
    "I had trouble hearing that, please try again.",
];

static EMPTY_SPEECH: &[&str] = &[
    "I didn't catch any speech in that, could you say it again?",
    "That came through silent on my end, please try once more.",
];

/// Picks response phrasings from a seedable randomness source
pub struct PhraseBook {
    rng: Mutex<StdRng>,
}

impl PhraseBook {
    /// Entropy-seeded phrasing for production use
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic phrasing for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick one phrase from a pool
    pub fn pick<'a>(&self, pool: &[&'a str]) -> &'a str {
        let index = self.rng.lock().gen_range(0..pool.len());
        pool[index]
    }

    /// Phrase a turn rejection around the coordinator's reason
    pub fn rejection(&self, reason: &str) -> String {
        self.pick(REJECTION_TEMPLATES).replace("{reason}", reason)
    }

    /// Phrase a queued-turn notice around the coordinator's reason
    pub fn queued(&self, reason: &str) -> String {
        self.pick(QUEUE_TEMPLATES).replace("{reason}", reason)
    }

    /// Phrase an interrupted-turn notice
    pub fn interrupted(&self) -> String {
        self.pick(INTERRUPT_PHRASES).to_string()
    }

    /// Prompt for a question left unanswered too long
    pub fn silence_prompt(&self) -> String {
        self.pick(SILENCE_PROMPTS).to_string()
    }

    /// Message for exhausted transcription providers
    pub fn transcription_failure(&self) -> String {
        self.pick(TRANSCRIPTION_FAILURES).to_string()
    }

    /// Message for audio that transcribed to nothing
    pub fn empty_speech(&self) -> String {
        self.pick(EMPTY_SPEECH).to_string()
    }
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self::new()
    }
}
